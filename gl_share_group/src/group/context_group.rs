/// ContextGroup - synchronization point for contexts sharing GPU objects
///
/// The group owns the registry of every resource created for its share
/// set, the FIFO of resources whose release was requested while no member
/// context was current, and the per-group slots of multi-group resources.
///
/// All state sits behind one mutex. Resource callbacks and context hooks
/// (`make_current`) always run after the lock is released: the group
/// collects what must be done under the lock, then executes it. A resource
/// callback that frees another resource is therefore an ordinary call and
/// cannot deadlock on the group.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::context::{Context, ContextId};
use crate::error::Result;
use crate::resource::{SharedHandle, SharedResource, ResourceKey, MultiGroupId};
use crate::runtime::Runtime;
use crate::{glshare_bail, glshare_debug, glshare_trace, glshare_warn};

// ===== GROUP ID =====

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a context group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl GroupId {
    fn next() -> Self {
        Self(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

// ===== INTERNAL STATE =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// Registered, release not requested
    Live,
    /// Release requested, waiting in the pending FIFO
    Pending,
}

struct ResourceEntry {
    resource: Arc<Mutex<dyn SharedResource>>,
    state: EntryState,
}

struct MultiGroupSlot {
    key: ResourceKey,
    value: Arc<dyn Any + Send + Sync>,
}

struct Member {
    id: ContextId,
    context: Weak<dyn Context>,
}

#[derive(Default)]
struct GroupState {
    members: Vec<Member>,
    /// First member still in the group; identifies the share set
    primary: Option<ContextId>,
    resources: SlotMap<ResourceKey, ResourceEntry>,
    pending: VecDeque<ResourceKey>,
    multi_group: FxHashMap<MultiGroupId, MultiGroupSlot>,
    destroyed: bool,
}

impl GroupState {
    fn is_member(&self, id: ContextId) -> bool {
        self.members.iter().any(|member| member.id == id)
    }

    fn live_members(&self) -> Vec<Arc<dyn Context>> {
        self.members.iter().filter_map(|member| member.context.upgrade()).collect()
    }

    fn remove_entry(&mut self, key: ResourceKey) -> Option<Arc<Mutex<dyn SharedResource>>> {
        let entry = self.resources.remove(key)?;
        if entry.state == EntryState::Pending {
            self.pending.retain(|pending| *pending != key);
        }
        Some(entry.resource)
    }

    /// Take every pending resource, oldest first
    fn drain_pending(&mut self) -> Vec<Arc<Mutex<dyn SharedResource>>> {
        let mut drained = Vec::with_capacity(self.pending.len());
        while let Some(key) = self.pending.pop_front() {
            if let Some(entry) = self.resources.remove(key) {
                drained.push(entry.resource);
            }
        }
        drained
    }

    /// Mark the group destroyed and hand back everything left to invalidate
    fn tear_down(&mut self) -> Vec<Arc<Mutex<dyn SharedResource>>> {
        self.destroyed = true;
        self.primary = None;
        self.members.clear();
        self.pending.clear();
        self.multi_group.clear();
        self.resources.drain().map(|(_, entry)| entry.resource).collect()
    }
}

// ============================================================================
// ContextGroup
// ============================================================================

/// A set of contexts sharing GPU objects
///
/// Member contexts hold the group through an `Arc`; the group only keeps
/// weak references to them. When the last member is removed the group is
/// torn down: every resource it still tracks is invalidated, and the group
/// refuses new members and resources from then on.
///
/// # Example
///
/// ```ignore
/// let group = ContextGroup::new();
/// group.add_context(&context)?;
///
/// let texture = group.register(ResourceGuard::new(id, release::delete_texture))?;
/// texture.free(); // freed now if a member is current, queued otherwise
///
/// group.remove_context(&*context); // flushes the queue, then tears down
/// ```
pub struct ContextGroup {
    id: GroupId,
    state: Mutex<GroupState>,
}

impl ContextGroup {
    /// Create a new empty group
    pub fn new() -> Arc<Self> {
        let group = Arc::new(Self {
            id: GroupId::next(),
            state: Mutex::new(GroupState::default()),
        });
        Runtime::group_created();
        glshare_debug!("glshare::ContextGroup", "Created {}", group.id);
        group
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    // ===== MEMBERSHIP =====

    /// Add a context to the group
    ///
    /// The first member becomes the primary share context. Adding a context
    /// twice has no effect.
    ///
    /// # Errors
    ///
    /// Returns `GroupDestroyed` if the group already lost its last context.
    pub fn add_context(&self, context: &Arc<dyn Context>) -> Result<()> {
        let id = context.id();
        let joined = {
            let mut state = self.state.lock();
            if state.destroyed {
                None
            } else if state.is_member(id) {
                return Ok(());
            } else {
                state.members.push(Member { id, context: Arc::downgrade(context) });
                if state.primary.is_none() {
                    state.primary = Some(id);
                }
                Some(state.members.len())
            }
        };
        let Some(count) = joined else {
            glshare_bail!(GroupDestroyed, "glshare::ContextGroup",
                "Cannot add {} to {}: group was torn down", id, self.id);
        };
        glshare_debug!("glshare::ContextGroup", "{} joined {} ({} member(s))", id, self.id, count);
        Ok(())
    }

    /// Remove a context from the group
    ///
    /// Pending deletions are flushed with `context` first (it is made
    /// current if needed), since it may be the last context able to issue
    /// them. If no member remains afterwards, the group is torn down and
    /// every resource it still tracks, live or pending, is invalidated.
    pub fn remove_context(&self, context: &dyn Context) {
        let id = context.id();
        if !self.state.lock().is_member(id) {
            glshare_warn!("glshare::ContextGroup", "{} is not a member of {}", id, self.id);
            return;
        }

        self.cleanup_resources(context);

        let (remaining, invalidated) = {
            let mut state = self.state.lock();
            let Some(index) = state.members.iter().position(|member| member.id == id) else {
                return;
            };
            state.members.remove(index);
            if state.primary == Some(id) {
                state.primary = state.members.first().map(|member| member.id);
            }
            let remaining = state.members.len();
            (remaining, (remaining == 0).then(|| state.tear_down()))
        };

        glshare_debug!("glshare::ContextGroup", "{} left {} ({} member(s))", id, self.id, remaining);
        let Some(invalidated) = invalidated else {
            return;
        };

        let count = invalidated.len();
        for resource in invalidated {
            resource.lock().invalidate_resource();
        }
        Runtime::group_destroyed();
        glshare_debug!("glshare::ContextGroup",
            "Destroyed {}, {} resource(s) invalidated", self.id, count);
    }

    /// Last flush before `context` leaves the group
    ///
    /// Whatever context was current on the thread before is current again
    /// afterwards.
    fn cleanup_resources(&self, context: &dyn Context) {
        if self.pending_count() == 0 {
            return;
        }
        let was_current = context.is_current();
        let previous = context.current_on_thread();
        self.delete_pending_resources(context);
        if !was_current && context.is_current() {
            context.restore_current(previous);
        }
    }

    // ===== RELEASE =====

    /// Free every pending resource with `context`
    ///
    /// `context` must be a member of this group. If it is not current it
    /// is made current through its hook; if that fails the resources stay
    /// queued for the next opportunity. Resources are freed oldest first.
    pub fn delete_pending_resources(&self, context: &dyn Context) {
        let (is_member, has_pending) = {
            let state = self.state.lock();
            (state.is_member(context.id()), !state.pending.is_empty())
        };
        if !is_member {
            glshare_warn!("glshare::ContextGroup",
                "Refusing to flush {} with foreign {}", self.id, context.id());
            return;
        }
        if !has_pending {
            return;
        }

        if !context.is_current() {
            if let Err(err) = context.make_current() {
                glshare_warn!("glshare::ContextGroup",
                    "Deferring {} pending deletion(s) in {}: {}", self.pending_count(), self.id, err);
                return;
            }
        }

        let pending = {
            let mut state = self.state.lock();
            if !state.is_member(context.id()) {
                return;
            }
            state.drain_pending()
        };
        if pending.is_empty() {
            return;
        }

        glshare_trace!("glshare::ContextGroup",
            "Freeing {} resource(s) in {} with {}", pending.len(), self.id, context.id());
        for resource in pending {
            resource.lock().free_resource(context);
        }
    }

    /// Request release of a registered resource (see [`SharedHandle::free`])
    pub(crate) fn free(&self, key: ResourceKey) {
        let members = {
            let mut state = self.state.lock();
            match state.resources.get_mut(key) {
                Some(entry) if entry.state == EntryState::Live => entry.state = EntryState::Pending,
                _ => return,
            }
            state.pending.push_back(key);
            state.live_members()
        };

        match members.iter().find(|context| context.is_current()) {
            Some(current) => self.delete_pending_resources(current.as_ref()),
            None => glshare_trace!("glshare::ContextGroup",
                "No current context in {}, release deferred ({} pending)", self.id, self.pending_count()),
        }
    }

    // ===== REGISTRY =====

    /// Register a resource in this group
    ///
    /// # Errors
    ///
    /// Returns `GroupDestroyed` if the group already lost its last context.
    pub fn register<T: SharedResource + 'static>(self: &Arc<Self>, resource: T) -> Result<SharedHandle<T>> {
        let shared = Arc::new(Mutex::new(resource));
        let key = self.insert_entry(shared.clone())?;
        Ok(SharedHandle::new(Arc::downgrade(self), key, shared))
    }

    fn insert_entry(&self, resource: Arc<Mutex<dyn SharedResource>>) -> Result<ResourceKey> {
        let key = {
            let mut state = self.state.lock();
            (!state.destroyed).then(|| state.resources.insert(ResourceEntry { resource, state: EntryState::Live }))
        };
        match key {
            Some(key) => Ok(key),
            None => glshare_bail!(GroupDestroyed, "glshare::ContextGroup",
                "Cannot register a resource in {}: group was torn down", self.id),
        }
    }

    pub(crate) fn contains_resource(&self, key: ResourceKey) -> bool {
        self.state.lock().resources.contains_key(key)
    }

    pub(crate) fn is_resource_pending(&self, key: ResourceKey) -> bool {
        self.state
            .lock()
            .resources
            .get(key)
            .map_or(false, |entry| entry.state == EntryState::Pending)
    }

    // ===== MULTI GROUP SLOTS =====

    pub(crate) fn multi_group_value(&self, id: MultiGroupId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.state.lock().multi_group.get(&id).map(|slot| slot.value.clone())
    }

    /// Store `value` in the slot of `id`, registering `resource` with it
    ///
    /// Without `replace`, an occupied slot wins and its value is returned.
    /// With `replace`, the previous occupant is unregistered and invalidated.
    pub(crate) fn insert_multi_group_slot(
        &self,
        id: MultiGroupId,
        value: Arc<dyn Any + Send + Sync>,
        resource: Arc<Mutex<dyn SharedResource>>,
        replace: bool,
    ) -> Result<Arc<dyn Any + Send + Sync>> {
        let replaced = {
            let mut state = self.state.lock();
            if state.destroyed {
                drop(state);
                glshare_bail!(GroupDestroyed, "glshare::ContextGroup",
                    "Cannot populate {} in {}: group was torn down", id, self.id);
            }
            if let Some(existing) = state.multi_group.get(&id) {
                if !replace {
                    return Ok(existing.value.clone());
                }
            }
            let key = state.resources.insert(ResourceEntry { resource, state: EntryState::Live });
            let previous = state.multi_group.insert(id, MultiGroupSlot { key, value: value.clone() });
            previous.and_then(|slot| state.remove_entry(slot.key))
        };

        if let Some(previous) = replaced {
            previous.lock().invalidate_resource();
        }
        Ok(value)
    }

    /// Empty the slot of `id`, unregistering its resource
    pub(crate) fn take_multi_group_slot(&self, id: MultiGroupId) -> Option<Arc<Mutex<dyn SharedResource>>> {
        let mut state = self.state.lock();
        let slot = state.multi_group.remove(&id)?;
        state.remove_entry(slot.key)
    }

    // ===== QUERIES =====

    /// Member contexts still alive, in joining order
    pub fn contexts(&self) -> Vec<Arc<dyn Context>> {
        self.state.lock().live_members()
    }

    /// Whether `id` is a member
    pub fn has_context(&self, id: ContextId) -> bool {
        self.state.lock().is_member(id)
    }

    /// Number of member contexts
    pub fn context_count(&self) -> usize {
        self.state.lock().members.len()
    }

    /// Reference count of the group: one per member context
    pub fn ref_count(&self) -> usize {
        self.context_count()
    }

    /// Primary share context: the earliest member still in the group
    pub fn primary_context(&self) -> Option<Arc<dyn Context>> {
        let state = self.state.lock();
        let primary = state.primary?;
        state
            .members
            .iter()
            .find(|member| member.id == primary)
            .and_then(|member| member.context.upgrade())
    }

    /// Member context current on the calling thread, if any
    pub fn current_context(&self) -> Option<Arc<dyn Context>> {
        self.contexts().into_iter().find(|context| context.is_current())
    }

    /// Number of registered resources (live and pending)
    pub fn resource_count(&self) -> usize {
        self.state.lock().resources.len()
    }

    /// Number of resources waiting for a current context
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Whether the group lost its last context
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }
}

impl fmt::Debug for ContextGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ContextGroup")
            .field("id", &self.id)
            .field("members", &state.members.len())
            .field("resources", &state.resources.len())
            .field("pending", &state.pending.len())
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

impl Drop for ContextGroup {
    fn drop(&mut self) {
        // Only reachable when members never left through remove_context.
        let state = self.state.get_mut();
        if state.destroyed {
            return;
        }
        let leftovers = state.tear_down();
        for resource in leftovers {
            resource.lock().invalidate_resource();
        }
        Runtime::group_destroyed();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "context_group_tests.rs"]
mod tests;
