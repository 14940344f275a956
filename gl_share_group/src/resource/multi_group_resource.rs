/// MultiGroupResource - one lazily built instance of `T` per context group
///
/// Lets a higher-level cache (a texture cache, a glyph cache, ...) keep one
/// instance of itself per share group without bookkeeping of its own. The
/// instance lives in the group's registry like any other shared resource,
/// so group teardown invalidates it.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use crate::context::Context;
use crate::error::Result;
use crate::group::ContextGroup;
use crate::resource::SharedResource;
use crate::glshare_err;

// ===== MULTI GROUP ID =====

static NEXT_MULTI_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`MultiGroupResource`], used as its slot key in every group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MultiGroupId(u64);

impl MultiGroupId {
    fn next() -> Self {
        Self(NEXT_MULTI_GROUP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MultiGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "multi#{}", self.0)
    }
}

/// Resources that can be built from the context requesting them
pub trait FromContext: SharedResource + Sized {
    fn from_context(context: &dyn Context) -> Self;
}

// ============================================================================
// MultiGroupResource
// ============================================================================

/// Keyed per-group cache of `T`
///
/// # Example
///
/// ```ignore
/// static CACHES: LazyLock<MultiGroupResource<GlyphCache>> = LazyLock::new(MultiGroupResource::new);
///
/// let cache = CACHES.value(&*context)?;
/// cache.lock().glyph(context, 'a');
/// ```
pub struct MultiGroupResource<T: SharedResource + 'static> {
    id: MultiGroupId,
    /// Groups this resource has populated a slot in
    groups: Mutex<Vec<Weak<ContextGroup>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: SharedResource + 'static> MultiGroupResource<T> {
    pub fn new() -> Self {
        Self {
            id: MultiGroupId::next(),
            groups: Mutex::new(Vec::new()),
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> MultiGroupId {
        self.id
    }

    /// Instance for `context`'s group, if one was created
    pub fn get(&self, context: &dyn Context) -> Option<Arc<Mutex<T>>> {
        self.get_in(&context.share_group())
    }

    /// Instance for `context`'s group, built with `T::from_context` on first access
    ///
    /// # Errors
    ///
    /// Returns `GroupDestroyed` if the group already lost its last context.
    pub fn value(&self, context: &dyn Context) -> Result<Arc<Mutex<T>>>
    where
        T: FromContext,
    {
        self.value_with(context, T::from_context)
    }

    /// Instance for `context`'s group, built with `factory` on first access
    ///
    /// The factory runs without the group lock held. When two threads race
    /// on the first access, both may build an instance but only the first
    /// one inserted is kept; the other is dropped unregistered.
    pub fn value_with<F>(&self, context: &dyn Context, factory: F) -> Result<Arc<Mutex<T>>>
    where
        F: FnOnce(&dyn Context) -> T,
    {
        let group = context.share_group();
        if let Some(existing) = self.get_in(&group) {
            return Ok(existing);
        }
        self.insert_in(&group, factory(context), false)
    }

    /// Register `resource` as the instance for `context`'s group
    ///
    /// A previous instance for that group is removed and invalidated.
    pub fn insert(&self, context: &dyn Context, resource: T) -> Result<Arc<Mutex<T>>> {
        self.insert_in(&context.share_group(), resource, true)
    }

    /// Remove and invalidate the instance for `context`'s group only
    ///
    /// Returns false if the group had no instance.
    pub fn cleanup(&self, context: &dyn Context) -> bool {
        let group = context.share_group();
        let removed = self.cleanup_in(&group);
        self.groups
            .lock()
            .retain(|weak| weak.upgrade().map_or(false, |g| !Arc::ptr_eq(&g, &group)));
        removed
    }

    /// Every live per-group instance
    pub fn resources(&self) -> Vec<Arc<Mutex<T>>> {
        let groups: Vec<Arc<ContextGroup>> = {
            let mut groups = self.groups.lock();
            groups.retain(|weak| weak.upgrade().map_or(false, |g| !g.is_destroyed()));
            groups.iter().filter_map(Weak::upgrade).collect()
        };
        groups.iter().filter_map(|group| self.get_in(group)).collect()
    }

    /// Number of groups currently holding an instance
    pub fn group_count(&self) -> usize {
        self.resources().len()
    }

    fn get_in(&self, group: &ContextGroup) -> Option<Arc<Mutex<T>>> {
        group
            .multi_group_value(self.id)
            .and_then(|value| value.downcast::<Mutex<T>>().ok())
    }

    fn insert_in(&self, group: &Arc<ContextGroup>, resource: T, replace: bool) -> Result<Arc<Mutex<T>>> {
        let typed = Arc::new(Mutex::new(resource));
        let value: Arc<dyn Any + Send + Sync> = typed.clone();
        let stored = group.insert_multi_group_slot(self.id, value, typed, replace)?;
        self.track(group);
        stored.downcast::<Mutex<T>>().map_err(|_| {
            glshare_err!(BackendError, "glshare::MultiGroupResource",
                "{} slot in {} holds a foreign type", self.id, group.id())
        })
    }

    fn cleanup_in(&self, group: &ContextGroup) -> bool {
        match group.take_multi_group_slot(self.id) {
            Some(resource) => {
                resource.lock().invalidate_resource();
                true
            }
            None => false,
        }
    }

    fn track(&self, group: &Arc<ContextGroup>) {
        let mut groups = self.groups.lock();
        let known = groups
            .iter()
            .any(|weak| weak.upgrade().map_or(false, |g| Arc::ptr_eq(&g, group)));
        if !known {
            groups.push(Arc::downgrade(group));
        }
    }
}

impl<T: SharedResource + 'static> Default for MultiGroupResource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SharedResource + 'static> Drop for MultiGroupResource<T> {
    fn drop(&mut self) {
        let groups = std::mem::take(self.groups.get_mut());
        for group in groups.iter().filter_map(Weak::upgrade) {
            self.cleanup_in(&group);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "multi_group_resource_tests.rs"]
mod tests;
