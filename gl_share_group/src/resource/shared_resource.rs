/// SharedResource - GPU objects owned by a context group
///
/// A resource is registered in its group's registry under a
/// [`ResourceKey`]; call sites keep a [`SharedHandle`] holding that key and
/// a weak back-reference to the group. The group decides when the two
/// callbacks of the trait run.

use std::sync::{Arc, Weak};
use parking_lot::{Mutex, MutexGuard};
use slotmap::new_key_type;
use crate::context::Context;
use crate::group::ContextGroup;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key of a resource in its group's registry.
    ///
    /// A key stops resolving once the resource was freed or invalidated.
    pub struct ResourceKey;
}

// ============================================================================
// SharedResource trait
// ============================================================================

/// GPU-side object owned by a context group rather than a single context
///
/// Both callbacks are invoked by the group, at most one of them, at most
/// once, and never while the group's state lock is held.
pub trait SharedResource: Send {
    /// The group no longer exists: drop GPU handles without any GPU call
    ///
    /// Afterwards the object must be safe to drop.
    fn invalidate_resource(&mut self);

    /// A context of the group is current: issue the GPU deletion
    ///
    /// # Arguments
    ///
    /// * `context` - Current member context of the owning group
    fn free_resource(&mut self, context: &dyn Context);
}

// ============================================================================
// SharedHandle
// ============================================================================

/// Call-site handle to a registered resource
///
/// Dropping the handle requests release, like an explicit [`free`].
///
/// [`free`]: SharedHandle::free
pub struct SharedHandle<T: SharedResource + 'static> {
    group: Weak<ContextGroup>,
    key: ResourceKey,
    resource: Arc<Mutex<T>>,
}

impl<T: SharedResource + 'static> SharedHandle<T> {
    pub(crate) fn new(group: Weak<ContextGroup>, key: ResourceKey, resource: Arc<Mutex<T>>) -> Self {
        Self { group, key, resource }
    }

    /// Owning group, while the resource is still registered there
    ///
    /// Returns None once the resource was freed or invalidated.
    pub fn group(&self) -> Option<Arc<ContextGroup>> {
        self.group.upgrade().filter(|group| group.contains_resource(self.key))
    }

    /// Registry key of this resource
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Whether release was requested but has not happened yet
    pub fn is_pending(&self) -> bool {
        self.group
            .upgrade()
            .map_or(false, |group| group.is_resource_pending(self.key))
    }

    /// Schedule the resource for deletion at an appropriate time
    ///
    /// Frees immediately when a context of the group is current on this
    /// thread, otherwise queues the resource in the group's pending list.
    /// Calling this again, or after invalidation, does nothing.
    pub fn free(&self) {
        if let Some(group) = self.group.upgrade() {
            group.free(self.key);
        }
    }

    /// Lock the resource state
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.resource.lock()
    }

    /// Shared resource state
    pub fn resource(&self) -> &Arc<Mutex<T>> {
        &self.resource
    }
}

impl<T: SharedResource + 'static> Drop for SharedHandle<T> {
    fn drop(&mut self) {
        self.free();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "shared_resource_tests.rs"]
mod tests;
