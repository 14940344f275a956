//! Resource module
//!
//! Shared resources, the single-name resource guard and the per-group
//! keyed cache.

mod shared_resource;
mod resource_guard;
mod multi_group_resource;

pub use shared_resource::{SharedResource, SharedHandle, ResourceKey};
pub use resource_guard::{ResourceGuard, ReleaseFn, release};
pub use multi_group_resource::{MultiGroupResource, MultiGroupId, FromContext};
