//! Context group module
//!
//! Membership, resource registry and pending-deletion queue of a share group.

mod context_group;

pub use context_group::{ContextGroup, GroupId};
