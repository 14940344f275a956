//! Context module - the collaborator traits the share group is built on
//!
//! The platform GL context (creation, surface binding, "make current") is
//! not implemented here. The core only needs a context's identity, the
//! group it belongs to, whether it is current on the calling thread, a hook
//! to make it current, and the function table GPU deletions run against.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use crate::error::Result;
use crate::group::ContextGroup;

#[cfg(test)]
pub(crate) mod mock_context;

/// Numeric GPU object name (texture, buffer, program, ...)
pub type GLuint = u32;

// ===== CONTEXT ID =====

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a context
///
/// Allocated once per context by the backend; never reused in a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a new unique context id
    pub fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context#{}", self.0)
    }
}

// ============================================================================
// GlFunctions trait
// ============================================================================

/// Rendering function table of a context
///
/// Release callbacks receive this table together with the object name they
/// delete. Only the entry points the share group and the texture cache
/// need are listed.
pub trait GlFunctions: Send + Sync {
    /// Generate one texture name
    fn gen_texture(&self) -> GLuint;

    /// Bind a texture to the 2D target
    fn bind_texture(&self, id: GLuint);

    /// Upload RGBA8 pixels to the bound 2D texture
    fn tex_image_2d(&self, width: u32, height: u32, pixels: &[u8]);

    fn delete_textures(&self, ids: &[GLuint]);
    fn delete_buffers(&self, ids: &[GLuint]);
    fn delete_framebuffers(&self, ids: &[GLuint]);
    fn delete_renderbuffers(&self, ids: &[GLuint]);
    fn delete_program(&self, id: GLuint);
    fn delete_shader(&self, id: GLuint);
}

// ============================================================================
// Context trait
// ============================================================================

/// A GL context as seen by the share group
///
/// Implemented by backends. A context belongs to exactly one
/// [`ContextGroup`] for its whole life; it joins with
/// [`ContextGroup::add_context`] after creation and leaves with
/// [`ContextGroup::remove_context`] when destroyed.
pub trait Context: Send + Sync {
    /// Stable identity
    fn id(&self) -> ContextId;

    /// The share group this context belongs to
    fn share_group(&self) -> Arc<ContextGroup>;

    /// Whether this context is current on the calling thread
    fn is_current(&self) -> bool;

    /// Make this context current on the calling thread
    ///
    /// Called by the group when it needs a current context to flush
    /// pending deletions. Failing leaves those deletions queued.
    fn make_current(&self) -> Result<()>;

    /// Release this context from the calling thread
    fn done_current(&self);

    /// Context current on the calling thread, whichever group it is in
    ///
    /// Saved by the group before it makes a departing context current to
    /// flush deletions. The default reports none.
    fn current_on_thread(&self) -> Option<ContextId> {
        None
    }

    /// Make `previous` current again on the calling thread
    ///
    /// Called after a flush with the value of [`Context::current_on_thread`].
    /// No deletions are flushed. The default only releases this context.
    fn restore_current(&self, previous: Option<ContextId>) {
        let _ = previous;
        self.done_current();
    }

    /// Function table used for GPU calls issued through this context
    fn functions(&self) -> &dyn GlFunctions;
}
