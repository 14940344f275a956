/// ResourceGuard - a single GPU object name plus its release callback
///
/// Covers the simple cases (one texture, one buffer, one program) where the
/// whole resource is a name and the GL call that deletes it.

use crate::context::{Context, GlFunctions, GLuint};
use crate::error::Result;
use crate::resource::{SharedHandle, SharedResource};

/// Release callback: deletes `id` through the current context's functions
pub type ReleaseFn = fn(&dyn GlFunctions, GLuint);

/// Stock release callbacks for [`ResourceGuard`]
pub mod release {
    use crate::context::{GlFunctions, GLuint};

    pub fn delete_texture(functions: &dyn GlFunctions, id: GLuint) {
        functions.delete_textures(&[id]);
    }

    pub fn delete_buffer(functions: &dyn GlFunctions, id: GLuint) {
        functions.delete_buffers(&[id]);
    }

    pub fn delete_framebuffer(functions: &dyn GlFunctions, id: GLuint) {
        functions.delete_framebuffers(&[id]);
    }

    pub fn delete_renderbuffer(functions: &dyn GlFunctions, id: GLuint) {
        functions.delete_renderbuffers(&[id]);
    }

    pub fn delete_program(functions: &dyn GlFunctions, id: GLuint) {
        functions.delete_program(id);
    }

    pub fn delete_shader(functions: &dyn GlFunctions, id: GLuint) {
        functions.delete_shader(id);
    }
}

/// Shared resource wrapping one GPU object name
///
/// The name is zeroed as soon as the resource is invalidated or released,
/// so `id() == 0` always means "nothing left to delete".
pub struct ResourceGuard {
    id: GLuint,
    release: ReleaseFn,
}

impl ResourceGuard {
    /// Create an unregistered guard
    ///
    /// # Arguments
    ///
    /// * `id` - GPU object name
    /// * `release` - Callback issuing the deletion (see [`release`])
    pub fn new(id: GLuint, release: ReleaseFn) -> Self {
        Self { id, release }
    }

    /// Create a guard and register it in `context`'s share group
    ///
    /// # Errors
    ///
    /// Returns `GroupDestroyed` if the group already lost its last context.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let texture = ResourceGuard::create(&*context, 7, release::delete_texture)?;
    /// assert_eq!(texture.id(), 7);
    /// texture.free();
    /// ```
    pub fn create(context: &dyn Context, id: GLuint, release: ReleaseFn) -> Result<SharedHandle<ResourceGuard>> {
        context.share_group().register(Self::new(id, release))
    }

    /// GPU object name (0 once invalidated or released)
    pub fn id(&self) -> GLuint {
        self.id
    }
}

impl SharedResource for ResourceGuard {
    fn invalidate_resource(&mut self) {
        self.id = 0;
    }

    fn free_resource(&mut self, context: &dyn Context) {
        if self.id != 0 {
            (self.release)(context.functions(), self.id);
        }
        self.id = 0;
    }
}

impl SharedHandle<ResourceGuard> {
    /// GPU object name (0 once invalidated or released)
    pub fn id(&self) -> GLuint {
        self.lock().id()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "resource_guard_tests.rs"]
mod tests;
