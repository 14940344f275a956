/*!
# gl_share_group

Lifetime management for GPU objects shared between GL contexts.

Contexts configured to share objects form a share group. Objects created
in one context of the group (textures, buffers, programs) belong to the
group, not to that context. They must be deleted exactly once, while some
member context is current, and must be invalidated instead of deleted when
the whole group disappears first.

## Architecture

- **Context / GlFunctions**: traits implemented by a backend (the platform GL context and its function table)
- **ContextGroup**: membership, resource registry and pending-deletion queue of a share group
- **SharedResource / SharedHandle**: a GPU object owned by a group and the call-site handle to it
- **ResourceGuard**: a single object name plus the GL call that deletes it
- **MultiGroupResource**: one lazily built instance of a type per group
- **TextureCache**: per-group cache of uploaded textures
*/

// Internal modules
mod error;
mod runtime;
pub mod log;
pub mod context;
pub mod group;
pub mod resource;
pub mod texture;

// Main glshare namespace module
pub mod glshare {
    // Error types
    pub use crate::error::{Error, Result};

    // Process-wide state (logger, live group count)
    pub use crate::runtime::Runtime;

    // Collaborator traits
    pub use crate::context::{Context, ContextId, GlFunctions, GLuint};

    // Share group
    pub use crate::group::{ContextGroup, GroupId};

    // Resources
    pub use crate::resource::{
        SharedResource, SharedHandle, ResourceKey,
        ResourceGuard, ReleaseFn, release,
        MultiGroupResource, MultiGroupId, FromContext,
    };

    // Texture cache
    pub use crate::texture::{TextureCache, TextureCacheConfig, CachedTexture};

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }
}
