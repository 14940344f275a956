/*!
# gl_share_group - Headless Backend

Software implementation of the gl_share_group collaborator traits.

`HeadlessContext` implements `Context` with a per-thread "current context"
slot, and `HeadlessFunctions` implements `GlFunctions` as an object name
table that records every creation and deletion. Contexts created from a
share context join its group and its name table, like real shared GL
contexts do.

No GPU or windowing system is needed, which makes this backend suitable
for tests and for tools that only exercise resource lifetimes.
*/

mod headless_context;
mod headless_functions;

pub use headless_context::{HeadlessConfig, HeadlessContext};
pub use headless_functions::HeadlessFunctions;

// Main glshare namespace module, mirroring the core crate
pub mod glshare {
    pub use crate::headless_context::{HeadlessConfig, HeadlessContext};
    pub use crate::headless_functions::HeadlessFunctions;
}
