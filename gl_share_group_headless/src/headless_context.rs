/// HeadlessContext - Context implementation without a GPU
///
/// "Current" follows GL semantics: at most one context is current per
/// thread, and a context is current only on the thread that made it so.
/// Making a context current flushes its group's pending deletions.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use gl_share_group::glshare::{
    Context, ContextGroup, ContextId, GlFunctions, Result,
};
use gl_share_group::{glshare_bail, glshare_debug};
use crate::headless_functions::HeadlessFunctions;

thread_local! {
    /// Context current on this thread
    static CURRENT_CONTEXT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

/// Headless context configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessConfig {
    /// Label used in log messages
    pub name: String,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            name: "headless".to_string(),
        }
    }
}

pub struct HeadlessContext {
    id: ContextId,
    config: HeadlessConfig,
    group: Arc<ContextGroup>,
    functions: Arc<HeadlessFunctions>,
    destroyed: AtomicBool,
}

impl HeadlessContext {
    /// Create a context with the default configuration
    ///
    /// # Arguments
    ///
    /// * `share` - Context to share objects with; `None` starts a new group
    ///
    /// # Errors
    ///
    /// Returns `GroupDestroyed` if `share` was already destroyed and was
    /// the last context of its group.
    pub fn create(share: Option<&Arc<HeadlessContext>>) -> Result<Arc<Self>> {
        Self::create_with_config(HeadlessConfig::default(), share)
    }

    pub fn create_with_config(config: HeadlessConfig, share: Option<&Arc<HeadlessContext>>) -> Result<Arc<Self>> {
        let (group, functions) = match share {
            Some(share) => (share.group.clone(), share.functions.clone()),
            None => (ContextGroup::new(), Arc::new(HeadlessFunctions::new())),
        };

        let context = Arc::new(Self {
            id: ContextId::next(),
            config,
            group: group.clone(),
            functions,
            destroyed: AtomicBool::new(false),
        });

        let as_dyn: Arc<dyn Context> = context.clone();
        if let Err(err) = group.add_context(&as_dyn) {
            // Never joined, nothing to leave on drop
            context.destroyed.store(true, Ordering::SeqCst);
            return Err(err);
        }

        glshare_debug!("glshare::headless",
            "Created {} '{}' in {}", context.id, context.config.name, group.id());
        Ok(context)
    }

    pub fn config(&self) -> &HeadlessConfig {
        &self.config
    }

    /// Object name table shared by the contexts of this group
    pub fn headless_functions(&self) -> &Arc<HeadlessFunctions> {
        &self.functions
    }

    /// Context current on the calling thread, if any
    pub fn current_id() -> Option<ContextId> {
        CURRENT_CONTEXT.with(Cell::get)
    }

    /// Leave the share group, flushing its pending deletions first
    ///
    /// Runs at most once; dropping the context calls it as well.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.group.remove_context(self);
        self.done_current();
        glshare_debug!("glshare::headless", "Destroyed {} '{}'", self.id, self.config.name);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Context for HeadlessContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn share_group(&self) -> Arc<ContextGroup> {
        self.group.clone()
    }

    fn is_current(&self) -> bool {
        Self::current_id() == Some(self.id)
    }

    fn make_current(&self) -> Result<()> {
        if self.functions.make_current_fails() {
            glshare_bail!(MakeCurrentFailed, "glshare::headless",
                "{} '{}' cannot be made current", self.id, self.config.name);
        }
        CURRENT_CONTEXT.with(|current| current.set(Some(self.id)));
        self.group.delete_pending_resources(self);
        Ok(())
    }

    fn done_current(&self) {
        CURRENT_CONTEXT.with(|current| {
            if current.get() == Some(self.id) {
                current.set(None);
            }
        });
    }

    fn current_on_thread(&self) -> Option<ContextId> {
        Self::current_id()
    }

    fn restore_current(&self, previous: Option<ContextId>) {
        CURRENT_CONTEXT.with(|current| current.set(previous));
    }

    fn functions(&self) -> &dyn GlFunctions {
        &*self.functions
    }
}

impl fmt::Debug for HeadlessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessContext")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("group", &self.group.id())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl Drop for HeadlessContext {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "headless_context_tests.rs"]
mod tests;
