/// Mock context, function table and resource for unit tests (no GL required)
///
/// MockContext tracks "current" as a plain per-context flag instead of a
/// per-thread one; tests decide which contexts are current.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use parking_lot::Mutex;
use crate::context::{Context, ContextId, GlFunctions, GLuint};
use crate::error::{Error, Result};
use crate::group::ContextGroup;
use crate::resource::SharedResource;

// ============================================================================
// Mock GlFunctions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    GenTexture(GLuint),
    BindTexture(GLuint),
    TexImage2D { width: u32, height: u32, len: usize },
    DeleteTextures(Vec<GLuint>),
    DeleteBuffers(Vec<GLuint>),
    DeleteFramebuffers(Vec<GLuint>),
    DeleteRenderbuffers(Vec<GLuint>),
    DeleteProgram(GLuint),
    DeleteShader(GLuint),
}

impl MockCall {
    fn is_delete(&self) -> bool {
        !matches!(
            self,
            MockCall::GenTexture(_) | MockCall::BindTexture(_) | MockCall::TexImage2D { .. }
        )
    }
}

#[derive(Debug, Default)]
pub struct MockFunctions {
    next_name: AtomicU32,
    calls: Mutex<Vec<MockCall>>,
}

impl MockFunctions {
    pub fn new() -> Self {
        Self {
            next_name: AtomicU32::new(1),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn delete_call_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| c.is_delete()).count()
    }

    pub fn deleted_textures(&self) -> Vec<GLuint> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                MockCall::DeleteTextures(ids) => Some(ids.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn deleted_buffers(&self) -> Vec<GLuint> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                MockCall::DeleteBuffers(ids) => Some(ids.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().push(call);
    }
}

impl GlFunctions for MockFunctions {
    fn gen_texture(&self) -> GLuint {
        let id = self.next_name.fetch_add(1, Ordering::Relaxed);
        self.record(MockCall::GenTexture(id));
        id
    }

    fn bind_texture(&self, id: GLuint) {
        self.record(MockCall::BindTexture(id));
    }

    fn tex_image_2d(&self, width: u32, height: u32, pixels: &[u8]) {
        self.record(MockCall::TexImage2D { width, height, len: pixels.len() });
    }

    fn delete_textures(&self, ids: &[GLuint]) {
        self.record(MockCall::DeleteTextures(ids.to_vec()));
    }

    fn delete_buffers(&self, ids: &[GLuint]) {
        self.record(MockCall::DeleteBuffers(ids.to_vec()));
    }

    fn delete_framebuffers(&self, ids: &[GLuint]) {
        self.record(MockCall::DeleteFramebuffers(ids.to_vec()));
    }

    fn delete_renderbuffers(&self, ids: &[GLuint]) {
        self.record(MockCall::DeleteRenderbuffers(ids.to_vec()));
    }

    fn delete_program(&self, id: GLuint) {
        self.record(MockCall::DeleteProgram(id));
    }

    fn delete_shader(&self, id: GLuint) {
        self.record(MockCall::DeleteShader(id));
    }
}

// ============================================================================
// Mock Context
// ============================================================================

pub struct MockContext {
    id: ContextId,
    group: Arc<ContextGroup>,
    functions: Arc<MockFunctions>,
    current: AtomicBool,
    fail_make_current: AtomicBool,
    make_current_calls: AtomicUsize,
    /// Reported by `current_on_thread`
    thread_current: Mutex<Option<ContextId>>,
    restored: Mutex<Vec<Option<ContextId>>>,
}

impl MockContext {
    /// Create a context, joining `share`'s group or starting a new one
    pub fn create(share: Option<&Arc<MockContext>>) -> Arc<MockContext> {
        let (group, functions) = match share {
            Some(share) => (share.share_group(), share.functions.clone()),
            None => (ContextGroup::new(), Arc::new(MockFunctions::new())),
        };
        let context = Arc::new(Self {
            id: ContextId::next(),
            group: group.clone(),
            functions,
            current: AtomicBool::new(false),
            fail_make_current: AtomicBool::new(false),
            make_current_calls: AtomicUsize::new(0),
            thread_current: Mutex::new(None),
            restored: Mutex::new(Vec::new()),
        });
        let as_dyn: Arc<dyn Context> = context.clone();
        group.add_context(&as_dyn).unwrap();
        context
    }

    pub fn mock_functions(&self) -> &Arc<MockFunctions> {
        &self.functions
    }

    pub fn set_current(&self, current: bool) {
        self.current.store(current, Ordering::SeqCst);
    }

    pub fn set_fail_make_current(&self, fail: bool) {
        self.fail_make_current.store(fail, Ordering::SeqCst);
    }

    pub fn make_current_calls(&self) -> usize {
        self.make_current_calls.load(Ordering::SeqCst)
    }

    pub fn set_thread_current(&self, previous: Option<ContextId>) {
        *self.thread_current.lock() = previous;
    }

    /// Values handed to `restore_current`, in call order
    pub fn restored(&self) -> Vec<Option<ContextId>> {
        self.restored.lock().clone()
    }

    pub fn destroy(&self) {
        self.group.remove_context(self);
        self.current.store(false, Ordering::SeqCst);
    }
}

impl Context for MockContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn share_group(&self) -> Arc<ContextGroup> {
        self.group.clone()
    }

    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst)
    }

    fn make_current(&self) -> Result<()> {
        self.make_current_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_make_current.load(Ordering::SeqCst) {
            return Err(Error::MakeCurrentFailed(format!("{} refused", self.id)));
        }
        self.current.store(true, Ordering::SeqCst);
        self.group.delete_pending_resources(self);
        Ok(())
    }

    fn done_current(&self) {
        self.current.store(false, Ordering::SeqCst);
    }

    fn current_on_thread(&self) -> Option<ContextId> {
        *self.thread_current.lock()
    }

    fn restore_current(&self, previous: Option<ContextId>) {
        self.restored.lock().push(previous);
        self.current.store(false, Ordering::SeqCst);
    }

    fn functions(&self) -> &dyn GlFunctions {
        &*self.functions
    }
}

// ============================================================================
// Mock Resource
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    Invalidated(&'static str),
    Freed(&'static str, ContextId),
}

/// Resource that only records which group callbacks it received
pub struct MockResource {
    name: &'static str,
    events: Arc<Mutex<Vec<ResourceEvent>>>,
}

impl MockResource {
    pub fn new(name: &'static str, events: &Arc<Mutex<Vec<ResourceEvent>>>) -> Self {
        Self { name, events: events.clone() }
    }
}

impl SharedResource for MockResource {
    fn invalidate_resource(&mut self) {
        self.events.lock().push(ResourceEvent::Invalidated(self.name));
    }

    fn free_resource(&mut self, context: &dyn Context) {
        self.events.lock().push(ResourceEvent::Freed(self.name, context.id()));
    }
}

pub fn event_log() -> Arc<Mutex<Vec<ResourceEvent>>> {
    Arc::new(Mutex::new(Vec::new()))
}
