/// Headless GlFunctions - a software object name table
///
/// Names are allocated from one counter per share group. Deleting a name
/// that is not alive (never created, or already deleted) is counted as an
/// invalid deletion instead of being silently accepted, so tests can assert
/// that nothing was released twice.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use gl_share_group::glshare::{GlFunctions, GLuint};
use gl_share_group::glshare_warn;

#[derive(Default)]
struct ObjectTable {
    /// Live texture names and their uploaded size (0x0 until uploaded)
    textures: FxHashMap<GLuint, (u32, u32)>,
    buffers: FxHashSet<GLuint>,
    bound_texture: GLuint,
    deleted_textures: Vec<GLuint>,
    deleted_buffers: Vec<GLuint>,
    delete_calls: usize,
    invalid_deletes: usize,
}

/// Object name table shared by the contexts of one share group
pub struct HeadlessFunctions {
    next_name: AtomicU32,
    objects: Mutex<ObjectTable>,
    fail_make_current: AtomicBool,
}

impl HeadlessFunctions {
    pub fn new() -> Self {
        Self {
            next_name: AtomicU32::new(1),
            objects: Mutex::new(ObjectTable::default()),
            fail_make_current: AtomicBool::new(false),
        }
    }

    fn next_name(&self) -> GLuint {
        self.next_name.fetch_add(1, Ordering::Relaxed)
    }

    /// Generate one buffer name
    pub fn gen_buffer(&self) -> GLuint {
        let id = self.next_name();
        self.objects.lock().buffers.insert(id);
        id
    }

    // ===== INSPECTION =====

    /// Whether `id` is a live texture name
    pub fn is_texture(&self, id: GLuint) -> bool {
        self.objects.lock().textures.contains_key(&id)
    }

    /// Uploaded size of a live texture
    pub fn texture_size(&self, id: GLuint) -> Option<(u32, u32)> {
        self.objects.lock().textures.get(&id).copied()
    }

    pub fn live_texture_count(&self) -> usize {
        self.objects.lock().textures.len()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.objects.lock().buffers.len()
    }

    /// Texture names deleted so far, in deletion order
    pub fn deleted_textures(&self) -> Vec<GLuint> {
        self.objects.lock().deleted_textures.clone()
    }

    /// Buffer names deleted so far, in deletion order
    pub fn deleted_buffers(&self) -> Vec<GLuint> {
        self.objects.lock().deleted_buffers.clone()
    }

    /// Number of delete calls of any kind
    pub fn delete_call_count(&self) -> usize {
        self.objects.lock().delete_calls
    }

    /// Number of names deleted while not alive
    pub fn invalid_delete_count(&self) -> usize {
        self.objects.lock().invalid_deletes
    }

    // ===== FAILURE INJECTION =====

    /// Make every `make_current` of this group's contexts fail
    pub fn set_fail_make_current(&self, fail: bool) {
        self.fail_make_current.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn make_current_fails(&self) -> bool {
        self.fail_make_current.load(Ordering::SeqCst)
    }
}

impl Default for HeadlessFunctions {
    fn default() -> Self {
        Self::new()
    }
}

impl GlFunctions for HeadlessFunctions {
    fn gen_texture(&self) -> GLuint {
        let id = self.next_name();
        self.objects.lock().textures.insert(id, (0, 0));
        id
    }

    fn bind_texture(&self, id: GLuint) {
        self.objects.lock().bound_texture = id;
    }

    fn tex_image_2d(&self, width: u32, height: u32, _pixels: &[u8]) {
        let mut objects = self.objects.lock();
        let bound = objects.bound_texture;
        match objects.textures.get_mut(&bound) {
            Some(size) => *size = (width, height),
            None => glshare_warn!("glshare::headless", "Upload to unbound texture {}", bound),
        }
    }

    fn delete_textures(&self, ids: &[GLuint]) {
        let mut objects = self.objects.lock();
        objects.delete_calls += 1;
        for &id in ids {
            if objects.textures.remove(&id).is_none() {
                objects.invalid_deletes += 1;
                glshare_warn!("glshare::headless", "Deleting texture {} which is not alive", id);
            }
            if objects.bound_texture == id {
                objects.bound_texture = 0;
            }
            objects.deleted_textures.push(id);
        }
    }

    fn delete_buffers(&self, ids: &[GLuint]) {
        let mut objects = self.objects.lock();
        objects.delete_calls += 1;
        for &id in ids {
            if !objects.buffers.remove(&id) {
                objects.invalid_deletes += 1;
                glshare_warn!("glshare::headless", "Deleting buffer {} which is not alive", id);
            }
            objects.deleted_buffers.push(id);
        }
    }

    fn delete_framebuffers(&self, _ids: &[GLuint]) {
        self.objects.lock().delete_calls += 1;
    }

    fn delete_renderbuffers(&self, _ids: &[GLuint]) {
        self.objects.lock().delete_calls += 1;
    }

    fn delete_program(&self, _id: GLuint) {
        self.objects.lock().delete_calls += 1;
    }

    fn delete_shader(&self, _id: GLuint) {
        self.objects.lock().delete_calls += 1;
    }
}
