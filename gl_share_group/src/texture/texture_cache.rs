/// TextureCache - per share group cache of uploaded textures
///
/// Maps an application image key to a texture name. One cache exists per
/// share group (through a process-wide [`MultiGroupResource`]); every cached
/// texture is a [`ResourceGuard`] registered in that group, so releasing a
/// texture follows the usual free/defer/invalidate rules.
///
/// The cache is bounded by cost (KiB of pixel data) and evicts the least
/// recently bound textures first.

use std::collections::VecDeque;
use std::sync::{Arc, LazyLock};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use crate::context::{Context, GLuint};
use crate::group::GroupId;
use crate::error::Result;
use crate::resource::{
    FromContext, MultiGroupResource, ResourceGuard, SharedHandle, SharedResource, release,
};
use crate::{glshare_bail, glshare_trace};

/// One cache per share group
static TEXTURE_CACHES: LazyLock<MultiGroupResource<TextureCache>> =
    LazyLock::new(MultiGroupResource::new);

// ============================================================================
// Configuration
// ============================================================================

/// Texture cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureCacheConfig {
    /// Upper bound of cached pixel data, in KiB
    pub max_cost_kb: usize,
}

impl Default for TextureCacheConfig {
    fn default() -> Self {
        Self {
            max_cost_kb: 64 * 1024,
        }
    }
}

// ============================================================================
// CachedTexture
// ============================================================================

/// A cached texture name; dropping it releases the texture through its group
pub struct CachedTexture {
    resource: SharedHandle<ResourceGuard>,
    cost_kb: usize,
}

impl CachedTexture {
    /// Wrap an existing texture name of `context`'s share group
    pub fn new(context: &dyn Context, id: GLuint, cost_kb: usize) -> Result<Self> {
        let resource = ResourceGuard::create(context, id, release::delete_texture)?;
        Ok(Self { resource, cost_kb })
    }

    /// Texture name (0 once the group invalidated it)
    pub fn id(&self) -> GLuint {
        self.resource.id()
    }

    pub fn cost_kb(&self) -> usize {
        self.cost_kb
    }
}

// ============================================================================
// TextureCache
// ============================================================================

pub struct TextureCache {
    config: TextureCacheConfig,
    /// Share group the cached textures belong to, once known
    group: Option<GroupId>,
    entries: FxHashMap<u64, CachedTexture>,
    /// Keys from least to most recently bound
    recency: VecDeque<u64>,
    total_cost_kb: usize,
}

impl TextureCache {
    /// Create an empty cache (not registered in any group)
    pub fn new(config: TextureCacheConfig) -> Self {
        Self {
            config,
            group: None,
            entries: FxHashMap::default(),
            recency: VecDeque::new(),
            total_cost_kb: 0,
        }
    }

    /// Cache of `context`'s share group, created on first access
    ///
    /// # Errors
    ///
    /// Returns `GroupDestroyed` if the group already lost its last context.
    pub fn for_context(context: &dyn Context) -> Result<Arc<Mutex<TextureCache>>> {
        TEXTURE_CACHES.value(context)
    }

    /// Remove the cache of `context`'s share group, invalidating it
    pub fn cleanup_for_context(context: &dyn Context) -> bool {
        TEXTURE_CACHES.cleanup(context)
    }

    /// Texture name for `key`, uploading `pixels` (RGBA8) on a cache miss
    ///
    /// `context` must be current.
    ///
    /// # Arguments
    ///
    /// * `context` - Current context of the cache's share group
    /// * `key` - Application image key
    /// * `width` / `height` - Image size in pixels
    /// * `pixels` - Tightly packed RGBA8 data, `width * height * 4` bytes
    ///
    /// # Errors
    ///
    /// Returns `InvalidImage` if `pixels` does not match the size,
    /// `ContextNotInGroup` if `context` belongs to another share group than
    /// the textures already cached, or `GroupDestroyed` if the group was
    /// torn down.
    pub fn bind_texture(
        &mut self,
        context: &dyn Context,
        key: u64,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<GLuint> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4));
        if expected != Some(pixels.len()) {
            glshare_bail!(InvalidImage, "glshare::TextureCache",
                "{}x{} image for key {} needs {:?} bytes, got {}", width, height, key, expected, pixels.len());
        }

        let group = context.share_group().id();
        match self.group {
            Some(owner) if owner != group => {
                glshare_bail!(ContextNotInGroup, "glshare::TextureCache",
                    "{} belongs to {}, cache holds textures of {}", context.id(), group, owner);
            }
            _ => self.group = Some(group),
        }

        if let Some(texture) = self.entries.get(&key) {
            let id = texture.id();
            self.touch(key);
            return Ok(id);
        }

        let functions = context.functions();
        let id = functions.gen_texture();
        functions.bind_texture(id);
        functions.tex_image_2d(width, height, pixels);

        let cost_kb = pixels.len().div_ceil(1024).max(1);
        let texture = match CachedTexture::new(context, id, cost_kb) {
            Ok(texture) => texture,
            Err(err) => {
                functions.delete_textures(&[id]);
                return Err(err);
            }
        };

        self.evict_for(cost_kb);
        self.entries.insert(key, texture);
        self.recency.push_back(key);
        self.total_cost_kb += cost_kb;
        glshare_trace!("glshare::TextureCache",
            "Cached texture {} for key {} ({} KiB, {} KiB total)", id, key, cost_kb, self.total_cost_kb);
        Ok(id)
    }

    /// Drop the texture cached for `key`; returns false if none was cached
    pub fn invalidate(&mut self, key: u64) -> bool {
        match self.entries.remove(&key) {
            Some(texture) => {
                self.total_cost_kb -= texture.cost_kb();
                self.recency.retain(|k| *k != key);
                true
            }
            None => false,
        }
    }

    /// Drop every cached texture
    pub fn clear(&mut self) {
        self.recency.clear();
        self.total_cost_kb = 0;
        self.entries.clear();
    }

    /// Cached texture name for `key`, without uploading or touching recency
    pub fn texture_id(&self, key: u64) -> Option<GLuint> {
        self.entries.get(&key).map(CachedTexture::id)
    }

    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_cost_kb(&self) -> usize {
        self.total_cost_kb
    }

    pub fn config(&self) -> &TextureCacheConfig {
        &self.config
    }

    fn touch(&mut self, key: u64) {
        if let Some(position) = self.recency.iter().position(|k| *k == key) {
            self.recency.remove(position);
        }
        self.recency.push_back(key);
    }

    /// Evict least recently bound textures until `incoming` KiB fit.
    /// An entry larger than the whole budget still gets cached, alone.
    fn evict_for(&mut self, incoming: usize) {
        while self.total_cost_kb + incoming > self.config.max_cost_kb {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            if let Some(texture) = self.entries.remove(&oldest) {
                self.total_cost_kb -= texture.cost_kb();
                glshare_trace!("glshare::TextureCache", "Evicted key {} (texture {})", oldest, texture.id());
            }
        }
    }
}

impl FromContext for TextureCache {
    fn from_context(context: &dyn Context) -> Self {
        let mut cache = Self::new(TextureCacheConfig::default());
        cache.group = Some(context.share_group().id());
        cache
    }
}

impl SharedResource for TextureCache {
    fn invalidate_resource(&mut self) {
        self.clear();
    }

    fn free_resource(&mut self, _context: &dyn Context) {
        self.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "texture_cache_tests.rs"]
mod tests;
