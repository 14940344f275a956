//! Texture module
//!
//! Texture cache built on the per-group resource machinery.

mod texture_cache;

pub use texture_cache::{TextureCache, TextureCacheConfig, CachedTexture};
