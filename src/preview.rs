//! List-row and notification previews.
//!
//! A preview is a short text plus up to a few small bitmaps. Bitmaps are
//! cached by content identity, never by item identity, so a forwarded photo
//! shares the entry of its original. Real decoding happens in the external
//! decoder; until its result arrives we serve a blurhash placeholder, which
//! is allowed to be stale for a display pass.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::content::ContentId;

/// Longest side of a preview snippet bitmap.
pub const PREVIEW_SIDE: u32 = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewOptions {
    /// Produce an individual preview even when the item belongs to an album.
    pub ignore_group: bool,
}

/// A small cached bitmap keyed by content identity.
///
/// `bitmap` is `None` when neither a placeholder nor a decode result is
/// available yet; the cache key is still valid for a later pass.
#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub cache_key: ContentId,
    pub bitmap: Option<Arc<RgbaImage>>,
}

/// Short text plus miniature images for list and notification rendering.
#[derive(Debug, Clone, Default)]
pub struct Preview {
    pub text: String,
    pub images: Vec<PreviewImage>,
}

/// What the cache needs to know about an image before its bytes load.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSource {
    pub content: ContentId,
    pub width: u32,
    pub height: u32,
    pub blurhash: Option<String>,
}

/// A finished decode delivered by the external decoder.
#[derive(Debug)]
pub struct DecodedPreview {
    pub content: ContentId,
    pub bitmap: RgbaImage,
}

/// Handle given to the external decoder. Results are queued and applied on
/// the owning thread when [`PreviewCache::drain_completed`] runs; a result
/// for content nobody references anymore is silently dropped.
#[derive(Debug, Clone)]
pub struct PreviewDecoder {
    tx: mpsc::UnboundedSender<DecodedPreview>,
}

impl PreviewDecoder {
    pub fn deliver(&self, content: ContentId, bitmap: RgbaImage) {
        // The cache may already be gone on shutdown; dropping is fine.
        let _ = self.tx.send(DecodedPreview { content, bitmap });
    }
}

struct CacheEntry {
    bitmap: Option<Arc<RgbaImage>>,
    placeholder: bool,
}

/// At most one bitmap per content key.
pub struct PreviewCache {
    entries: HashMap<ContentId, CacheEntry>,
    tx: mpsc::UnboundedSender<DecodedPreview>,
    rx: mpsc::UnboundedReceiver<DecodedPreview>,
}

impl PreviewCache {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            entries: HashMap::new(),
            tx,
            rx,
        }
    }

    /// Returns the cached snippet for `source`, creating a placeholder entry
    /// on first sight. Duplicate population converges on one entry.
    pub fn resolve(&mut self, source: &PreviewSource) -> PreviewImage {
        let entry = self
            .entries
            .entry(source.content)
            .or_insert_with(|| CacheEntry {
                bitmap: decode_placeholder(source).map(Arc::new),
                placeholder: true,
            });
        PreviewImage {
            cache_key: source.content,
            bitmap: entry.bitmap.clone(),
        }
    }

    /// Drops the entry for `content`. Called when the underlying content
    /// reference of a message changes, never for caption-only edits.
    pub fn invalidate(&mut self, content: ContentId) {
        if self.entries.remove(&content).is_some() {
            tracing::debug!(
                target: "murmur::preview",
                "Invalidated preview entry for content {}",
                content.to_hex()
            );
        }
    }

    pub fn contains(&self, content: ContentId) -> bool {
        self.entries.contains_key(&content)
    }

    pub fn is_placeholder(&self, content: ContentId) -> bool {
        self.entries
            .get(&content)
            .map(|entry| entry.placeholder)
            .unwrap_or(false)
    }

    pub fn decoder(&self) -> PreviewDecoder {
        PreviewDecoder {
            tx: self.tx.clone(),
        }
    }

    /// Applies queued decode results. Returns how many entries were updated.
    pub fn drain_completed(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(decoded) = self.rx.try_recv() {
            if self.complete(decoded) {
                applied += 1;
            }
        }
        applied
    }

    fn complete(&mut self, decoded: DecodedPreview) -> bool {
        match self.entries.get_mut(&decoded.content) {
            Some(entry) => {
                if !entry.placeholder && entry.bitmap.is_some() {
                    // Duplicate completion, the first result stays.
                    return false;
                }
                entry.bitmap = Some(Arc::new(snippet_of(decoded.bitmap)));
                entry.placeholder = false;
                true
            }
            None => {
                // Nobody references this content anymore.
                tracing::debug!(
                    target: "murmur::preview",
                    "Dropping decode result for unreferenced content {}",
                    decoded.content.to_hex()
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for PreviewCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn snippet_size(width: u32, height: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest == 0 {
        return (PREVIEW_SIDE, PREVIEW_SIDE);
    }
    if longest <= PREVIEW_SIDE {
        return (width.max(1), height.max(1));
    }
    let scale = f64::from(PREVIEW_SIDE) / f64::from(longest);
    (
        ((f64::from(width) * scale).round() as u32).max(1),
        ((f64::from(height) * scale).round() as u32).max(1),
    )
}

fn decode_placeholder(source: &PreviewSource) -> Option<RgbaImage> {
    let hash = source.blurhash.as_deref()?;
    let (width, height) = snippet_size(source.width, source.height);
    let data = blurhash::decode(hash, width, height, 1.0).ok()?;
    RgbaImage::from_raw(width, height, data)
}

fn snippet_of(bitmap: RgbaImage) -> RgbaImage {
    let (width, height) = snippet_size(bitmap.width(), bitmap.height());
    if (width, height) == (bitmap.width(), bitmap.height()) {
        bitmap
    } else {
        image::imageops::thumbnail(&bitmap, width, height)
    }
}
