//! Pixel Cache: decoded images by (image, zoom mode).
//!
//! One independent [`PixelCache`] per [`ZoomMode`], grouped in
//! [`PixelCaches`]. Entries are never shared between modes.
//!
//! ## Validity
//!
//! An entry answers a lookup only if it was decoded for the same requested
//! width and, when the caller needs orientation correction, it already
//! carries it. Stale entries are plain misses; they stay in place until they
//! are overwritten or the whole cache is flushed.
//!
//! ## Eviction
//!
//! No LRU. When the background cache worker is about to add an entry to a
//! cache that already holds `capacity` entries, the whole cache is dropped.
//! Inserts from the synchronous show path never evict.

use crate::types::{ImageRef, ZoomMode};
use image::DynamicImage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A decoded, display-ready image plus the facts that decide cache validity.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: Arc<DynamicImage>,
    /// Orientation correction was applied (or was not needed and is known not to be).
    pub was_oriented: bool,
    /// Viewport width the image was decoded for.
    pub requested_width: u32,
}

impl DecodedImage {
    pub fn new(pixels: DynamicImage, was_oriented: bool, requested_width: u32) -> Self {
        Self {
            pixels: Arc::new(pixels),
            was_oriented,
            requested_width,
        }
    }

    /// Whether this entry can serve a request for `requested_width`.
    pub fn satisfies(&self, requested_width: u32, orient: bool) -> bool {
        self.requested_width == requested_width && (!orient || self.was_oriented)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pixels.width(), self.pixels.height())
    }
}

/// Bounded map from image to decoded pixels for one zoom mode.
#[derive(Debug)]
pub struct PixelCache {
    capacity: usize,
    entries: Mutex<HashMap<ImageRef, DecodedImage>>,
}

impl PixelCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// A valid entry for this request, or `None` (absent or stale).
    pub fn get(&self, image: &ImageRef, requested_width: u32, orient: bool) -> Option<DecodedImage> {
        self.lock()
            .get(image)
            .filter(|entry| entry.satisfies(requested_width, orient))
            .cloned()
    }

    /// Whether any entry exists for `image`, valid or not.
    pub fn contains(&self, image: &ImageRef) -> bool {
        self.lock().contains_key(image)
    }

    pub fn put(&self, image: ImageRef, decoded: DecodedImage) {
        self.lock().insert(image, decoded);
    }

    /// Flush everything if one more entry would exceed the capacity.
    /// Returns whether a flush happened.
    pub fn evict_if_oversized(&self) -> bool {
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            entries.clear();
            true
        } else {
            false
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ImageRef, DecodedImage>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The two per-mode caches.
#[derive(Debug)]
pub struct PixelCaches {
    fit: PixelCache,
    full: PixelCache,
}

impl PixelCaches {
    pub fn new(capacity: usize) -> Self {
        Self {
            fit: PixelCache::new(capacity),
            full: PixelCache::new(capacity),
        }
    }

    pub fn for_zoom(&self, zoom: ZoomMode) -> &PixelCache {
        match zoom {
            ZoomMode::Fit => &self.fit,
            ZoomMode::Full => &self.full,
        }
    }

    pub fn get(
        &self,
        zoom: ZoomMode,
        image: &ImageRef,
        requested_width: u32,
        orient: bool,
    ) -> Option<DecodedImage> {
        self.for_zoom(zoom).get(image, requested_width, orient)
    }

    pub fn put(&self, zoom: ZoomMode, image: ImageRef, decoded: DecodedImage) {
        self.for_zoom(zoom).put(image, decoded);
    }

    pub fn contains(&self, zoom: ZoomMode, image: &ImageRef) -> bool {
        self.for_zoom(zoom).contains(image)
    }

    pub fn evict_if_oversized(&self, zoom: ZoomMode) -> bool {
        self.for_zoom(zoom).evict_if_oversized()
    }
}
