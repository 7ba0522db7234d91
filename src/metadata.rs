//! Metadata Reader: dimensions and orientation without a full decode.
//!
//! [`read_metadata`] probes a file through the backend, stores the result in
//! the [`MetadataCache`] and tells the front-end the pixel dimensions.
//!
//! ## Orientation rule
//!
//! Only the EXIF orientation tag matters. A missing tag or the value `1`
//! means the stored pixels are already upright; anything else means the
//! decoder must correct them (see [`crate::imaging::orientation`]).
//!
//! ## Caching
//!
//! Entries are created lazily on first read and overwritten on every re-read.
//! There is no invalidation: a file that changes on disk keeps its old entry
//! until something reads it again.

use crate::context::Context;
use crate::imaging::{BackendError, Orientation, needs_correction};
use crate::types::ImageRef;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Cannot read metadata of {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
}

/// What the pipeline knows about an image before decoding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub needs_orientation: bool,
    pub width: u32,
    pub height: u32,
    /// Transform that makes the stored pixels upright.
    pub orientation: Orientation,
}

impl Metadata {
    pub fn from_parts(width: u32, height: u32, orientation_tag: Option<u32>) -> Self {
        Self {
            needs_orientation: needs_correction(orientation_tag),
            width,
            height,
            orientation: Orientation::from_tag(orientation_tag),
        }
    }
}

/// Metadata by image, shared across threads.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: Mutex<HashMap<ImageRef, Metadata>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, image: &ImageRef) -> Option<Metadata> {
        self.lock().get(image).copied()
    }

    pub fn insert(&self, image: ImageRef, metadata: Metadata) {
        self.lock().insert(image, metadata);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ImageRef, Metadata>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read metadata for `image`, refresh the cache and notify the front-end.
pub fn read_metadata(ctx: &Context, image: &ImageRef) -> Result<Metadata, MetadataError> {
    let probe = ctx
        .backend
        .probe(image.path())
        .map_err(|source| MetadataError::Unreadable {
            path: image.path().to_path_buf(),
            source,
        })?;

    let metadata = Metadata::from_parts(probe.width, probe.height, probe.orientation_tag);
    debug!(
        image = %image,
        width = metadata.width,
        height = metadata.height,
        needs_orientation = metadata.needs_orientation,
        "Read metadata"
    );

    ctx.metadata.insert(image.clone(), metadata);
    ctx.front_end
        .set_dimensions(image, metadata.width, metadata.height);
    Ok(metadata)
}
