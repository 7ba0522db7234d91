//! Shared value types used across the pipeline.
//!
//! These are the keys every component agrees on: which image ([`ImageRef`]),
//! which zoom partition ([`ZoomMode`]), and what box a decode must fit into
//! ([`TargetBox`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An image identified by its absolute path.
///
/// Identity is the path: two refs with equal paths are the same logical image.
/// Cloning is cheap (shared allocation) because refs are copied into queues,
/// cache keys and front-end notifications all the time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef(Arc<Path>);

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(Arc::from(path.into().into_boxed_path()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl From<&Path> for ImageRef {
    fn from(path: &Path) -> Self {
        Self(Arc::from(path))
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for ImageRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl AsRef<Path> for ImageRef {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Which view an image is prepared for. Cache entries never cross modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ZoomMode {
    /// Scaled to fit the viewport, aspect ratio preserved.
    #[default]
    Fit,
    /// Native resolution (the user zoomed in).
    Full,
}

impl fmt::Display for ZoomMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoomMode::Fit => f.write_str("fit"),
            ZoomMode::Full => f.write_str("full"),
        }
    }
}

/// Bounding box a decode must fit into, usually the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBox {
    pub width: u32,
    pub height: u32,
}

impl TargetBox {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Flags for a single decode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Orientation correction must be applied to the result.
    pub orient: bool,
    /// Skip the in-flight wait and the cache lookup; the caller is the preparer.
    pub force: bool,
}

/// Key of one preparation: the image plus the zoom partition it is for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrepKey {
    pub image: ImageRef,
    pub zoom: ZoomMode,
}

impl PrepKey {
    pub fn new(image: ImageRef, zoom: ZoomMode) -> Self {
        Self { image, zoom }
    }
}

impl fmt::Display for PrepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.image, self.zoom)
    }
}
