//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the set of pixel-level primitives the
//! decoder chains together: probe a file for metadata, pull out an embedded
//! preview, decode (fast path or general-purpose path) and write a JPEG.
//! Every strategy in [`crate::decode`] is a composition of these calls, so a
//! mock backend can count decodes and inject failures without touching real
//! image files.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use crate::types::TargetBox;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// What a metadata probe reveals without decoding pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeInfo {
    pub width: u32,
    pub height: u32,
    /// Raw EXIF orientation tag, `None` when the file carries none.
    pub orientation_tag: Option<u32>,
}

/// Pixel-level primitives. See the [module docs](self).
pub trait ImageBackend: Send + Sync {
    /// Dimensions and orientation tag, read from headers only.
    fn probe(&self, path: &Path) -> Result<ProbeInfo, BackendError>;

    /// Encoded bytes of the largest preview image embedded in the file's metadata.
    fn embedded_preview(&self, path: &Path) -> Result<Vec<u8>, BackendError>;

    /// Fast decode of a file, scaled to fit `target` (`None` keeps native size).
    fn decode_file(
        &self,
        path: &Path,
        target: Option<TargetBox>,
    ) -> Result<DynamicImage, BackendError>;

    /// Decode an encoded buffer, scaled to fit `target` (`None` keeps native size).
    fn decode_bytes(
        &self,
        data: &[u8],
        target: Option<TargetBox>,
    ) -> Result<DynamicImage, BackendError>;

    /// General-purpose open at native size: sniffs the content, ignores the extension.
    fn open(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode `image` as JPEG at `path`.
    fn save_jpeg(&self, image: &DynamicImage, path: &Path, quality: u8)
    -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::calculations::fit_within;
    use image::{Rgb, RgbImage};
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock backend that records operations and fabricates pixels.
    ///
    /// Files are described up front: a probe entry gives a path its size and
    /// orientation, a preview entry gives it embedded preview bytes, and the
    /// `failing_*` sets make a strategy fail for that path. Uses Mutex (not
    /// RefCell) so it is Sync and can be shared with worker threads.
    #[derive(Default)]
    pub struct MockBackend {
        pub probes: Mutex<HashMap<PathBuf, ProbeInfo>>,
        pub previews: Mutex<HashMap<PathBuf, Vec<u8>>>,
        pub failing_direct: Mutex<HashSet<PathBuf>>,
        pub failing_open: Mutex<HashSet<PathBuf>>,
        pub failing_save: Mutex<bool>,
        pub decode_delay: Mutex<Duration>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Probe(PathBuf),
        EmbeddedPreview(PathBuf),
        DecodeFile {
            path: PathBuf,
            target: Option<TargetBox>,
        },
        DecodeBytes {
            len: usize,
            target: Option<TargetBox>,
        },
        Open(PathBuf),
        SaveJpeg(PathBuf),
    }

    impl RecordedOp {
        /// Whether this op produced pixels.
        pub fn is_decode(&self) -> bool {
            matches!(
                self,
                RecordedOp::DecodeFile { .. } | RecordedOp::DecodeBytes { .. } | RecordedOp::Open(_)
            )
        }
    }

    /// Deterministic, asymmetric test pattern so orientation changes are visible.
    pub fn pattern(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * 7 + y * 3) % 256) as u8])
        }))
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a readable image at `path`.
        pub fn with_image(self, path: &str, width: u32, height: u32, tag: Option<u32>) -> Self {
            self.probes.lock().unwrap().insert(
                PathBuf::from(path),
                ProbeInfo {
                    width,
                    height,
                    orientation_tag: tag,
                },
            );
            self
        }

        pub fn with_preview(self, path: &str, bytes: &[u8]) -> Self {
            self.previews
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), bytes.to_vec());
            self
        }

        pub fn failing_direct(self, path: &str) -> Self {
            self.failing_direct
                .lock()
                .unwrap()
                .insert(PathBuf::from(path));
            self
        }

        pub fn failing_open(self, path: &str) -> Self {
            self.failing_open.lock().unwrap().insert(PathBuf::from(path));
            self
        }

        /// Every save writes a few bytes and then fails, like a full disk.
        pub fn failing_save(self) -> Self {
            *self.failing_save.lock().unwrap() = true;
            self
        }

        pub fn with_delay(self, delay: Duration) -> Self {
            *self.decode_delay.lock().unwrap() = delay;
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// Number of operations that produced pixels.
        pub fn decode_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| op.is_decode())
                .count()
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }

        fn pause(&self) {
            let delay = *self.decode_delay.lock().unwrap();
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }

        fn native(&self, path: &Path) -> Result<(u32, u32), BackendError> {
            self.probes
                .lock()
                .unwrap()
                .get(path)
                .map(|p| (p.width, p.height))
                .ok_or_else(|| BackendError::ProcessingFailed("No mock image".to_string()))
        }
    }

    fn render(native: (u32, u32), target: Option<TargetBox>) -> DynamicImage {
        let (w, h) = match target {
            Some(bounds) => fit_within(native, bounds),
            None => native,
        };
        pattern(w, h)
    }

    impl ImageBackend for MockBackend {
        fn probe(&self, path: &Path) -> Result<ProbeInfo, BackendError> {
            self.record(RecordedOp::Probe(path.to_path_buf()));
            self.probes
                .lock()
                .unwrap()
                .get(path)
                .copied()
                .ok_or_else(|| BackendError::ProcessingFailed("No mock metadata".to_string()))
        }

        fn embedded_preview(&self, path: &Path) -> Result<Vec<u8>, BackendError> {
            self.record(RecordedOp::EmbeddedPreview(path.to_path_buf()));
            self.previews
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| BackendError::Unsupported("No mock preview".to_string()))
        }

        fn decode_file(
            &self,
            path: &Path,
            target: Option<TargetBox>,
        ) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::DecodeFile {
                path: path.to_path_buf(),
                target,
            });
            self.pause();
            if self.failing_direct.lock().unwrap().contains(path) {
                return Err(BackendError::ProcessingFailed("mock direct failure".into()));
            }
            Ok(render(self.native(path)?, target))
        }

        fn decode_bytes(
            &self,
            data: &[u8],
            target: Option<TargetBox>,
        ) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::DecodeBytes {
                len: data.len(),
                target,
            });
            self.pause();
            if data.is_empty() {
                return Err(BackendError::ProcessingFailed("empty buffer".into()));
            }
            Ok(render((32, 24), target))
        }

        fn open(&self, path: &Path) -> Result<DynamicImage, BackendError> {
            self.record(RecordedOp::Open(path.to_path_buf()));
            self.pause();
            if self.failing_open.lock().unwrap().contains(path) {
                return Err(BackendError::ProcessingFailed("mock open failure".into()));
            }
            Ok(render(self.native(path)?, None))
        }

        fn save_jpeg(
            &self,
            _image: &DynamicImage,
            path: &Path,
            _quality: u8,
        ) -> Result<(), BackendError> {
            self.record(RecordedOp::SaveJpeg(path.to_path_buf()));
            if *self.failing_save.lock().unwrap() {
                std::fs::write(path, b"\xFF\xD8trunc")?;
                return Err(BackendError::ProcessingFailed("mock save failure".into()));
            }
            std::fs::write(path, b"mock jpeg")?;
            Ok(())
        }
    }

    #[test]
    fn mock_records_probe() {
        let backend = MockBackend::new().with_image("/test/image.jpg", 800, 600, Some(6));

        let info = backend.probe(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(info.width, 800);
        assert_eq!(info.orientation_tag, Some(6));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Probe(p) if p == Path::new("/test/image.jpg")));
    }

    #[test]
    fn mock_decode_fits_target() {
        let backend = MockBackend::new().with_image("/a.jpg", 400, 200, None);
        let img = backend
            .decode_file(Path::new("/a.jpg"), Some(TargetBox::new(100, 100)))
            .unwrap();
        assert_eq!((img.width(), img.height()), (100, 50));
        assert_eq!(backend.decode_count(), 1);
    }

    #[test]
    fn mock_failures_are_per_path() {
        let backend = MockBackend::new()
            .with_image("/bad.jpg", 10, 10, None)
            .with_image("/good.jpg", 10, 10, None)
            .failing_direct("/bad.jpg");
        assert!(backend.decode_file(Path::new("/bad.jpg"), None).is_err());
        assert!(backend.decode_file(Path::new("/good.jpg"), None).is_ok());
    }
}
