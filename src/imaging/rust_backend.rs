//! Pure Rust image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Probe dimensions | `image::image_dimensions` (header only), EXIF pixel dimensions as fallback |
//! | Orientation tag | `kamadak-exif`, `Tag::Orientation` in the primary IFD |
//! | Embedded preview | `kamadak-exif`, `JPEGInterchangeFormat` + length per IFD, largest wins |
//! | Fast decode | `image::ImageReader` with the format taken from the extension, `Triangle` scaling |
//! | General-purpose open | `image::ImageReader::with_guessed_format` (content sniffing) |
//! | Encode thumbnail | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, ImageBackend, ProbeInfo};
use super::calculations::fit_within;
use crate::types::TargetBox;
use exif::{In, Tag};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;
use tracing::debug;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the EXIF block of a file. `Ok(None)` when the file simply has none.
fn read_exif(path: &Path) -> Result<Option<exif::Exif>, BackendError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Ok(Some(exif)),
        Err(exif::Error::NotFound(_)) => Ok(None),
        Err(exif::Error::Io(e)) => Err(BackendError::Io(e)),
        Err(e) => Err(BackendError::ProcessingFailed(format!(
            "Failed to read EXIF from {}: {}",
            path.display(),
            e
        ))),
    }
}

fn exif_uint(exif: &exif::Exif, tag: Tag, ifd: In) -> Option<u32> {
    exif.get_field(tag, ifd).and_then(|f| f.value.get_uint(0))
}

/// Fit `img` into `target`, or return it unchanged when there is no target.
fn scale_to(img: DynamicImage, target: Option<TargetBox>, filter: FilterType) -> DynamicImage {
    match target {
        Some(bounds) => {
            let (w, h) = fit_within((img.width(), img.height()), bounds);
            if (w, h) == (img.width(), img.height()) {
                img
            } else {
                img.resize_exact(w, h, filter)
            }
        }
        None => img,
    }
}

fn decode_failed(what: &str, e: image::ImageError) -> BackendError {
    match e {
        image::ImageError::IoError(io) => BackendError::Io(io),
        image::ImageError::Unsupported(u) => {
            BackendError::Unsupported(format!("{what}: {u}"))
        }
        other => BackendError::ProcessingFailed(format!("Failed to decode {what}: {other}")),
    }
}

impl ImageBackend for RustBackend {
    fn probe(&self, path: &Path) -> Result<ProbeInfo, BackendError> {
        let exif = match read_exif(path) {
            Ok(exif) => exif,
            Err(BackendError::Io(e)) => return Err(BackendError::Io(e)),
            Err(e) => {
                // GIF, BMP and friends carry no EXIF at all
                debug!(path = %path.display(), error = %e, "no usable EXIF block");
                None
            }
        };
        let orientation_tag = exif
            .as_ref()
            .and_then(|e| exif_uint(e, Tag::Orientation, In::PRIMARY));

        let (width, height) = match image::image_dimensions(path) {
            Ok(dims) => dims,
            Err(e) => {
                // Containers the decoders cannot read may still describe
                // themselves in EXIF.
                let dims = exif.as_ref().and_then(|e| {
                    Some((
                        exif_uint(e, Tag::PixelXDimension, In::PRIMARY)?,
                        exif_uint(e, Tag::PixelYDimension, In::PRIMARY)?,
                    ))
                });
                dims.ok_or_else(|| decode_failed(&path.display().to_string(), e))?
            }
        };

        Ok(ProbeInfo {
            width,
            height,
            orientation_tag,
        })
    }

    fn embedded_preview(&self, path: &Path) -> Result<Vec<u8>, BackendError> {
        let exif = read_exif(path)?.ok_or_else(|| {
            BackendError::Unsupported(format!("{} has no EXIF block", path.display()))
        })?;
        let buf = exif.buf();

        [In::PRIMARY, In::THUMBNAIL]
            .into_iter()
            .filter_map(|ifd| {
                let offset = exif_uint(&exif, Tag::JPEGInterchangeFormat, ifd)? as usize;
                let length = exif_uint(&exif, Tag::JPEGInterchangeFormatLength, ifd)? as usize;
                let data = buf.get(offset..offset.checked_add(length)?)?;
                data.starts_with(&JPEG_SOI).then_some(data)
            })
            .max_by_key(|data| data.len())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                BackendError::Unsupported(format!("{} has no embedded preview", path.display()))
            })
    }

    fn decode_file(
        &self,
        path: &Path,
        target: Option<TargetBox>,
    ) -> Result<DynamicImage, BackendError> {
        let format = ImageFormat::from_path(path)
            .map_err(|e| BackendError::Unsupported(format!("{}: {}", path.display(), e)))?;
        let mut reader = ImageReader::open(path)?;
        reader.set_format(format);
        let img = reader
            .decode()
            .map_err(|e| decode_failed(&path.display().to_string(), e))?;
        Ok(scale_to(img, target, FilterType::Triangle))
    }

    fn decode_bytes(
        &self,
        data: &[u8],
        target: Option<TargetBox>,
    ) -> Result<DynamicImage, BackendError> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()
            .map_err(|e| decode_failed("embedded buffer", e))?;
        Ok(scale_to(img, target, FilterType::Triangle))
    }

    fn open(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| decode_failed(&path.display().to_string(), e))
    }

    fn save_jpeg(
        &self,
        image: &DynamicImage,
        path: &Path,
        quality: u8,
    ) -> Result<(), BackendError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality);
        // JPEG has no alpha channel
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
    }
}
