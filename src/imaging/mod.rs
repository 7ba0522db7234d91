//! Pixel-level image work, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Probe** | `image::image_dimensions` + `kamadak-exif` orientation tag |
//! | **Embedded preview** | `kamadak-exif` JPEG interchange offsets |
//! | **Decode** | `image::ImageReader` (extension-based fast path, sniffing fallback) |
//! | **Orient** | [`Orientation`] table over `fliph`/`flipv`/`rotate*` |
//! | **Thumbnail encode** | `JpegEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for fit-to-box math (unit testable)
//! - **Orientation**: The EXIF orientation transform table
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
pub mod calculations;
pub mod orientation;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, ProbeInfo};
pub use orientation::{Orientation, needs_correction};
pub use rust_backend::RustBackend;
