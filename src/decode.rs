//! Image Decoder: cache check, then an ordered chain of decode strategies.
//!
//! [`decode`] first consults the pixel cache through the coordinator
//! (waiting out an in-flight preparation of the same key), and on a miss
//! walks [`Strategy::CHAIN`] until one strategy produces pixels:
//!
//! | Strategy | Source | Orientation |
//! |---|---|---|
//! | [`Direct`](Strategy::Direct) | the file, fast decoder, scaled to target | none; `was_oriented` only if already upright |
//! | [`EmbeddedPreview`](Strategy::EmbeddedPreview) | largest preview in the EXIF block, metadata refreshed first | same as direct |
//! | [`Library`](Strategy::Library) | general-purpose open, preview bytes as fallback | always applied |
//!
//! The first two are only tried when they can produce an acceptable result:
//! the image is known to be upright, or orientation was not requested and
//! nothing is known yet. A direct decode of an image with unknown metadata is
//! therefore cached unoriented; the viewer schedules an orientation recheck
//! for exactly that case.
//!
//! Every successful decode is stored in the cache for its zoom mode.

use crate::context::Context;
use crate::coordinator::Claim;
use crate::imaging::calculations::shrink_within;
use crate::imaging::{BackendError, Orientation};
use crate::metadata::{Metadata, read_metadata};
use crate::pixel_cache::DecodedImage;
use crate::types::{DecodeOptions, ImageRef, PrepKey, TargetBox, ZoomMode};
use image::DynamicImage;
use image::imageops::FilterType;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Cannot decode {path}: {reason}")]
    Exhausted { path: PathBuf, reason: String },
}

/// One request to the decoder.
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub image: ImageRef,
    pub zoom: ZoomMode,
    /// Current viewport; its width is the cache-validity key.
    pub viewport: TargetBox,
    pub options: DecodeOptions,
}

impl DecodeRequest {
    pub fn new(image: ImageRef, zoom: ZoomMode, viewport: TargetBox) -> Self {
        Self {
            image,
            zoom,
            viewport,
            options: DecodeOptions::default(),
        }
    }

    pub fn oriented(mut self, orient: bool) -> Self {
        self.options.orient = orient;
        self
    }

    /// Skip the in-flight wait and the cache lookup.
    pub fn forced(mut self) -> Self {
        self.options.force = true;
        self
    }

    pub fn key(&self) -> PrepKey {
        PrepKey::new(self.image.clone(), self.zoom)
    }

    pub fn requested_width(&self) -> u32 {
        self.viewport.width
    }

    /// Fit mode scales into the viewport, full mode keeps native size.
    pub fn target(&self) -> Option<TargetBox> {
        match self.zoom {
            ZoomMode::Fit => Some(self.viewport),
            ZoomMode::Full => None,
        }
    }
}

/// Where a [`Decoded`] result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Strategy(Strategy),
}

#[derive(Debug, Clone)]
pub struct Decoded {
    pub image: DecodedImage,
    pub source: Source,
}

impl Decoded {
    pub fn was_oriented(&self) -> bool {
        self.image.was_oriented
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    EmbeddedPreview,
    Library,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => f.write_str("direct"),
            Strategy::EmbeddedPreview => f.write_str("embedded preview"),
            Strategy::Library => f.write_str("library"),
        }
    }
}

impl Strategy {
    /// Tried in this order; the first success wins.
    pub const CHAIN: [Strategy; 3] = [
        Strategy::Direct,
        Strategy::EmbeddedPreview,
        Strategy::Library,
    ];

    /// Whether this strategy may serve `req` given what is known about the image.
    pub fn applies(self, req: &DecodeRequest, metadata: Option<Metadata>) -> bool {
        match self {
            Strategy::Direct | Strategy::EmbeddedPreview => {
                is_upright(metadata) || (!req.options.orient && metadata.is_none())
            }
            Strategy::Library => true,
        }
    }

    /// Run this strategy alone. Does not touch the cache.
    pub fn attempt(
        self,
        ctx: &Context,
        req: &DecodeRequest,
        metadata: Option<Metadata>,
    ) -> Result<DecodedImage, BackendError> {
        let path = req.image.path();
        let width = req.requested_width();
        match self {
            Strategy::Direct => {
                let pixels = ctx.backend.decode_file(path, req.target())?;
                Ok(DecodedImage::new(pixels, is_upright(metadata), width))
            }
            Strategy::EmbeddedPreview => {
                // The preview sits in the metadata block, so refresh metadata on the way
                let metadata = match read_metadata(ctx, &req.image) {
                    Ok(fresh) => Some(fresh),
                    Err(e) => {
                        debug!(image = %req.image, error = %e, "Preview without fresh metadata");
                        metadata
                    }
                };
                let preview = ctx.backend.embedded_preview(path)?;
                let pixels = ctx.backend.decode_bytes(&preview, req.target())?;
                Ok(DecodedImage::new(pixels, is_upright(metadata), width))
            }
            Strategy::Library => {
                let pixels = library_render(ctx, &req.image, req.target())?;
                Ok(DecodedImage::new(pixels, true, width))
            }
        }
    }
}

fn is_upright(metadata: Option<Metadata>) -> bool {
    metadata.is_some_and(|m| !m.needs_orientation)
}

/// Decode `req`, reusing a cached or in-flight result when allowed.
pub fn decode(ctx: &Context, req: &DecodeRequest) -> Result<Decoded, DecodeError> {
    if req.options.force {
        return prepare(ctx, req);
    }

    let key = req.key();
    let lookup = || {
        ctx.pixels
            .get(req.zoom, &req.image, req.requested_width(), req.options.orient)
    };
    match ctx.coordinator.claim_or_lookup(&key, lookup) {
        Claim::Ready(image) => {
            debug!(key = %key, "Cache hit");
            Ok(Decoded {
                image,
                source: Source::Cache,
            })
        }
        Claim::Claimed(_guard) => {
            debug!(key = %key, "Cache miss");
            prepare(ctx, req)
        }
    }
}

/// Walk the strategy chain and cache the first success.
fn prepare(ctx: &Context, req: &DecodeRequest) -> Result<Decoded, DecodeError> {
    let metadata = ctx.metadata.get(&req.image);
    let mut failures = Vec::new();

    for strategy in Strategy::CHAIN {
        if !strategy.applies(req, metadata) {
            continue;
        }
        match strategy.attempt(ctx, req, metadata) {
            Ok(image) => {
                debug!(
                    image = %req.image,
                    zoom = %req.zoom,
                    strategy = %strategy,
                    was_oriented = image.was_oriented,
                    "Decoded"
                );
                ctx.pixels.put(req.zoom, req.image.clone(), image.clone());
                return Ok(Decoded {
                    image,
                    source: Source::Strategy(strategy),
                });
            }
            Err(e) => {
                debug!(image = %req.image, strategy = %strategy, error = %e, "Strategy failed");
                failures.push(format!("{strategy}: {e}"));
            }
        }
    }

    Err(DecodeError::Exhausted {
        path: req.image.path().to_path_buf(),
        reason: failures.join("; "),
    })
}

/// General-purpose render: open (or fall back to the embedded preview),
/// orient from freshly read metadata, then shrink into `bounds` if given.
///
/// Also used for thumbnails. Unreadable metadata is not fatal: the image is
/// rendered as stored.
pub fn library_render(
    ctx: &Context,
    image: &ImageRef,
    bounds: Option<TargetBox>,
) -> Result<DynamicImage, BackendError> {
    let orientation = match read_metadata(ctx, image) {
        Ok(metadata) => metadata.orientation,
        Err(e) => {
            warn!(image = %image, error = %e, "Rendering without orientation");
            Orientation::Normal
        }
    };

    let path = image.path();
    let pixels = match ctx.backend.open(path) {
        Ok(pixels) => pixels,
        Err(open_err) => {
            debug!(image = %image, error = %open_err, "Open failed, trying embedded preview");
            let preview = ctx.backend.embedded_preview(path).map_err(|_| open_err)?;
            ctx.backend.decode_bytes(&preview, None)?
        }
    };

    let pixels = orientation.apply(pixels);
    Ok(match bounds {
        Some(bounds) => {
            let (w, h) = shrink_within((pixels.width(), pixels.height()), bounds);
            if (w, h) == (pixels.width(), pixels.height()) {
                pixels
            } else {
                pixels.resize_exact(w, h, FilterType::Lanczos3)
            }
        }
        None => pixels,
    })
}
