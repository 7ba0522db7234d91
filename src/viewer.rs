//! The synchronous show path and the policies around it.
//!
//! [`Viewer`] is owned by the interaction thread. It remembers the folder
//! listing, the current image and the zoom mode, and drives the shared
//! [`Context`]:
//!
//! - [`show`](Viewer::show) decodes for the current zoom and viewport,
//!   records the interaction and queues the neighbours for the cache worker.
//! - [`check_orientation`](Viewer::check_orientation) is the follow-up of a
//!   show whose result came back unoriented: once metadata is known, the
//!   image is shown again with correction if it needs it.
//! - [`change_folder`](Viewer::change_folder) and
//!   [`prioritize_folder_thumbs`](Viewer::prioritize_folder_thumbs) feed the
//!   thumbnail worker, nearest images first.

use crate::context::Context;
use crate::decode::{DecodeError, DecodeRequest, Decoded, decode};
use crate::imaging::calculations::distance_from;
use crate::metadata::read_metadata;
use crate::types::{ImageRef, PrepKey, ZoomMode};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowOptions {
    /// Startup display: no activity, no browser update, no cache-around.
    pub quick: bool,
    /// Orientation correction is required.
    pub orient: bool,
}

impl ShowOptions {
    pub fn quick() -> Self {
        Self {
            quick: true,
            orient: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Shown {
    pub image: ImageRef,
    pub decoded: Decoded,
    /// The result is unoriented and metadata was not known: call
    /// [`Viewer::check_orientation`] once the display is up.
    pub needs_orientation_check: bool,
}

pub struct Viewer {
    ctx: Arc<Context>,
    images: Vec<ImageRef>,
    current: Option<ImageRef>,
    selected: Option<ImageRef>,
    zoom: ZoomMode,
}

impl Viewer {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            images: Vec::new(),
            current: None,
            selected: None,
            zoom: ZoomMode::Fit,
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    pub fn current(&self) -> Option<&ImageRef> {
        self.current.as_ref()
    }

    pub fn selected(&self) -> Option<&ImageRef> {
        self.selected.as_ref()
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn zoom(&self) -> ZoomMode {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: ZoomMode) {
        self.zoom = zoom;
    }

    /// Display `image` now.
    pub fn show(&mut self, image: &ImageRef, options: ShowOptions) -> Result<Shown, DecodeError> {
        info!(image = %image, zoom = %self.zoom, "Showing");
        self.current = Some(image.clone());
        self.selected = Some(image.clone());

        let req = DecodeRequest::new(image.clone(), self.zoom, self.ctx.front_end.viewport())
            .oriented(options.orient);
        let decoded = decode(&self.ctx, &req)?;
        let needs_orientation_check = !options.orient && !decoded.was_oriented();

        if options.quick {
            self.ctx.activity.reset();
        } else {
            self.ctx.activity.register();
            self.ctx.front_end.select_in_browser(image);
            self.cache_around();
        }

        Ok(Shown {
            image: image.clone(),
            decoded,
            needs_orientation_check,
        })
    }

    /// Re-read metadata and re-show `image` oriented if it is still current and needs it.
    pub fn check_orientation(&mut self, image: &ImageRef) -> Result<Option<Shown>, DecodeError> {
        let metadata = match read_metadata(&self.ctx, image) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(image = %image, error = %e, "Orientation check skipped");
                return Ok(None);
            }
        };
        if self.current.as_ref() != Some(image) || !metadata.needs_orientation {
            return Ok(None);
        }
        let options = ShowOptions {
            orient: true,
            ..ShowOptions::default()
        };
        self.show(image, options).map(Some)
    }

    /// Queue the images next to the current one, unless already cached.
    /// Returns how many were queued.
    pub fn cache_around(&self) -> usize {
        if self.images.is_empty() {
            return 0;
        }
        let position = self.position_of(self.current.as_ref()).unwrap_or(0);

        let mut queued = 0;
        for index in [position.checked_add(1), position.checked_sub(1)]
            .into_iter()
            .flatten()
        {
            let Some(image) = self.images.get(index) else {
                continue;
            };
            if self.ctx.pixels.contains(self.zoom, image) {
                continue;
            }
            debug!(image = %image, zoom = %self.zoom, "Caching around");
            if self
                .ctx
                .cache_queue
                .enqueue(PrepKey::new(image.clone(), self.zoom))
            {
                queued += 1;
            }
        }
        queued
    }

    /// Install a folder listing.
    pub fn set_folder(&mut self, images: Vec<ImageRef>) {
        self.images = images;
    }

    /// Switch to another folder: drop pending thumbnail work, forget what was
    /// prepared, select the first image and queue the folder's thumbnails.
    pub fn change_folder(&mut self, images: Vec<ImageRef>) {
        self.ctx.thumbnails.queue().replace([]);
        self.ctx.thumbnails.reset_prepared();
        self.set_folder(images);

        self.selected = self.images.first().cloned();
        if let Some(first) = &self.selected {
            self.ctx.front_end.select_in_browser(first);
        }
        self.prioritize_folder_thumbs();
    }

    /// Queue every image of the folder, nearest to the selection first.
    pub fn prioritize_folder_thumbs(&self) {
        let position = self.position_of(self.selected.as_ref()).unwrap_or(0);
        let mut order: Vec<(usize, &ImageRef)> = self.images.iter().enumerate().collect();
        order.sort_by_key(|(i, _)| distance_from(position, *i));

        let files: Vec<ImageRef> = order.into_iter().map(|(_, image)| image.clone()).collect();
        self.ctx
            .thumbnails
            .priority_thumbs(self.selected.as_ref(), &files);
    }

    /// The fit-mode viewport changed size: every fit entry is stale.
    pub fn viewport_changed(&self) {
        self.ctx.pixels.for_zoom(ZoomMode::Fit).clear();
    }

    /// Show the image `direction` steps away, wrapping around the folder.
    /// Images that fail to decode are skipped.
    pub fn go(&mut self, direction: isize) -> Result<Option<Shown>, DecodeError> {
        let len = self.images.len();
        if len == 0 {
            return Ok(None);
        }
        let mut position = self.position_of(self.current.as_ref()).unwrap_or(0);
        let mut last_error = None;

        for _ in 0..len {
            position = step(position, direction, len);
            let image = self.images[position].clone();
            match self.show(&image, ShowOptions::default()) {
                Ok(shown) => return Ok(Some(shown)),
                Err(e) => {
                    warn!(image = %image, error = %e, "Could not show, skipping");
                    last_error = Some(e);
                }
            }
        }
        last_error.map_or(Ok(None), Err)
    }

    fn position_of(&self, image: Option<&ImageRef>) -> Option<usize> {
        let image = image?;
        self.images.iter().position(|i| i == image)
    }
}

fn step(position: usize, direction: isize, len: usize) -> usize {
    (position as isize + direction).rem_euclid(len as isize) as usize
}
