//! Thumbnail Worker: persisted thumbnails in priority order, out of the user's way.
//!
//! ## Disk cache
//!
//! One JPEG per source image under `<cache_root>/<height>/`, named by the
//! SHA-256 of the absolute source path:
//!
//! ```text
//! ~/.cache/glance/thumbs/120/3f8a…c1.jpg
//! ```
//!
//! The file's existence is the cache. Nothing is expired and a changed
//! source is not detected. Files are encoded under a `.part` name and
//! renamed into place, so a failed write never leaves a reusable file.
//!
//! ## Ordering
//!
//! [`ThumbnailQueue::priority_thumbs`] replaces the pending order: the
//! selected image first, then the requested images not yet prepared, then
//! whatever was queued before and is neither requested nor prepared.
//! Images handled once in this run are remembered in the prepared set and
//! never processed again until [`ThumbnailQueue::reset_prepared`].
//!
//! ## Throttling
//!
//! At startup the worker waits (bounded by `throttle.startup_grace_ms`)
//! while the viewer shows a single image. Before every item it waits until
//! the user has been idle for `throttle.idle_ms`, then pauses briefly. The
//! idle wait polls the activity clock on a timer; there is no event to wait on.

use crate::config::ThumbnailConfig;
use crate::context::Context;
use crate::decode::library_render;
use crate::imaging::BackendError;
use crate::queue::WorkQueue;
use crate::types::{ImageRef, TargetBox};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot render thumbnail: {0}")]
    Backend(#[from] BackendError),
}

/// Cache file name for `image`: hex SHA-256 of the path plus `.jpg`.
pub fn thumbnail_file_name(image: &ImageRef) -> String {
    let digest = Sha256::digest(image.path().as_os_str().as_encoded_bytes());
    format!("{:x}.jpg", digest)
}

/// Where the thumbnail of `image` lives. Pure function of the path and config.
pub fn thumbnail_path_for(config: &ThumbnailConfig, image: &ImageRef) -> PathBuf {
    config.cache_dir().join(thumbnail_file_name(image))
}

/// Return the thumbnail of `image`, rendering and saving it only if absent.
pub fn prepare_thumbnail(ctx: &Context, image: &ImageRef) -> Result<PathBuf, ThumbnailError> {
    let config = &ctx.config.thumbnails;
    let path = thumbnail_path_for(config, image);
    if path.exists() {
        debug!(image = %image, thumbnail = %path.display(), "Thumbnail cached on disk");
        return Ok(path);
    }

    let pixels = library_render(ctx, image, Some(TargetBox::new(config.width, config.height)))?;
    // Existence means complete, so only a fully written file takes the final name
    let partial = path.with_extension("jpg.part");
    if let Err(e) = ctx.backend.save_jpeg(&pixels, &partial, config.quality) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&partial, &path) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }
    debug!(image = %image, thumbnail = %path.display(), "Thumbnail written");
    Ok(path)
}

/// Prepare one thumbnail and tell the front-end how it went.
pub fn add_thumb(ctx: &Context, image: &ImageRef) {
    match prepare_thumbnail(ctx, image) {
        Ok(path) => {
            ctx.front_end.add_image_thumbnail(image, &path);
            if ctx.front_end.current_selection().as_ref() == Some(image) {
                ctx.front_end.select_in_browser(image);
            }
        }
        Err(e) => {
            ctx.front_end.remove_image_entry(image);
            warn!(image = %image, error = %e, "Could not add thumbnail");
        }
    }
}

/// The thumbnail work queue plus the set of images already handled.
#[derive(Debug, Default)]
pub struct ThumbnailQueue {
    queue: WorkQueue<ImageRef>,
    prepared: Mutex<HashSet<ImageRef>>,
}

impl ThumbnailQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self) -> &WorkQueue<ImageRef> {
        &self.queue
    }

    /// Replace the pending order. See the [module docs](self#ordering).
    pub fn priority_thumbs(&self, selected: Option<&ImageRef>, files: &[ImageRef]) {
        let prepared = self.prepared();
        let previous = self.queue.snapshot();

        let requested = files.iter().filter(|f| !prepared.contains(*f)).cloned();
        let leftover = previous
            .into_iter()
            .filter(|f| !files.contains(f) && !prepared.contains(f));
        let order: Vec<ImageRef> = selected
            .cloned()
            .into_iter()
            .chain(requested)
            .chain(leftover)
            .collect();

        debug!(queued = order.len(), "Thumbnail queue reprioritized");
        self.queue.replace(order);
    }

    pub fn is_prepared(&self, image: &ImageRef) -> bool {
        self.prepared().contains(image)
    }

    /// Record `image` as handled. Returns `false` if it already was.
    pub fn mark_prepared(&self, image: &ImageRef) -> bool {
        self.prepared().insert(image.clone())
    }

    pub fn reset_prepared(&self) {
        self.prepared().clear();
    }

    pub fn prepared_count(&self) -> usize {
        self.prepared().len()
    }

    fn prepared(&self) -> MutexGuard<'_, HashSet<ImageRef>> {
        self.prepared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`ThumbnailQueue::priority_thumbs`] with the front-end's current selection.
pub fn priority_thumbs(ctx: &Context, files: &[ImageRef]) {
    let selected = ctx.front_end.current_selection();
    ctx.thumbnails.priority_thumbs(selected.as_ref(), files);
}

/// Worker loop. Returns when the thumbnail queue is closed.
pub fn run_worker(ctx: &Context) {
    let throttle = &ctx.config.throttle;
    let queue = ctx.thumbnails.queue();

    let started = Instant::now();
    while ctx.front_end.in_single_image_mode()
        && started.elapsed() < throttle.startup_grace()
        && !queue.is_closed()
    {
        thread::sleep(throttle.startup_poll());
    }

    let cache_dir = ctx.config.thumbnails.cache_dir();
    if let Err(e) = fs::create_dir_all(&cache_dir) {
        error!(dir = %cache_dir.display(), error = %e, "Could not create thumbnail cache dir");
    }

    info!(dir = %cache_dir.display(), "Starting thumbnail worker");
    while queue.wait_for_work() {
        while wait_until_idle(ctx) {
            thread::sleep(throttle.pause());
            let Some(image) = queue.pop_front() else {
                break;
            };
            if ctx.thumbnails.mark_prepared(&image) {
                debug!(image = %image, "Thumbnail worker loads image");
                if panic::catch_unwind(AssertUnwindSafe(|| add_thumb(ctx, &image))).is_err() {
                    error!(image = %image, "Thumbnail worker panicked on image");
                    ctx.front_end.remove_image_entry(&image);
                }
            }
            queue.task_done();
        }
    }
    info!("Thumbnail worker stopped");
}

/// Sleep until the user has been idle long enough. `false` if the queue closed meanwhile.
fn wait_until_idle(ctx: &Context) -> bool {
    let throttle = &ctx.config.throttle;
    let queue = ctx.thumbnails.queue();
    while !ctx.activity.is_idle(throttle.idle()) {
        if queue.is_closed() {
            return false;
        }
        thread::sleep(throttle.poll());
    }
    !queue.is_closed()
}
