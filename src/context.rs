//! The pipeline context: every piece of shared state, owned in one place.
//!
//! A [`Context`] is created once, wrapped in an `Arc` and handed to the
//! viewer and both workers. There are no process-wide singletons; two
//! contexts in one process (as in the test suite) never see each other.
//!
//! [`Workers`] starts the two background threads. They are detached in the
//! sense that nothing waits for them at process exit; [`Workers::shutdown`]
//! exists so embedders and tests can stop them deterministically.

use crate::cache_worker;
use crate::config::PipelineConfig;
use crate::coordinator::Coordinator;
use crate::front_end::{Activity, FrontEnd};
use crate::imaging::ImageBackend;
use crate::metadata::MetadataCache;
use crate::pixel_cache::PixelCaches;
use crate::queue::WorkQueue;
use crate::thumbnails::{self, ThumbnailQueue};
use crate::types::PrepKey;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

pub struct Context {
    pub config: PipelineConfig,
    pub backend: Arc<dyn ImageBackend>,
    pub front_end: Arc<dyn FrontEnd>,
    pub metadata: MetadataCache,
    pub pixels: PixelCaches,
    pub coordinator: Coordinator,
    pub activity: Activity,
    pub cache_queue: WorkQueue<PrepKey>,
    pub thumbnails: ThumbnailQueue,
}

impl Context {
    pub fn new(
        config: PipelineConfig,
        backend: Arc<dyn ImageBackend>,
        front_end: Arc<dyn FrontEnd>,
    ) -> Self {
        let capacity = config.cache.capacity;
        Self {
            config,
            backend,
            front_end,
            metadata: MetadataCache::new(),
            pixels: PixelCaches::new(capacity),
            coordinator: Coordinator::new(),
            activity: Activity::new(),
            cache_queue: WorkQueue::new(),
            thumbnails: ThumbnailQueue::new(),
        }
    }
}

/// Handles of the two background workers.
pub struct Workers {
    ctx: Arc<Context>,
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    /// Spawn the cache worker and the thumbnail worker on named threads.
    pub fn start(ctx: &Arc<Context>) -> io::Result<Self> {
        let cache = {
            let ctx = Arc::clone(ctx);
            thread::Builder::new()
                .name("glance-cache".into())
                .spawn(move || cache_worker::run(&ctx))?
        };
        let thumbs = {
            let ctx = Arc::clone(ctx);
            thread::Builder::new()
                .name("glance-thumbs".into())
                .spawn(move || thumbnails::run_worker(&ctx))?
        };
        info!("Background workers started");
        Ok(Self {
            ctx: Arc::clone(ctx),
            handles: vec![cache, thumbs],
        })
    }

    /// Close both queues and wait for the workers to finish their current item.
    pub fn shutdown(self) {
        self.ctx.cache_queue.close();
        self.ctx.thumbnails.queue().close();
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                warn!(thread = %name, "Worker exited by panic");
            }
        }
        info!("Background workers stopped");
    }
}
