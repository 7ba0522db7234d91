//! Background Cache Worker: pre-decodes queued (image, zoom) pairs.
//!
//! The viewer enqueues the neighbours of the current image; this worker
//! decodes them with orientation so the next step feels instant. It claims
//! each key in the coordinator before decoding, which makes a concurrent
//! show of the same image wait for this decode instead of repeating it.
//!
//! Failures and panics are contained per item. One bad file is logged and
//! the loop moves on.

use crate::context::Context;
use crate::decode::{DecodeError, DecodeRequest, Source, Strategy, decode};
use crate::metadata::read_metadata;
use crate::types::PrepKey;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// What [`prepare_one`] did with a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepared {
    AlreadyCached,
    Decoded(Strategy),
}

/// Worker loop. Returns when the cache queue is closed.
pub fn run(ctx: &Context) {
    info!("Starting cache worker");
    while ctx.cache_queue.wait_for_work() {
        while let Some(key) = ctx.cache_queue.pop_front() {
            match panic::catch_unwind(AssertUnwindSafe(|| prepare_one(ctx, &key))) {
                Ok(Ok(prepared)) => debug!(key = %key, outcome = ?prepared, "Cache worker item done"),
                Ok(Err(e)) => warn!(key = %key, error = %e, "Could not cache image"),
                Err(_) => error!(key = %key, "Cache worker panicked on image"),
            }
            ctx.cache_queue.task_done();
        }
    }
    info!("Cache worker stopped");
}

/// Decode one key into the cache unless an entry already exists.
pub fn prepare_one(ctx: &Context, key: &PrepKey) -> Result<Prepared, DecodeError> {
    if ctx.pixels.contains(key.zoom, &key.image) {
        return Ok(Prepared::AlreadyCached);
    }

    let _guard = ctx.coordinator.acquire(key);
    // A show may have prepared it while we waited for the claim
    if ctx.pixels.contains(key.zoom, &key.image) {
        return Ok(Prepared::AlreadyCached);
    }

    debug!(key = %key, "Cache worker loads image");
    if let Err(e) = read_metadata(ctx, &key.image) {
        debug!(key = %key, error = %e, "Metadata unavailable, decoding anyway");
    }

    if ctx.pixels.evict_if_oversized(key.zoom) {
        info!(zoom = %key.zoom, "Pixel cache full, flushed");
    }

    let req = DecodeRequest::new(key.image.clone(), key.zoom, ctx.front_end.viewport())
        .oriented(true)
        .forced();
    let decoded = decode(ctx, &req)?;
    Ok(match decoded.source {
        Source::Strategy(strategy) => Prepared::Decoded(strategy),
        Source::Cache => Prepared::AlreadyCached,
    })
}
