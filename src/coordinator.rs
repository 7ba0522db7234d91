//! Preparation Coordinator: single-flight over (image, zoom) preparations.
//!
//! A preparation is *claimed* by inserting its [`PrepKey`] into the
//! in-flight set and *released* when the returned [`InFlightGuard`] drops.
//! Release happens on success, on error and during unwinding alike, so a
//! failed decode can never leave a key stuck.
//!
//! Waiting is a broadcast: every release wakes every waiter, and each waiter
//! re-checks whether its own key is still in flight before proceeding.
//! Requests for different keys never wait on each other.
//!
//! Lock order: the coordinator lock is taken before any pixel cache lock.

use crate::pixel_cache::DecodedImage;
use crate::types::{ImageRef, PrepKey, ZoomMode};
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{error, info};

/// A release that found nothing to release. Unreachable unless the
/// in-flight bookkeeping is broken; logged, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("In-flight marker for {image} ({zoom}) was already cleared")]
pub struct CacheInvariantViolation {
    pub image: ImageRef,
    pub zoom: ZoomMode,
}

/// Result of [`Coordinator::claim_or_lookup`].
pub enum Claim<'a> {
    /// Someone already prepared a usable result.
    Ready(DecodedImage),
    /// The caller now owns the preparation and must produce the result.
    Claimed(InFlightGuard<'a>),
}

#[derive(Debug, Default)]
pub struct Coordinator {
    in_flight: Mutex<HashSet<PrepKey>>,
    released: Condvar,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait out any in-flight preparation of `key`, then consult `lookup`.
    ///
    /// A hit is returned as [`Claim::Ready`]. On a miss the key is claimed
    /// before the lock is dropped, so concurrent callers for the same key
    /// end up waiting on this one instead of decoding again.
    pub fn claim_or_lookup<F>(&self, key: &PrepKey, lookup: F) -> Claim<'_>
    where
        F: FnOnce() -> Option<DecodedImage>,
    {
        let mut in_flight = self.wait_until_free(key);
        if let Some(hit) = lookup() {
            return Claim::Ready(hit);
        }
        in_flight.insert(key.clone());
        Claim::Claimed(InFlightGuard {
            coordinator: self,
            key: key.clone(),
        })
    }

    /// Wait until `key` is free, then claim it unconditionally.
    pub fn acquire(&self, key: &PrepKey) -> InFlightGuard<'_> {
        let mut in_flight = self.wait_until_free(key);
        in_flight.insert(key.clone());
        InFlightGuard {
            coordinator: self,
            key: key.clone(),
        }
    }

    pub fn is_in_flight(&self, key: &PrepKey) -> bool {
        self.lock().contains(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.lock().len()
    }

    fn wait_until_free(&self, key: &PrepKey) -> MutexGuard<'_, HashSet<PrepKey>> {
        let in_flight = self.lock();
        if !in_flight.contains(key) {
            return in_flight;
        }
        info!(key = %key, "Waiting on in-flight preparation");
        self.released
            .wait_while(in_flight, |keys| keys.contains(key))
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, key: &PrepKey) {
        let removed = self.lock().remove(key);
        if !removed {
            let violation = CacheInvariantViolation {
                image: key.image.clone(),
                zoom: key.zoom,
            };
            error!(error = %violation, "In-flight bookkeeping out of sync");
        }
        self.released.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PrepKey>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ownership of one in-flight preparation. Dropping it releases the key and
/// wakes all waiters.
#[must_use = "dropping the guard immediately releases the preparation"]
pub struct InFlightGuard<'a> {
    coordinator: &'a Coordinator,
    key: PrepKey,
}

impl InFlightGuard<'_> {
    pub fn key(&self) -> &PrepKey {
        &self.key
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.release(&self.key);
    }
}
