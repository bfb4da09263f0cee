//! Admission control for bulk staging writes.
//!
//! One limiter instance is shared by every bulk writer of a store so that
//! aggregate staging throughput stays bounded while foreground traffic keeps
//! its share of the disk.


use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::StorageError;

/// Token-bucket byte limiter for bulk I/O writes.
///
/// A rate of `0` disables limiting entirely. The bucket holds at most one
/// second's budget; requests larger than that are admitted in burst-sized
/// chunks so an oversized write cannot park forever behind a single
/// impossible reservation.
pub struct BulkIoRateLimiter {
    bytes_per_sec: AtomicU64,
    bucket: Mutex<TokenBucket>,
}

struct TokenBucket {
    available: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(
        &mut self,
        rate: f64,
    ) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.available = (self.available + elapsed * rate).min(rate);
        self.last_refill = now;
    }
}

impl BulkIoRateLimiter {
    /// Creates a limiter admitting `bytes_per_sec` bytes per second. `0`
    /// means unlimited.
    pub fn new(bytes_per_sec: u64) -> Self {
        Self {
            bytes_per_sec: AtomicU64::new(bytes_per_sec),
            bucket: Mutex::new(TokenBucket {
                available: bytes_per_sec as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// A limiter that admits everything immediately.
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    pub fn bytes_per_sec(&self) -> u64 {
        self.bytes_per_sec.load(Ordering::Relaxed)
    }

    /// Re-targets the admission rate. The retained budget is clamped so a
    /// rate decrease takes effect immediately.
    pub fn set_bytes_per_sec(
        &self,
        bytes_per_sec: u64,
    ) {
        let mut bucket = self.bucket.lock();
        bucket.available = bucket.available.min(bytes_per_sec as f64);
        bucket.last_refill = Instant::now();
        self.bytes_per_sec.store(bytes_per_sec, Ordering::Relaxed);
    }

    /// Waits until `bytes` are authorized or `cancel` fires.
    ///
    /// Cancellation is honored before the fast path and at every suspension
    /// point; a cancelled wait returns [`StorageError::Cancelled`] promptly
    /// without consuming the remaining request.
    pub async fn admit(
        &self,
        bytes: u64,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled.into());
        }

        let mut remaining = bytes;
        while remaining > 0 {
            match self.consume(&mut remaining) {
                None => {}
                Some(delay) => {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return Err(StorageError::Cancelled.into());
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    /// Non-blocking admission of `bytes` against the current budget.
    /// Requests larger than one second's budget never succeed here.
    pub fn try_admit(
        &self,
        bytes: u64,
    ) -> bool {
        let rate = self.bytes_per_sec.load(Ordering::Relaxed);
        if rate == 0 {
            return true;
        }

        let mut bucket = self.bucket.lock();
        bucket.refill(rate as f64);
        if (bytes as f64) <= bucket.available {
            bucket.available -= bytes as f64;
            true
        } else {
            false
        }
    }

    /// Claims as much of `remaining` as fits right now and returns how long
    /// to wait before the next chunk does, if any.
    fn consume(
        &self,
        remaining: &mut u64,
    ) -> Option<Duration> {
        let rate = self.bytes_per_sec.load(Ordering::Relaxed);
        if rate == 0 {
            *remaining = 0;
            return None;
        }

        let mut bucket = self.bucket.lock();
        bucket.refill(rate as f64);

        let chunk = (*remaining).min(rate);
        if bucket.available >= chunk as f64 {
            bucket.available -= chunk as f64;
            *remaining -= chunk;
            None
        } else {
            Some(Duration::from_secs_f64(
                (chunk as f64 - bucket.available) / rate as f64,
            ))
        }
    }
}
