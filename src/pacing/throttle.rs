//! Read pacing: periodic pauses and bandwidth limits
//!
//! Both pacers only delay reads; neither can change what the hasher
//! computes.

use super::Pacer;
use crate::error::Result;
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Sleeps for `pause` after every `every` bytes consumed
#[derive(Debug, Clone)]
pub struct SleepPacer {
    every: u64,
    pause: Duration,
    next_pause_at: u64,
}

impl SleepPacer {
    /// Create a pacer; `every == 0` never pauses
    pub fn new(every: u64, pause: Duration) -> Self {
        Self {
            every,
            pause,
            next_pause_at: every,
        }
    }
}

impl Pacer for SleepPacer {
    fn before_read(&mut self, consumed: u64) -> Result<()> {
        if self.every == 0 || self.pause.is_zero() {
            return Ok(());
        }
        if consumed >= self.next_pause_at {
            std::thread::sleep(self.pause);
            self.next_pause_at = consumed + self.every;
        }
        Ok(())
    }
}

/// Token-bucket read bandwidth limit
///
/// Every read is charged once it completes, including the last read of a
/// hash. The limiter handle is shared between clones, so several concurrent
/// hash operations draw from one budget.
pub struct BandwidthPacer {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    clock: DefaultClock,
    bytes_per_token: u64,
    last_consumed: u64,
}

impl BandwidthPacer {
    /// Create a pacer limited to `bytes_per_second`
    pub fn new(bytes_per_second: u64) -> Self {
        // Use 1KB chunks as tokens for smoother throttling
        const BYTES_PER_TOKEN: u64 = 1024;

        let tokens_per_second = (bytes_per_second / BYTES_PER_TOKEN).max(1);
        let capped_tokens = tokens_per_second.min(u64::from(u32::MAX)) as u32;
        let quota = Quota::per_second(NonZeroU32::new(capped_tokens).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            clock: DefaultClock::default(),
            bytes_per_token: BYTES_PER_TOKEN,
            last_consumed: 0,
        }
    }

    /// Try to take capacity for `bytes` without blocking
    pub fn try_acquire(&self, bytes: u64) -> bool {
        let tokens_needed = (bytes / self.bytes_per_token).max(1);
        (0..tokens_needed).all(|_| self.limiter.check().is_ok())
    }

    fn wait_for_capacity(&self, bytes: u64) {
        let tokens_needed = (bytes / self.bytes_per_token).max(1);
        for _ in 0..tokens_needed {
            while let Err(not_until) = self.limiter.check() {
                std::thread::sleep(not_until.wait_time_from(self.clock.now()));
            }
        }
    }
}

impl Clone for BandwidthPacer {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            clock: self.clock.clone(),
            bytes_per_token: self.bytes_per_token,
            last_consumed: 0,
        }
    }
}

impl Pacer for BandwidthPacer {
    fn before_read(&mut self, consumed: u64) -> Result<()> {
        // a new hash restarts the byte count
        if consumed < self.last_consumed {
            self.last_consumed = 0;
        }
        Ok(())
    }

    fn after_read(&mut self, consumed: u64) -> Result<()> {
        let delta = consumed.saturating_sub(self.last_consumed);
        self.last_consumed = consumed;
        if delta > 0 {
            self.wait_for_capacity(delta);
        }
        Ok(())
    }
}
