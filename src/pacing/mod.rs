//! Pacing and cancellation between buffer reads
//!
//! The hasher calls [`Pacer::before_read`] before every read from its
//! source and [`Pacer::after_read`] once the bytes are consumed. A pacer may
//! sleep, wait for bandwidth, do nothing, or abort the computation; it never
//! sees or alters the bytes being digested.

mod cancel;
mod throttle;

pub use cancel::CancellationToken;
pub use throttle::{BandwidthPacer, SleepPacer};

use crate::config::PacingConfig;
use crate::error::Result;

/// Policy consulted around each buffer read
pub trait Pacer {
    /// Called with the number of bytes consumed so far
    fn before_read(&mut self, consumed: u64) -> Result<()>;

    /// Called with the new total once a read has been consumed
    fn after_read(&mut self, _consumed: u64) -> Result<()> {
        Ok(())
    }
}

impl<P: Pacer + ?Sized> Pacer for Box<P> {
    fn before_read(&mut self, consumed: u64) -> Result<()> {
        (**self).before_read(consumed)
    }

    fn after_read(&mut self, consumed: u64) -> Result<()> {
        (**self).after_read(consumed)
    }
}

impl<P: Pacer + ?Sized> Pacer for &mut P {
    fn before_read(&mut self, consumed: u64) -> Result<()> {
        (**self).before_read(consumed)
    }

    fn after_read(&mut self, consumed: u64) -> Result<()> {
        (**self).after_read(consumed)
    }
}

/// Never delays, never cancels
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn before_read(&mut self, _consumed: u64) -> Result<()> {
        Ok(())
    }
}

/// Runs several pacers in order, stopping at the first error
#[derive(Default)]
pub struct PacerChain {
    pacers: Vec<Box<dyn Pacer + Send>>,
}

impl PacerChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pacer
    pub fn with(mut self, pacer: impl Pacer + Send + 'static) -> Self {
        self.pacers.push(Box::new(pacer));
        self
    }

    /// Number of pacers in the chain
    pub fn len(&self) -> usize {
        self.pacers.len()
    }

    /// True when the chain does nothing
    pub fn is_empty(&self) -> bool {
        self.pacers.is_empty()
    }

    /// Build the pacing described by `config`, checking `cancel` first
    pub fn from_config(config: &PacingConfig, cancel: Option<CancellationToken>) -> Self {
        let mut chain = Self::new();
        if let Some(token) = cancel {
            chain = chain.with(token);
        }
        if config.pause_every > 0 && !config.pause.is_zero() {
            chain = chain.with(SleepPacer::new(config.pause_every, config.pause));
        }
        if let Some(limit) = config.bandwidth_limit {
            chain = chain.with(BandwidthPacer::new(limit));
        }
        chain
    }
}

impl Pacer for PacerChain {
    fn before_read(&mut self, consumed: u64) -> Result<()> {
        self.pacers
            .iter_mut()
            .try_for_each(|pacer| pacer.before_read(consumed))
    }

    fn after_read(&mut self, consumed: u64) -> Result<()> {
        self.pacers
            .iter_mut()
            .try_for_each(|pacer| pacer.after_read(consumed))
    }
}
