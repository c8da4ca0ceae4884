//! Cooperative cancellation

use super::Pacer;
use crate::error::{PartHashError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
///
/// Clones observe the same flag. Used as a [`Pacer`], it aborts the hash
/// before the next read once cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Pacer for CancellationToken {
    fn before_read(&mut self, _consumed: u64) -> Result<()> {
        if self.is_cancelled() {
            Err(PartHashError::Cancelled)
        } else {
            Ok(())
        }
    }
}
