//! Progress reporting for zone computation.
//!
//! The pipeline reports one unit of work per (center cell, environment
//! class) group through [`ProgressCallback`], so the host decides how to
//! render it: progress bars, periodic log lines, or nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Receives progress updates from the zone pipeline.
///
/// Implementations must be `Send + Sync` so one callback can be shared
/// through an `Arc` by concurrent pipeline runs.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`] instance.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// Reports progress as `log::info!` lines every `every` units.
pub struct LogProgress {
    every: u64,
    total: AtomicU64,
    position: AtomicU64,
}

impl LogProgress {
    /// Logs once every `every` units (at least 1).
    #[must_use]
    pub fn new(every: u64) -> Arc<dyn ProgressCallback> {
        Arc::new(Self {
            every: every.max(1),
            total: AtomicU64::new(0),
            position: AtomicU64::new(0),
        })
    }
}

impl ProgressCallback for LogProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.position.store(0, Ordering::Relaxed);
    }

    fn inc(&self, delta: u64) {
        let before = self.position.fetch_add(delta, Ordering::Relaxed);
        let after = before + delta;
        if after / self.every > before / self.every {
            log::info!(
                "  {after}/{} zone groups processed",
                self.total.load(Ordering::Relaxed)
            );
        }
    }

    fn set_message(&self, msg: String) {
        log::info!("{msg}");
    }

    fn finish(&self, msg: String) {
        log::info!("{msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_progress_tracks_position() {
        let progress = LogProgress {
            every: 2,
            total: AtomicU64::new(0),
            position: AtomicU64::new(0),
        };
        progress.set_total(5);
        for _ in 0..5 {
            progress.inc(1);
        }
        assert_eq!(progress.position.load(Ordering::Relaxed), 5);

        progress.set_total(3);
        assert_eq!(progress.position.load(Ordering::Relaxed), 0);
    }
}
