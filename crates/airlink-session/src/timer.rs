//! One-shot retry timer.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A spawned one-shot timer that runs a closure after a delay.
///
/// Dropping the timer cancels it, so a timer can never fire after its owner
/// has discarded it. Each timer carries the generation it was armed with;
/// the owner compares it against the generation reported by the closure to
/// discard firings that raced with a cancel.
#[derive(Debug)]
pub struct RetryTimer {
    generation: u64,
    token: CancellationToken,
}

impl RetryTimer {
    /// Spawn a timer that calls `on_fire` after `delay` unless cancelled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm<F>(generation: u64, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => on_fire(),
            }
        });

        Self { generation, token }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
