// Shared-resource gates: a rate limiter that spaces out calls to the
// backend, and an admission controller that counts heavy units in flight.
// These two are the only cross-task mutable state in a run.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

/// Serializes access to a shared backend so that successive calls, from any
/// caller, are separated by at least `min_interval`.
pub struct RateLimiter {
    min_interval: Duration,
    last_call: AsyncMutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: AsyncMutex::new(None),
        }
    }

    /// Wait until the minimum interval since the previous call has elapsed,
    /// then claim the next slot. The lock is held while waiting, so two
    /// callers can never both believe they hold the next slot.
    pub async fn acquire(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Counts heavy work units currently in flight. Components read the count
/// to shrink their batch sizes under load: soft backpressure, no blocking.
#[derive(Default)]
pub struct AdmissionController {
    in_flight: Mutex<usize>,
}

impl AdmissionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a heavy unit. The permit decrements the counter when
    /// dropped, on success and failure paths alike.
    pub fn start_heavy(self: &Arc<Self>) -> HeavyPermit {
        let mut count = self.in_flight.lock().unwrap();
        *count += 1;
        HeavyPermit {
            controller: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.lock().unwrap()
    }
}

pub struct HeavyPermit {
    controller: Arc<AdmissionController>,
}

impl Drop for HeavyPermit {
    fn drop(&mut self) {
        let mut count = self.controller.in_flight.lock().unwrap();
        *count = count.saturating_sub(1);
    }
}
