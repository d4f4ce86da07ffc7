use std::time::Duration;

use serde::Deserialize;

use crate::error::VerifyError;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Knobs for one verification run. Deserializable so callers can ship it as
/// JSON/TOML; every field has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Complexity budget per work unit when batching tables.
    #[serde(default = "default_batch_budget")]
    pub batch_budget: u32,
    /// Maximum line items per work unit when chunking a flat item list.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    /// Units at or above this complexity count against the admission
    /// controller while in flight.
    #[serde(default = "default_heavy_threshold")]
    pub heavy_threshold: u32,
    /// Minimum spacing between successive calls to the shared backend.
    #[serde(default = "default_min_call_interval_ms")]
    pub min_call_interval_ms: u64,
    /// Interval between polls of a long-running backend call.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Wall-clock budget for one backend call, measured from submission.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Attempt cap for transient backend failures.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_batch_budget() -> u32 {
    400
}

fn default_max_chunk_size() -> usize {
    8
}

fn default_heavy_threshold() -> u32 {
    200
}

fn default_min_call_interval_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_call_timeout_ms() -> u64 {
    120_000
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_retry_max_delay_ms() -> u64 {
    5_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_budget: default_batch_budget(),
            max_chunk_size: default_max_chunk_size(),
            heavy_threshold: default_heavy_threshold(),
            min_call_interval_ms: default_min_call_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl RunConfig {
    /// Fail-fast validation at the invocation boundary: these are caller
    /// bugs, not runtime conditions.
    pub fn validate(&self) -> Result<(), VerifyError> {
        if self.max_chunk_size == 0 {
            return Err(VerifyError::ConfigValidation(
                "max_chunk_size must be at least 1".into(),
            ));
        }
        if self.retry_max_attempts == 0 {
            return Err(VerifyError::ConfigValidation(
                "retry_max_attempts must be at least 1".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(VerifyError::ConfigValidation(
                "poll_interval_ms must be nonzero".into(),
            ));
        }
        Ok(())
    }

    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}
