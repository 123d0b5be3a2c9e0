use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rowdraw_common::error::{Error, Result};

use crate::retry::RetryPolicy;

pub const DEFAULT_GAPS: f64 = 1.03;
pub const DEFAULT_MAX_ITERATIONS: u32 = 64;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_ENUMERATION_LIMIT: u64 = 100_000;
pub const DEFAULT_STALL_LIMIT: u32 = 3;

/// Where the advisory row count used for batch sizing comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountSource {
    /// Table statistics when present, exact count otherwise.
    #[default]
    Statistics,
    Exact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleOptions {
    pub limit: usize,
    pub key_column: Option<String>,
    pub gaps: f64,
    pub max_iterations: u32,
    pub time_budget: Option<Duration>,
    pub max_batch_size: usize,
    pub enumeration_limit: u64,
    pub stall_limit: u32,
    pub count_source: CountSource,
    pub seed: Option<u64>,
    pub retry: RetryPolicy,
}

impl SampleOptions {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            key_column: None,
            gaps: DEFAULT_GAPS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            time_budget: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            enumeration_limit: DEFAULT_ENUMERATION_LIMIT,
            stall_limit: DEFAULT_STALL_LIMIT,
            count_source: CountSource::default(),
            seed: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = Some(column.into());
        self
    }

    pub fn with_gaps(mut self, gaps: f64) -> Self {
        self.gaps = gaps;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_enumeration_limit(mut self, limit: u64) -> Self {
        self.enumeration_limit = limit;
        self
    }

    pub fn with_stall_limit(mut self, stall_limit: u32) -> Self {
        self.stall_limit = stall_limit;
        self
    }

    pub fn with_count_source(mut self, source: CountSource) -> Self {
        self.count_source = source;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(Error::invalid_parameter("limit must be positive"));
        }
        if !self.gaps.is_finite() || self.gaps <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "gaps must be a positive number, got {}",
                self.gaps
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::invalid_parameter("max_iterations must be positive"));
        }
        if self.max_batch_size == 0 {
            return Err(Error::invalid_parameter("max_batch_size must be positive"));
        }
        if self.stall_limit == 0 {
            return Err(Error::invalid_parameter("stall_limit must be positive"));
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return Err(Error::invalid_parameter(
                "retry multiplier must be at least 1.0",
            ));
        }
        Ok(())
    }
}

/// Shared flag a caller sets to abandon a sample at the next iteration boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
