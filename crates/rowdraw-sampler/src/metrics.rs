use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::outcome::{SampleStats, SampleStatus};

/// Process-lifetime counters across samples. Share behind an `Arc`.
pub struct SampleMetrics {
    pub sample_count: AtomicU64,
    pub error_count: AtomicU64,
    pub exhausted_count: AtomicU64,
    pub budget_exhausted_count: AtomicU64,
    pub batch_count: AtomicU64,
    pub candidate_count: AtomicU64,
    pub miss_count: AtomicU64,
    pub duplicate_count: AtomicU64,
    pub retry_count: AtomicU64,
    pub total_sample_time_us: AtomicU64,
    pub slow_sample_count: AtomicU64,
    slow_sample_threshold_ms: u64,
}

impl SampleMetrics {
    pub fn new() -> Self {
        Self {
            sample_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            exhausted_count: AtomicU64::new(0),
            budget_exhausted_count: AtomicU64::new(0),
            batch_count: AtomicU64::new(0),
            candidate_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            duplicate_count: AtomicU64::new(0),
            retry_count: AtomicU64::new(0),
            total_sample_time_us: AtomicU64::new(0),
            slow_sample_count: AtomicU64::new(0),
            slow_sample_threshold_ms: 1000,
        }
    }

    pub fn with_slow_sample_threshold(mut self, threshold_ms: u64) -> Self {
        self.slow_sample_threshold_ms = threshold_ms;
        self
    }

    pub fn slow_sample_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_sample_threshold_ms)
    }

    pub fn record_sample(&self, status: SampleStatus, stats: &SampleStats) {
        self.sample_count.fetch_add(1, Ordering::Relaxed);
        match status {
            SampleStatus::Complete => {}
            SampleStatus::DomainExhausted => {
                self.exhausted_count.fetch_add(1, Ordering::Relaxed);
            }
            SampleStatus::BudgetExhausted => {
                self.budget_exhausted_count.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.batch_count
            .fetch_add(stats.iterations as u64, Ordering::Relaxed);
        self.candidate_count
            .fetch_add(stats.candidates, Ordering::Relaxed);
        self.miss_count.fetch_add(stats.misses, Ordering::Relaxed);
        self.duplicate_count
            .fetch_add(stats.duplicates, Ordering::Relaxed);
        self.retry_count.fetch_add(stats.retries, Ordering::Relaxed);
        self.record_time(stats.elapsed);
    }

    pub fn record_error(&self, duration: Duration) {
        self.sample_count.fetch_add(1, Ordering::Relaxed);
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.record_time(duration);
    }

    fn record_time(&self, duration: Duration) {
        self.total_sample_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        if duration.as_millis() as u64 >= self.slow_sample_threshold_ms {
            self.slow_sample_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get_sample_count(&self) -> u64 {
        self.sample_count.load(Ordering::Relaxed)
    }

    pub fn get_error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn get_exhausted_count(&self) -> u64 {
        self.exhausted_count.load(Ordering::Relaxed)
    }

    pub fn get_budget_exhausted_count(&self) -> u64 {
        self.budget_exhausted_count.load(Ordering::Relaxed)
    }

    pub fn get_batch_count(&self) -> u64 {
        self.batch_count.load(Ordering::Relaxed)
    }

    pub fn get_candidate_count(&self) -> u64 {
        self.candidate_count.load(Ordering::Relaxed)
    }

    pub fn get_miss_count(&self) -> u64 {
        self.miss_count.load(Ordering::Relaxed)
    }

    pub fn get_duplicate_count(&self) -> u64 {
        self.duplicate_count.load(Ordering::Relaxed)
    }

    pub fn get_retry_count(&self) -> u64 {
        self.retry_count.load(Ordering::Relaxed)
    }

    pub fn get_slow_sample_count(&self) -> u64 {
        self.slow_sample_count.load(Ordering::Relaxed)
    }

    pub fn get_average_sample_time_us(&self) -> u64 {
        let count = self.get_sample_count();
        if count == 0 {
            return 0;
        }
        self.total_sample_time_us.load(Ordering::Relaxed) / count
    }

    pub fn reset(&self) {
        for counter in [
            &self.sample_count,
            &self.error_count,
            &self.exhausted_count,
            &self.budget_exhausted_count,
            &self.batch_count,
            &self.candidate_count,
            &self.miss_count,
            &self.duplicate_count,
            &self.retry_count,
            &self.total_sample_time_us,
            &self.slow_sample_count,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for SampleMetrics {
    fn default() -> Self {
        Self::new()
    }
}
