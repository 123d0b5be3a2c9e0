use std::path::Path;
use std::time::Duration;

use rowdraw_common::error::{Error, Result};
use serde::Deserialize;

use crate::options::{
    CountSource, DEFAULT_ENUMERATION_LIMIT, DEFAULT_GAPS, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_MAX_ITERATIONS, DEFAULT_STALL_LIMIT, SampleOptions,
};
use crate::retry::RetryPolicy;

/// File form of the sampler defaults:
///
/// ```toml
/// [sampler]
/// gaps = 1.1
/// max_iterations = 32
/// time_budget_ms = 2000
/// count_source = "exact"
///
/// [retry]
/// max_attempts = 5
/// initial_backoff_ms = 20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    pub sampler: SamplerSection,
    pub retry: RetrySection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerSection {
    pub gaps: f64,
    pub max_iterations: u32,
    pub time_budget_ms: Option<u64>,
    pub max_batch_size: usize,
    pub enumeration_limit: u64,
    pub stall_limit: u32,
    pub count_source: CountSourceSetting,
    pub seed: Option<u64>,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            gaps: DEFAULT_GAPS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            time_budget_ms: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            enumeration_limit: DEFAULT_ENUMERATION_LIMIT,
            stall_limit: DEFAULT_STALL_LIMIT,
            count_source: CountSourceSetting::Statistics,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSourceSetting {
    #[default]
    Statistics,
    Exact,
}

impl From<CountSourceSetting> for CountSource {
    fn from(setting: CountSourceSetting) -> Self {
        match setting {
            CountSourceSetting::Statistics => CountSource::Statistics,
            CountSourceSetting::Exact => CountSource::Exact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            multiplier: policy.multiplier,
        }
    }
}

impl From<&RetrySection> for RetryPolicy {
    fn from(section: &RetrySection) -> Self {
        RetryPolicy::default()
            .with_max_attempts(section.max_attempts)
            .with_initial_backoff(Duration::from_millis(section.initial_backoff_ms))
            .with_max_backoff(Duration::from_millis(section.max_backoff_ms))
            .with_multiplier(section.multiplier)
    }
}

impl SamplerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| Error::invalid_parameter(format!("invalid sampler config: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_parameter(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Options for a sample of `limit` rows seeded with these defaults.
    pub fn options(&self, limit: usize) -> SampleOptions {
        let s = &self.sampler;
        let mut options = SampleOptions::new(limit)
            .with_gaps(s.gaps)
            .with_max_iterations(s.max_iterations)
            .with_max_batch_size(s.max_batch_size)
            .with_enumeration_limit(s.enumeration_limit)
            .with_stall_limit(s.stall_limit)
            .with_count_source(s.count_source.into())
            .with_retry(RetryPolicy::from(&self.retry));
        if let Some(ms) = s.time_budget_ms {
            options = options.with_time_budget(Duration::from_millis(ms));
        }
        if let Some(seed) = s.seed {
            options = options.with_seed(seed);
        }
        options
    }
}
