use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::QuerySettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Workers kept alive when idle; also the size of a freshly reset pool.
    pub baseline_size: usize,
    /// Period of the tick that starts one backlog query on a free worker.
    pub prefetch_interval: Duration,
    /// Quiet time before a `delay_request` is promoted to a real request.
    pub delay_debounce: Duration,
    /// A fetch still running after this long is force-stopped.
    pub worker_timeout: Duration,
    /// Hard cap on live workers. `None` lets the pool grow while busy.
    pub max_workers: Option<usize>,
    pub query: QuerySettings,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            baseline_size: 5,
            prefetch_interval: Duration::from_millis(5_000),
            delay_debounce: Duration::from_millis(2_000),
            worker_timeout: Duration::from_millis(20_000),
            max_workers: None,
            query: QuerySettings::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("baseline pool size must be at least 1")]
    ZeroBaseline,
    #[error("worker cap {cap} must be at least {minimum} (baseline {baseline})")]
    CapTooSmall {
        cap: usize,
        baseline: usize,
        minimum: usize,
    },
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
    #[error("invalid {name} '{value}': {message}")]
    InvalidBaseUrl {
        name: &'static str,
        value: String,
        message: String,
    },
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baseline_size == 0 {
            return Err(ConfigError::ZeroBaseline);
        }
        if let Some(cap) = self.max_workers {
            // The active worker is never evicted, so a cap needs room for one more.
            let minimum = self.baseline_size.max(2);
            if cap < minimum {
                return Err(ConfigError::CapTooSmall {
                    cap,
                    baseline: self.baseline_size,
                    minimum,
                });
            }
        }
        for (name, value) in [
            ("prefetch interval", self.prefetch_interval),
            ("delay debounce", self.delay_debounce),
            ("worker timeout", self.worker_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration { name });
            }
        }
        for (name, value) in [
            ("dictionary base url", &self.query.dictionary_base),
            ("search base url", &self.query.search_base),
            ("translate base url", &self.query.translate_base),
        ] {
            check_base_url(name, value)?;
        }
        Ok(())
    }
}

fn check_base_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::InvalidBaseUrl {
        name,
        value: value.to_string(),
        message,
    };
    let url = Url::parse(value).map_err(|err| invalid(err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("cannot be a base".to_string()));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(())
}
