//! Retry policy for the fetch layer
//!
//! Retrying happens in two tiers. The transport tier re-sends a request
//! immediately when the connection or the body read fails, and caps redirects.
//! The application tier re-runs a whole "fetch and parse" step with
//! exponential backoff, absorbing rate limiting and server errors. Failures
//! that would repeat on every attempt are never retried.

use crate::config::RetryConfig;
use backon::ExponentialBuilder;
use std::time::Duration;

/// Retry budgets and backoff shape used by a `Fetcher`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub connect_retries: u32,
    pub read_retries: u32,
    pub redirect_retries: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Outer retries; `None` retries until the step succeeds
    pub max_retries: Option<usize>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            connect_retries: config.connect_retries,
            read_retries: config.read_retries,
            redirect_retries: config.redirect_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_cap: Duration::from_millis(config.backoff_cap_ms),
            max_retries: config.max_retries,
        }
    }

    /// Zero-delay policy with a bounded outer retry count
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            connect_retries: 0,
            read_retries: 0,
            redirect_retries: 10,
            backoff_base: Duration::ZERO,
            backoff_cap: Duration::ZERO,
            max_retries: Some(max_retries),
        }
    }

    /// Backoff for the application tier: base, doubling, capped
    pub fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.backoff_base)
            .with_max_delay(self.backoff_cap)
            .with_factor(2.0);

        match self.max_retries {
            Some(times) => builder.with_max_times(times),
            None => builder.without_max_times(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
