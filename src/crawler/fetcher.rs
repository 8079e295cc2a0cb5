//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - Transport retries for failed connections and truncated reads
//! - Redirect limits
//! - Backoff retries around a whole "fetch and parse" step

use super::retry::RetryPolicy;
use super::FetchError;
use crate::adapters::ParseError;
use crate::config::HttpConfig;
use backon::Retryable;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration (user agent and timeouts)
/// * `redirect_limit` - Maximum number of redirects followed per request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig, redirect_limit: u32) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(redirect_limit as usize))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches marketplace pages under a `RetryPolicy`
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher with its own HTTP client
    pub fn new(config: &HttpConfig, policy: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config, policy.redirect_retries)?;
        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches the body of a page
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.fetch_with(url, |body| Ok(body.to_owned())).await
    }

    /// Fetches a page and parses it
    ///
    /// Transient failures (see `FetchError::is_retryable`) trigger another
    /// attempt after a backoff delay, until the step succeeds or the policy's
    /// outer retry budget runs out. Permanent statuses and parse failures are
    /// returned at once.
    ///
    /// # Arguments
    ///
    /// * `url` - The page to fetch
    /// * `parse` - Extracts the value of interest from the page body
    pub async fn fetch_with<T, F>(&self, url: &Url, parse: F) -> Result<T, FetchError>
    where
        F: Fn(&str) -> Result<T, ParseError>,
    {
        let parse = &parse;
        let attempt = move || async move {
            let body = self.get(url).await?;
            parse(&body).map_err(|source| FetchError::Parse {
                url: url.to_string(),
                source,
            })
        };

        attempt
            .retry(self.policy.backoff())
            .sleep(sleep)
            .when(FetchError::is_retryable)
            .notify(|err: &FetchError, delay: Duration| {
                tracing::warn!("Retrying {} in {}ms: {}", url, delay.as_millis(), err);
            })
            .await
    }

    /// Single GET with transport-level retries
    ///
    /// Connection failures spend the connect budget, timeouts and failed body
    /// reads spend the read budget. Redirects are capped by the client.
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        let mut connect_left = self.policy.connect_retries;
        let mut read_left = self.policy.read_retries;

        loop {
            let response = match self.client.get(url.clone()).send().await {
                Ok(response) => response,
                Err(e) if e.is_connect() && connect_left > 0 => {
                    connect_left -= 1;
                    tracing::debug!("Connection to {} failed, retrying: {}", url, e);
                    continue;
                }
                Err(e) if e.is_timeout() && read_left > 0 => {
                    read_left -= 1;
                    tracing::debug!("Request to {} timed out, retrying", url);
                    continue;
                }
                Err(e) => return Err(FetchError::network(url, &e)),
            };

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            match response.text().await {
                Ok(body) => return Ok(body),
                Err(e) if read_left > 0 => {
                    read_left -= 1;
                    tracing::debug!("Reading {} failed, retrying: {}", url, e);
                }
                Err(e) => return Err(FetchError::network(url, &e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&HttpConfig::default(), 15);
        assert!(client.is_ok());
    }

    #[test]
    fn test_fetcher_keeps_policy() {
        let fetcher = Fetcher::new(&HttpConfig::default(), RetryPolicy::immediate(2)).unwrap();
        assert_eq!(fetcher.policy().max_retries, Some(2));
    }

    #[tokio::test]
    async fn test_unreachable_host_gives_network_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let fetcher = Fetcher::new(&HttpConfig::default(), RetryPolicy::immediate(0)).unwrap();
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
