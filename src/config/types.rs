use crate::model::{EstateType, OfferType};
use serde::Deserialize;

/// Main configuration structure for Offer Tracker
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub marketplaces: MarketplacesConfig,
}

/// What to track and how often
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Ordered list of city slugs as used in marketplace URLs
    pub cities: Vec<String>,

    /// Offer types to sweep for every city
    #[serde(default = "default_offers")]
    pub offers: Vec<OfferType>,

    /// Estate types to sweep for every city
    #[serde(default = "default_estates")]
    pub estates: Vec<EstateType>,

    /// Seconds between the start of two sweeps
    #[serde(rename = "interval-secs", default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Maximum number of targets crawled at the same time
    #[serde(
        rename = "max-concurrent-targets",
        default = "default_max_concurrent_targets"
    )]
    pub max_concurrent_targets: u32,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout of a single request attempt
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Two-tier retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Transport retries for failed connections
    #[serde(rename = "connect-retries", default = "default_transport_retries")]
    pub connect_retries: u32,

    /// Transport retries for timed out or truncated reads
    #[serde(rename = "read-retries", default = "default_transport_retries")]
    pub read_retries: u32,

    /// Maximum number of redirects followed per request
    #[serde(rename = "redirect-retries", default = "default_transport_retries")]
    pub redirect_retries: u32,

    /// First backoff delay of the outer retry (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound of the outer retry delay (milliseconds)
    #[serde(rename = "backoff-cap-ms", default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Outer retries before giving up; unbounded when absent
    #[serde(rename = "max-retries", default)]
    pub max_retries: Option<usize>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            connect_retries: default_transport_retries(),
            read_retries: default_transport_retries(),
            redirect_retries: default_transport_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            max_retries: None,
        }
    }
}

/// Paginated crawl configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Pages past the first one that a single crawl may fetch
    #[serde(rename = "page-limit", default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Per-marketplace switches and overrides
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketplacesConfig {
    #[serde(default)]
    pub otodom: MarketplaceConfig,
    #[serde(default)]
    pub olx: OlxConfig,
}

/// Settings shared by every marketplace
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Overrides the marketplace origin (scheme and host)
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
        }
    }
}

/// OLX settings; its markup uses generated class names that change over time
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OlxConfig {
    #[serde(flatten)]
    pub common: MarketplaceConfig,

    /// CSS selector of the element holding the total offer count
    #[serde(rename = "count-selector", default)]
    pub count_selector: Option<String>,

    /// CSS selector of listing anchors
    #[serde(rename = "listing-selector", default)]
    pub listing_selector: Option<String>,
}

fn default_offers() -> Vec<OfferType> {
    OfferType::ALL.to_vec()
}

fn default_estates() -> Vec<EstateType> {
    EstateType::ALL.to_vec()
}

fn default_interval_secs() -> u64 {
    60 * 60
}

fn default_max_concurrent_targets() -> u32 {
    2
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_transport_retries() -> u32 {
    15
}

fn default_backoff_base_ms() -> u64 {
    2_000
}

fn default_backoff_cap_ms() -> u64 {
    5_000
}

fn default_page_limit() -> u32 {
    150
}

fn default_enabled() -> bool {
    true
}
