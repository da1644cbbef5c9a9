use std::env;
use std::num::NonZeroUsize;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Apify API token. Missing is not fatal at startup; extraction requests
    /// answer 500 until it is provided.
    pub apify_api_key: Option<String>,

    /// Root of the Apify REST API
    /// Default: https://api.apify.com/v2
    pub apify_base_url: String,

    /// Actor that performs the job search
    pub actor_id: String,

    /// Actor input defaults applied to every point
    pub search: SearchDefaults,

    /// Maximum records kept per point. `None` means unlimited.
    /// Default: 100
    pub dataset_page_limit: Option<usize>,

    /// Number of points processed together in one batch of a request
    /// Default: 1 (strictly sequential)
    pub fan_out_concurrency: NonZeroUsize,

    /// Process-wide cap on actor operations in flight across all requests
    /// Default: 10
    pub max_concurrent_calls: NonZeroUsize,

    /// Timeout for each HTTP request made to the actor API, in seconds
    pub actor_timeout_secs: u64,

    pub host: String,
    pub port: u16,

    /// Maximum payload size for all requests (in bytes)
    /// Default: 10MB (10 * 1024 * 1024)
    pub max_payload_size: usize,

    /// Directory for rotated log files
    pub log_dir: String,

    /// Restrict CORS to a single origin. Any origin is allowed when unset.
    pub cors_allowed_origin: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchDefaults {
    pub country: String,
    pub location: String,
    pub max_items: u32,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            country: "IN".to_string(),
            location: "chennai".to_string(),
            max_items: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Optional environment variables:
    /// - APIFY_API_KEY (or legacy `apifykey`): actor API token
    /// - APIFY_BASE_URL, APIFY_ACTOR_ID
    /// - SEARCH_COUNTRY, SEARCH_LOCATION, SEARCH_MAX_ITEMS
    /// - DATASET_PAGE_LIMIT: records per point, 0 = unlimited (default: 100)
    /// - FAN_OUT_CONCURRENCY: batch size per request (default: 1)
    /// - MAX_CONCURRENT_CALLS: in-flight actor operations (default: 10)
    /// - ACTOR_TIMEOUT_SECS (default: 300)
    /// - HOST, PORT (default: 127.0.0.1:5000)
    /// - MAX_PAYLOAD_SIZE: Maximum request payload size in bytes (default: 10485760 = 10MB)
    /// - LOG_DIR (default: logs)
    /// - CORS_ALLOWED_ORIGIN
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parsed = |key: &str| non_empty(key).and_then(|s| s.trim().parse::<u64>().ok());

        let apify_api_key = non_empty("APIFY_API_KEY").or_else(|| non_empty("apifykey"));

        let apify_base_url = non_empty("APIFY_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "https://api.apify.com/v2".to_string());

        let actor_id = non_empty("APIFY_ACTOR_ID").unwrap_or_else(|| "hMvNSpz3JnHgl5jkh".to_string());

        let defaults = SearchDefaults::default();
        let search = SearchDefaults {
            country: non_empty("SEARCH_COUNTRY").unwrap_or(defaults.country),
            location: non_empty("SEARCH_LOCATION").unwrap_or(defaults.location),
            max_items: parsed("SEARCH_MAX_ITEMS")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.max_items),
        };

        let dataset_page_limit = match parsed("DATASET_PAGE_LIMIT") {
            Some(0) => None,
            Some(n) => Some(n as usize),
            None => Some(100),
        };

        let fan_out_concurrency = positive(parsed("FAN_OUT_CONCURRENCY"), 1)
            .ok_or_else(|| "FAN_OUT_CONCURRENCY must be at least 1".to_string())?;

        let max_concurrent_calls = positive(parsed("MAX_CONCURRENT_CALLS"), 10)
            .ok_or_else(|| "MAX_CONCURRENT_CALLS must be at least 1".to_string())?;

        let actor_timeout_secs = parsed("ACTOR_TIMEOUT_SECS").unwrap_or(300);

        let host = non_empty("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parsed("PORT")
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(5000);

        // Parse MAX_PAYLOAD_SIZE with default fallback
        let max_payload_size = parsed("MAX_PAYLOAD_SIZE")
            .map(|n| n as usize)
            .unwrap_or(10 * 1024 * 1024); // Default: 10MB

        let log_dir = non_empty("LOG_DIR").unwrap_or_else(|| "logs".to_string());
        let cors_allowed_origin = non_empty("CORS_ALLOWED_ORIGIN");

        Ok(Config {
            apify_api_key,
            apify_base_url,
            actor_id,
            search,
            dataset_page_limit,
            fan_out_concurrency,
            max_concurrent_calls,
            actor_timeout_secs,
            host,
            port,
            max_payload_size,
            log_dir,
            cors_allowed_origin,
        })
    }
}

/// Unset falls back to `default`; an explicit zero is rejected.
fn positive(value: Option<u64>, default: usize) -> Option<NonZeroUsize> {
    match value {
        Some(n) => NonZeroUsize::new(n as usize),
        None => NonZeroUsize::new(default),
    }
}
