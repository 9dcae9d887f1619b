//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to legacy variable names with warning logs, plus the harvester settings
//! assembled from them.

use crate::error::HarvestError;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default probe target ("what is my IP" style endpoint)
pub const DEFAULT_PROBE_URL: &str = "https://httpbin.org/ip";

/// Default User-Agent sent to feeds and through proxies
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; proxyharvest/0.1)";

/// Get an environment variable with fallback to a legacy name
///
/// If the new variable name is set, returns its value.
/// If only the old (legacy) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use proxyharvest::config::get_env_with_fallback;
///
/// let concurrency = get_env_with_fallback("PROXYHARVEST_CONCURRENCY", "CONCURRENCY");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Returns `default` if neither variable is set or parsing fails.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    match get_env_with_fallback(new_name, old_name) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(
                    "Environment variable '{}' has an invalid value '{}', using default",
                    new_name,
                    raw
                );
                default
            }
        },
        None => default,
    }
}

/// Harvester settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Global ceiling on simultaneously outstanding probes.
    pub concurrency: usize,
    /// Hard timeout of one probe attempt.
    pub probe_timeout: Duration,
    /// Sleep between discovery passes.
    pub discovery_interval: Duration,
    /// Sleep between prune passes.
    pub prune_interval: Duration,
    /// Latency ceiling for admission by discovery.
    pub admission_latency: Duration,
    /// Latency ceiling for retention by pruning.
    pub prune_latency: Duration,
    /// URL requested through each candidate proxy.
    pub probe_url: String,
    /// Timeout of one feed request.
    pub source_timeout: Duration,
    /// User-Agent header for feeds and probes.
    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            concurrency: 200,
            probe_timeout: Duration::from_secs(8),
            discovery_interval: Duration::from_secs(600),
            prune_interval: Duration::from_secs(7200),
            admission_latency: Duration::from_millis(500),
            prune_latency: Duration::from_millis(500),
            probe_url: DEFAULT_PROBE_URL.to_string(),
            source_timeout: Duration::from_secs(12),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HarvestConfig {
    /// Load configuration from environment variables.
    ///
    /// `PROXYHARVEST_MAX_LATENCY_MS` sets both latency ceilings; the
    /// admission/prune specific variables override it individually.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let concurrency = get_env_with_fallback_parse(
            "PROXYHARVEST_CONCURRENCY",
            "CONCURRENCY",
            defaults.concurrency,
        );
        let probe_timeout_secs = get_env_with_fallback_parse(
            "PROXYHARVEST_PROBE_TIMEOUT_SECS",
            "PROBE_TIMEOUT",
            defaults.probe_timeout.as_secs(),
        );
        let discovery_interval_secs = get_env_with_fallback_parse(
            "PROXYHARVEST_DISCOVERY_INTERVAL_SECS",
            "REFRESH_INTERVAL",
            defaults.discovery_interval.as_secs(),
        );
        let prune_interval_secs = get_env_with_fallback_parse(
            "PROXYHARVEST_PRUNE_INTERVAL_SECS",
            "PRUNE_INTERVAL",
            defaults.prune_interval.as_secs(),
        );
        let max_latency_ms = get_env_with_fallback_parse(
            "PROXYHARVEST_MAX_LATENCY_MS",
            "MAX_LATENCY_MS",
            defaults.admission_latency.as_millis() as u64,
        );
        let admission_latency_ms = get_env_with_fallback_parse(
            "PROXYHARVEST_ADMISSION_LATENCY_MS",
            "ADMISSION_LATENCY_MS",
            max_latency_ms,
        );
        let prune_latency_ms = get_env_with_fallback_parse(
            "PROXYHARVEST_PRUNE_LATENCY_MS",
            "PRUNE_LATENCY_MS",
            max_latency_ms,
        );
        let probe_url =
            get_env_with_fallback_or("PROXYHARVEST_PROBE_URL", "PROBE_URL", DEFAULT_PROBE_URL);
        let source_timeout_secs = get_env_with_fallback_parse(
            "PROXYHARVEST_SOURCE_TIMEOUT_SECS",
            "SOURCE_TIMEOUT",
            defaults.source_timeout.as_secs(),
        );
        let user_agent =
            get_env_with_fallback_or("PROXYHARVEST_USER_AGENT", "USER_AGENT", DEFAULT_USER_AGENT);

        Self {
            concurrency,
            probe_timeout: Duration::from_secs(probe_timeout_secs),
            discovery_interval: Duration::from_secs(discovery_interval_secs),
            prune_interval: Duration::from_secs(prune_interval_secs),
            admission_latency: Duration::from_millis(admission_latency_ms),
            prune_latency: Duration::from_millis(prune_latency_ms),
            probe_url,
            source_timeout: Duration::from_secs(source_timeout_secs),
            user_agent,
        }
    }

    /// Reject settings that would make a cycle spin or never probe.
    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.concurrency == 0 {
            return Err(HarvestError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(HarvestError::Config(format!(
                "concurrency must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.concurrency
            )));
        }
        let durations = [
            ("probe timeout", self.probe_timeout),
            ("discovery interval", self.discovery_interval),
            ("prune interval", self.prune_interval),
            ("source timeout", self.source_timeout),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(HarvestError::Config(format!("{} must be non-zero", name)));
            }
        }
        if !(self.probe_url.starts_with("http://") || self.probe_url.starts_with("https://")) {
            return Err(HarvestError::Config(format!(
                "probe URL must be http(s), got '{}'",
                self.probe_url
            )));
        }
        Ok(())
    }
}

/// Telegram notifier credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    /// Bot token
    pub token: String,
    /// Destination chat id
    pub chat_id: i64,
}

impl TelegramConfig {
    /// Load Telegram credentials from environment variables.
    ///
    /// Returns `Ok(None)` when no token is configured. A token without a
    /// usable chat id is a credential error.
    pub fn from_env() -> Result<Option<Self>, HarvestError> {
        let Some(token) = get_env_with_fallback("PROXYHARVEST_TELEGRAM_TOKEN", "TELEGRAM_TOKEN")
            .filter(|t| !t.trim().is_empty())
        else {
            return Ok(None);
        };
        let raw_chat_id = get_env_with_fallback("PROXYHARVEST_TELEGRAM_CHAT_ID", "TELEGRAM_CHAT_ID")
            .ok_or_else(|| {
                HarvestError::Credential(
                    "PROXYHARVEST_TELEGRAM_TOKEN is set but PROXYHARVEST_TELEGRAM_CHAT_ID is missing"
                        .to_string(),
                )
            })?;
        let chat_id = raw_chat_id.trim().parse::<i64>().map_err(|_| {
            HarvestError::Credential(format!(
                "PROXYHARVEST_TELEGRAM_CHAT_ID must be an integer, got '{}'",
                raw_chat_id
            ))
        })?;
        Ok(Some(Self {
            token: token.trim().to_string(),
            chat_id,
        }))
    }
}
