use serde::Deserialize;
use std::time::Duration;

/// Crawler-style identity sent with every navigation
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

/// `Accept-Language` used when loading the `en` variant of a page
pub const DEFAULT_DEFAULT_LANGUAGE: &str = "en-US,en;q=0.9";

/// `Accept-Language` used when loading the `ar` variant of a page
pub const DEFAULT_ALTERNATE_LANGUAGE: &str = "ar,en;q=0.5";

/// Main configuration structure for SEO Sweep
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which engine produces sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Shared HTTP client; settles once the body is received
    #[default]
    Http,
    /// Headless Chrome; requires the `chrome` cargo feature
    Chrome,
}

/// Fetch pipeline behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Engine used to load pages
    pub engine: EngineKind,

    /// Number of pages fetched at once (the window size)
    pub concurrency: usize,

    /// Per-navigation settle timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries after the first failed attempt of a location
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Fixed pause between attempts of the same location (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Pause after load-settle so client-side content can populate (milliseconds)
    #[serde(rename = "settle-grace-ms")]
    pub settle_grace_ms: u64,

    /// Quiet window with no new network activity that counts as settled (milliseconds)
    #[serde(rename = "settle-quiet-ms")]
    pub settle_quiet_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Http,
            concurrency: 3,
            timeout_ms: 30_000,
            max_retries: 2,
            retry_delay_ms: 2_000,
            settle_grace_ms: 1_500,
            settle_quiet_ms: 500,
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn settle_grace(&self) -> Duration {
        Duration::from_millis(self.settle_grace_ms)
    }

    pub fn settle_quiet(&self) -> Duration {
        Duration::from_millis(self.settle_quiet_ms)
    }

    /// Total number of tries a location gets before it is reported as failed
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Outbound identity configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// User agent sent with every navigation
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// `Accept-Language` for the default (`en`) locale
    #[serde(rename = "default-language")]
    pub default_language: String,

    /// `Accept-Language` for the alternate (`ar`) locale
    #[serde(rename = "alternate-language")]
    pub alternate_language: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_language: DEFAULT_DEFAULT_LANGUAGE.to_string(),
            alternate_language: DEFAULT_ALTERNATE_LANGUAGE.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the JSON results file
    #[serde(rename = "results-path")]
    pub results_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: "./seo_results.json".to_string(),
        }
    }
}
