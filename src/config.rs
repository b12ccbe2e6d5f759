use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "rxguard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Age assumed when the patient age field is missing or unparseable.
pub const DEFAULT_AGE: u32 = 65;

/// Doses per day assumed when a row's dose field is missing or invalid.
pub const DEFAULT_DOSES_PER_DAY: u32 = 1;

/// Environment variable overriding the rules service base URL.
pub const BASE_URL_ENV: &str = "RXGUARD_BASE_URL";

/// Environment variable overriding the HTTP request timeout (seconds).
pub const TIMEOUT_ENV: &str = "RXGUARD_TIMEOUT_SECS";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "rxguard=info"
}

// ═══════════════════════════════════════════════════════════
// Timing
// ═══════════════════════════════════════════════════════════

/// Debounce windows and display limits for the live pipelines.
/// The check window must stay longer than the suggestion window.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Quiet period before a safety check fires.
    pub check_debounce: Duration,
    /// Quiet period before a suggestion fetch fires.
    pub suggest_debounce: Duration,
    /// How long the "no concerns" acknowledgement stays visible.
    pub safe_notice: Duration,
    /// Minimum trimmed query length (characters) for suggestions.
    pub min_query_chars: usize,
    /// Maximum candidates shown in a suggestion panel.
    pub max_suggestions: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            check_debounce: Duration::from_millis(800),
            suggest_debounce: Duration::from_millis(300),
            safe_notice: Duration::from_secs(2),
            min_query_chars: 2,
            max_suggestions: 10,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Client
// ═══════════════════════════════════════════════════════════

/// Where the rules service lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub check_path: String,
    pub suggest_path: String,
    pub request_timeout: Duration,
    pub timing: TimingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            check_path: "/api/check-medication".to_string(),
            suggest_path: "/api/drug-suggest".to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            timing: TimingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults, overridden by `RXGUARD_BASE_URL` / `RXGUARD_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup(BASE_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                config.base_url = url.to_string();
            }
        }

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "Ignoring invalid {TIMEOUT_ENV}"),
            }
        }

        config
    }

    /// Base URL with any trailing slash removed.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn check_url(&self) -> String {
        format!("{}{}", self.base(), self.check_path)
    }

    pub fn suggest_url(&self) -> String {
        format!("{}{}", self.base(), self.suggest_path)
    }
}
