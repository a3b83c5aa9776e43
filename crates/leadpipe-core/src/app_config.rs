use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Tuning for the batched scoring stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringSettings {
    pub batch_size: usize,
    pub threshold: i32,
    pub default_score: i32,
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            batch_size: 20,
            threshold: 40,
            default_score: 50,
            concurrency: 1,
            timeout_secs: 60,
        }
    }
}

impl ScoringSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub apify_api_token: Option<String>,
    pub search_api_url: Option<String>,
    pub search_api_key: Option<String>,
    pub allow_synthetic_leads: bool,
    pub acquisition_timeout_secs: u64,
    pub source_user_agent: String,
    pub source_max_retries: u32,
    pub source_retry_backoff_base_secs: u64,
    pub scoring_api_url: Option<String>,
    pub scoring_api_key: Option<String>,
    pub scoring_model: String,
    pub scoring: ScoringSettings,
}

impl AppConfig {
    #[must_use]
    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_secs(self.acquisition_timeout_secs)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "apify_api_token",
                &self.apify_api_token.as_ref().map(|_| "[redacted]"),
            )
            .field("search_api_url", &self.search_api_url)
            .field(
                "search_api_key",
                &self.search_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("allow_synthetic_leads", &self.allow_synthetic_leads)
            .field("acquisition_timeout_secs", &self.acquisition_timeout_secs)
            .field("source_user_agent", &self.source_user_agent)
            .field("source_max_retries", &self.source_max_retries)
            .field(
                "source_retry_backoff_base_secs",
                &self.source_retry_backoff_base_secs,
            )
            .field("scoring_api_url", &self.scoring_api_url)
            .field(
                "scoring_api_key",
                &self.scoring_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("scoring_model", &self.scoring_model)
            .field("scoring", &self.scoring)
            .finish()
    }
}
