pub mod app_config;
pub mod campaign;
pub mod config;
pub mod lead;
pub mod sources;

pub use app_config::{AppConfig, Environment, ScoringSettings};
pub use campaign::{CampaignStatus, LogEntry, ScraperParameters};
pub use config::{load_app_config, load_app_config_from_env};
pub use lead::{LeadCandidate, OutreachStatus};
pub use sources::{load_source_catalog, PlatformConfig, ProviderKind, SourceCatalog};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read source catalog at {path}: {source}")]
    SourceCatalogIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse source catalog: {0}")]
    SourceCatalogParse(#[from] serde_yaml::Error),

    #[error("source catalog validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown campaign status: {0}")]
    UnknownCampaignStatus(String),

    #[error("unknown outreach status: {0}")]
    UnknownOutreachStatus(String),
}
