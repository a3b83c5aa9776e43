use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const MAX_RESULTS_CEILING: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Apify,
    WebSearch,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Apify => write!(f, "apify"),
            ProviderKind::WebSearch => write!(f, "web_search"),
        }
    }
}

/// How one platform name is fulfilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub name: String,
    pub provider: ProviderKind,
    /// Apify actor id (`user~actor`); required when `provider` is `apify`.
    pub actor: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

fn default_max_results() -> u32 {
    50
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCatalog {
    pub platforms: Vec<PlatformConfig>,
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self {
            platforms: vec![
                PlatformConfig {
                    name: "google_maps".to_string(),
                    provider: ProviderKind::Apify,
                    actor: Some("compass~crawler-google-places".to_string()),
                    max_results: default_max_results(),
                },
                PlatformConfig {
                    name: "linkedin".to_string(),
                    provider: ProviderKind::Apify,
                    actor: Some("harvestapi~linkedin-profile-search".to_string()),
                    max_results: default_max_results(),
                },
                PlatformConfig {
                    name: "google_search".to_string(),
                    provider: ProviderKind::WebSearch,
                    actor: None,
                    max_results: default_max_results(),
                },
            ],
        }
    }
}

impl SourceCatalog {
    #[must_use]
    pub fn platform(&self, name: &str) -> Option<&PlatformConfig> {
        self.platforms.iter().find(|p| p.name == name)
    }
}

/// Load and validate the source catalog from a YAML file.
///
/// A missing file yields [`SourceCatalog::default`].
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// fails validation.
pub fn load_source_catalog(path: &Path) -> Result<SourceCatalog, ConfigError> {
    if !path.exists() {
        return Ok(SourceCatalog::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourceCatalogIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: SourceCatalog = serde_yaml::from_str(&content)?;

    validate_catalog(&catalog)?;

    Ok(catalog)
}

fn validate_catalog(catalog: &SourceCatalog) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for platform in &catalog.platforms {
        let name = platform.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "platform name must be non-empty".to_string(),
            ));
        }

        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate platform: '{name}'"
            )));
        }

        if platform.provider == ProviderKind::Apify
            && platform.actor.as_deref().is_none_or(|a| a.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "platform '{name}' uses apify but has no actor"
            )));
        }

        if platform.max_results == 0 || platform.max_results > MAX_RESULTS_CEILING {
            return Err(ConfigError::Validation(format!(
                "platform '{name}' has invalid max_results {}; must be 1..={MAX_RESULTS_CEILING}",
                platform.max_results
            )));
        }
    }

    Ok(())
}
