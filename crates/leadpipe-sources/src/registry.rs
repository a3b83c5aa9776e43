//! Platform-name → lead source dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use leadpipe_core::{AppConfig, ProviderKind, SourceCatalog};

use crate::apify::{ApifySource, APIFY_BASE_URL};
use crate::client::{build_http_client, RetryPolicy};
use crate::error::SourceError;
use crate::synthetic::SyntheticSource;
use crate::types::RawLead;
use crate::web_search::WebSearchSource;

/// A pluggable acquisition capability for one platform.
#[async_trait]
pub trait LeadSource: Send + Sync {
    /// Provenance tag stamped on every record this source returns.
    fn tag(&self) -> &str;

    /// Runs one search and returns the raw records it produced.
    async fn fetch(&self, search_expression: &str) -> Result<Vec<RawLead>, SourceError>;
}

/// Lookup table from platform identifier to the source serving it.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn LeadSource>>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.sources.iter().map(|(k, v)| (k, v.tag())))
            .finish()
    }
}

impl SourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` under `platform`, replacing any previous entry.
    pub fn register(&mut self, platform: impl Into<String>, source: Arc<dyn LeadSource>) {
        self.sources.insert(platform.into().trim().to_lowercase(), source);
    }

    /// Resolves a platform name case-insensitively. Unknown names yield `None`.
    #[must_use]
    pub fn resolve(&self, platform: &str) -> Option<Arc<dyn LeadSource>> {
        self.sources.get(&platform.trim().to_lowercase()).cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

/// Builds the registry for a run from configuration.
///
/// Each catalog platform is served by the first available option in the
/// chain: its configured provider, then the web-search capability, then
/// synthetic placeholder data (only when explicitly enabled). Platforms with
/// no available option are left out. An empty registry means acquisition is
/// unavailable.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the HTTP client cannot be built.
pub fn build_registry(
    config: &AppConfig,
    catalog: &SourceCatalog,
) -> Result<SourceRegistry, SourceError> {
    let client = build_http_client(config.acquisition_timeout(), &config.source_user_agent)?;
    let retry = RetryPolicy {
        max_retries: config.source_max_retries,
        backoff_base_secs: config.source_retry_backoff_base_secs,
    };
    let search = match (&config.search_api_url, &config.search_api_key) {
        (Some(url), Some(key)) => Some((url.clone(), key.clone())),
        _ => None,
    };

    let mut registry = SourceRegistry::new();

    for platform in &catalog.platforms {
        let name = platform.name.as_str();

        let primary: Option<Arc<dyn LeadSource>> = match platform.provider {
            ProviderKind::Apify => match (&config.apify_api_token, &platform.actor) {
                (Some(token), Some(actor)) => Some(Arc::new(ApifySource::new(
                    client.clone(),
                    APIFY_BASE_URL,
                    token,
                    actor,
                    name,
                    platform.max_results,
                    retry,
                ))),
                _ => None,
            },
            ProviderKind::WebSearch => None,
        };

        let source = primary
            .or_else(|| {
                search.as_ref().map(|(url, key)| {
                    Arc::new(WebSearchSource::new(
                        client.clone(),
                        url,
                        key,
                        name,
                        platform.max_results,
                        retry,
                    )) as Arc<dyn LeadSource>
                })
            })
            .or_else(|| {
                config
                    .allow_synthetic_leads
                    .then(|| Arc::new(SyntheticSource::new(name)) as Arc<dyn LeadSource>)
            });

        match source {
            Some(source) => {
                tracing::debug!(platform = name, source = source.tag(), "registered lead source");
                registry.register(name, source);
            }
            None => {
                tracing::warn!(
                    platform = name,
                    provider = %platform.provider,
                    "no acquisition provider available for platform"
                );
            }
        }
    }

    Ok(registry)
}
