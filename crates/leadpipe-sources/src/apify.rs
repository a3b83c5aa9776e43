//! Apify actor-backed lead source.
//!
//! Uses the synchronous `run-sync-get-dataset-items` endpoint so one search
//! is one request: the actor runs to completion and its dataset comes back
//! as the response body.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::client::{decode_json, RetryPolicy};
use crate::error::SourceError;
use crate::rate_limit::retry_with_backoff;
use crate::registry::LeadSource;
use crate::types::RawLead;

pub const APIFY_BASE_URL: &str = "https://api.apify.com/v2";

/// Actor input. Places-style actors read `searchStringsArray` and
/// `maxCrawledPlacesPerSearch`; profile-search actors read `searchQuery` and
/// `maxItems`. Actors ignore keys they do not declare.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActorInput<'a> {
    search_strings_array: [&'a str; 1],
    search_query: &'a str,
    max_items: u32,
    max_crawled_places_per_search: u32,
}

#[derive(Debug, Clone)]
pub struct ApifySource {
    client: Client,
    base_url: String,
    token: String,
    actor: String,
    tag: String,
    max_results: u32,
    retry: RetryPolicy,
}

impl ApifySource {
    #[must_use]
    pub fn new(
        client: Client,
        base_url: &str,
        token: &str,
        actor: &str,
        platform: &str,
        max_results: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            actor: actor.to_string(),
            tag: format!("apify:{platform}"),
            max_results,
            retry,
        }
    }

    fn run_url(&self) -> String {
        format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            self.base_url, self.actor
        )
    }

    async fn run_once(&self, search_expression: &str) -> Result<Vec<Value>, SourceError> {
        let input = ActorInput {
            search_strings_array: [search_expression],
            search_query: search_expression,
            max_items: self.max_results,
            max_crawled_places_per_search: self.max_results,
        };

        let response = self
            .client
            .post(self.run_url())
            .bearer_auth(&self.token)
            .json(&input)
            .send()
            .await?;

        decode_json(response, "apify", &self.actor).await
    }
}

#[async_trait]
impl LeadSource for ApifySource {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn fetch(&self, search_expression: &str) -> Result<Vec<RawLead>, SourceError> {
        tracing::info!(
            actor = %self.actor,
            search_expression,
            max_results = self.max_results,
            "starting apify actor run"
        );

        let items = retry_with_backoff(self.retry.max_retries, self.retry.backoff_base_secs, || {
            self.run_once(search_expression)
        })
        .await?;

        tracing::info!(actor = %self.actor, items = items.len(), "apify run completed");

        Ok(items
            .into_iter()
            .take(self.max_results as usize)
            .filter(Value::is_object)
            .map(|payload| RawLead::new(self.tag.clone(), payload))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_url_strips_trailing_slash() {
        let source = ApifySource::new(
            Client::new(),
            "https://api.apify.com/v2/",
            "t",
            "compass~crawler-google-places",
            "google_maps",
            10,
            RetryPolicy::none(),
        );
        assert_eq!(
            source.run_url(),
            "https://api.apify.com/v2/acts/compass~crawler-google-places/run-sync-get-dataset-items"
        );
        assert_eq!(source.tag(), "apify:google_maps");
    }

    #[test]
    fn actor_input_uses_camel_case_keys() {
        let input = ActorInput {
            search_strings_array: ["dentists in austin"],
            search_query: "dentists in austin",
            max_items: 5,
            max_crawled_places_per_search: 5,
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["searchStringsArray"][0], "dentists in austin");
        assert_eq!(json["maxItems"], 5);
        assert_eq!(json["maxCrawledPlacesPerSearch"], 5);
    }
}
