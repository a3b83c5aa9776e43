//! Web-search-backed lead source (Serper-compatible JSON API).
//!
//! Each organic result becomes one raw record. The result title is split on
//! ` - ` / ` | ` into name, job title and company, and the snippet is scanned
//! for an email address and a phone number.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{decode_json, RetryPolicy};
use crate::error::SourceError;
use crate::rate_limit::retry_with_backoff;
use crate::registry::LeadSource;
use crate::types::RawLead;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\d[\d\s().\-]{7,}\d").expect("valid phone regex")
});

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Clone)]
pub struct WebSearchSource {
    client: Client,
    url: String,
    api_key: String,
    platform: String,
    tag: String,
    max_results: u32,
    retry: RetryPolicy,
}

impl WebSearchSource {
    #[must_use]
    pub fn new(
        client: Client,
        url: &str,
        api_key: &str,
        platform: &str,
        max_results: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
            platform: platform.to_string(),
            tag: format!("web_search:{platform}"),
            max_results,
            retry,
        }
    }

    async fn search_once(&self, query: &str) -> Result<SearchResponse, SourceError> {
        let response = self
            .client
            .post(&self.url)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest {
                q: query,
                num: self.max_results,
            })
            .send()
            .await?;

        decode_json(response, "web_search", "search results").await
    }
}

/// Restricts a query to the platform's public pages where one is known.
fn scoped_query(platform: &str, search_expression: &str) -> String {
    match platform {
        "linkedin" => format!("site:linkedin.com/in {search_expression}"),
        "google_maps" => format!("{search_expression} contact phone"),
        _ => search_expression.to_string(),
    }
}

fn lift_result(result: &OrganicResult) -> Value {
    // "Name - Title - Company | Site"
    let title = result.title.split(" | ").next().unwrap_or_default();
    let mut parts = title.split(" - ").map(str::trim).filter(|p| !p.is_empty());
    let full_name = parts.next();
    let job_title = parts.next();
    let company = parts.next();

    let email = EMAIL_RE.find(&result.snippet).map(|m| m.as_str().to_string());
    let phone = PHONE_RE
        .find(&result.snippet)
        .map(|m| m.as_str().trim().to_string());

    json!({
        "fullName": full_name,
        "jobTitle": job_title,
        "company": company,
        "profileUrl": (!result.link.is_empty()).then(|| result.link.clone()),
        "email": email,
        "phone": phone,
        "snippet": result.snippet,
    })
}

#[async_trait]
impl LeadSource for WebSearchSource {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn fetch(&self, search_expression: &str) -> Result<Vec<RawLead>, SourceError> {
        let query = scoped_query(&self.platform, search_expression);
        tracing::info!(platform = %self.platform, query = %query, "running web search");

        let response = retry_with_backoff(self.retry.max_retries, self.retry.backoff_base_secs, || {
            self.search_once(&query)
        })
        .await?;

        Ok(response
            .organic
            .iter()
            .take(self.max_results as usize)
            .map(|r| RawLead::new(self.tag.clone(), lift_result(r)))
            .collect())
    }
}
