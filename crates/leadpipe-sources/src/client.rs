//! HTTP plumbing shared by the provider-backed sources.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::SourceError;

/// Retry policy applied to every provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Base delay in seconds: the n-th retry waits `base * 2^(n-1)`.
    pub backoff_base_secs: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_secs: 0,
        }
    }
}

/// Builds a `reqwest::Client` with the configured request timeout and
/// `User-Agent`.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the client cannot be constructed.
pub fn build_http_client(timeout: Duration, user_agent: &str) -> Result<Client, SourceError> {
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()?;
    Ok(client)
}

/// Maps a provider response onto a typed error or its decoded JSON body.
///
/// 401/403 become [`SourceError::Unauthorized`], 429 becomes
/// [`SourceError::RateLimited`] (honouring `Retry-After` when numeric), and
/// any other non-2xx becomes [`SourceError::UnexpectedStatus`].
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: Response,
    provider: &str,
    context: &str,
) -> Result<T, SourceError> {
    let status = response.status();
    let url = response.url().to_string();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SourceError::Unauthorized {
            provider: provider.to_owned(),
            status: status.as_u16(),
        });
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        return Err(SourceError::RateLimited {
            provider: provider.to_owned(),
            retry_after_secs,
        });
    }

    if !status.is_success() {
        return Err(SourceError::UnexpectedStatus {
            status: status.as_u16(),
            url,
        });
    }

    let body = response.text().await?;
    serde_json::from_str::<T>(&body).map_err(|e| SourceError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}
