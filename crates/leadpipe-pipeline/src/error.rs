use std::time::Duration;

use leadpipe_db::DbError;
use leadpipe_sources::SourceError;
use thiserror::Error;

/// Failures that abort the acquisition stage (and with it, the run).
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("no lead source is configured and no fallback is enabled")]
    NoSourcesAvailable,

    #[error("lead source for {platform} is unavailable: {source}")]
    SourceUnavailable {
        platform: String,
        #[source]
        source: SourceError,
    },
}

/// Failures confined to one scoring batch.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scoring request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scoring service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("scoring call timed out after {0:?}")]
    Timeout(Duration),

    #[error("scoring response had no message content")]
    EmptyResponse,

    #[error("could not parse scoring response: {0}")]
    Parse(String),

    #[error("scoring batch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid scraper parameters: {0}")]
    InvalidParameters(String),

    #[error("campaign {0} is not tracked by this launcher")]
    UnknownCampaign(i64),

    #[error("campaign run task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Source(#[from] SourceError),
}
