//! Campaign lifecycle types shared by the pipeline and the database layer.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Lifecycle status of a campaign run.
///
/// `Ready`, `FailedScraping`, and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Pending,
    Scraping,
    Scoring,
    Ready,
    FailedScraping,
    Error,
}

impl CampaignStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Pending => "pending",
            CampaignStatus::Scraping => "scraping",
            CampaignStatus::Scoring => "scoring",
            CampaignStatus::Ready => "ready",
            CampaignStatus::FailedScraping => "failed_scraping",
            CampaignStatus::Error => "error",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CampaignStatus::Ready | CampaignStatus::FailedScraping | CampaignStatus::Error
        )
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CampaignStatus::Pending),
            "scraping" => Ok(CampaignStatus::Scraping),
            "scoring" => Ok(CampaignStatus::Scoring),
            "ready" => Ok(CampaignStatus::Ready),
            "failed_scraping" => Ok(CampaignStatus::FailedScraping),
            "error" => Ok(CampaignStatus::Error),
            other => Err(CoreError::UnknownCampaignStatus(other.to_string())),
        }
    }
}

/// Immutable input of one campaign run.
///
/// Accepts both `snake_case` and the `camelCase` keys produced by the
/// research report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScraperParameters {
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default, alias = "searchExpressions")]
    pub search_expressions: Vec<String>,
    #[serde(default, alias = "jobTitles")]
    pub job_titles: Vec<String>,
}

/// One line of a campaign's execution log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Creates an entry stamped with the current time.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
