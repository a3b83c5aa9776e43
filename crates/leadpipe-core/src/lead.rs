//! Lead candidate shape produced by normalization and consumed by scoring
//! and persistence.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachStatus {
    #[default]
    New,
    Contacted,
    Replied,
    Bounced,
    Unsubscribed,
}

impl OutreachStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OutreachStatus::New => "new",
            OutreachStatus::Contacted => "contacted",
            OutreachStatus::Replied => "replied",
            OutreachStatus::Bounced => "bounced",
            OutreachStatus::Unsubscribed => "unsubscribed",
        }
    }
}

impl FromStr for OutreachStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(OutreachStatus::New),
            "contacted" => Ok(OutreachStatus::Contacted),
            "replied" => Ok(OutreachStatus::Replied),
            "bounced" => Ok(OutreachStatus::Bounced),
            "unsubscribed" => Ok(OutreachStatus::Unsubscribed),
            other => Err(CoreError::UnknownOutreachStatus(other.to_string())),
        }
    }
}

/// A normalized contact candidate, not yet persisted.
///
/// `email` only ever holds an address that passed validation during
/// normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadCandidate {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub profile_url: Option<String>,
    pub location: Option<String>,
    /// 0..=100; 0 until scored.
    pub match_score: i32,
    pub outreach_status: OutreachStatus,
    /// Provenance tag, e.g. `apify:google_maps`.
    pub source: String,
    pub raw_data: Value,
}

impl LeadCandidate {
    /// Full name plus at least one way to reach the lead.
    #[must_use]
    pub fn is_contactable(&self) -> bool {
        !self.full_name.trim().is_empty()
            && (self.email.is_some() || self.phone.is_some() || self.profile_url.is_some())
    }

    /// Lowercased, trimmed email used as the first identity key.
    #[must_use]
    pub fn email_key(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    /// Lowercased, trimmed `(name, company)` pair used as the second identity key.
    #[must_use]
    pub fn name_company_key(&self) -> (String, String) {
        (
            self.full_name.trim().to_lowercase(),
            self.company
                .as_deref()
                .unwrap_or_default()
                .trim()
                .to_lowercase(),
        )
    }
}
