//! Raw acquisition output, before normalization.
//!
//! Providers disagree on field names. Observed shapes:
//!
//! - Google Maps places (Apify `crawler-google-places`): business `title`,
//!   `phone`, `website`, `url` (maps link), `address`/`city`, optional
//!   `emails` array when contact enrichment is enabled.
//! - LinkedIn profile search: `fullName` or `firstName` + `lastName`,
//!   `headline`/`jobTitle`, `companyName`, `linkedinUrl`/`profileUrl`,
//!   `location` either as a string or `{ "linkedinText": ... }`.
//! - Web search results are lifted into `{ fullName, profileUrl, email,
//!   phone, snippet }` by [`crate::web_search`].
//!
//! The payload is kept verbatim and stored as `raw_data`.

use serde_json::Value;

/// One record as returned by a lead source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLead {
    /// Provenance tag, e.g. `apify:google_maps`.
    pub source: String,
    pub payload: Value,
}

impl RawLead {
    pub fn new(source: impl Into<String>, payload: Value) -> Self {
        Self {
            source: source.into(),
            payload,
        }
    }
}
