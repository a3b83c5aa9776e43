//! Deterministic placeholder leads for development environments.
//!
//! Only registered when `LEADPIPE_ALLOW_SYNTHETIC_LEADS` is set. Records are
//! derived from a SHA-256 of the platform and search expression, so the same
//! query always yields the same leads. Every record carries
//! `"synthetic": true` in its raw payload and uses `.example` domains.

use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::SourceError;
use crate::registry::LeadSource;
use crate::types::RawLead;

const LEADS_PER_QUERY: usize = 5;

const FIRST_NAMES: &[&str] = &[
    "Avery", "Jordan", "Riley", "Morgan", "Casey", "Quinn", "Rowan", "Emerson",
];
const LAST_NAMES: &[&str] = &[
    "Nguyen", "Okafor", "Lindqvist", "Moreno", "Tanaka", "Schultz", "Haddad", "Byrne",
];
const COMPANIES: &[&str] = &[
    "Northwind", "Bluepeak", "Copperline", "Harborview", "Lumen Works", "Tallgrass",
];
const TITLES: &[&str] = &[
    "Founder",
    "Operations Manager",
    "Head of Marketing",
    "Office Manager",
    "Sales Director",
];

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    platform: String,
    tag: String,
}

impl SyntheticSource {
    #[must_use]
    pub fn new(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            tag: format!("synthetic:{platform}"),
        }
    }
}

fn pick<'a>(options: &[&'a str], byte: u8) -> &'a str {
    options[usize::from(byte) % options.len()]
}

fn slug(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

#[async_trait]
impl LeadSource for SyntheticSource {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn fetch(&self, search_expression: &str) -> Result<Vec<RawLead>, SourceError> {
        let query = search_expression.trim().to_lowercase();
        let digest = Sha256::new()
            .chain_update(self.platform.as_bytes())
            .chain_update([0u8])
            .chain_update(query.as_bytes())
            .finalize();

        let leads = digest
            .chunks_exact(4)
            .take(LEADS_PER_QUERY)
            .enumerate()
            .map(|(i, seed)| {
                let first = pick(FIRST_NAMES, seed[0]);
                let last = pick(LAST_NAMES, seed[1]);
                let company = pick(COMPANIES, seed[2]);
                let title = pick(TITLES, seed[3]);
                let email = format!("{}.{}@{}.example", slug(first), slug(last), slug(company));
                RawLead::new(
                    self.tag.clone(),
                    json!({
                        "fullName": format!("{first} {last}"),
                        "jobTitle": title,
                        "companyName": company,
                        "email": email,
                        "phone": format!("+1-555-01{:02}", (usize::from(seed[0]) + i) % 100),
                        "query": query,
                        "synthetic": true,
                    }),
                )
            })
            .collect();

        Ok(leads)
    }
}
