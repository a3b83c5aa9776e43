//! Normalization from provider-shaped [`RawLead`] payloads to
//! [`LeadCandidate`].
//!
//! Each field is read from the first populated key in a provider-specific
//! alias list (see [`crate::types`] for the observed shapes). Text is trimmed
//! and internal whitespace collapsed; emails that fail validation are
//! dropped. Normalizing already-normalized values leaves them unchanged.

use std::sync::LazyLock;

use leadpipe_core::{LeadCandidate, OutreachStatus};
use regex::Regex;
use serde_json::Value;

use crate::types::RawLead;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});

const NAME_KEYS: &[&str] = &["fullName", "full_name", "name", "title"];
const EMAIL_KEYS: &[&str] = &["email", "emailAddress", "emails"];
const PHONE_KEYS: &[&str] = &["phone", "phoneNumber", "phoneUnformatted", "phones"];
const URL_KEYS: &[&str] = &["profileUrl", "linkedinUrl", "website", "url"];
const JOB_TITLE_KEYS: &[&str] = &["jobTitle", "headline", "position", "categoryName"];
const COMPANY_KEYS: &[&str] = &["companyName", "company", "currentCompany"];
const LOCATION_KEYS: &[&str] = &["location", "address", "city"];

/// Fields providers use for the value inside a wrapper object.
const NESTED_TEXT_KEYS: &[&str] = &["name", "linkedinText", "value", "text"];

/// Minimum digit count for a phone number to be kept.
const MIN_PHONE_DIGITS: usize = 7;

/// Returns `true` if `candidate` looks like a deliverable email address.
#[must_use]
pub fn is_valid_email(candidate: &str) -> bool {
    candidate.len() <= 254 && EMAIL_RE.is_match(candidate)
}

/// Trims and collapses internal whitespace. Empty results become `None`.
#[must_use]
pub fn clean_text(value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Reads a string out of a JSON value, looking through the shapes providers
/// use for "one of several": arrays (first usable element) and objects with
/// a `name`/`linkedinText`/`value` field.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(text_of),
        Value::Object(map) => NESTED_TEXT_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(text_of)),
        Value::Null | Value::Bool(_) => None,
    }
}

/// Like [`text_of`], but collects every usable string instead of the first.
fn all_texts_of(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(clean_text(s)),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => items.iter().for_each(|item| all_texts_of(item, out)),
        Value::Object(map) => NESTED_TEXT_KEYS
            .iter()
            .filter_map(|k| map.get(*k))
            .for_each(|item| all_texts_of(item, out)),
        Value::Null | Value::Bool(_) => {}
    }
}

fn first_text(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| payload.get(*k).and_then(text_of))
}

fn full_name(payload: &Value) -> Option<String> {
    first_text(payload, NAME_KEYS).or_else(|| {
        let first = first_text(payload, &["firstName", "first_name"]);
        let last = first_text(payload, &["lastName", "last_name"]);
        match (first, last) {
            (Some(f), Some(l)) => Some(format!("{f} {l}")),
            (Some(n), None) | (None, Some(n)) => Some(n),
            (None, None) => None,
        }
    })
}

/// The first valid address across every alias and every list element.
fn email(payload: &Value) -> Option<String> {
    let mut candidates = Vec::new();
    for key in EMAIL_KEYS {
        if let Some(value) = payload.get(*key) {
            all_texts_of(value, &mut candidates);
        }
    }
    candidates
        .into_iter()
        .map(|e| e.trim_start_matches("mailto:").to_string())
        .find(|e| is_valid_email(e))
}

fn phone(payload: &Value) -> Option<String> {
    first_text(payload, PHONE_KEYS)
        .filter(|p| p.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS)
}

fn profile_url(payload: &Value) -> Option<String> {
    first_text(payload, URL_KEYS)
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
}

/// Converts one raw record into a candidate.
///
/// Returns `None` when the record has no usable name or no way to contact
/// the lead (valid email, phone, or profile URL).
#[must_use]
pub fn normalize_raw_lead(raw: &RawLead) -> Option<LeadCandidate> {
    let payload = &raw.payload;

    let candidate = LeadCandidate {
        full_name: full_name(payload)?,
        email: email(payload),
        phone: phone(payload),
        job_title: first_text(payload, JOB_TITLE_KEYS),
        company: first_text(payload, COMPANY_KEYS),
        profile_url: profile_url(payload),
        location: first_text(payload, LOCATION_KEYS),
        match_score: 0,
        outreach_status: OutreachStatus::New,
        source: raw.source.clone(),
        raw_data: payload.clone(),
    };

    candidate.is_contactable().then_some(candidate)
}

/// Normalizes a batch, dropping records that cannot be contacted.
#[must_use]
pub fn normalize_all(raws: &[RawLead]) -> Vec<LeadCandidate> {
    raws.iter().filter_map(normalize_raw_lead).collect()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
