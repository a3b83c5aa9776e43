//! First-occurrence deduplication under the two-key identity rule.
//!
//! Two leads are the same entity when their emails match or their
//! `(full name, company)` pairs match, both compared trimmed and
//! case-insensitively. A lead is dropped as soon as either key has already
//! been seen on a retained lead.

use std::collections::HashSet;

use leadpipe_core::LeadCandidate;

/// Returns the leads whose identity keys were not seen earlier in the list,
/// preserving input order.
#[must_use]
pub fn dedup_leads(leads: Vec<LeadCandidate>) -> Vec<LeadCandidate> {
    let mut emails: HashSet<String> = HashSet::with_capacity(leads.len());
    let mut names: HashSet<(String, String)> = HashSet::with_capacity(leads.len());

    leads
        .into_iter()
        .filter(|lead| {
            let email = lead.email_key();
            let name = lead.name_company_key();

            if email.as_ref().is_some_and(|e| emails.contains(e)) || names.contains(&name) {
                return false;
            }

            if let Some(email) = email {
                emails.insert(email);
            }
            names.insert(name);
            true
        })
        .collect()
}
