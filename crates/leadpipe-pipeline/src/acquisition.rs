//! Source acquisition stage.
//!
//! Runs every (search expression × platform) pair in order, expressions
//! outer. A pair that errors or times out is logged and skipped. A source
//! that rejects our credentials is not called again for the rest of the run.
//! The stage itself fails only when no source is available at all, or when
//! every platform that resolved rejected us before anything was fetched.

use std::collections::HashSet;
use std::time::Duration;

use leadpipe_core::{LeadCandidate, ScraperParameters};
use leadpipe_sources::{normalize_all, RawLead, SourceError, SourceRegistry};

use crate::error::AcquisitionError;
use crate::tracker::StatusTracker;

#[derive(Debug, Default)]
pub struct AcquisitionOutput {
    /// Normalized, contactable candidates in acquisition order.
    pub candidates: Vec<LeadCandidate>,
    pub raw_count: usize,
    pub skipped_pairs: usize,
}

impl AcquisitionOutput {
    /// Raw records dropped during normalization.
    #[must_use]
    pub fn discarded(&self) -> usize {
        self.raw_count - self.candidates.len()
    }
}

/// Fetches raw records for every pair and normalizes them.
///
/// # Errors
///
/// Returns [`AcquisitionError::NoSourcesAvailable`] if the registry is empty
/// and [`AcquisitionError::SourceUnavailable`] if every resolvable platform
/// rejected our credentials and no records were fetched.
pub async fn acquire_leads(
    registry: &SourceRegistry,
    parameters: &ScraperParameters,
    timeout: Duration,
    tracker: &StatusTracker,
) -> Result<AcquisitionOutput, AcquisitionError> {
    if registry.is_empty() {
        return Err(AcquisitionError::NoSourcesAvailable);
    }

    let campaign_id = tracker.campaign_id();
    let mut raw: Vec<RawLead> = Vec::new();
    let mut skipped_pairs = 0usize;
    let mut resolved: HashSet<&str> = HashSet::new();
    let mut rejected: Vec<(String, SourceError)> = Vec::new();

    for expression in &parameters.search_expressions {
        for platform in &parameters.platforms {
            let Some(source) = registry.resolve(platform) else {
                tracing::warn!(campaign_id, platform = %platform, "unknown platform; skipping");
                tracker.record_log(format!("Skipped unsupported platform '{platform}'"));
                skipped_pairs += 1;
                continue;
            };
            resolved.insert(platform.as_str());

            if rejected.iter().any(|(p, _)| p == platform) {
                tracker.record_log(format!(
                    "Skipped {platform} for \"{expression}\": credentials were rejected earlier"
                ));
                skipped_pairs += 1;
                continue;
            }

            match tokio::time::timeout(timeout, source.fetch(expression)).await {
                Ok(Ok(records)) => {
                    tracing::info!(
                        campaign_id,
                        platform = %platform,
                        source = source.tag(),
                        records = records.len(),
                        "acquisition pair completed"
                    );
                    tracker.record_log(format!(
                        "Fetched {} raw records from {platform} for \"{expression}\"",
                        records.len()
                    ));
                    raw.extend(records);
                }
                Ok(Err(e)) if e.is_fatal() => {
                    tracing::error!(
                        campaign_id,
                        platform = %platform,
                        error = %e,
                        "lead source rejected credentials; disabling it for this run"
                    );
                    tracker.record_log(format!(
                        "Search on {platform} for \"{expression}\" failed: {e}; not calling {platform} again"
                    ));
                    skipped_pairs += 1;
                    rejected.push((platform.clone(), e));
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        campaign_id,
                        platform = %platform,
                        error = %e,
                        "acquisition pair failed; skipping"
                    );
                    tracker.record_log(format!(
                        "Search on {platform} for \"{expression}\" failed: {e}"
                    ));
                    skipped_pairs += 1;
                }
                Err(_) => {
                    tracing::warn!(
                        campaign_id,
                        platform = %platform,
                        timeout_secs = timeout.as_secs(),
                        "acquisition pair timed out; skipping"
                    );
                    tracker.record_log(format!(
                        "Search on {platform} for \"{expression}\" timed out after {}s",
                        timeout.as_secs()
                    ));
                    skipped_pairs += 1;
                }
            }
        }
    }

    if raw.is_empty() && !rejected.is_empty() && rejected.len() == resolved.len() {
        let (platform, source) = rejected.swap_remove(0);
        return Err(AcquisitionError::SourceUnavailable { platform, source });
    }

    let candidates = normalize_all(&raw);

    Ok(AcquisitionOutput {
        candidates,
        raw_count: raw.len(),
        skipped_pairs,
    })
}
