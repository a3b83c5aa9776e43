//! Batched relevance scoring.
//!
//! Leads are split into fixed-size batches. Each batch is projected to the
//! few fields that matter for relevance, sent to the scoring backend, and the
//! per-index scores are merged back. A batch that fails in any way gets the
//! default score for every lead in it; other batches are unaffected. The
//! threshold filter and the descending stable sort run once at the end.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use leadpipe_core::{LeadCandidate, ScoringSettings};
use serde::{Deserialize, Serialize};
use tokio_util::task::AbortOnDropHandle;

use crate::error::ScoringError;

pub const SYSTEM_PROMPT: &str = "You score sales leads for relevance to an outreach campaign. \
Return JSON only, in the form {\"scores\":[{\"index\":<int>,\"score\":<int>}]}, with exactly \
one entry per lead index you were given. Scores are integers from 0 to 100, where 100 is a \
perfect match for the target job titles and search intent. A lead with neither a job title \
nor a company must score 30 or lower.";

/// Sends one prompt to an external model and returns its raw text answer.
#[async_trait]
pub trait ScoringBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, ScoringError>;
}

/// What the campaign is looking for.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoringContext {
    pub job_titles: Vec<String>,
    pub search_expressions: Vec<String>,
}

/// The per-lead payload sent to the backend. Never includes `raw_data`.
#[derive(Debug, Serialize)]
struct LeadProjection<'a> {
    index: usize,
    name: &'a str,
    has_email: bool,
    job_title: Option<&'a str>,
    company: Option<&'a str>,
    location: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ScoringRequest<'a> {
    target_job_titles: &'a [String],
    search_expressions: &'a [String],
    leads: Vec<LeadProjection<'a>>,
}

#[derive(Debug, Deserialize)]
struct ScoreEntry {
    index: usize,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScoreResponse {
    Wrapped { scores: Vec<ScoreEntry> },
    Bare(Vec<ScoreEntry>),
}

#[derive(Debug, Default)]
pub struct ScoringOutcome {
    /// Leads at or above the threshold, highest score first.
    pub leads: Vec<LeadCandidate>,
    pub total_batches: usize,
    pub failed_batches: usize,
    /// Leads removed by the threshold filter.
    pub below_threshold: usize,
}

#[derive(Clone)]
pub struct Scorer {
    backend: Option<Arc<dyn ScoringBackend>>,
    settings: ScoringSettings,
}

impl std::fmt::Debug for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scorer")
            .field("backend", &self.backend.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Scorer {
    #[must_use]
    pub fn new(backend: Option<Arc<dyn ScoringBackend>>, settings: ScoringSettings) -> Self {
        Self { backend, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    /// Scores, filters, and sorts `leads`.
    pub async fn score(&self, leads: Vec<LeadCandidate>, context: &ScoringContext) -> ScoringOutcome {
        let batch_size = self.settings.batch_size.max(1);
        let total_batches = leads.len().div_ceil(batch_size);

        let (scores, failed_batches) = match &self.backend {
            None => {
                tracing::info!(
                    leads = leads.len(),
                    default_score = self.settings.default_score,
                    "no scoring backend configured; applying default score"
                );
                (vec![self.settings.default_score; leads.len()], 0)
            }
            Some(backend) => {
                let backend = Arc::clone(backend);
                let context = Arc::new(context.clone());
                let settings = self.settings;
                let batches: Vec<(usize, Vec<LeadCandidate>)> = leads
                    .chunks(batch_size)
                    .map(<[LeadCandidate]>::to_vec)
                    .enumerate()
                    .collect();

                // One task per batch: a panic in one batch only defaults that
                // batch. Dropping the stream aborts batches still in flight.
                let results: Vec<Result<Vec<i32>, ScoringError>> = stream::iter(batches)
                    .map(move |(batch, chunk)| {
                        let backend = Arc::clone(&backend);
                        let context = Arc::clone(&context);
                        AbortOnDropHandle::new(tokio::spawn(async move {
                            score_batch(backend.as_ref(), settings, batch, &chunk, &context).await
                        }))
                    })
                    .buffered(self.settings.concurrency.max(1))
                    .map(|joined| joined.map_err(ScoringError::from).and_then(|result| result))
                    .collect()
                    .await;

                let mut scores = Vec::with_capacity(leads.len());
                let mut failed = 0usize;
                for (batch, (result, chunk)) in
                    results.into_iter().zip(leads.chunks(batch_size)).enumerate()
                {
                    match result {
                        Ok(batch_scores) => scores.extend(batch_scores),
                        Err(e) => {
                            failed += 1;
                            tracing::warn!(
                                batch,
                                leads = chunk.len(),
                                error = %e,
                                "scoring batch failed; applying default score"
                            );
                            scores.extend(std::iter::repeat_n(
                                self.settings.default_score,
                                chunk.len(),
                            ));
                        }
                    }
                }
                (scores, failed)
            }
        };

        let scored: Vec<LeadCandidate> = leads
            .into_iter()
            .zip(scores)
            .map(|(mut lead, score)| {
                lead.match_score = score;
                lead
            })
            .collect();

        let before = scored.len();
        let mut kept: Vec<LeadCandidate> = scored
            .into_iter()
            .filter(|lead| lead.match_score >= self.settings.threshold)
            .collect();
        // `sort_by` is stable: equal scores keep input order.
        kept.sort_by(|a, b| b.match_score.cmp(&a.match_score));

        ScoringOutcome {
            below_threshold: before - kept.len(),
            leads: kept,
            total_batches,
            failed_batches,
        }
    }
}

async fn score_batch(
    backend: &dyn ScoringBackend,
    settings: ScoringSettings,
    batch: usize,
    chunk: &[LeadCandidate],
    context: &ScoringContext,
) -> Result<Vec<i32>, ScoringError> {
    let prompt = build_user_prompt(chunk, context)?;
    let timeout = settings.timeout();

    let text = tokio::time::timeout(timeout, backend.complete(SYSTEM_PROMPT, &prompt))
        .await
        .map_err(|_| ScoringError::Timeout(timeout))??;

    let scores = merge_scores(&text, chunk.len(), settings.default_score)?;
    tracing::debug!(batch, leads = chunk.len(), "scoring batch completed");
    Ok(scores)
}

/// Serializes the batch projection plus campaign context.
fn build_user_prompt(chunk: &[LeadCandidate], context: &ScoringContext) -> Result<String, ScoringError> {
    let request = ScoringRequest {
        target_job_titles: &context.job_titles,
        search_expressions: &context.search_expressions,
        leads: chunk
            .iter()
            .enumerate()
            .map(|(index, lead)| LeadProjection {
                index,
                name: &lead.full_name,
                has_email: lead.email.is_some(),
                job_title: lead.job_title.as_deref(),
                company: lead.company.as_deref(),
                location: lead.location.as_deref(),
            })
            .collect(),
    };
    serde_json::to_string(&request).map_err(|e| ScoringError::Parse(e.to_string()))
}

/// Strips a surrounding markdown code fence, if any.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parses a backend answer into one score per lead in the batch.
///
/// Indexes outside the batch are ignored; indexes the answer omits get
/// `default_score`. Scores are rounded and clamped to 0..=100.
fn merge_scores(text: &str, len: usize, default_score: i32) -> Result<Vec<i32>, ScoringError> {
    let parsed: ScoreResponse = serde_json::from_str(strip_fences(text))
        .map_err(|e| ScoringError::Parse(e.to_string()))?;
    let entries = match parsed {
        ScoreResponse::Wrapped { scores } | ScoreResponse::Bare(scores) => scores,
    };

    let mut scores = vec![default_score; len];
    for entry in entries {
        if let Some(slot) = scores.get_mut(entry.index) {
            #[allow(clippy::cast_possible_truncation)]
            let score = entry.score.round().clamp(0.0, 100.0) as i32;
            *slot = score;
        }
    }
    Ok(scores)
}

#[cfg(test)]
#[path = "scorer_test.rs"]
mod tests;
