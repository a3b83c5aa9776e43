//! Campaign pipeline orchestration.
//!
//! One run moves a campaign through
//!
//! ```text
//! pending -> scraping -> scoring -> ready
//!                  \-> failed_scraping
//! ```
//!
//! Acquisition failure is fatal. Scoring and persistence failures degrade
//! the run but it still reaches `ready`. Any unexpected fault in stage logic
//! maps to `error`. The terminal status write is always the last write of a
//! run, except when the run is abandoned through cancellation.

use std::sync::Arc;
use std::time::Duration;

use leadpipe_core::{CampaignStatus, LeadCandidate, ScraperParameters};
use leadpipe_sources::SourceRegistry;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use crate::acquisition::acquire_leads;
use crate::dedup::dedup_leads;
use crate::persistence::persist_leads;
use crate::scorer::{Scorer, ScoringContext};
use crate::store::{CampaignStore, LeadStore, StatusFields};
use crate::tracker::StatusTracker;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Ready {
        /// Leads that passed filtering and scoring; see `persisted` for what
        /// was actually written.
        lead_count: usize,
        persisted: u64,
    },
    FailedScraping {
        error: String,
    },
    Error {
        error: String,
    },
    /// Cancelled before finishing; no terminal status was written.
    Abandoned,
}

impl RunOutcome {
    #[must_use]
    pub fn status(&self) -> Option<CampaignStatus> {
        match self {
            RunOutcome::Ready { .. } => Some(CampaignStatus::Ready),
            RunOutcome::FailedScraping { .. } => Some(CampaignStatus::FailedScraping),
            RunOutcome::Error { .. } => Some(CampaignStatus::Error),
            RunOutcome::Abandoned => None,
        }
    }
}

/// Everything a run needs, shared across concurrent runs.
pub struct CampaignPipeline {
    campaigns: Arc<dyn CampaignStore>,
    leads: Arc<dyn LeadStore>,
    registry: SourceRegistry,
    scorer: Arc<Scorer>,
    acquisition_timeout: Duration,
}

impl std::fmt::Debug for CampaignPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignPipeline")
            .field("registry", &self.registry)
            .field("scorer", &self.scorer)
            .field("acquisition_timeout", &self.acquisition_timeout)
            .finish_non_exhaustive()
    }
}

impl CampaignPipeline {
    #[must_use]
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        leads: Arc<dyn LeadStore>,
        registry: SourceRegistry,
        scorer: Scorer,
        acquisition_timeout: Duration,
    ) -> Self {
        Self {
            campaigns,
            leads,
            registry,
            scorer: Arc::new(scorer),
            acquisition_timeout,
        }
    }

    #[must_use]
    pub fn campaign_store(&self) -> Arc<dyn CampaignStore> {
        Arc::clone(&self.campaigns)
    }

    /// Runs one campaign to a terminal status.
    ///
    /// Stage logic runs in its own task so a panic is caught here and turned
    /// into an `error` status instead of leaving the campaign stuck.
    pub async fn run(
        self: Arc<Self>,
        campaign_id: i64,
        parameters: ScraperParameters,
        cancel: CancellationToken,
    ) -> RunOutcome {
        let tracker = StatusTracker::spawn(self.campaign_store(), campaign_id);

        tracker.set_status(CampaignStatus::Scraping, StatusFields::default());
        tracker.record_log(format!(
            "Campaign started: {} platform(s), {} search expression(s)",
            parameters.platforms.len(),
            parameters.search_expressions.len()
        ));
        tracing::info!(campaign_id, "campaign run started");

        let mut stages = tokio::spawn({
            let pipeline = Arc::clone(&self);
            let tracker = tracker.clone();
            async move { pipeline.run_stages(&tracker, &parameters).await }
        });

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                stages.abort();
                RunOutcome::Abandoned
            }
            joined = &mut stages => match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(campaign_id, error = %e, "campaign stages aborted unexpectedly");
                    RunOutcome::Error {
                        error: format!("internal error: {e}"),
                    }
                }
            },
        };

        finalize(&tracker, &outcome);
        tracker.flush().await;

        tracing::info!(campaign_id, outcome = ?outcome, "campaign run finished");
        outcome
    }

    async fn run_stages(&self, tracker: &StatusTracker, parameters: &ScraperParameters) -> RunOutcome {
        let campaign_id = tracker.campaign_id();

        // Acquisition
        let acquired =
            match acquire_leads(&self.registry, parameters, self.acquisition_timeout, tracker).await
            {
                Ok(acquired) => acquired,
                Err(e) => {
                    tracing::warn!(campaign_id, error = %e, "lead acquisition failed");
                    return RunOutcome::FailedScraping {
                        error: e.to_string(),
                    };
                }
            };
        tracker.record_log(format!(
            "Acquired {} raw records; {} usable after normalization ({} discarded)",
            acquired.raw_count,
            acquired.candidates.len(),
            acquired.discarded()
        ));

        let unique = dedup_leads(acquired.candidates);
        tracker.record_log(format!("{} unique leads after deduplication", unique.len()));

        // Scoring
        tracker.set_status(CampaignStatus::Scoring, StatusFields::default());
        tracker.record_log(format!("Scoring {} leads", unique.len()));
        let qualified = self.score_stage(tracker, unique, parameters).await;

        // Persistence
        let lead_count = qualified.len();
        let report = persist_leads(self.leads.as_ref(), campaign_id, &qualified).await;
        if report.used_fallback {
            tracker.record_log("Bulk insert failed; saved leads one at a time");
        }
        tracker.record_log(format!(
            "Saved {} of {} leads ({} duplicates skipped, {} failed)",
            report.inserted, report.attempted, report.duplicates, report.failed
        ));

        RunOutcome::Ready {
            lead_count,
            persisted: report.inserted,
        }
    }

    /// Scores in a separate task. Batch faults are contained by the scorer;
    /// if the scoring task itself faults, the leads are kept as they stood
    /// before scoring. Aborting the run aborts the scoring task with it.
    async fn score_stage(
        &self,
        tracker: &StatusTracker,
        leads: Vec<LeadCandidate>,
        parameters: &ScraperParameters,
    ) -> Vec<LeadCandidate> {
        let campaign_id = tracker.campaign_id();
        let unscored = leads.clone();
        let scorer = Arc::clone(&self.scorer);
        let context = ScoringContext {
            job_titles: parameters.job_titles.clone(),
            search_expressions: parameters.search_expressions.clone(),
        };

        let scoring =
            AbortOnDropHandle::new(tokio::spawn(async move { scorer.score(leads, &context).await }));

        match scoring.await {
            Ok(outcome) => {
                if outcome.failed_batches > 0 {
                    tracker.record_log(format!(
                        "{} of {} scoring batches failed; default score applied to them",
                        outcome.failed_batches, outcome.total_batches
                    ));
                }
                tracker.record_log(format!(
                    "{} leads met the score threshold ({} below)",
                    outcome.leads.len(),
                    outcome.below_threshold
                ));
                outcome.leads
            }
            Err(e) => {
                tracing::warn!(campaign_id, error = %e, "scoring failed; keeping unscored leads");
                tracker.record_log(format!(
                    "Scoring failed ({e}); keeping {} unscored leads",
                    unscored.len()
                ));
                unscored
            }
        }
    }
}

fn finalize(tracker: &StatusTracker, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Ready { lead_count, .. } => {
            tracker.record_log(format!("Campaign ready with {lead_count} leads"));
            tracker.set_status(
                CampaignStatus::Ready,
                StatusFields {
                    lead_count: Some(i32::try_from(*lead_count).unwrap_or(i32::MAX)),
                    error_message: None,
                },
            );
        }
        RunOutcome::FailedScraping { error } => {
            tracker.record_log(format!("Lead acquisition failed: {error}"));
            tracker.set_status(
                CampaignStatus::FailedScraping,
                StatusFields {
                    lead_count: Some(0),
                    error_message: Some(error.clone()),
                },
            );
        }
        RunOutcome::Error { error } => {
            tracker.record_log(format!("Campaign failed: {error}"));
            tracker.set_status(
                CampaignStatus::Error,
                StatusFields {
                    lead_count: None,
                    error_message: Some(error.clone()),
                },
            );
        }
        RunOutcome::Abandoned => {
            tracing::warn!(
                campaign_id = tracker.campaign_id(),
                "campaign run cancelled; leaving status as is"
            );
        }
    }
}
