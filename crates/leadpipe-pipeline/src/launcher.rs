//! Detached campaign runs.
//!
//! [`CampaignLauncher::trigger`] validates input, creates the campaign row,
//! spawns the run, and returns as soon as the row exists. Live runs and the
//! latest campaign per owner are tracked in a [`RunRegistry`] that lives for
//! the whole process. Entries are never evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use leadpipe_core::{AppConfig, ScraperParameters, SourceCatalog};
use leadpipe_sources::build_registry;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::llm::ChatCompletionsScorer;
use crate::pipeline::{CampaignPipeline, RunOutcome};
use crate::scorer::{Scorer, ScoringBackend};
use crate::store::{CampaignTicket, PgStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct RunRegistry {
    latest_by_owner: Mutex<HashMap<String, CampaignTicket>>,
    runs: Mutex<HashMap<i64, JoinHandle<RunOutcome>>>,
}

impl RunRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, owner_id: &str, ticket: CampaignTicket, handle: JoinHandle<RunOutcome>) {
        lock(&self.latest_by_owner).insert(owner_id.to_string(), ticket);
        lock(&self.runs).insert(ticket.id, handle);
    }

    /// The most recently triggered campaign for `owner_id` in this process.
    #[must_use]
    pub fn latest_for_owner(&self, owner_id: &str) -> Option<CampaignTicket> {
        lock(&self.latest_by_owner).get(owner_id).copied()
    }

    /// Number of runs that have not finished yet.
    #[must_use]
    pub fn active_runs(&self) -> usize {
        lock(&self.runs).values().filter(|h| !h.is_finished()).count()
    }

    fn take_handle(&self, campaign_id: i64) -> Option<JoinHandle<RunOutcome>> {
        lock(&self.runs).remove(&campaign_id)
    }
}

/// Trims entries, drops blanks, and rejects parameters a run cannot use.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameters`] for a blank owner id, no
/// platforms, or no search expressions.
pub fn validate_parameters(
    owner_id: &str,
    parameters: ScraperParameters,
) -> Result<ScraperParameters, PipelineError> {
    fn clean(values: Vec<String>) -> Vec<String> {
        values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }

    if owner_id.trim().is_empty() {
        return Err(PipelineError::InvalidParameters(
            "owner id is required".to_string(),
        ));
    }

    let cleaned = ScraperParameters {
        platforms: clean(parameters.platforms),
        search_expressions: clean(parameters.search_expressions),
        job_titles: clean(parameters.job_titles),
    };

    if cleaned.platforms.is_empty() {
        return Err(PipelineError::InvalidParameters(
            "at least one platform is required".to_string(),
        ));
    }
    if cleaned.search_expressions.is_empty() {
        return Err(PipelineError::InvalidParameters(
            "at least one search expression is required".to_string(),
        ));
    }

    Ok(cleaned)
}

#[derive(Debug)]
pub struct CampaignLauncher {
    pipeline: Arc<CampaignPipeline>,
    runs: Arc<RunRegistry>,
    root: CancellationToken,
}

impl CampaignLauncher {
    #[must_use]
    pub fn new(pipeline: CampaignPipeline, runs: Arc<RunRegistry>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            runs,
            root: CancellationToken::new(),
        }
    }

    /// Wires a Postgres-backed launcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Source`] if the source HTTP client cannot be
    /// built.
    pub fn from_app_config(
        config: &AppConfig,
        catalog: &SourceCatalog,
        pool: PgPool,
    ) -> Result<Self, PipelineError> {
        let store = Arc::new(PgStore::new(pool));
        let registry = build_registry(config, catalog)?;
        if registry.is_empty() {
            tracing::warn!("no lead sources available; campaigns will fail at acquisition");
        }

        let backend = match ChatCompletionsScorer::from_app_config(config) {
            Ok(Some(scorer)) => Some(Arc::new(scorer) as Arc<dyn ScoringBackend>),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "scoring backend unavailable; default scores will be used");
                None
            }
        };

        let pipeline = CampaignPipeline::new(
            store.clone(),
            store,
            registry,
            Scorer::new(backend, config.scoring),
            config.acquisition_timeout(),
        );
        Ok(Self::new(pipeline, Arc::new(RunRegistry::new())))
    }

    #[must_use]
    pub fn runs(&self) -> &RunRegistry {
        &self.runs
    }

    /// Creates the campaign and starts its run in the background.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameters`] before anything is
    /// written, or [`PipelineError::Db`] if the campaign row cannot be
    /// created.
    pub async fn trigger(
        &self,
        owner_id: &str,
        parameters: ScraperParameters,
    ) -> Result<CampaignTicket, PipelineError> {
        let parameters = validate_parameters(owner_id, parameters)?;
        let owner_id = owner_id.trim();

        let ticket = self
            .pipeline
            .campaign_store()
            .create_campaign(owner_id, &parameters)
            .await?;

        tracing::info!(
            campaign_id = ticket.id,
            public_id = %ticket.public_id,
            owner_id,
            "campaign created; starting run"
        );

        let handle = tokio::spawn(Arc::clone(&self.pipeline).run(
            ticket.id,
            parameters,
            self.root.child_token(),
        ));
        self.runs.record(owner_id, ticket, handle);

        Ok(ticket)
    }

    /// Waits for a run started by this launcher to finish.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownCampaign`] if the run is not tracked
    /// (or was already awaited), or [`PipelineError::Join`] if the run task
    /// itself panicked.
    pub async fn wait(&self, campaign_id: i64) -> Result<RunOutcome, PipelineError> {
        let handle = self
            .runs
            .take_handle(campaign_id)
            .ok_or(PipelineError::UnknownCampaign(campaign_id))?;
        Ok(handle.await?)
    }

    /// Cancels every in-flight run. Cancelled runs write no terminal status.
    pub fn shutdown(&self) {
        tracing::info!(active_runs = self.runs.active_runs(), "shutting down campaign launcher");
        self.root.cancel();
    }
}
