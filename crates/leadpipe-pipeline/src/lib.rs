//! Campaign lead pipeline.
//!
//! Acquires raw leads from the configured sources, normalizes and
//! deduplicates them, scores them in batches against the campaign's target
//! job titles, and bulk-writes the qualified leads. Progress and the final
//! status are reported through a best-effort [`StatusTracker`].

pub mod acquisition;
pub mod dedup;
pub mod error;
pub mod launcher;
pub mod llm;
pub mod persistence;
pub mod pipeline;
pub mod scorer;
pub mod store;
pub mod tracker;

pub use acquisition::{acquire_leads, AcquisitionOutput};
pub use dedup::dedup_leads;
pub use error::{AcquisitionError, PipelineError, ScoringError};
pub use launcher::{validate_parameters, CampaignLauncher, RunRegistry};
pub use llm::ChatCompletionsScorer;
pub use persistence::{persist_leads, PersistReport};
pub use pipeline::{CampaignPipeline, RunOutcome};
pub use scorer::{Scorer, ScoringBackend, ScoringContext, ScoringOutcome};
pub use store::{CampaignStore, CampaignTicket, LeadStore, PgStore, StatusFields};
pub use tracker::StatusTracker;
