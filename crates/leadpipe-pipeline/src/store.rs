//! Storage seams used by the pipeline.
//!
//! The orchestrator only talks to [`CampaignStore`] and [`LeadStore`];
//! [`PgStore`] backs both with `leadpipe-db`. Tests substitute in-memory
//! implementations.

use async_trait::async_trait;
use leadpipe_core::{CampaignStatus, LeadCandidate, LogEntry, ScraperParameters};
use leadpipe_db::DbError;
use sqlx::PgPool;
use uuid::Uuid;

/// Identifiers handed back to the caller when a campaign is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignTicket {
    pub id: i64,
    pub public_id: Uuid,
}

/// Fields written alongside a status transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFields {
    pub lead_count: Option<i32>,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn create_campaign(
        &self,
        owner_id: &str,
        parameters: &ScraperParameters,
    ) -> Result<CampaignTicket, DbError>;

    async fn append_log(&self, campaign_id: i64, entry: &LogEntry) -> Result<(), DbError>;

    async fn set_status(
        &self,
        campaign_id: i64,
        status: CampaignStatus,
        fields: &StatusFields,
    ) -> Result<(), DbError>;
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// One multi-row statement. Rows colliding with an existing identity key
    /// are skipped; returns the number written.
    async fn insert_bulk(&self, campaign_id: i64, leads: &[LeadCandidate])
        -> Result<u64, DbError>;

    /// Single-row insert. Returns `false` when the row was skipped as a
    /// duplicate.
    async fn insert_one(&self, campaign_id: i64, lead: &LeadCandidate) -> Result<bool, DbError>;
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CampaignStore for PgStore {
    async fn create_campaign(
        &self,
        owner_id: &str,
        parameters: &ScraperParameters,
    ) -> Result<CampaignTicket, DbError> {
        let row = leadpipe_db::create_campaign(&self.pool, owner_id, parameters).await?;
        Ok(CampaignTicket {
            id: row.id,
            public_id: row.public_id,
        })
    }

    async fn append_log(&self, campaign_id: i64, entry: &LogEntry) -> Result<(), DbError> {
        leadpipe_db::append_campaign_log(&self.pool, campaign_id, entry).await
    }

    async fn set_status(
        &self,
        campaign_id: i64,
        status: CampaignStatus,
        fields: &StatusFields,
    ) -> Result<(), DbError> {
        leadpipe_db::update_campaign_status(
            &self.pool,
            campaign_id,
            status,
            fields.lead_count,
            fields.error_message.as_deref(),
        )
        .await
    }
}

#[async_trait]
impl LeadStore for PgStore {
    async fn insert_bulk(
        &self,
        campaign_id: i64,
        leads: &[LeadCandidate],
    ) -> Result<u64, DbError> {
        leadpipe_db::insert_leads_bulk(&self.pool, campaign_id, leads).await
    }

    async fn insert_one(&self, campaign_id: i64, lead: &LeadCandidate) -> Result<bool, DbError> {
        leadpipe_db::insert_lead(&self.pool, campaign_id, lead).await
    }
}
