//! Database operations for `campaigns` and `campaign_logs`.

use chrono::{DateTime, Utc};
use leadpipe_core::{CampaignStatus, LogEntry, ScraperParameters};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `campaigns` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRow {
    pub id: i64,
    pub public_id: Uuid,
    pub owner_id: String,
    pub status: String,
    pub scraper_parameters: Json<ScraperParameters>,
    /// The schema defines this as `INTEGER NOT NULL DEFAULT 0`.
    pub lead_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignRow {
    /// Parses the stored status string.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidValue`] if the column holds an unknown status.
    pub fn status(&self) -> Result<CampaignStatus, DbError> {
        Ok(self.status.parse()?)
    }
}

/// Read-only projection consumed by pollers.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignStatusView {
    pub campaign_id: Uuid,
    pub owner_id: String,
    pub status: CampaignStatus,
    pub lead_count: i32,
    pub error_message: Option<String>,
    pub execution_logs: Vec<LogEntry>,
}

#[derive(sqlx::FromRow)]
struct LogRow {
    message: String,
    logged_at: DateTime<Utc>,
}

const CAMPAIGN_COLUMNS: &str = "id, public_id, owner_id, status, scraper_parameters, \
                                lead_count, error_message, created_at, updated_at";

// ---------------------------------------------------------------------------
// campaigns operations
// ---------------------------------------------------------------------------

/// Creates a new campaign in `pending` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_campaign(
    pool: &PgPool,
    owner_id: &str,
    parameters: &ScraperParameters,
) -> Result<CampaignRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "INSERT INTO campaigns (public_id, owner_id, status, scraper_parameters) \
         VALUES ($1, $2, 'pending', $3) \
         RETURNING {CAMPAIGN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(owner_id)
    .bind(Json(parameters))
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Sets `status` and, when provided, `lead_count` and `error_message` in one
/// statement.
///
/// Terminal campaigns are never moved again.
///
/// # Errors
///
/// Returns [`DbError::CampaignAlreadyFinished`] if the campaign is missing or
/// already terminal, or [`DbError::Sqlx`] if the update fails.
pub async fn update_campaign_status(
    pool: &PgPool,
    id: i64,
    status: CampaignStatus,
    lead_count: Option<i32>,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE campaigns \
         SET status = $1, \
             lead_count = COALESCE($2, lead_count), \
             error_message = COALESCE($3, error_message), \
             updated_at = NOW() \
         WHERE id = $4 \
           AND status NOT IN ('ready', 'failed_scraping', 'error')",
    )
    .bind(status.as_str())
    .bind(lead_count)
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::CampaignAlreadyFinished {
            id,
            requested: status.as_str(),
        });
    }

    Ok(())
}

/// Fetches a single campaign by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_campaign(pool: &PgPool, id: i64) -> Result<CampaignRow, DbError> {
    sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Fetches a single campaign by its public UUID.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_campaign_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<CampaignRow, DbError> {
    sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the owner's most recently created campaign, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_latest_campaign_for_owner(
    pool: &PgPool,
    owner_id: &str,
) -> Result<Option<CampaignRow>, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
         WHERE owner_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1"
    ))
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// campaign_logs operations
// ---------------------------------------------------------------------------

/// Appends one execution log line to a campaign.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a foreign-key
/// violation for an unknown campaign).
pub async fn append_campaign_log(
    pool: &PgPool,
    campaign_id: i64,
    entry: &LogEntry,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO campaign_logs (campaign_id, message, logged_at) \
         VALUES ($1, $2, $3)",
    )
    .bind(campaign_id)
    .bind(&entry.message)
    .bind(entry.timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns a campaign's log lines in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaign_logs(pool: &PgPool, campaign_id: i64) -> Result<Vec<LogEntry>, DbError> {
    let rows = sqlx::query_as::<_, LogRow>(
        "SELECT message, logged_at FROM campaign_logs \
         WHERE campaign_id = $1 \
         ORDER BY id ASC",
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| LogEntry {
            message: r.message,
            timestamp: r.logged_at,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Poll projections
// ---------------------------------------------------------------------------

async fn status_view(pool: &PgPool, row: CampaignRow) -> Result<CampaignStatusView, DbError> {
    let status = row.status()?;
    let execution_logs = list_campaign_logs(pool, row.id).await?;

    Ok(CampaignStatusView {
        campaign_id: row.public_id,
        owner_id: row.owner_id,
        status,
        lead_count: row.lead_count,
        error_message: row.error_message,
        execution_logs,
    })
}

/// Builds the poll projection for one campaign.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the campaign does not exist.
pub async fn get_campaign_status_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<CampaignStatusView, DbError> {
    let row = get_campaign_by_public_id(pool, public_id).await?;
    status_view(pool, row).await
}

/// Builds the poll projection for the owner's latest campaign.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn get_latest_campaign_status_for_owner(
    pool: &PgPool,
    owner_id: &str,
) -> Result<Option<CampaignStatusView>, DbError> {
    match get_latest_campaign_for_owner(pool, owner_id).await? {
        Some(row) => Ok(Some(status_view(pool, row).await?)),
        None => Ok(None),
    }
}
