//! Database operations for the `leads` table.

use chrono::{DateTime, Utc};
use leadpipe_core::LeadCandidate;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `leads` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeadRow {
    pub id: Uuid,
    pub campaign_id: i64,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub profile_url: Option<String>,
    pub location: Option<String>,
    pub match_score: i32,
    pub outreach_status: String,
    pub source: String,
    pub raw_data: Value,
    pub created_at: DateTime<Utc>,
}

/// Inserts every lead in one statement, skipping rows that collide with an
/// existing identity key for the campaign.
///
/// Returns the number of rows actually written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails as a whole (for example a
/// check-constraint violation on any row). Uniqueness conflicts are not
/// errors.
pub async fn insert_leads_bulk(
    pool: &PgPool,
    campaign_id: i64,
    leads: &[LeadCandidate],
) -> Result<u64, DbError> {
    if leads.is_empty() {
        return Ok(0);
    }

    let mut ids = Vec::with_capacity(leads.len());
    let mut full_names = Vec::with_capacity(leads.len());
    let mut emails = Vec::with_capacity(leads.len());
    let mut phones = Vec::with_capacity(leads.len());
    let mut job_titles = Vec::with_capacity(leads.len());
    let mut companies = Vec::with_capacity(leads.len());
    let mut profile_urls = Vec::with_capacity(leads.len());
    let mut locations = Vec::with_capacity(leads.len());
    let mut scores = Vec::with_capacity(leads.len());
    let mut outreach = Vec::with_capacity(leads.len());
    let mut sources = Vec::with_capacity(leads.len());
    let mut raw = Vec::with_capacity(leads.len());

    for lead in leads {
        ids.push(Uuid::new_v4());
        full_names.push(lead.full_name.clone());
        emails.push(lead.email.clone());
        phones.push(lead.phone.clone());
        job_titles.push(lead.job_title.clone());
        companies.push(lead.company.clone());
        profile_urls.push(lead.profile_url.clone());
        locations.push(lead.location.clone());
        scores.push(lead.match_score);
        outreach.push(lead.outreach_status.as_str().to_string());
        sources.push(lead.source.clone());
        raw.push(lead.raw_data.clone());
    }

    let result = sqlx::query(
        "INSERT INTO leads \
             (id, campaign_id, full_name, email, phone, job_title, company, \
              profile_url, location, match_score, outreach_status, source, raw_data) \
         SELECT u.id, $1, u.full_name, u.email, u.phone, u.job_title, u.company, \
                u.profile_url, u.location, u.match_score, u.outreach_status, u.source, u.raw_data \
         FROM UNNEST($2::uuid[], $3::text[], $4::text[], $5::text[], $6::text[], $7::text[], \
                     $8::text[], $9::text[], $10::int4[], $11::text[], $12::text[], $13::jsonb[]) \
              AS u(id, full_name, email, phone, job_title, company, \
                   profile_url, location, match_score, outreach_status, source, raw_data) \
         ON CONFLICT DO NOTHING",
    )
    .bind(campaign_id)
    .bind(&ids)
    .bind(&full_names)
    .bind(&emails)
    .bind(&phones)
    .bind(&job_titles)
    .bind(&companies)
    .bind(&profile_urls)
    .bind(&locations)
    .bind(&scores)
    .bind(&outreach)
    .bind(&sources)
    .bind(&raw)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Inserts a single lead. Returns `false` when the row collided with an
/// existing identity key and was skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_lead(
    pool: &PgPool,
    campaign_id: i64,
    lead: &LeadCandidate,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO leads \
             (id, campaign_id, full_name, email, phone, job_title, company, \
              profile_url, location, match_score, outreach_status, source, raw_data) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(campaign_id)
    .bind(&lead.full_name)
    .bind(&lead.email)
    .bind(&lead.phone)
    .bind(&lead.job_title)
    .bind(&lead.company)
    .bind(&lead.profile_url)
    .bind(&lead.location)
    .bind(lead.match_score)
    .bind(lead.outreach_status.as_str())
    .bind(&lead.source)
    .bind(&lead.raw_data)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Lists a campaign's leads, highest `match_score` first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_leads_for_campaign(
    pool: &PgPool,
    campaign_id: i64,
    limit: i64,
) -> Result<Vec<LeadRow>, DbError> {
    let rows = sqlx::query_as::<_, LeadRow>(
        "SELECT id, campaign_id, full_name, email, phone, job_title, company, \
                profile_url, location, match_score, outreach_status, source, raw_data, created_at \
         FROM leads \
         WHERE campaign_id = $1 \
         ORDER BY match_score DESC, created_at ASC, id ASC \
         LIMIT $2",
    )
    .bind(campaign_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts the leads stored for a campaign.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_leads_for_campaign(pool: &PgPool, campaign_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leads WHERE campaign_id = $1")
        .bind(campaign_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
