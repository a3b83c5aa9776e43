//! Persistence stage: one bulk insert, row-by-row when the bulk statement
//! fails. Never returns an error to the orchestrator.

use leadpipe_core::LeadCandidate;

use crate::store::LeadStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub attempted: usize,
    pub inserted: u64,
    /// Rows skipped because a lead with the same identity already exists.
    pub duplicates: u64,
    /// Rows rejected by the database on the row-by-row path.
    pub failed: u64,
    pub used_fallback: bool,
}

pub async fn persist_leads(
    store: &dyn LeadStore,
    campaign_id: i64,
    leads: &[LeadCandidate],
) -> PersistReport {
    let attempted = leads.len();
    if leads.is_empty() {
        return PersistReport::default();
    }

    match store.insert_bulk(campaign_id, leads).await {
        Ok(inserted) => {
            tracing::info!(campaign_id, attempted, inserted, "bulk lead insert completed");
            return PersistReport {
                attempted,
                inserted,
                duplicates: u64::try_from(attempted)
                    .unwrap_or(u64::MAX)
                    .saturating_sub(inserted),
                failed: 0,
                used_fallback: false,
            };
        }
        Err(e) => {
            tracing::warn!(
                campaign_id,
                attempted,
                error = %e,
                "bulk lead insert failed; retrying row by row"
            );
        }
    }

    let mut report = PersistReport {
        attempted,
        used_fallback: true,
        ..PersistReport::default()
    };

    for lead in leads {
        match store.insert_one(campaign_id, lead).await {
            Ok(true) => report.inserted += 1,
            Ok(false) => report.duplicates += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    campaign_id,
                    lead = %lead.full_name,
                    error = %e,
                    "lead insert failed; skipping"
                );
            }
        }
    }

    tracing::info!(
        campaign_id,
        attempted,
        inserted = report.inserted,
        failed = report.failed,
        "row-by-row lead insert completed"
    );
    report
}
