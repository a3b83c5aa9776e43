//! Campaign command handlers for the CLI.
//!
//! `run` drives one campaign in-process and waits for it; `status` and
//! `leads` are read-only queries against what a run has stored.

use clap::Subcommand;
use leadpipe_core::{AppConfig, ScraperParameters};
use leadpipe_db::CampaignStatusView;
use leadpipe_pipeline::{CampaignLauncher, RunOutcome};
use sqlx::PgPool;
use uuid::Uuid;

/// Sub-commands available under `campaign`.
#[derive(Debug, Subcommand)]
pub enum CampaignCommands {
    /// Trigger a campaign and wait for it to finish
    Run {
        /// Owner the campaign is created for
        #[arg(long)]
        owner: String,
        /// Platform to search (repeatable, e.g. `linkedin`, `google_maps`)
        #[arg(long = "platform", required = true)]
        platforms: Vec<String>,
        /// Search expression (repeatable)
        #[arg(long = "search", required = true)]
        searches: Vec<String>,
        /// Target job title used when scoring (repeatable)
        #[arg(long = "title")]
        titles: Vec<String>,
    },
    /// Show a campaign's status and log trail
    Status {
        /// Campaign public id
        #[arg(long, conflicts_with = "owner", required_unless_present = "owner")]
        id: Option<Uuid>,
        /// Show the owner's most recent campaign instead
        #[arg(long)]
        owner: Option<String>,
    },
    /// List a campaign's leads, best match first
    Leads {
        /// Campaign public id
        #[arg(long)]
        id: Uuid,
        /// Maximum number of leads to show
        #[arg(long, default_value = "50")]
        limit: i64,
    },
}

pub(crate) async fn dispatch(
    pool: &PgPool,
    config: &AppConfig,
    command: CampaignCommands,
) -> anyhow::Result<()> {
    match command {
        CampaignCommands::Run {
            owner,
            platforms,
            searches,
            titles,
        } => {
            let parameters = ScraperParameters {
                platforms,
                search_expressions: searches,
                job_titles: titles,
            };
            run_campaign(pool, config, &owner, parameters).await
        }
        CampaignCommands::Status { id, owner } => show_status(pool, id, owner.as_deref()).await,
        CampaignCommands::Leads { id, limit } => list_leads(pool, id, limit).await,
    }
}

/// Trigger a campaign, wait for its run, and print where it ended up.
///
/// Ctrl-C cancels the run; the campaign keeps whatever non-terminal status
/// it had reached.
///
/// # Errors
///
/// Returns an error if the source catalog cannot be loaded, the parameters
/// are rejected, the campaign row cannot be created, or the run ends in
/// anything other than `ready`.
pub(crate) async fn run_campaign(
    pool: &PgPool,
    config: &AppConfig,
    owner: &str,
    parameters: ScraperParameters,
) -> anyhow::Result<()> {
    let catalog = leadpipe_core::load_source_catalog(&config.sources_path)?;
    let launcher = CampaignLauncher::from_app_config(config, &catalog, pool.clone())?;

    let ticket = launcher.trigger(owner, parameters).await?;
    println!("campaign {} started", ticket.public_id);

    let outcome = tokio::select! {
        outcome = launcher.wait(ticket.id) => outcome?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::warn!(public_id = %ticket.public_id, "interrupted; cancelling campaign run");
            launcher.shutdown();
            anyhow::bail!("interrupted; campaign {} was left unfinished", ticket.public_id);
        }
    };

    println!("{}", describe_outcome(&outcome));

    let view = leadpipe_db::get_campaign_status_by_public_id(pool, ticket.public_id).await?;
    print_status_view(&view);

    match outcome {
        RunOutcome::Ready { .. } => Ok(()),
        other => anyhow::bail!(
            "campaign {} did not finish ready: {}",
            ticket.public_id,
            describe_outcome(&other)
        ),
    }
}

/// Print the poll projection for one campaign, or for an owner's latest.
///
/// # Errors
///
/// Returns an error if the campaign cannot be found or a query fails.
pub(crate) async fn show_status(
    pool: &PgPool,
    id: Option<Uuid>,
    owner: Option<&str>,
) -> anyhow::Result<()> {
    let view = match (id, owner) {
        (Some(id), _) => leadpipe_db::get_campaign_status_by_public_id(pool, id)
            .await
            .map_err(|e| anyhow::anyhow!("campaign {id}: {e}"))?,
        (None, Some(owner)) => leadpipe_db::get_latest_campaign_status_for_owner(pool, owner)
            .await?
            .ok_or_else(|| anyhow::anyhow!("owner '{owner}' has no campaigns"))?,
        (None, None) => anyhow::bail!("either --id or --owner is required"),
    };

    print_status_view(&view);
    Ok(())
}

/// Print a campaign's stored leads ordered by match score.
///
/// # Errors
///
/// Returns an error if the campaign does not exist or a query fails.
pub(crate) async fn list_leads(pool: &PgPool, id: Uuid, limit: i64) -> anyhow::Result<()> {
    let campaign = leadpipe_db::get_campaign_by_public_id(pool, id)
        .await
        .map_err(|e| anyhow::anyhow!("campaign {id}: {e}"))?;
    let total = leadpipe_db::count_leads_for_campaign(pool, campaign.id).await?;
    let leads = leadpipe_db::list_leads_for_campaign(pool, campaign.id, limit.max(1)).await?;

    println!("campaign {id}: showing {} of {total} lead(s)", leads.len());
    for lead in &leads {
        let contact = lead
            .email
            .as_deref()
            .or(lead.phone.as_deref())
            .unwrap_or("-");
        println!(
            "{:>3}  {}  <{}>  {} @ {}",
            lead.match_score,
            lead.full_name,
            contact,
            lead.job_title.as_deref().unwrap_or("-"),
            lead.company.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}

fn describe_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Ready {
            lead_count,
            persisted,
        } => format!("ready: {lead_count} qualified lead(s), {persisted} saved"),
        RunOutcome::FailedScraping { error } => format!("failed_scraping: {error}"),
        RunOutcome::Error { error } => format!("error: {error}"),
        RunOutcome::Abandoned => "abandoned before finishing".to_string(),
    }
}

fn print_status_view(view: &CampaignStatusView) {
    println!("campaign:  {}", view.campaign_id);
    println!("owner:     {}", view.owner_id);
    println!("status:    {}", view.status);
    println!("leads:     {}", view.lead_count);
    if let Some(error) = &view.error_message {
        println!("error:     {error}");
    }
    println!("log:");
    for entry in &view.execution_logs {
        println!(
            "  {}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.message
        );
    }
}
