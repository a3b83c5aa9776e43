//! End-to-end orchestrator tests against in-memory stores, sources, and
//! scoring backends. No network or database is involved.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use leadpipe_core::{CampaignStatus, LeadCandidate, LogEntry, ScoringSettings, ScraperParameters};
use leadpipe_db::DbError;
use leadpipe_pipeline::{
    CampaignLauncher, CampaignPipeline, CampaignStore, CampaignTicket, LeadStore, PipelineError,
    RunOutcome, RunRegistry, Scorer, ScoringBackend, ScoringError, StatusFields,
};
use leadpipe_sources::{LeadSource, RawLead, SourceError, SourceRegistry};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct CampaignState {
    owner_id: String,
    statuses: Vec<CampaignStatus>,
    lead_count: i32,
    error_message: Option<String>,
    logs: Vec<String>,
}

impl CampaignState {
    fn status(&self) -> CampaignStatus {
        self.statuses.last().copied().unwrap_or(CampaignStatus::Pending)
    }
}

#[derive(Default)]
struct MemoryStore {
    next_id: AtomicI64,
    campaigns: Mutex<HashMap<i64, CampaignState>>,
    leads: Mutex<Vec<(i64, LeadCandidate)>>,
    fail_bulk: bool,
    bulk_calls: AtomicUsize,
    single_calls: AtomicUsize,
}

impl MemoryStore {
    fn failing_bulk() -> Self {
        Self {
            fail_bulk: true,
            ..Self::default()
        }
    }

    fn campaign(&self, id: i64) -> CampaignState {
        self.campaigns.lock().unwrap()[&id].clone()
    }

    fn leads_for(&self, id: i64) -> Vec<LeadCandidate> {
        self.leads
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == id)
            .map(|(_, l)| l.clone())
            .collect()
    }

    /// Mirrors the unique indexes on `leads`.
    fn try_insert(&self, campaign_id: i64, lead: &LeadCandidate) -> bool {
        let mut rows = self.leads.lock().unwrap();
        let clash = rows.iter().any(|(c, existing)| {
            *c == campaign_id
                && ((lead.email_key().is_some() && existing.email_key() == lead.email_key())
                    || existing.name_company_key() == lead.name_company_key())
        });
        if clash {
            return false;
        }
        rows.push((campaign_id, lead.clone()));
        true
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn create_campaign(
        &self,
        owner_id: &str,
        _parameters: &ScraperParameters,
    ) -> Result<CampaignTicket, DbError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.campaigns.lock().unwrap().insert(
            id,
            CampaignState {
                owner_id: owner_id.to_string(),
                ..CampaignState::default()
            },
        );
        Ok(CampaignTicket {
            id,
            public_id: uuid::Uuid::new_v4(),
        })
    }

    async fn append_log(&self, campaign_id: i64, entry: &LogEntry) -> Result<(), DbError> {
        let mut campaigns = self.campaigns.lock().unwrap();
        let state = campaigns.get_mut(&campaign_id).ok_or(DbError::NotFound)?;
        state.logs.push(entry.message.clone());
        Ok(())
    }

    async fn set_status(
        &self,
        campaign_id: i64,
        status: CampaignStatus,
        fields: &StatusFields,
    ) -> Result<(), DbError> {
        let mut campaigns = self.campaigns.lock().unwrap();
        let state = campaigns.get_mut(&campaign_id).ok_or(DbError::NotFound)?;
        if state.status().is_terminal() {
            return Err(DbError::CampaignAlreadyFinished {
                id: campaign_id,
                requested: status.as_str(),
            });
        }
        state.statuses.push(status);
        if let Some(count) = fields.lead_count {
            state.lead_count = count;
        }
        if let Some(message) = &fields.error_message {
            state.error_message = Some(message.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn insert_bulk(
        &self,
        campaign_id: i64,
        leads: &[LeadCandidate],
    ) -> Result<u64, DbError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_bulk {
            return Err(DbError::NotFound);
        }
        Ok(leads
            .iter()
            .filter(|lead| self.try_insert(campaign_id, lead))
            .count() as u64)
    }

    async fn insert_one(&self, campaign_id: i64, lead: &LeadCandidate) -> Result<bool, DbError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.try_insert(campaign_id, lead))
    }
}

enum Behavior {
    Records(Vec<Value>),
    Unauthorized,
    ServerError,
    Hang,
}

struct FakeSource {
    tag: String,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FakeSource {
    fn new(platform: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            tag: format!("fake:{platform}"),
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LeadSource for FakeSource {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn fetch(&self, _search_expression: &str) -> Result<Vec<RawLead>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Records(values) => Ok(values
                .iter()
                .map(|v| RawLead::new(self.tag.clone(), v.clone()))
                .collect()),
            Behavior::Unauthorized => Err(SourceError::Unauthorized {
                provider: "fake".to_string(),
                status: 401,
            }),
            Behavior::ServerError => Err(SourceError::UnexpectedStatus {
                status: 503,
                url: "https://fake.test".to_string(),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Scores by name lookup; unknown names score 0.
struct TableScorer {
    scores: HashMap<String, i32>,
    calls: AtomicUsize,
}

impl TableScorer {
    fn new(pairs: &[(&str, i32)]) -> Arc<Self> {
        Arc::new(Self {
            scores: pairs.iter().map(|(n, s)| ((*n).to_string(), *s)).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ScoringBackend for TableScorer {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, ScoringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request: Value = serde_json::from_str(user).unwrap();
        let scores: Vec<Value> = request["leads"]
            .as_array()
            .unwrap()
            .iter()
            .map(|lead| {
                let name = lead["name"].as_str().unwrap();
                json!({ "index": lead["index"], "score": self.scores.get(name).copied().unwrap_or(0) })
            })
            .collect();
        Ok(format!("```json\n{}\n```", json!({ "scores": scores })))
    }
}

struct PanickingScorer;

/// Panics on any batch that contains `poison`; scores everyone else 90.
struct PoisonedBatchScorer {
    poison: &'static str,
}

#[async_trait]
impl ScoringBackend for PoisonedBatchScorer {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, ScoringError> {
        assert!(!user.contains(self.poison), "scoring backend exploded");
        let request: Value = serde_json::from_str(user).unwrap();
        let scores: Vec<Value> = request["leads"]
            .as_array()
            .unwrap()
            .iter()
            .map(|lead| json!({ "index": lead["index"], "score": 90 }))
            .collect();
        Ok(json!({ "scores": scores }).to_string())
    }
}

/// Never answers; flips `dropped` once its pending call is torn down.
#[derive(Default)]
struct StuckScorer {
    started: AtomicBool,
    dropped: Arc<AtomicBool>,
}

struct SetOnDrop(Arc<AtomicBool>);

impl Drop for SetOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScoringBackend for StuckScorer {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, ScoringError> {
        let _guard = SetOnDrop(Arc::clone(&self.dropped));
        self.started.store(true, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok("[]".to_string())
    }
}

#[async_trait]
impl ScoringBackend for PanickingScorer {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, ScoringError> {
        panic!("scoring backend exploded");
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Ten raw records: two exact-email duplicates, one invalid email with a
/// phone, one with no contact method at all.
fn scenario_records() -> Vec<Value> {
    vec![
        json!({ "fullName": "Alice Archer", "email": "alice@northagency.com", "companyName": "North Agency", "jobTitle": "CEO" }),
        json!({ "fullName": "Bob Baker", "email": "bob@beanmarketing.com", "companyName": "Bean Marketing", "jobTitle": "Marketing Director" }),
        json!({ "fullName": "Carol Chen", "email": "carol@harborcreative.com", "companyName": "Harbor Creative", "jobTitle": "Founder" }),
        json!({ "fullName": "Dan Diaz", "email": "dan@commonwealthads.com", "companyName": "Commonwealth Ads" }),
        json!({ "fullName": "Eve Evans", "email": "eve@fenwaydigital.com", "companyName": "Fenway Digital" }),
        json!({ "fullName": "Frank Foster", "email": "frank-at-backbay", "phone": "+1 617 555 0106", "companyName": "Back Bay Media" }),
        json!({ "fullName": "Gina Gray", "companyName": "Seaport Studio" }),
        json!({ "fullName": "Alice A.", "email": "ALICE@northagency.com", "companyName": "North Agency Inc" }),
        json!({ "fullName": "Robert Baker", "email": " bob@beanmarketing.com", "companyName": "Bean" }),
        json!({ "fullName": "Hank Hill", "email": "hank@charlesriver.com", "companyName": "Charles River PR" }),
    ]
}

fn scenario_scores() -> Vec<(&'static str, i32)> {
    vec![
        ("Alice Archer", 92),
        ("Bob Baker", 85),
        ("Carol Chen", 70),
        ("Dan Diaz", 55),
        ("Eve Evans", 40),
        ("Frank Foster", 20),
        ("Hank Hill", 39),
    ]
}

fn scenario_parameters() -> ScraperParameters {
    ScraperParameters {
        platforms: vec!["google_maps".to_string()],
        search_expressions: vec![r#""marketing agency" AND (Boston OR MA)"#.to_string()],
        job_titles: vec!["CEO".to_string(), "Marketing Director".to_string()],
    }
}

fn registry_with(sources: &[(&str, Arc<FakeSource>)]) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    for (platform, source) in sources {
        registry.register(*platform, source.clone());
    }
    registry
}

fn pipeline(
    store: &Arc<MemoryStore>,
    registry: SourceRegistry,
    backend: Option<Arc<dyn ScoringBackend>>,
) -> CampaignPipeline {
    pipeline_with_settings(store, registry, backend, ScoringSettings::default())
}

fn pipeline_with_settings(
    store: &Arc<MemoryStore>,
    registry: SourceRegistry,
    backend: Option<Arc<dyn ScoringBackend>>,
    settings: ScoringSettings,
) -> CampaignPipeline {
    CampaignPipeline::new(
        store.clone(),
        store.clone(),
        registry,
        Scorer::new(backend, settings),
        Duration::from_secs(5),
    )
}

async fn run(
    store: &Arc<MemoryStore>,
    pipeline: CampaignPipeline,
    parameters: ScraperParameters,
) -> (i64, RunOutcome) {
    let ticket = store.create_campaign("owner-1", &parameters).await.unwrap();
    let outcome = Arc::new(pipeline)
        .run(ticket.id, parameters, CancellationToken::new())
        .await;
    (ticket.id, outcome)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn end_to_end_scenario_reaches_ready_with_five_leads() {
    let store = Arc::new(MemoryStore::default());
    let source = FakeSource::new("google_maps", Behavior::Records(scenario_records()));
    let scorer = TableScorer::new(&scenario_scores());

    let (id, outcome) = run(
        &store,
        pipeline(
            &store,
            registry_with(&[("google_maps", source)]),
            Some(scorer.clone() as Arc<dyn ScoringBackend>),
        ),
        scenario_parameters(),
    )
    .await;

    assert_eq!(
        outcome,
        RunOutcome::Ready {
            lead_count: 5,
            persisted: 5
        }
    );

    let campaign = store.campaign(id);
    assert_eq!(campaign.status(), CampaignStatus::Ready);
    assert_eq!(campaign.lead_count, 5);
    assert!(campaign.error_message.is_none());

    let leads = store.leads_for(id);
    let names: Vec<&str> = leads.iter().map(|l| l.full_name.as_str()).collect();
    assert_eq!(
        names,
        ["Alice Archer", "Bob Baker", "Carol Chen", "Dan Diaz", "Eve Evans"]
    );
    assert!(leads.iter().all(|l| l.match_score >= 40));
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_email_record_survives_on_its_phone() {
    let store = Arc::new(MemoryStore::default());
    let source = FakeSource::new("google_maps", Behavior::Records(scenario_records()));
    let scorer = TableScorer::new(&[("Frank Foster", 60)]);

    let (id, _) = run(
        &store,
        pipeline(&store, registry_with(&[("google_maps", source)]), Some(scorer as Arc<dyn ScoringBackend>)),
        scenario_parameters(),
    )
    .await;

    let leads = store.leads_for(id);
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].full_name, "Frank Foster");
    assert!(leads[0].email.is_none());
    assert_eq!(leads[0].phone.as_deref(), Some("+1 617 555 0106"));
}

#[tokio::test]
async fn status_transitions_and_logs_are_ordered() {
    let store = Arc::new(MemoryStore::default());
    let source = FakeSource::new("google_maps", Behavior::Records(scenario_records()));

    let (id, _) = run(
        &store,
        pipeline(&store, registry_with(&[("google_maps", source)]), None),
        scenario_parameters(),
    )
    .await;

    let campaign = store.campaign(id);
    assert_eq!(
        campaign.statuses,
        [
            CampaignStatus::Scraping,
            CampaignStatus::Scoring,
            CampaignStatus::Ready
        ]
    );
    assert!(campaign.logs.first().unwrap().starts_with("Campaign started"));
    assert_eq!(campaign.logs.last().unwrap(), "Campaign ready with 7 leads");

    let position = |needle: &str| {
        campaign
            .logs
            .iter()
            .position(|l| l.contains(needle))
            .unwrap_or_else(|| panic!("missing log containing {needle:?}"))
    };
    assert!(position("Fetched 10 raw records") < position("unique leads"));
    assert!(position("unique leads") < position("Scoring 7 leads"));
    assert!(position("Scoring 7 leads") < position("Saved 7 of 7"));
}

#[tokio::test]
async fn unauthorized_source_fails_scraping_without_scoring_or_persistence() {
    let store = Arc::new(MemoryStore::default());
    let source = FakeSource::new("linkedin", Behavior::Unauthorized);
    let scorer = TableScorer::new(&[]);

    let (id, outcome) = run(
        &store,
        pipeline(
            &store,
            registry_with(&[("linkedin", source)]),
            Some(scorer.clone() as Arc<dyn ScoringBackend>),
        ),
        ScraperParameters {
            platforms: vec!["linkedin".to_string()],
            search_expressions: vec!["cto".to_string()],
            job_titles: Vec::new(),
        },
    )
    .await;

    assert!(matches!(outcome, RunOutcome::FailedScraping { .. }));
    let campaign = store.campaign(id);
    assert_eq!(campaign.status(), CampaignStatus::FailedScraping);
    assert!(campaign
        .error_message
        .as_deref()
        .unwrap()
        .contains("linkedin"));
    assert!(!campaign.statuses.contains(&CampaignStatus::Scoring));
    assert!(store.leads_for(id).is_empty());
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.bulk_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_platform_is_skipped_and_healthy_records_are_kept() {
    let store = Arc::new(MemoryStore::default());
    let good = FakeSource::new("google_maps", Behavior::Records(scenario_records()));
    let rejected = FakeSource::new("linkedin", Behavior::Unauthorized);

    let (id, outcome) = run(
        &store,
        pipeline(
            &store,
            registry_with(&[("google_maps", good.clone()), ("linkedin", rejected.clone())]),
            None,
        ),
        ScraperParameters {
            platforms: vec!["google_maps".to_string(), "linkedin".to_string()],
            search_expressions: vec!["a".to_string(), "b".to_string()],
            job_titles: Vec::new(),
        },
    )
    .await;

    assert_eq!(
        outcome,
        RunOutcome::Ready {
            lead_count: 7,
            persisted: 7
        }
    );
    assert_eq!(good.calls.load(Ordering::SeqCst), 2);
    // Not called again once it has rejected our credentials.
    assert_eq!(rejected.calls.load(Ordering::SeqCst), 1);

    let campaign = store.campaign(id);
    assert_eq!(campaign.status(), CampaignStatus::Ready);
    assert!(campaign.error_message.is_none());
    assert!(campaign
        .logs
        .iter()
        .any(|l| l.contains("not calling linkedin again")));
    assert_eq!(store.leads_for(id).len(), 7);
}

#[tokio::test]
async fn empty_registry_fails_scraping() {
    let store = Arc::new(MemoryStore::default());

    let (id, outcome) = run(
        &store,
        pipeline(&store, SourceRegistry::new(), None),
        scenario_parameters(),
    )
    .await;

    assert!(matches!(outcome, RunOutcome::FailedScraping { .. }));
    let campaign = store.campaign(id);
    assert_eq!(campaign.status(), CampaignStatus::FailedScraping);
    assert_eq!(campaign.lead_count, 0);
}

#[tokio::test]
async fn panicking_backend_defaults_every_batch_and_still_reaches_ready() {
    let store = Arc::new(MemoryStore::default());
    let source = FakeSource::new("google_maps", Behavior::Records(scenario_records()));

    let (id, outcome) = run(
        &store,
        pipeline(
            &store,
            registry_with(&[("google_maps", source)]),
            Some(Arc::new(PanickingScorer) as Arc<dyn ScoringBackend>),
        ),
        scenario_parameters(),
    )
    .await;

    assert!(matches!(outcome, RunOutcome::Ready { lead_count: 7, .. }));
    let campaign = store.campaign(id);
    assert_eq!(campaign.status(), CampaignStatus::Ready);
    assert!(campaign
        .logs
        .iter()
        .any(|l| l.starts_with("1 of 1 scoring batches failed")));
    let leads = store.leads_for(id);
    assert_eq!(leads.len(), 7);
    assert!(leads.iter().all(|l| l.match_score == 50));
}

#[tokio::test]
async fn panicking_batch_does_not_cost_other_batches_their_scores() {
    let store = Arc::new(MemoryStore::default());
    let source = FakeSource::new("google_maps", Behavior::Records(scenario_records()));

    let (id, outcome) = run(
        &store,
        pipeline_with_settings(
            &store,
            registry_with(&[("google_maps", source)]),
            Some(Arc::new(PoisonedBatchScorer { poison: "Hank Hill" }) as Arc<dyn ScoringBackend>),
            ScoringSettings {
                batch_size: 2,
                ..ScoringSettings::default()
            },
        ),
        scenario_parameters(),
    )
    .await;

    assert_eq!(
        outcome,
        RunOutcome::Ready {
            lead_count: 7,
            persisted: 7
        }
    );
    let scores: Vec<(String, i32)> = store
        .leads_for(id)
        .into_iter()
        .map(|l| (l.full_name, l.match_score))
        .collect();
    let expected: Vec<(String, i32)> = [
        ("Alice Archer", 90),
        ("Bob Baker", 90),
        ("Carol Chen", 90),
        ("Dan Diaz", 90),
        ("Eve Evans", 90),
        ("Frank Foster", 90),
        ("Hank Hill", 50),
    ]
    .into_iter()
    .map(|(n, s)| (n.to_string(), s))
    .collect();
    assert_eq!(scores, expected);
    assert!(store
        .campaign(id)
        .logs
        .iter()
        .any(|l| l.starts_with("1 of 4 scoring batches failed")));
}

#[tokio::test]
async fn failing_pair_and_unknown_platform_are_skipped() {
    let store = Arc::new(MemoryStore::default());
    let good = FakeSource::new("google_maps", Behavior::Records(scenario_records()));
    let bad = FakeSource::new("linkedin", Behavior::ServerError);

    let (id, outcome) = run(
        &store,
        pipeline(
            &store,
            registry_with(&[("google_maps", good.clone()), ("linkedin", bad.clone())]),
            None,
        ),
        ScraperParameters {
            platforms: vec![
                "linkedin".to_string(),
                "tiktok".to_string(),
                "google_maps".to_string(),
            ],
            search_expressions: vec!["a".to_string(), "b".to_string()],
            job_titles: Vec::new(),
        },
    )
    .await;

    // Both expressions hit google_maps; the second pass is all duplicates.
    assert!(matches!(outcome, RunOutcome::Ready { lead_count: 7, .. }));
    assert_eq!(good.calls.load(Ordering::SeqCst), 2);
    assert_eq!(bad.calls.load(Ordering::SeqCst), 2);

    let logs = store.campaign(id).logs;
    assert_eq!(
        logs.iter()
            .filter(|l| l.contains("Skipped unsupported platform 'tiktok'"))
            .count(),
        2
    );
    assert!(logs.iter().any(|l| l.contains("Search on linkedin")));
}

#[tokio::test(start_paused = true)]
async fn hung_source_times_out_and_run_completes() {
    let store = Arc::new(MemoryStore::default());
    let hang = FakeSource::new("google_maps", Behavior::Hang);

    let (id, outcome) = run(
        &store,
        pipeline(&store, registry_with(&[("google_maps", hang)]), None),
        scenario_parameters(),
    )
    .await;

    assert_eq!(
        outcome,
        RunOutcome::Ready {
            lead_count: 0,
            persisted: 0
        }
    );
    assert!(store
        .campaign(id)
        .logs
        .iter()
        .any(|l| l.contains("timed out after 5s")));
}

#[tokio::test]
async fn bulk_failure_falls_back_to_row_inserts() {
    let store = Arc::new(MemoryStore::failing_bulk());
    let source = FakeSource::new("google_maps", Behavior::Records(scenario_records()));

    let (id, outcome) = run(
        &store,
        pipeline(&store, registry_with(&[("google_maps", source)]), None),
        scenario_parameters(),
    )
    .await;

    assert_eq!(
        outcome,
        RunOutcome::Ready {
            lead_count: 7,
            persisted: 7
        }
    );
    assert_eq!(store.bulk_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.single_calls.load(Ordering::SeqCst), 7);
    assert_eq!(store.leads_for(id).len(), 7);
}

#[tokio::test]
async fn concurrent_runs_do_not_share_leads() {
    let store = Arc::new(MemoryStore::default());
    let source = FakeSource::new("google_maps", Behavior::Records(scenario_records()));
    let launcher = CampaignLauncher::new(
        pipeline(&store, registry_with(&[("google_maps", source)]), None),
        Arc::new(RunRegistry::new()),
    );

    let a = launcher
        .trigger("owner-a", scenario_parameters())
        .await
        .unwrap();
    let b = launcher
        .trigger("owner-b", scenario_parameters())
        .await
        .unwrap();
    launcher.wait(a.id).await.unwrap();
    launcher.wait(b.id).await.unwrap();

    assert_eq!(store.leads_for(a.id).len(), 7);
    assert_eq!(store.leads_for(b.id).len(), 7);
    let ids: HashSet<i64> = [a.id, b.id].into_iter().collect();
    assert_eq!(ids.len(), 2);
}

// ---------------------------------------------------------------------------
// Launcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_returns_before_run_and_tracks_latest_per_owner() {
    let store = Arc::new(MemoryStore::default());
    let source = FakeSource::new("google_maps", Behavior::Records(scenario_records()));
    let launcher = CampaignLauncher::new(
        pipeline(&store, registry_with(&[("google_maps", source)]), None),
        Arc::new(RunRegistry::new()),
    );

    let first = launcher
        .trigger("owner-1", scenario_parameters())
        .await
        .unwrap();
    let second = launcher
        .trigger(" owner-1 ", scenario_parameters())
        .await
        .unwrap();

    assert_eq!(launcher.runs().latest_for_owner("owner-1"), Some(second));
    assert_eq!(store.campaign(second.id).owner_id, "owner-1");

    let outcome = launcher.wait(first.id).await.unwrap();
    assert_eq!(outcome.status(), Some(CampaignStatus::Ready));
    launcher.wait(second.id).await.unwrap();

    assert!(matches!(
        launcher.wait(first.id).await,
        Err(PipelineError::UnknownCampaign(_))
    ));
}

#[tokio::test]
async fn invalid_parameters_create_no_campaign() {
    let store = Arc::new(MemoryStore::default());
    let launcher = CampaignLauncher::new(
        pipeline(&store, SourceRegistry::new(), None),
        Arc::new(RunRegistry::new()),
    );

    let err = launcher
        .trigger(
            "owner-1",
            ScraperParameters {
                platforms: Vec::new(),
                search_expressions: vec!["x".to_string()],
                job_titles: Vec::new(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidParameters(_)));
    assert!(store.campaigns.lock().unwrap().is_empty());
}

#[tokio::test]
async fn shutdown_abandons_in_flight_run_without_terminal_status() {
    let store = Arc::new(MemoryStore::default());
    let hang = FakeSource::new("google_maps", Behavior::Hang);
    let launcher = CampaignLauncher::new(
        CampaignPipeline::new(
            store.clone(),
            store.clone(),
            registry_with(&[("google_maps", hang.clone())]),
            Scorer::new(None, ScoringSettings::default()),
            Duration::from_secs(3_600),
        ),
        Arc::new(RunRegistry::new()),
    );

    let ticket = launcher
        .trigger("owner-1", scenario_parameters())
        .await
        .unwrap();

    // Let the run reach the hanging fetch before cancelling.
    while hang.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    launcher.shutdown();

    let outcome = launcher.wait(ticket.id).await.unwrap();
    assert_eq!(outcome, RunOutcome::Abandoned);
    assert_eq!(store.campaign(ticket.id).status(), CampaignStatus::Scraping);
}

#[tokio::test]
async fn shutdown_during_scoring_tears_down_the_backend_call() {
    let store = Arc::new(MemoryStore::default());
    let source = FakeSource::new("google_maps", Behavior::Records(scenario_records()));
    let scorer = Arc::new(StuckScorer::default());
    let launcher = CampaignLauncher::new(
        pipeline(
            &store,
            registry_with(&[("google_maps", source)]),
            Some(scorer.clone() as Arc<dyn ScoringBackend>),
        ),
        Arc::new(RunRegistry::new()),
    );

    let ticket = launcher
        .trigger("owner-1", scenario_parameters())
        .await
        .unwrap();
    while !scorer.started.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }
    launcher.shutdown();

    assert_eq!(launcher.wait(ticket.id).await.unwrap(), RunOutcome::Abandoned);
    tokio::time::timeout(Duration::from_secs(5), async {
        while !scorer.dropped.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("scoring call kept running after shutdown");
    assert_eq!(store.campaign(ticket.id).status(), CampaignStatus::Scoring);
    assert!(store.leads_for(ticket.id).is_empty());
}
