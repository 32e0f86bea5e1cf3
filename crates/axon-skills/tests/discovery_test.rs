//! Integration test: gap discovery — verifies evidence mining, LLM
//! degradation paths, composite ranking, dedup, and delivery.
//!
//! ## Scenarios
//! 1. Zero usage evidence in 30 days: `analyze_usage_gaps` returns empty
//!    with no LLM call made.
//! 2. Full run: evidence → gaps → marketplace matches → one notification
//!    and one activity entry per recommendation.
//! 3. Dedup: a gap overlapping >50% with a prior-week recommendation is
//!    excluded; one overlapping ≤50% is retained.
//! 4. Message drafting failure falls back to the deterministic template.
//! 5. Composite score ranks higher-installed skills first, all else equal.

use axon_core::{
    ActivityEvent, ChatTurn, ConversationTurn, GapReport, GapType, LanguageModel,
    MarketplaceIndex, MarketplaceSkill, RecommendationRecord, Store, StoreActivityLog,
    StoreNotifier, TrustLevel,
};
use axon_skills::SkillDiscoveryAgent;
use chrono::{Duration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted language model: pops queued responses, counts calls.
struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(responses: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(
        &self,
        _messages: &[ChatTurn],
        _system: Option<&str>,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(e.into()),
            None => Err("no scripted response".into()),
        }
    }
}

fn agent_with(
    store: Arc<Store>,
    llm: Arc<ScriptedModel>,
) -> SkillDiscoveryAgent {
    let index = Arc::new(MarketplaceIndex::new(Arc::clone(&store), None));
    let notifier = Arc::new(StoreNotifier::new(Arc::clone(&store)));
    let activity = Arc::new(StoreActivityLog::new(Arc::clone(&store)));
    SkillDiscoveryAgent::new(store, llm, index, notifier, activity, 30_000)
}

fn temp_store() -> (tempfile::TempDir, Arc<Store>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(Store::open(dir.path().join("db")).expect("open store"));
    (dir, store)
}

fn marketplace_skill(id: &str, name: &str, installs: u64) -> MarketplaceSkill {
    MarketplaceSkill {
        id: id.to_string(),
        name: name.to_string(),
        description: "automated crm export and reporting".to_string(),
        tags: vec!["crm".to_string(), "export".to_string()],
        trust_level: TrustLevel::Verified,
        permissions: vec![],
        data_access: "read-only".to_string(),
        life_sciences_relevant: false,
        install_count: installs,
    }
}

fn gap(keywords: &[&str]) -> GapReport {
    GapReport {
        user_id: "u1".to_string(),
        gap_type: GapType::ManualWorkaround,
        description: "weekly crm exports are assembled by hand".to_string(),
        evidence: vec![],
        frequency: 4,
        last_seen: Utc::now(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn seed_evidence(store: &Store) {
    let now = Utc::now();
    for i in 0..4 {
        store
            .put_activity_event(&ActivityEvent {
                user_id: "u1".to_string(),
                action: "export crm report".to_string(),
                created_at: now - Duration::days(i),
            })
            .unwrap();
    }
    store
        .put_conversation_turn(&ConversationTurn {
            user_id: "u1".to_string(),
            content: "can you export the crm pipeline to a sheet?".to_string(),
            handled: false,
            created_at: now - Duration::days(2),
        })
        .unwrap();
}

const GAPS_JSON: &str = r#"```json
[
  {
    "gap_type": "manual_workaround",
    "description": "weekly crm exports are assembled by hand",
    "evidence": ["manual action 'export crm report' repeated 4 times"],
    "frequency": 4,
    "keywords": ["crm", "export"]
  }
]
```"#;

// ===========================================================================
// Scenario 1: zero evidence makes no LLM call
// ===========================================================================

#[tokio::test]
async fn zero_evidence_short_circuits_without_llm() {
    let (_dir, store) = temp_store();
    let llm = ScriptedModel::new(vec![]);
    let agent = agent_with(store, Arc::clone(&llm));

    let gaps = agent.analyze_usage_gaps("u1").await;
    assert!(gaps.is_empty());
    assert_eq!(llm.call_count(), 0, "no LLM call on zero evidence");
}

// ===========================================================================
// Scenario 2: full run delivers exactly one notification + activity entry
// ===========================================================================

#[tokio::test]
async fn full_run_delivers_recommendation() {
    let (_dir, store) = temp_store();
    seed_evidence(&store);
    store
        .replace_marketplace(&[marketplace_skill("mp-1", "Crm Export Bot", 200)])
        .unwrap();

    let llm = ScriptedModel::new(vec![
        Ok(GAPS_JSON.to_string()),
        Ok(r#"["I noticed you export CRM reports weekly. Crm Export Bot can automate that — automated crm export and reporting. It needs read-only access. Install it?"]"#.to_string()),
    ]);
    let agent = agent_with(Arc::clone(&store), Arc::clone(&llm));

    let delivered = agent.run("u1").await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].skills[0].skill.id, "mp-1");
    assert_eq!(llm.call_count(), 2);

    assert_eq!(store.notifications_for_user("u1").unwrap().len(), 1);
    assert_eq!(store.activity_for_user("u1").unwrap().len(), 1);
    // The dedup record is written for the next run.
    let recent = store
        .recommendations_since("u1", Utc::now() - Duration::days(7))
        .unwrap();
    assert_eq!(recent.len(), 1);
}

// ===========================================================================
// Scenario 3: 7-day keyword dedup
// ===========================================================================

#[tokio::test]
async fn dedup_suppresses_majority_overlap_only() {
    let (_dir, store) = temp_store();
    store
        .record_recommendation(&RecommendationRecord {
            user_id: "u1".to_string(),
            keywords: vec!["crm".to_string(), "export".to_string()],
            created_at: Utc::now() - Duration::days(2),
        })
        .unwrap();
    store
        .replace_marketplace(&[marketplace_skill("mp-1", "Crm Export Bot", 200)])
        .unwrap();

    let llm = ScriptedModel::new(vec![Err("drafting should not matter".to_string())]);
    let agent = agent_with(Arc::clone(&store), llm);

    // Both keywords already delivered: 2/2 overlap > 50% => suppressed.
    let duplicate = gap(&["crm", "export"]);
    let matches = agent.search_marketplace(&duplicate).await;
    let delivered = agent.recommend("u1", vec![(duplicate, matches)]).await;
    assert!(delivered.is_empty());

    // One of three keywords delivered: 1/3 overlap <= 50% => retained.
    let fresh = gap(&["crm", "forecast", "territory"]);
    let matches = agent.search_marketplace(&fresh).await;
    assert!(!matches.is_empty());
    let delivered = agent.recommend("u1", vec![(fresh, matches)]).await;
    assert_eq!(delivered.len(), 1);
}

// ===========================================================================
// Scenario 4: drafting failure falls back to the template
// ===========================================================================

#[tokio::test]
async fn drafting_failure_uses_template() {
    let (_dir, store) = temp_store();
    store
        .replace_marketplace(&[marketplace_skill("mp-1", "Crm Export Bot", 200)])
        .unwrap();
    let llm = ScriptedModel::new(vec![Err("model timeout".to_string())]);
    let agent = agent_with(Arc::clone(&store), llm);

    let g = gap(&["crm", "export"]);
    let matches = agent.search_marketplace(&g).await;
    let delivered = agent.recommend("u1", vec![(g, matches)]).await;
    assert_eq!(delivered.len(), 1, "delivery must not be blocked by drafting");
    assert!(delivered[0].message.contains("Crm Export Bot"));
    assert!(delivered[0].message.contains("read-only"));
    assert_eq!(store.notifications_for_user("u1").unwrap().len(), 1);
}

// ===========================================================================
// Scenario 5: install count breaks ties upward
// ===========================================================================

#[tokio::test]
async fn higher_install_count_ranks_first_all_else_equal() {
    let (_dir, store) = temp_store();
    store
        .replace_marketplace(&[
            marketplace_skill("mp-small", "Crm Export Bot", 3),
            marketplace_skill("mp-big", "Crm Export Pro", 5_000),
        ])
        .unwrap();
    let llm = ScriptedModel::new(vec![]);
    let agent = agent_with(Arc::clone(&store), llm);

    let matches = agent.search_marketplace(&gap(&["crm", "export"])).await;
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].skill.id, "mp-big");
    assert!(matches[0].composite_score > matches[1].composite_score);
}

// ===========================================================================
// A gap with no keywords yields no matches
// ===========================================================================

#[tokio::test]
async fn empty_keywords_yield_no_matches() {
    let (_dir, store) = temp_store();
    store
        .replace_marketplace(&[marketplace_skill("mp-1", "Crm Export Bot", 200)])
        .unwrap();
    let llm = ScriptedModel::new(vec![]);
    let agent = agent_with(Arc::clone(&store), llm);

    assert!(agent.search_marketplace(&gap(&[])).await.is_empty());
}
