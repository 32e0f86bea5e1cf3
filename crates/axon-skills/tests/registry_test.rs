//! Integration test: unified skill catalog — verifies provenance ordering,
//! task ranking, agent scoping, and external refresh semantics.
//!
//! ## Scenarios
//! 1. Catalog queries order by provenance priority with stable ties.
//! 2. Task ranking never returns zero-relevance entries and orders by relevance.
//! 3. A capability whose applicability check raises scores 0 and is filtered out.
//! 4. Agent scoping: "hunter" sees hunter skills, "analyst" does not.
//! 5. Search merges the user-scoped custom lookup and applies filters.
//! 6. refresh_external wholesale-replaces EXTERNAL entries only.

use axon_core::{
    MarketplaceIndex, MarketplaceSkill, SkillEntry, SkillType, Store, TaskSpec, TrustLevel,
};
use axon_skills::{Capability, SkillRegistry, SkillSource};
use std::sync::Arc;

fn setup() -> (tempfile::TempDir, Arc<Store>, SkillRegistry) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(Store::open(dir.path().join("db")).expect("open store"));
    let index = Arc::new(MarketplaceIndex::new(Arc::clone(&store), None));
    let registry = SkillRegistry::new(Arc::clone(&store), index);
    (dir, store, registry)
}

fn custom_entry(name: &str, description: &str) -> SkillEntry {
    SkillEntry {
        id: String::new(),
        name: name.to_string(),
        description: description.to_string(),
        skill_type: SkillType::Custom,
        agent_types: vec!["hunter".to_string()],
        trust_level: TrustLevel::User,
        data_classes: vec![],
        life_sciences_relevant: false,
        performance_metrics: Default::default(),
    }
}

fn marketplace_entry(name: &str) -> MarketplaceSkill {
    MarketplaceSkill {
        id: format!("mp-{}", name.to_lowercase()),
        name: name.to_string(),
        description: format!("{} from the marketplace", name),
        tags: vec![],
        trust_level: TrustLevel::Verified,
        permissions: vec![],
        data_access: "read-only".to_string(),
        life_sciences_relevant: false,
        install_count: 5,
    }
}

/// Capability whose applicability check always raises.
struct BrokenSkill;

#[async_trait::async_trait]
impl Capability for BrokenSkill {
    fn name(&self) -> &'static str {
        "BrokenSkill"
    }
    fn description(&self) -> &'static str {
        "always raises from its applicability check"
    }
    fn agent_types(&self) -> &'static [&'static str] {
        &["hunter"]
    }
    async fn can_handle(
        &self,
        _task: &TaskSpec,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        Err("backend unreachable".into())
    }
}

// ===========================================================================
// Scenario 1: provenance ordering
// ===========================================================================

#[tokio::test]
async fn catalog_is_ordered_by_provenance_priority() {
    let (_dir, store, registry) = setup();
    store
        .replace_marketplace(&[marketplace_entry("TrialTracker")])
        .unwrap();
    store
        .put_custom_skill("u1", &{
            let mut e = custom_entry("QuotaTracker", "tracks quota attainment");
            e.id = SkillEntry::skill_id(SkillType::Custom, "QuotaTracker");
            e
        })
        .unwrap();
    registry.initialize();

    let all = registry.get_all_available("u1");
    assert!(all.len() >= 4, "expected all four provenances, got {}", all.len());
    let priorities: Vec<u8> = all.iter().map(|e| e.skill_type.priority()).collect();
    let mut sorted = priorities.clone();
    sorted.sort();
    assert_eq!(priorities, sorted, "catalog not in priority order");
    assert_eq!(all.first().unwrap().skill_type, SkillType::Native);
    assert_eq!(all.last().unwrap().skill_type, SkillType::External);
}

// ===========================================================================
// Scenario 2: task ranking excludes zero relevance
// ===========================================================================

#[tokio::test]
async fn task_ranking_excludes_zeros_and_orders_by_relevance() {
    let (_dir, _store, registry) = setup();
    registry.initialize();

    let ranked = registry
        .get_for_task(&TaskSpec::new("enrich_lead", "research the new oncology lead"))
        .await;
    assert!(!ranked.is_empty());
    assert!(ranked.iter().all(|r| r.relevance > 0.0));
    for pair in ranked.windows(2) {
        assert!(pair[0].relevance >= pair[1].relevance);
    }
    assert_eq!(ranked[0].entry.name, "LeadEnrichment");

    // An empty task yields no results at all.
    let empty = registry.get_for_task(&TaskSpec::default()).await;
    assert!(empty.is_empty());
}

// ===========================================================================
// Scenario 3: broken capability never aborts ranking
// ===========================================================================

#[tokio::test]
async fn broken_capability_scores_zero_and_is_filtered() {
    let (_dir, _store, registry) = setup();
    registry.register(SkillSource::Native(Arc::new(BrokenSkill)));
    registry.initialize();

    let ranked = registry
        .get_for_task(&TaskSpec::new("update_crm", "sync the account status"))
        .await;
    assert!(!ranked.is_empty(), "other skills must still rank");
    assert!(ranked.iter().all(|r| r.entry.name != "BrokenSkill"));
}

// ===========================================================================
// Scenario 4: agent scoping
// ===========================================================================

#[tokio::test]
async fn agent_scoping_filters_by_role() {
    let (_dir, _store, registry) = setup();
    registry.initialize();

    let hunter = registry.get_for_agent("hunter");
    assert!(hunter.iter().any(|e| e.name == "LeadEnrichment"));

    let analyst = registry.get_for_agent("analyst");
    assert!(analyst.iter().all(|e| e.name != "LeadEnrichment"));
    assert!(analyst.iter().any(|e| e.name == "CompetitorScan"));

    assert!(registry.get_for_agent("janitor").is_empty());
}

// ===========================================================================
// Scenario 5: search semantics
// ===========================================================================

#[tokio::test]
async fn search_merges_custom_lookup_and_applies_filters() {
    let (_dir, store, registry) = setup();
    store
        .put_custom_skill("u1", &{
            let mut e = custom_entry("QuotaTracker", "tracks quarterly quota attainment");
            e.id = SkillEntry::skill_id(SkillType::Custom, "QuotaTracker");
            e
        })
        .unwrap();
    registry.initialize();

    let hits = registry.search("quota", "u1", None, None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "QuotaTracker");

    // Another user does not see u1's custom skill.
    let other = registry.search("quota", "u2", None, None);
    assert!(other.iter().all(|e| e.name != "QuotaTracker"));

    // Empty query returns the full filtered catalog.
    let core_only = registry.search("", "u1", Some(TrustLevel::Core), None);
    assert!(!core_only.is_empty());
    assert!(core_only.iter().all(|e| e.trust_level == TrustLevel::Core));
}

// ===========================================================================
// Scenario 6: external refresh is wholesale
// ===========================================================================

#[tokio::test]
async fn refresh_external_replaces_only_external_entries() {
    let (_dir, store, registry) = setup();
    store
        .replace_marketplace(&[marketplace_entry("TrialTracker")])
        .unwrap();
    registry.initialize();

    let before = registry.get_all_available("u1");
    let natives_before = before
        .iter()
        .filter(|e| e.skill_type == SkillType::Native)
        .count();
    assert!(before.iter().any(|e| e.name == "TrialTracker"));

    // Marketplace content changes out from under the registry.
    store
        .replace_marketplace(&[marketplace_entry("GrantRadar")])
        .unwrap();
    registry.refresh_external().await;

    let after = registry.get_all_available("u1");
    assert!(after.iter().any(|e| e.name == "GrantRadar"));
    assert!(after.iter().all(|e| e.name != "TrialTracker"));
    let natives_after = after
        .iter()
        .filter(|e| e.skill_type == SkillType::Native)
        .count();
    assert_eq!(natives_before, natives_after, "other provenances must be untouched");
}
