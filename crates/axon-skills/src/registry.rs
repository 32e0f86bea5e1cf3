//! Unified skill catalog over the four provenances.
//!
//! One registry instance is constructed per process and passed by dependency
//! injection. Catalog order is always skill-type priority
//! (native < definition < custom < external) with registration order as the
//! tie-break; task ranking orders by relevance first.

use crate::capability::{entry_for, Capability};
use crate::definitions::{SkillDefinition, SKILL_DEFINITIONS};
use crate::natives::native_capabilities;
use crate::scoring::keyword_relevance;
use axon_core::{
    MarketplaceSkill, RankedSkill, SkillEntry, SkillIndex, SkillType, Store, TaskSpec, TrustLevel,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Roles granted to marketplace-external skills, which declare none themselves.
const ALL_AGENT_ROLES: [&str; 3] = ["hunter", "analyst", "closer"];

/// A skill source handed to `register`. The provenance decides how the entry
/// is ranked: only `Native` carries a live instance.
pub enum SkillSource {
    Native(Arc<dyn Capability>),
    Definition(&'static SkillDefinition),
    Custom(SkillEntry),
    External(SkillEntry),
}

/// Ranking-relevant provenance of a registered entry.
#[derive(Clone)]
enum Provenance {
    Native(Arc<dyn Capability>),
    Definition,
    Custom,
    External,
}

#[derive(Clone)]
struct Registered {
    entry: SkillEntry,
    provenance: Provenance,
}

/// Aggregates native, LLM-defined, tenant-custom, and marketplace-external
/// skills into one priority-ordered catalog.
pub struct SkillRegistry {
    store: Arc<Store>,
    index: Arc<dyn SkillIndex>,
    entries: RwLock<Vec<Registered>>,
    initialized: AtomicBool,
}

impl SkillRegistry {
    pub fn new(store: Arc<Store>, index: Arc<dyn SkillIndex>) -> Self {
        Self {
            store,
            index,
            entries: RwLock::new(Vec::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Idempotent insert keyed by the provenance-prefixed id. Returns false
    /// when an entry with the same id is already registered.
    pub fn register(&self, source: SkillSource) -> bool {
        let registered = match source {
            SkillSource::Native(capability) => Registered {
                entry: entry_for(capability.as_ref()),
                provenance: Provenance::Native(capability),
            },
            SkillSource::Definition(definition) => Registered {
                entry: definition.entry(),
                provenance: Provenance::Definition,
            },
            SkillSource::Custom(mut entry) => {
                entry.skill_type = SkillType::Custom;
                entry.id = SkillEntry::skill_id(SkillType::Custom, &entry.name);
                Registered {
                    entry,
                    provenance: Provenance::Custom,
                }
            }
            SkillSource::External(mut entry) => {
                entry.skill_type = SkillType::External;
                entry.id = SkillEntry::skill_id(SkillType::External, &entry.name);
                Registered {
                    entry,
                    provenance: Provenance::External,
                }
            }
        };

        let Ok(mut entries) = self.entries.write() else {
            return false;
        };
        if entries.iter().any(|r| r.entry.id == registered.entry.id) {
            return false;
        }
        entries.push(registered);
        true
    }

    /// One-shot bootstrap: registers the fixed native and definition sets,
    /// then loads external entries from storage. Custom skills stay
    /// user-scoped and are merged per query. Calling this again is a no-op.
    /// Storage errors are logged and contribute zero rows; the registry
    /// stays usable with whatever loaded successfully.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        for capability in native_capabilities() {
            self.register(SkillSource::Native(capability));
        }
        for definition in SKILL_DEFINITIONS {
            self.register(SkillSource::Definition(definition));
        }
        match self.store.marketplace_entries() {
            Ok(rows) => {
                for mp in rows {
                    self.register(SkillSource::External(external_entry(&mp)));
                }
            }
            Err(e) => {
                tracing::warn!(target: "axon::registry", error = %e, "external skill load failed");
            }
        }
        let count = self.entries.read().map(|e| e.len()).unwrap_or(0);
        tracing::info!(target: "axon::registry", count, "skill catalog initialized");
    }

    fn ensure_initialized(&self) {
        if !self.initialized.load(Ordering::Acquire) {
            self.initialize();
        }
    }

    fn snapshot(&self) -> Vec<Registered> {
        self.entries
            .read()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Case-insensitive substring search over name+description, merged with
    /// a user-scoped custom-skill lookup. An empty query returns the full
    /// filtered catalog.
    pub fn search(
        &self,
        query: &str,
        user_id: &str,
        trust_level: Option<TrustLevel>,
        life_sciences_relevant: Option<bool>,
    ) -> Vec<SkillEntry> {
        self.ensure_initialized();
        let needle = query.trim().to_lowercase();

        let mut results: Vec<SkillEntry> =
            self.snapshot().into_iter().map(|r| r.entry).collect();
        match self.store.custom_skills_for_user(user_id) {
            Ok(rows) => {
                for entry in rows {
                    if !results.iter().any(|e| e.id == entry.id) {
                        results.push(entry);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(target: "axon::registry", error = %e, "user custom lookup failed");
            }
        }

        results.retain(|e| {
            let text_hit = needle.is_empty()
                || e.name.to_lowercase().contains(&needle)
                || e.description.to_lowercase().contains(&needle);
            text_hit
                && trust_level.map_or(true, |t| e.trust_level == t)
                && life_sciences_relevant.map_or(true, |ls| e.life_sciences_relevant == ls)
        });
        results.sort_by_key(|e| e.skill_type.priority());
        results
    }

    /// Ranks the catalog against a task. Entries backed by a live instance
    /// are scored by their own applicability check (a raised error scores 0
    /// for that entry only); all others use the keyword heuristic. Entries
    /// scoring exactly 0 are excluded.
    pub async fn get_for_task(&self, task: &TaskSpec) -> Vec<RankedSkill> {
        self.ensure_initialized();
        let mut ranked = Vec::new();
        for registered in self.snapshot() {
            let relevance = match &registered.provenance {
                Provenance::Native(capability) => match capability.can_handle(task).await {
                    Ok(score) => score.clamp(0.0, 1.0),
                    Err(e) => {
                        tracing::debug!(
                            target: "axon::registry",
                            skill = %registered.entry.id,
                            error = %e,
                            "applicability check failed, scoring 0"
                        );
                        0.0
                    }
                },
                Provenance::Definition | Provenance::Custom | Provenance::External => {
                    keyword_relevance(task, &registered.entry.name, &registered.entry.description)
                }
            };
            if relevance > 0.0 {
                ranked.push(RankedSkill {
                    entry: registered.entry,
                    relevance,
                });
            }
        }
        ranked.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.entry.skill_type.priority().cmp(&b.entry.skill_type.priority()))
        });
        ranked
    }

    /// Entries whose agent_types contain the given role. An unknown role
    /// returns empty, not an error.
    pub fn get_for_agent(&self, agent_type: &str) -> Vec<SkillEntry> {
        self.ensure_initialized();
        let mut results: Vec<SkillEntry> = self
            .snapshot()
            .into_iter()
            .map(|r| r.entry)
            .filter(|e| e.agent_types.iter().any(|a| a == agent_type))
            .collect();
        results.sort_by_key(|e| e.skill_type.priority());
        results
    }

    /// The full catalog, including the user's custom skills, in priority order.
    pub fn get_all_available(&self, user_id: &str) -> Vec<SkillEntry> {
        self.search("", user_id, None, None)
    }

    /// Wholesale-replaces the EXTERNAL entries via marketplace sync + reload.
    /// All other provenances are untouched. A failed sync keeps the current
    /// external set and reloads whatever the local index holds.
    pub async fn refresh_external(&self) {
        self.ensure_initialized();
        if let Err(e) = self.index.sync_from_marketplace().await {
            tracing::warn!(target: "axon::registry", error = %e, "marketplace sync failed");
        }
        let rows = match self.store.marketplace_entries() {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(target: "axon::registry", error = %e, "external reload failed");
                return;
            }
        };
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        entries.retain(|r| !matches!(r.provenance, Provenance::External));
        for mp in rows {
            let entry = external_entry(&mp);
            if !entries.iter().any(|r| r.entry.id == entry.id) {
                entries.push(Registered {
                    entry,
                    provenance: Provenance::External,
                });
            }
        }
    }

    /// Folds one execution outcome into an entry's performance metrics.
    /// This is the only mutation path for metrics.
    pub fn record_outcome(&self, skill_id: &str, success: bool) {
        if let Ok(mut entries) = self.entries.write() {
            if let Some(registered) = entries.iter_mut().find(|r| r.entry.id == skill_id) {
                registered.entry.performance_metrics.record(success);
            }
        }
    }
}

/// Maps a marketplace entry onto an EXTERNAL catalog entry. Marketplace
/// skills declare no agent roles, so all roles may see them.
fn external_entry(mp: &MarketplaceSkill) -> SkillEntry {
    SkillEntry {
        id: SkillEntry::skill_id(SkillType::External, &mp.name),
        name: mp.name.clone(),
        description: mp.description.clone(),
        skill_type: SkillType::External,
        agent_types: ALL_AGENT_ROLES.iter().map(|s| s.to_string()).collect(),
        trust_level: mp.trust_level,
        data_classes: vec![],
        life_sciences_relevant: mp.life_sciences_relevant,
        performance_metrics: Default::default(),
    }
}
