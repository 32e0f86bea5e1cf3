//! Persistent store: one Sled tree per table, JSON row values.
//!
//! Tables cover the narrow read/write contracts the skill core needs:
//! execution plans, marketplace index, custom skills, the recommendation
//! dedup log, trust history, usage-evidence rows (plans, conversation turns,
//! activity events), signal-context rows (entities, leads, profile, signals),
//! and the notification/activity sinks. Rows are user-prefixed where the
//! table is user-scoped; time windows are filtered after the prefix scan.

use crate::shared::{
    ActivityEntry, ActivityEvent, CompanyProfile, ConversationTurn, ExecutionPlan,
    ImplicationPlan, Lead, MarketplaceSkill, Notification, RecommendationRecord, Signal,
    SkillEntry, TrackedEntity,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;

const TREE_CUSTOM_SKILLS: &str = "custom_skills";
const TREE_MARKETPLACE: &str = "marketplace_index";
const TREE_EXECUTION_PLANS: &str = "execution_plans";
const TREE_IMPLICATION_PLANS: &str = "implication_plans";
const TREE_RECOMMENDATION_LOG: &str = "recommendation_log";
const TREE_TRUST_HISTORY: &str = "trust_history";
const TREE_CONVERSATION_TURNS: &str = "conversation_turns";
const TREE_ACTIVITY_EVENTS: &str = "activity_events";
const TREE_ENTITIES: &str = "entities";
const TREE_LEADS: &str = "leads";
const TREE_PROFILES: &str = "profiles";
const TREE_SIGNALS: &str = "signals";
const TREE_NOTIFICATIONS: &str = "notifications";
const TREE_ACTIVITY_LOG: &str = "activity_log";

/// Store failure. Callers at pipeline seams log these and degrade; nothing
/// here is process-fatal.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Sled-backed store with a hot cache on the read-mostly custom-skill path.
pub struct Store {
    db: sled::Db,
    /// user_id -> cached custom skills. Invalidated on write.
    custom_cache: Arc<DashMap<String, Vec<SkillEntry>>>,
}

impl Store {
    /// Opens or creates the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            custom_cache: Arc::new(DashMap::new()),
        })
    }

    fn put_row<T: Serialize>(&self, tree: &str, key: &str, row: &T) -> Result<(), StoreError> {
        let tree = self.db.open_tree(tree)?;
        tree.insert(key.as_bytes(), serde_json::to_vec(row)?)?;
        Ok(())
    }

    fn get_row<T: DeserializeOwned>(&self, tree: &str, key: &str) -> Result<Option<T>, StoreError> {
        let tree = self.db.open_tree(tree)?;
        match tree.get(key.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// Scans rows under `prefix` in key order, skipping rows that fail to parse.
    fn scan_rows<T: DeserializeOwned>(&self, tree: &str, prefix: &str) -> Result<Vec<T>, StoreError> {
        let tree_handle = self.db.open_tree(tree)?;
        let mut rows = Vec::new();
        for item in tree_handle.scan_prefix(prefix.as_bytes()) {
            let (key, raw) = item?;
            match serde_json::from_slice::<T>(&raw) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    tracing::warn!(
                        target: "axon::store",
                        tree,
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "skipping unparseable row"
                    );
                }
            }
        }
        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Custom skills
    // -------------------------------------------------------------------------

    /// Upserts a tenant-authored skill under `{user_id}/{entry.id}`.
    pub fn put_custom_skill(&self, user_id: &str, entry: &SkillEntry) -> Result<(), StoreError> {
        let key = format!("{}/{}", user_id, entry.id);
        self.put_row(TREE_CUSTOM_SKILLS, &key, entry)?;
        self.custom_cache.remove(user_id);
        Ok(())
    }

    /// All custom skills registered by one user, in key order.
    pub fn custom_skills_for_user(&self, user_id: &str) -> Result<Vec<SkillEntry>, StoreError> {
        if let Some(cached) = self.custom_cache.get(user_id) {
            return Ok(cached.clone());
        }
        let rows: Vec<SkillEntry> = self.scan_rows(TREE_CUSTOM_SKILLS, &format!("{}/", user_id))?;
        self.custom_cache.insert(user_id.to_string(), rows.clone());
        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Marketplace index
    // -------------------------------------------------------------------------

    /// Wholesale-replaces the marketplace index with the given entries.
    pub fn replace_marketplace(&self, entries: &[MarketplaceSkill]) -> Result<usize, StoreError> {
        let tree = self.db.open_tree(TREE_MARKETPLACE)?;
        tree.clear()?;
        for entry in entries {
            tree.insert(entry.id.as_bytes(), serde_json::to_vec(entry)?)?;
        }
        Ok(entries.len())
    }

    pub fn marketplace_entries(&self) -> Result<Vec<MarketplaceSkill>, StoreError> {
        self.scan_rows(TREE_MARKETPLACE, "")
    }

    // -------------------------------------------------------------------------
    // Execution and implication plans
    // -------------------------------------------------------------------------

    pub fn put_execution_plan(&self, plan: &ExecutionPlan) -> Result<(), StoreError> {
        let key = format!("{}/{}", plan.user_id, plan.id);
        self.put_row(TREE_EXECUTION_PLANS, &key, plan)
    }

    pub fn get_execution_plan(
        &self,
        user_id: &str,
        plan_id: &str,
    ) -> Result<Option<ExecutionPlan>, StoreError> {
        self.get_row(TREE_EXECUTION_PLANS, &format!("{}/{}", user_id, plan_id))
    }

    /// Execution plans for a user created at or after `since`.
    pub fn execution_plans_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExecutionPlan>, StoreError> {
        let rows: Vec<ExecutionPlan> =
            self.scan_rows(TREE_EXECUTION_PLANS, &format!("{}/", user_id))?;
        Ok(rows.into_iter().filter(|p| p.created_at >= since).collect())
    }

    pub fn put_implication_plan(&self, plan: &ImplicationPlan) -> Result<(), StoreError> {
        let key = format!("{}/{}", plan.user_id, plan.id);
        self.put_row(TREE_IMPLICATION_PLANS, &key, plan)
    }

    pub fn get_implication_plan(
        &self,
        user_id: &str,
        plan_id: &str,
    ) -> Result<Option<ImplicationPlan>, StoreError> {
        self.get_row(TREE_IMPLICATION_PLANS, &format!("{}/{}", user_id, plan_id))
    }

    // -------------------------------------------------------------------------
    // Recommendation dedup log
    // -------------------------------------------------------------------------

    pub fn record_recommendation(&self, record: &RecommendationRecord) -> Result<(), StoreError> {
        let key = format!(
            "{}/{}/{}",
            record.user_id,
            record.created_at.to_rfc3339(),
            uuid::Uuid::new_v4()
        );
        self.put_row(TREE_RECOMMENDATION_LOG, &key, record)
    }

    pub fn recommendations_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<RecommendationRecord>, StoreError> {
        let rows: Vec<RecommendationRecord> =
            self.scan_rows(TREE_RECOMMENDATION_LOG, &format!("{}/", user_id))?;
        Ok(rows.into_iter().filter(|r| r.created_at >= since).collect())
    }

    // -------------------------------------------------------------------------
    // Trust history (autonomy service backing)
    // -------------------------------------------------------------------------

    pub fn put_trust_row<T: Serialize>(&self, key: &str, row: &T) -> Result<(), StoreError> {
        self.put_row(TREE_TRUST_HISTORY, key, row)
    }

    pub fn get_trust_row<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.get_row(TREE_TRUST_HISTORY, key)
    }

    // -------------------------------------------------------------------------
    // Usage evidence
    // -------------------------------------------------------------------------

    pub fn put_conversation_turn(&self, turn: &ConversationTurn) -> Result<(), StoreError> {
        let key = format!(
            "{}/{}/{}",
            turn.user_id,
            turn.created_at.to_rfc3339(),
            uuid::Uuid::new_v4()
        );
        self.put_row(TREE_CONVERSATION_TURNS, &key, turn)
    }

    /// Conversation turns no skill handled, newest last, capped at `limit`.
    pub fn unhandled_turns_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, StoreError> {
        let rows: Vec<ConversationTurn> =
            self.scan_rows(TREE_CONVERSATION_TURNS, &format!("{}/", user_id))?;
        Ok(rows
            .into_iter()
            .filter(|t| !t.handled && t.created_at >= since)
            .take(limit)
            .collect())
    }

    pub fn put_activity_event(&self, event: &ActivityEvent) -> Result<(), StoreError> {
        let key = format!(
            "{}/{}/{}",
            event.user_id,
            event.created_at.to_rfc3339(),
            uuid::Uuid::new_v4()
        );
        self.put_row(TREE_ACTIVITY_EVENTS, &key, event)
    }

    pub fn activity_events_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityEvent>, StoreError> {
        let rows: Vec<ActivityEvent> =
            self.scan_rows(TREE_ACTIVITY_EVENTS, &format!("{}/", user_id))?;
        Ok(rows.into_iter().filter(|e| e.created_at >= since).collect())
    }

    // -------------------------------------------------------------------------
    // Signal context
    // -------------------------------------------------------------------------

    pub fn put_entity(&self, user_id: &str, entity: &TrackedEntity) -> Result<(), StoreError> {
        let key = format!("{}/{}", user_id, entity.name.to_lowercase());
        self.put_row(TREE_ENTITIES, &key, entity)
    }

    pub fn entities_for_user(&self, user_id: &str) -> Result<Vec<TrackedEntity>, StoreError> {
        self.scan_rows(TREE_ENTITIES, &format!("{}/", user_id))
    }

    pub fn put_lead(&self, user_id: &str, lead: &Lead) -> Result<(), StoreError> {
        let key = format!("{}/{}", user_id, lead.id);
        self.put_row(TREE_LEADS, &key, lead)
    }

    /// Leads with status "active", capped at `limit`.
    pub fn active_leads(&self, user_id: &str, limit: usize) -> Result<Vec<Lead>, StoreError> {
        let rows: Vec<Lead> = self.scan_rows(TREE_LEADS, &format!("{}/", user_id))?;
        Ok(rows
            .into_iter()
            .filter(|l| l.status.eq_ignore_ascii_case("active"))
            .take(limit)
            .collect())
    }

    pub fn put_profile(&self, user_id: &str, profile: &CompanyProfile) -> Result<(), StoreError> {
        self.put_row(TREE_PROFILES, user_id, profile)
    }

    pub fn company_profile(&self, user_id: &str) -> Result<Option<CompanyProfile>, StoreError> {
        self.get_row(TREE_PROFILES, user_id)
    }

    pub fn put_signal(&self, signal: &Signal) -> Result<(), StoreError> {
        let key = format!(
            "{}/{}/{}",
            signal.user_id,
            signal.detected_at.to_rfc3339(),
            signal.id
        );
        self.put_row(TREE_SIGNALS, &key, signal)
    }

    /// The `limit` most recent signals at or after `since`, newest first.
    pub fn signals_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Signal>, StoreError> {
        let mut rows: Vec<Signal> = self.scan_rows(TREE_SIGNALS, &format!("{}/", user_id))?;
        rows.retain(|s| s.detected_at >= since);
        rows.reverse();
        rows.truncate(limit);
        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Sinks
    // -------------------------------------------------------------------------

    pub fn push_notification(&self, row: &Notification) -> Result<(), StoreError> {
        let key = format!("{}/{}/{}", row.user_id, row.created_at.to_rfc3339(), row.id);
        self.put_row(TREE_NOTIFICATIONS, &key, row)
    }

    pub fn notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        self.scan_rows(TREE_NOTIFICATIONS, &format!("{}/", user_id))
    }

    pub fn push_activity(&self, row: &ActivityEntry) -> Result<(), StoreError> {
        let key = format!("{}/{}/{}", row.user_id, row.created_at.to_rfc3339(), row.id);
        self.put_row(TREE_ACTIVITY_LOG, &key, row)
    }

    pub fn activity_for_user(&self, user_id: &str) -> Result<Vec<ActivityEntry>, StoreError> {
        self.scan_rows(TREE_ACTIVITY_LOG, &format!("{}/", user_id))
    }
}
