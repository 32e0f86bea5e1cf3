//! Shared domain types used across the axon crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-step duration placeholder for `ExecutionPlan::estimated_duration_ms`.
/// Not derived from history; the executor may override it with real telemetry.
pub const STEP_ESTIMATE_MS: u64 = 5_000;

// -----------------------------------------------------------------------------
// Skill provenance, trust, and risk
// -----------------------------------------------------------------------------

/// Skill provenance. Declaration order is the fixed catalog sort order:
/// `Native < Definition < Custom < External`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    /// Compiled-in capability with a live instance.
    Native,
    /// LLM-defined skill declared in the static manifest.
    Definition,
    /// Tenant-authored skill loaded from storage.
    Custom,
    /// Marketplace skill loaded via the external index.
    External,
}

impl SkillType {
    /// Primary catalog sort key (lower sorts first).
    #[inline]
    pub fn priority(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillType::Native => "native",
            SkillType::Definition => "definition",
            SkillType::Custom => "custom",
            SkillType::External => "external",
        }
    }
}

/// Trust classification bounding data access and auto-approval eligibility.
/// `Core` is the most trusted, `Community` the least.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Core,
    Verified,
    User,
    Community,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Core => "core",
            TrustLevel::Verified => "verified",
            TrustLevel::User => "user",
            TrustLevel::Community => "community",
        }
    }

    /// Unknown strings fall to the least-trusted level.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "core" => TrustLevel::Core,
            "verified" => TrustLevel::Verified,
            "user" => TrustLevel::User,
            _ => TrustLevel::Community,
        }
    }
}

/// Risk classification for a planned action. Ordered `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Medium,
        }
    }
}

// -----------------------------------------------------------------------------
// Skill catalog entries
// -----------------------------------------------------------------------------

/// Mutable execution feedback on a catalog entry. Updated only via
/// `SkillRegistry::record_outcome`; never edited by queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Running success ratio in [0, 1].
    pub success_rate: f64,
    pub total_executions: u64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            success_rate: 0.0,
            total_executions: 0,
        }
    }
}

impl PerformanceMetrics {
    /// Folds one execution outcome into the running average.
    pub fn record(&mut self, success: bool) {
        let outcome = if success { 1.0 } else { 0.0 };
        let n = self.total_executions as f64;
        self.success_rate = (self.success_rate * n + outcome) / (n + 1.0);
        self.total_executions += 1;
    }
}

/// One entry in the unified skill catalog, from any of the four provenances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillEntry {
    /// Globally unique, provenance-prefixed id: `"{type}:{name}"`.
    pub id: String,
    pub name: String,
    pub description: String,
    pub skill_type: SkillType,
    /// Agent roles permitted to use this skill (e.g. "hunter", "analyst").
    pub agent_types: Vec<String>,
    pub trust_level: TrustLevel,
    /// Data classification labels the skill may touch (e.g. "crm", "public_web").
    #[serde(default)]
    pub data_classes: Vec<String>,
    #[serde(default)]
    pub life_sciences_relevant: bool,
    #[serde(default)]
    pub performance_metrics: PerformanceMetrics,
}

impl SkillEntry {
    /// Canonical catalog id for a (provenance, name) pair.
    pub fn skill_id(skill_type: SkillType, name: &str) -> String {
        format!("{}:{}", skill_type.as_str(), name)
    }
}

/// Ephemeral ranking result from `SkillRegistry::get_for_task`; never persisted.
#[derive(Debug, Clone)]
pub struct RankedSkill {
    pub entry: SkillEntry,
    /// Applicability score in [0, 1]. Always > 0 in returned results.
    pub relevance: f64,
}

/// A task to rank skills against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Machine task type (e.g. "enrich_lead").
    #[serde(default)]
    pub task_type: String,
    /// Free-text description of what the task needs.
    #[serde(default)]
    pub description: String,
}

impl TaskSpec {
    pub fn new(task_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            description: description.into(),
        }
    }

    /// True when the task carries no usable text at all.
    pub fn is_empty(&self) -> bool {
        self.task_type.trim().is_empty() && self.description.trim().is_empty()
    }
}

// -----------------------------------------------------------------------------
// Marketplace entries
// -----------------------------------------------------------------------------

/// One searchable entry in the marketplace index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub trust_level: TrustLevel,
    /// Declared permission scopes; more than 3 discounts the security score.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Data-access level surfaced to the user (e.g. "read-only", "read-write").
    #[serde(default)]
    pub data_access: String,
    #[serde(default)]
    pub life_sciences_relevant: bool,
    #[serde(default)]
    pub install_count: u64,
}

// -----------------------------------------------------------------------------
// Gap discovery
// -----------------------------------------------------------------------------

/// Kind of unmet need mined from 30 days of usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    SlowExecution,
    FailedTask,
    UnhandledRequest,
    ManualWorkaround,
}

/// One usage gap synthesized by the discovery agent. Produced once per run,
/// never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    pub user_id: String,
    pub gap_type: GapType,
    pub description: String,
    /// Raw evidence lines the synthesis was grounded on.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// How often the pattern was observed in the window.
    #[serde(default)]
    pub frequency: u32,
    pub last_seen: DateTime<Utc>,
    /// Search keywords for the marketplace stage.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// One marketplace candidate scored against a gap. At most 5 survive per gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRecommendation {
    pub skill: MarketplaceSkill,
    pub relevance_score: f64,
    pub trust_level: TrustLevel,
    pub data_access: String,
    pub life_sciences_relevant: bool,
    pub install_count: u64,
    pub composite_score: f64,
}

/// A delivered recommendation: one notification and one activity entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub user_id: String,
    pub gap: GapReport,
    pub skills: Vec<SkillRecommendation>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Durable trace of a delivered recommendation, kept for the 7-day dedup window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub user_id: String,
    pub keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// -----------------------------------------------------------------------------
// Signals, implications, and triggers
// -----------------------------------------------------------------------------

/// An externally detected market signal routed into the trigger pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub user_id: String,
    /// Signal kind (e.g. "competitor_funding", "regulatory_update").
    pub signal_type: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Entity names the signal mentions.
    #[serde(default)]
    pub entities: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

/// Action proposed by the analysis call for one implication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Looked up in the static action table; unknown types are dropped.
    pub action_type: String,
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub reasoning: String,
    /// 1 (highest) .. 5 (lowest).
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    3
}

/// An inferred, non-obvious consequence of a signal for the user's business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implication {
    pub summary: String,
    #[serde(default)]
    pub affected_entities: Vec<String>,
    pub action: ProposedAction,
}

/// One gated, executable mapping of an implication onto a skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillTrigger {
    /// Summary of the implication this trigger answers.
    pub implication: String,
    pub skill_path: String,
    pub action_type: String,
    pub risk_level: RiskLevel,
    /// Decided by autonomy gating, never declared by the analysis.
    pub auto_execute: bool,
    #[serde(default)]
    pub input_data: serde_json::Value,
    pub priority: u8,
    #[serde(default)]
    pub reasoning: String,
}

/// Root aggregate persisted per processed signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplicationPlan {
    pub id: String,
    pub user_id: String,
    pub signal: Signal,
    pub implications: Vec<Implication>,
    pub triggers: Vec<SkillTrigger>,
    #[serde(default)]
    pub execution_plan_id: Option<String>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

// -----------------------------------------------------------------------------
// Execution plans
// -----------------------------------------------------------------------------

/// One step of an execution plan, consumed by the external executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step_number: u32,
    pub skill_id: String,
    pub skill_path: String,
    /// Step numbers that must complete before this step may start.
    #[serde(default)]
    pub depends_on: Vec<u32>,
    pub status: String,
    #[serde(default)]
    pub input_data: serde_json::Value,
}

/// A tiered, dependency-respecting step schedule. The persisted `status`
/// ("approved" / "pending_approval") is the durable source of truth consumed
/// by the external executor; in-memory flags are advisory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub signal_id: Option<String>,
    pub steps: Vec<ExecutionStep>,
    /// Ordered groups of step numbers; each group must fully complete before
    /// the next starts, steps within a group may run concurrently.
    pub parallel_groups: Vec<Vec<u32>>,
    /// Max severity across the constituent triggers ("low" / "medium").
    pub risk_level: String,
    /// False only when every constituent trigger auto-executes.
    pub approval_required: bool,
    pub estimated_duration_ms: u64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    /// Set by the executor, read back by gap discovery.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionPlan {
    /// Wall-clock duration, when the executor recorded both timestamps.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// Usage evidence and signal context rows
// -----------------------------------------------------------------------------

/// One conversation turn; `handled == false` marks a request no skill answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_id: String,
    pub content: String,
    pub handled: bool,
    pub created_at: DateTime<Utc>,
}

/// One raw activity event; repeated actions are mined into manual-workaround
/// evidence by the discovery agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub user_id: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

/// A competitor or topic the user tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub name: String,
    /// "competitor" or "topic".
    pub entity_type: String,
    #[serde(default)]
    pub notes: String,
}

/// One CRM lead surfaced into signal context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company: String,
    /// "active" leads are eligible for signal context.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub therapeutic_area: String,
}

/// The user's company profile and product/therapeutic-area settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub therapeutic_areas: Vec<String>,
}

// -----------------------------------------------------------------------------
// Sink rows
// -----------------------------------------------------------------------------

/// One in-app notification row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// One activity-log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub user_id: String,
    pub agent: String,
    pub activity_type: String,
    pub title: String,
    pub description: String,
    pub confidence: f32,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
