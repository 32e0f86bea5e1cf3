//! axon-core: shared domain types, persistent store, LLM bridge, and the
//! service seams (marketplace index, autonomy, notification/activity sinks)
//! used by the axon skill pipelines.

mod autonomy;
mod config;
mod index;
mod llm;
mod shared;
mod sinks;
mod store;

pub use autonomy::{ApprovalDecision, AutonomyService, TrustHistory, TrustLedger};
pub use config::CoreConfig;
pub use index::{MarketplaceIndex, SkillIndex};
pub use llm::{strip_code_fences, ChatTurn, LanguageModel, OpenRouterBridge};
pub use shared::{
    ActivityEntry, ActivityEvent, CompanyProfile, ConversationTurn, ExecutionPlan, ExecutionStep,
    GapReport, GapType, Implication, ImplicationPlan, Lead, MarketplaceSkill, Notification,
    PerformanceMetrics, ProposedAction, RankedSkill, Recommendation, RecommendationRecord,
    RiskLevel, Signal, SkillEntry, SkillRecommendation, SkillTrigger, SkillType, TaskSpec,
    TrackedEntity, TrustLevel, STEP_ESTIMATE_MS,
};
pub use sinks::{ActivityLog, NotificationSink, StoreActivityLog, StoreNotifier};
pub use store::{Store, StoreError};
