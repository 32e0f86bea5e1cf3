//! Implication-aware signal triggering: turn a detected signal into a
//! tiered, risk-gated execution plan.
//!
//! Linear pipeline with no internal retries:
//! signal → context → analysis → action mapping → autonomy gating →
//! plan build → persist → notify. Context failures downgrade to a partial
//! context; failures at or after analysis abort with an empty trigger list.
//! Nothing blocks on human approval: plans needing it are persisted as
//! "pending_approval" for the asynchronous approval flow.

use axon_core::{
    strip_code_fences, AutonomyService, ChatTurn, CompanyProfile, ExecutionPlan, ExecutionStep,
    Implication, ImplicationPlan, LanguageModel, Lead, NotificationSink, RiskLevel, Signal,
    SkillTrigger, Store, TrackedEntity, STEP_ESTIMATE_MS,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

const MAX_IMPLICATIONS: usize = 5;
const CONTEXT_LEAD_LIMIT: usize = 100;
const CONTEXT_SIGNAL_LIMIT: usize = 10;
const CONTEXT_SIGNAL_WINDOW_DAYS: i64 = 7;
/// Entity/action lists in the notification collapse beyond this many items.
const COLLAPSE_LIMIT: usize = 3;

const ANALYSIS_PROMPT: &str = "You analyze market signals for a life-sciences sales team and \
infer non-obvious business implications. Given the signal and account context, respond with a \
JSON object: {\"implications\": [...]} containing 1 to 5 entries, most important first. Each \
entry: summary (one sentence), affected_entities (array of names), action {action_type, input \
(object), reasoning, priority (1 highest .. 5 lowest)}. Allowed action_type values: enrich_lead, \
scan_competitor, prepare_brief, watch_formulary, update_crm, draft_outreach, bulk_crm_update, \
purge_stale_leads. Respond with JSON only.";

// -----------------------------------------------------------------------------
// Static action vocabulary
// -----------------------------------------------------------------------------

/// One row of the action vocabulary: a recognized action type and the skill
/// it maps to. The table is the explicit source of truth; an action type
/// absent here is dropped rather than guessed at.
#[derive(Debug, Clone, Copy)]
pub struct ActionMapping {
    pub action_type: &'static str,
    pub skill_path: &'static str,
    pub default_risk: RiskLevel,
}

/// Version 1 of the action vocabulary. Read-only enrichment is LOW; anything
/// that writes outward is MEDIUM or above.
pub const ACTION_TABLE: &[ActionMapping] = &[
    ActionMapping {
        action_type: "enrich_lead",
        skill_path: "native/LeadEnrichment",
        default_risk: RiskLevel::Low,
    },
    ActionMapping {
        action_type: "scan_competitor",
        skill_path: "native/CompetitorScan",
        default_risk: RiskLevel::Low,
    },
    ActionMapping {
        action_type: "prepare_brief",
        skill_path: "native/MeetingBrief",
        default_risk: RiskLevel::Low,
    },
    ActionMapping {
        action_type: "watch_formulary",
        skill_path: "definition/FormularyWatch",
        default_risk: RiskLevel::Low,
    },
    ActionMapping {
        action_type: "update_crm",
        skill_path: "native/CrmSync",
        default_risk: RiskLevel::Medium,
    },
    ActionMapping {
        action_type: "draft_outreach",
        skill_path: "native/DraftOutreach",
        default_risk: RiskLevel::Medium,
    },
    ActionMapping {
        action_type: "bulk_crm_update",
        skill_path: "native/CrmSync",
        default_risk: RiskLevel::High,
    },
    ActionMapping {
        action_type: "purge_stale_leads",
        skill_path: "native/CrmSync",
        default_risk: RiskLevel::Critical,
    },
];

/// Looks up an action type in the static table.
pub fn lookup_action(action_type: &str) -> Option<&'static ActionMapping> {
    ACTION_TABLE.iter().find(|m| m.action_type == action_type)
}

/// Catalog id for a table skill path ("native/CrmSync" -> "native:CrmSync").
fn skill_id_for_path(skill_path: &str) -> String {
    skill_path.replacen('/', ":", 1)
}

// -----------------------------------------------------------------------------
// Pipeline
// -----------------------------------------------------------------------------

#[derive(Default)]
struct SignalContext {
    entities: Vec<TrackedEntity>,
    leads: Vec<Lead>,
    profile: CompanyProfile,
    recent_signals: Vec<Signal>,
}

#[derive(Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    implications: Vec<Implication>,
}

/// Signal → implication-analysis → action-mapping → autonomy-gating →
/// tiered execution-plan pipeline.
pub struct ImplicationAwareSkillTrigger {
    store: Arc<Store>,
    llm: Arc<dyn LanguageModel>,
    autonomy: Arc<dyn AutonomyService>,
    notifier: Arc<dyn NotificationSink>,
}

impl ImplicationAwareSkillTrigger {
    pub fn new(
        store: Arc<Store>,
        llm: Arc<dyn LanguageModel>,
        autonomy: Arc<dyn AutonomyService>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            llm,
            autonomy,
            notifier,
        }
    }

    /// Runs the full pipeline for one signal and returns the gated triggers.
    /// Zero implications mean the pipeline returns before plan-build; no
    /// empty plan is ever persisted.
    pub async fn process_signal(&self, signal: &Signal) -> Vec<SkillTrigger> {
        let user_id = signal.user_id.as_str();
        let context = self.gather_context(user_id);

        let implications = match self.analyze(signal, &context).await {
            Ok(implications) => implications,
            Err(e) => {
                tracing::warn!(target: "axon::trigger", error = %e, "signal analysis failed");
                return Vec::new();
            }
        };
        if implications.is_empty() {
            tracing::debug!(target: "axon::trigger", signal = %signal.id, "no implications");
            return Vec::new();
        }

        let triggers = self.gate_triggers(user_id, &implications).await;
        if triggers.is_empty() {
            tracing::debug!(target: "axon::trigger", signal = %signal.id, "no mapped actions");
            return Vec::new();
        }

        let plan = build_plan(user_id, &signal.id, &triggers);
        let implication_plan = ImplicationPlan {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            signal: signal.clone(),
            implications: implications.clone(),
            triggers: triggers.clone(),
            execution_plan_id: Some(plan.id.clone()),
            summary: format!(
                "{} implication(s) from '{}' mapped to {} action(s)",
                implications.len(),
                signal.title,
                triggers.len()
            ),
            created_at: Utc::now(),
        };

        // Persistence failures are logged; the computed triggers are still
        // returned to the caller.
        if let Err(e) = self.store.put_execution_plan(&plan) {
            tracing::warn!(target: "axon::trigger", error = %e, "execution plan persist failed");
        }
        if let Err(e) = self.store.put_implication_plan(&implication_plan) {
            tracing::warn!(target: "axon::trigger", error = %e, "implication plan persist failed");
        }

        self.notify(signal, &implications, &triggers, &plan).await;
        triggers
    }

    /// Gathers account context; each sub-query is independently fault-isolated
    /// and downgrades to empty on failure.
    fn gather_context(&self, user_id: &str) -> SignalContext {
        let entities = self.store.entities_for_user(user_id).unwrap_or_else(|e| {
            tracing::warn!(target: "axon::trigger", error = %e, "entity context failed");
            Vec::new()
        });
        let leads = self
            .store
            .active_leads(user_id, CONTEXT_LEAD_LIMIT)
            .unwrap_or_else(|e| {
                tracing::warn!(target: "axon::trigger", error = %e, "lead context failed");
                Vec::new()
            });
        let profile = self
            .store
            .company_profile(user_id)
            .unwrap_or_else(|e| {
                tracing::warn!(target: "axon::trigger", error = %e, "profile context failed");
                None
            })
            .unwrap_or_default();
        let since = Utc::now() - Duration::days(CONTEXT_SIGNAL_WINDOW_DAYS);
        let recent_signals = self
            .store
            .signals_since(user_id, since, CONTEXT_SIGNAL_LIMIT)
            .unwrap_or_else(|e| {
                tracing::warn!(target: "axon::trigger", error = %e, "signal context failed");
                Vec::new()
            });
        SignalContext {
            entities,
            leads,
            profile,
            recent_signals,
        }
    }

    /// One combined analysis + action-mapping call. At most 5 implications
    /// are kept; parse failures propagate so the pipeline aborts.
    async fn analyze(
        &self,
        signal: &Signal,
        context: &SignalContext,
    ) -> Result<Vec<Implication>, Box<dyn std::error::Error + Send + Sync>> {
        let prompt = format!(
            "Signal ({}): {}\n{}\n\nTracked entities: {}\nActive leads: {}\nCompany: {} \
             (products: {}; therapeutic areas: {})\nRecent signals: {}",
            signal.signal_type,
            signal.title,
            signal.summary,
            context
                .entities
                .iter()
                .map(|e| e.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            context
                .leads
                .iter()
                .map(|l| format!("{} ({})", l.name, l.company))
                .collect::<Vec<_>>()
                .join(", "),
            context.profile.company_name,
            context.profile.products.join(", "),
            context.profile.therapeutic_areas.join(", "),
            context
                .recent_signals
                .iter()
                .map(|s| s.title.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        );
        let raw = self
            .llm
            .generate(&[ChatTurn::user(prompt)], Some(ANALYSIS_PROMPT), 1536, 0.3)
            .await?;
        let mut parsed: AnalysisResponse = serde_json::from_str(strip_code_fences(&raw))?;
        parsed.implications.truncate(MAX_IMPLICATIONS);
        Ok(parsed.implications)
    }

    /// Maps implications onto the action table and gates each trigger.
    /// Unknown action types are dropped; the implication still counts for
    /// the summary. HIGH/CRITICAL never auto-execute; LOW/MEDIUM ask the
    /// autonomy service and fail closed on any error.
    async fn gate_triggers(
        &self,
        user_id: &str,
        implications: &[Implication],
    ) -> Vec<SkillTrigger> {
        let mut triggers = Vec::new();
        for implication in implications {
            let action = &implication.action;
            let Some(mapping) = lookup_action(&action.action_type) else {
                tracing::debug!(
                    target: "axon::trigger",
                    action_type = %action.action_type,
                    "unmapped action type dropped"
                );
                continue;
            };
            let risk_level = mapping.default_risk;
            let auto_execute = if risk_level >= RiskLevel::High {
                false
            } else {
                match self
                    .autonomy
                    .check_approval(user_id, &skill_id_for_path(mapping.skill_path), risk_level)
                    .await
                {
                    Ok(decision) => decision.auto_approved,
                    Err(e) => {
                        tracing::warn!(
                            target: "axon::trigger",
                            error = %e,
                            "autonomy check failed, requiring approval"
                        );
                        false
                    }
                }
            };
            triggers.push(SkillTrigger {
                implication: implication.summary.clone(),
                skill_path: mapping.skill_path.to_string(),
                action_type: mapping.action_type.to_string(),
                risk_level,
                auto_execute,
                input_data: action.input.clone(),
                priority: action.priority.clamp(1, 5),
                reasoning: action.reasoning.clone(),
            });
        }
        triggers
    }

    /// Exactly one in-app notification per run.
    async fn notify(
        &self,
        signal: &Signal,
        implications: &[Implication],
        triggers: &[SkillTrigger],
        plan: &ExecutionPlan,
    ) {
        let mut entities: Vec<String> = Vec::new();
        for implication in implications {
            for entity in &implication.affected_entities {
                if !entities.contains(entity) {
                    entities.push(entity.clone());
                }
            }
        }
        let actions: Vec<String> = triggers.iter().map(|t| t.action_type.clone()).collect();
        let auto = triggers.iter().filter(|t| t.auto_execute).count();
        let manual = triggers.len() - auto;

        let mut message = String::new();
        if !entities.is_empty() {
            message.push_str(&format!("Affects {}. ", collapse(&entities, "entities")));
        }
        message.push_str(&format!(
            "Planned: {}. {} action(s) will run automatically, {} await your approval.",
            collapse(&actions, "actions"),
            auto,
            manual
        ));

        if let Err(e) = self
            .notifier
            .create_notification(
                &signal.user_id,
                "signal_plan",
                &format!("Signal processed: {}", signal.title),
                &message,
                Some(&format!("/plans/{}", plan.id)),
                serde_json::json!({
                    "execution_plan_id": plan.id,
                    "risk_level": plan.risk_level,
                    "approval_required": plan.approval_required,
                }),
            )
            .await
        {
            tracing::warn!(target: "axon::trigger", error = %e, "plan notification failed");
        }
    }
}

/// Partitions triggers into the two-tier schedule and derives the plan-level
/// flags. Tier 1 is LOW-risk read-only enrichment with no dependencies; every
/// Tier-2 step depends on the full Tier-1 step set.
fn build_plan(user_id: &str, signal_id: &str, triggers: &[SkillTrigger]) -> ExecutionPlan {
    let mut steps = Vec::with_capacity(triggers.len());
    let mut tier1_numbers = Vec::new();
    let mut tier2_numbers = Vec::new();

    for trigger in triggers.iter().filter(|t| t.risk_level == RiskLevel::Low) {
        let step_number = steps.len() as u32 + 1;
        tier1_numbers.push(step_number);
        steps.push(step_for(step_number, trigger, Vec::new()));
    }
    for trigger in triggers.iter().filter(|t| t.risk_level != RiskLevel::Low) {
        let step_number = steps.len() as u32 + 1;
        tier2_numbers.push(step_number);
        steps.push(step_for(step_number, trigger, tier1_numbers.clone()));
    }

    let mut parallel_groups = Vec::new();
    if !tier1_numbers.is_empty() {
        parallel_groups.push(tier1_numbers);
    }
    if !tier2_numbers.is_empty() {
        parallel_groups.push(tier2_numbers);
    }

    let approval_required = !triggers.iter().all(|t| t.auto_execute);
    let risk_level = if triggers.iter().any(|t| t.risk_level > RiskLevel::Low) {
        "medium"
    } else {
        "low"
    };

    ExecutionPlan {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        signal_id: Some(signal_id.to_string()),
        estimated_duration_ms: steps.len() as u64 * STEP_ESTIMATE_MS,
        steps,
        parallel_groups,
        risk_level: risk_level.to_string(),
        approval_required,
        status: if approval_required {
            "pending_approval".to_string()
        } else {
            "approved".to_string()
        },
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
    }
}

fn step_for(step_number: u32, trigger: &SkillTrigger, depends_on: Vec<u32>) -> ExecutionStep {
    ExecutionStep {
        step_number,
        skill_id: skill_id_for_path(&trigger.skill_path),
        skill_path: trigger.skill_path.clone(),
        depends_on,
        status: "pending".to_string(),
        input_data: trigger.input_data.clone(),
    }
}

/// Collapses a list for notification text: up to 3 items are joined, more
/// become "N <noun> including X and Y".
fn collapse(items: &[String], noun: &str) -> String {
    if items.len() <= COLLAPSE_LIMIT {
        items.join(", ")
    } else {
        format!(
            "{} {} including {} and {}",
            items.len(),
            noun,
            items[0],
            items[1]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(action_type: &str, risk: RiskLevel, auto: bool) -> SkillTrigger {
        SkillTrigger {
            implication: "test".into(),
            skill_path: lookup_action(action_type).unwrap().skill_path.to_string(),
            action_type: action_type.into(),
            risk_level: risk,
            auto_execute: auto,
            input_data: serde_json::json!({}),
            priority: 3,
            reasoning: String::new(),
        }
    }

    #[test]
    fn action_table_lookup() {
        assert!(lookup_action("enrich_lead").is_some());
        assert_eq!(
            lookup_action("update_crm").unwrap().default_risk,
            RiskLevel::Medium
        );
        assert!(lookup_action("launch_rockets").is_none());
    }

    #[test]
    fn skill_id_only_replaces_first_slash() {
        assert_eq!(skill_id_for_path("native/CrmSync"), "native:CrmSync");
    }

    #[test]
    fn two_tier_plan_wires_dependencies() {
        let triggers = vec![
            trigger("enrich_lead", RiskLevel::Low, true),
            trigger("scan_competitor", RiskLevel::Low, true),
            trigger("update_crm", RiskLevel::Medium, false),
        ];
        let plan = build_plan("u1", "s1", &triggers);
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.parallel_groups, vec![vec![1, 2], vec![3]]);
        assert_eq!(plan.steps[2].depends_on, vec![1, 2]);
        assert!(plan.steps[0].depends_on.is_empty());
        assert!(plan.approval_required);
        assert_eq!(plan.risk_level, "medium");
        assert_eq!(plan.status, "pending_approval");
        assert_eq!(plan.estimated_duration_ms, 3 * STEP_ESTIMATE_MS);
    }

    #[test]
    fn all_auto_low_plan_is_approved() {
        let triggers = vec![
            trigger("enrich_lead", RiskLevel::Low, true),
            trigger("prepare_brief", RiskLevel::Low, true),
        ];
        let plan = build_plan("u1", "s1", &triggers);
        assert!(!plan.approval_required);
        assert_eq!(plan.risk_level, "low");
        assert_eq!(plan.status, "approved");
        assert_eq!(plan.parallel_groups.len(), 1);
    }

    #[test]
    fn collapse_beyond_three_items() {
        let few = vec!["Alpha".to_string(), "Beta".to_string()];
        assert_eq!(collapse(&few, "entities"), "Alpha, Beta");
        let many: Vec<String> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(collapse(&many, "entities"), "5 entities including A and B");
    }
}
