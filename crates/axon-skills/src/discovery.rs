//! Passive gap discovery: mine 30 days of usage for unmet needs, match them
//! against the marketplace, and recommend skills worth installing.
//!
//! Three sequential, independently failure-tolerant stages. Any stage that
//! finds nothing short-circuits with an empty result; no stage ever raises
//! to the caller.

use crate::scoring::{
    community_score, composite_score, gap_relevance, keyword_overlap, security_score,
};
use axon_core::{
    strip_code_fences, ActivityLog, ChatTurn, GapReport, GapType, LanguageModel,
    NotificationSink, Recommendation, RecommendationRecord, SkillIndex, SkillRecommendation,
    Store,
};
use chrono::{Duration, Utc};
use futures_util::future::join_all;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

const EVIDENCE_WINDOW_DAYS: i64 = 30;
const EVIDENCE_CAP: usize = 50;
const MAX_GAPS: usize = 10;
const SEARCH_LIMIT: usize = 20;
const MAX_RECOMMENDED: usize = 5;
const DEDUP_WINDOW_DAYS: i64 = 7;
const DEDUP_OVERLAP_LIMIT: f64 = 0.5;
const PATTERN_MIN_OCCURRENCES: usize = 3;

const GAP_SYNTHESIS_PROMPT: &str = "You analyze usage evidence from a sales-intelligence \
assistant and identify capability gaps. Respond with a JSON array of at most 10 objects, \
ranked most impactful first, each with: gap_type (one of slow_execution, failed_task, \
unhandled_request, manual_workaround), description (one sentence), evidence (array of the \
supporting lines), frequency (integer), keywords (3-6 lowercase search terms). \
Respond with JSON only.";

const MESSAGE_DRAFT_PROMPT: &str = "You write short in-app recommendations. For each gap \
below, write 2-3 sentences: acknowledge the observed pattern, name the suggested skill, \
describe it in one line, state the data-access level it needs, and ask whether to install \
it. Respond with a JSON array of strings, one message per gap, in order. JSON only.";

/// Gap-analysis → marketplace-search → recommendation pipeline.
pub struct SkillDiscoveryAgent {
    store: Arc<Store>,
    llm: Arc<dyn LanguageModel>,
    index: Arc<dyn SkillIndex>,
    notifier: Arc<dyn NotificationSink>,
    activity: Arc<dyn ActivityLog>,
    slow_threshold_ms: u64,
}

#[derive(Deserialize)]
struct LlmGap {
    gap_type: String,
    description: String,
    #[serde(default)]
    evidence: Vec<String>,
    #[serde(default)]
    frequency: u32,
    #[serde(default)]
    keywords: Vec<String>,
}

impl SkillDiscoveryAgent {
    pub fn new(
        store: Arc<Store>,
        llm: Arc<dyn LanguageModel>,
        index: Arc<dyn SkillIndex>,
        notifier: Arc<dyn NotificationSink>,
        activity: Arc<dyn ActivityLog>,
        slow_threshold_ms: u64,
    ) -> Self {
        Self {
            store,
            llm,
            index,
            notifier,
            activity,
            slow_threshold_ms,
        }
    }

    /// Full discovery run for the external scheduler: analyze, match, recommend.
    pub async fn run(&self, user_id: &str) -> Vec<Recommendation> {
        let gaps = self.analyze_usage_gaps(user_id).await;
        if gaps.is_empty() {
            tracing::debug!(target: "axon::discovery", user_id, "no gaps found");
            return Vec::new();
        }
        let mut gap_matches = Vec::with_capacity(gaps.len());
        for gap in gaps {
            let matches = self.search_marketplace(&gap).await;
            gap_matches.push((gap, matches));
        }
        self.recommend(user_id, gap_matches).await
    }

    // -------------------------------------------------------------------------
    // Stage 1: gap analysis
    // -------------------------------------------------------------------------

    /// Mines three independent 30-day evidence sources and asks the model to
    /// synthesize at most 10 ranked gaps. Zero evidence across all sources
    /// returns empty without an LLM call; malformed output degrades to empty.
    pub async fn analyze_usage_gaps(&self, user_id: &str) -> Vec<GapReport> {
        let since = Utc::now() - Duration::days(EVIDENCE_WINDOW_DAYS);

        let plan_evidence = self.plan_evidence(user_id, since);
        let turn_evidence = self.turn_evidence(user_id, since);
        let pattern_evidence = self.pattern_evidence(user_id, since);

        if plan_evidence.is_empty() && turn_evidence.is_empty() && pattern_evidence.is_empty() {
            return Vec::new();
        }

        let mut prompt = String::from("Usage evidence from the last 30 days.\n");
        for (label, lines) in [
            ("Failed or slow execution plans", &plan_evidence),
            ("Unhandled requests", &turn_evidence),
            ("Repeated manual activity", &pattern_evidence),
        ] {
            if !lines.is_empty() {
                prompt.push_str(&format!("\n{}:\n{}\n", label, lines.join("\n")));
            }
        }

        let raw = match self
            .llm
            .generate(&[ChatTurn::user(prompt)], Some(GAP_SYNTHESIS_PROMPT), 1024, 0.2)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(target: "axon::discovery", error = %e, "gap synthesis failed");
                return Vec::new();
            }
        };
        parse_gap_reports(&raw, user_id)
    }

    /// Failed plans and runs slower than the configured threshold.
    fn plan_evidence(&self, user_id: &str, since: chrono::DateTime<Utc>) -> Vec<String> {
        let plans = match self.store.execution_plans_since(user_id, since) {
            Ok(plans) => plans,
            Err(e) => {
                tracing::warn!(target: "axon::discovery", error = %e, "plan evidence failed");
                return Vec::new();
            }
        };
        let mut lines = Vec::new();
        for plan in plans {
            if plan.status == "failed" {
                lines.push(format!("plan {} failed ({} steps)", plan.id, plan.steps.len()));
            } else if let Some(ms) = plan.duration_ms() {
                if ms > self.slow_threshold_ms as i64 {
                    lines.push(format!("plan {} took {}ms", plan.id, ms));
                }
            }
            if lines.len() >= EVIDENCE_CAP {
                break;
            }
        }
        lines
    }

    /// Conversation turns no skill handled.
    fn turn_evidence(&self, user_id: &str, since: chrono::DateTime<Utc>) -> Vec<String> {
        match self.store.unhandled_turns_since(user_id, since, EVIDENCE_CAP) {
            Ok(turns) => turns
                .into_iter()
                .map(|t| format!("unhandled request: {}", t.content))
                .collect(),
            Err(e) => {
                tracing::warn!(target: "axon::discovery", error = %e, "turn evidence failed");
                Vec::new()
            }
        }
    }

    /// Manual actions repeated at least three times in the window.
    fn pattern_evidence(&self, user_id: &str, since: chrono::DateTime<Utc>) -> Vec<String> {
        let events = match self.store.activity_events_since(user_id, since) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(target: "axon::discovery", error = %e, "pattern evidence failed");
                return Vec::new();
            }
        };
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for event in events {
            *counts.entry(event.action).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n >= PATTERN_MIN_OCCURRENCES)
            .map(|(action, n)| format!("manual action '{}' repeated {} times", action, n))
            .take(EVIDENCE_CAP)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Stage 2: marketplace search
    // -------------------------------------------------------------------------

    /// Expands the gap's keywords into parallel marketplace searches and
    /// keeps the top 5 candidates by composite score. A gap with no
    /// keywords yields no matches.
    pub async fn search_marketplace(&self, gap: &GapReport) -> Vec<SkillRecommendation> {
        if gap.keywords.is_empty() {
            return Vec::new();
        }
        let searches = gap
            .keywords
            .iter()
            .map(|keyword| self.index.search(keyword, SEARCH_LIMIT, None, None));
        let mut candidates = Vec::new();
        for (keyword, result) in gap.keywords.iter().zip(join_all(searches).await) {
            match result {
                Ok(hits) => candidates.extend(hits),
                Err(e) => {
                    tracing::warn!(
                        target: "axon::discovery",
                        keyword,
                        error = %e,
                        "marketplace search failed"
                    );
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        candidates.retain(|c| seen.insert(c.id.clone()));

        // Install counts are only comparable once the whole candidate set is
        // known, so the community term is filled in a second pass.
        let max_installs = candidates.iter().map(|c| c.install_count).max().unwrap_or(0);
        let mut scored: Vec<SkillRecommendation> = candidates
            .into_iter()
            .map(|skill| {
                let relevance =
                    gap_relevance(&gap.keywords, &skill.name, &skill.description, &skill.tags);
                let security = security_score(skill.trust_level, skill.permissions.len());
                let community = community_score(skill.install_count, max_installs);
                let composite = composite_score(
                    relevance,
                    security,
                    community,
                    skill.life_sciences_relevant,
                );
                SkillRecommendation {
                    relevance_score: relevance,
                    trust_level: skill.trust_level,
                    data_access: skill.data_access.clone(),
                    life_sciences_relevant: skill.life_sciences_relevant,
                    install_count: skill.install_count,
                    composite_score: composite,
                    skill,
                }
            })
            .collect();
        // Stable sort: equal composites keep marketplace search order.
        scored.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(MAX_RECOMMENDED);
        scored
    }

    // -------------------------------------------------------------------------
    // Stage 3: recommendation
    // -------------------------------------------------------------------------

    /// Deduplicates against the prior 7 days, drafts one message per
    /// surviving gap (templated on LLM failure), and delivers exactly one
    /// notification and one activity entry per recommendation.
    pub async fn recommend(
        &self,
        user_id: &str,
        gap_matches: Vec<(GapReport, Vec<SkillRecommendation>)>,
    ) -> Vec<Recommendation> {
        let since = Utc::now() - Duration::days(DEDUP_WINDOW_DAYS);
        let recent = match self.store.recommendations_since(user_id, since) {
            Ok(recent) => recent,
            Err(e) => {
                tracing::warn!(target: "axon::discovery", error = %e, "dedup lookup failed");
                Vec::new()
            }
        };

        let survivors: Vec<(GapReport, Vec<SkillRecommendation>)> = gap_matches
            .into_iter()
            .filter(|(gap, matches)| {
                if matches.is_empty() {
                    return false;
                }
                let duplicate = recent.iter().any(|record| {
                    keyword_overlap(&gap.keywords, &record.keywords) > DEDUP_OVERLAP_LIMIT
                });
                if duplicate {
                    tracing::debug!(
                        target: "axon::discovery",
                        gap = %gap.description,
                        "suppressed by 7-day dedup"
                    );
                }
                !duplicate
            })
            .collect();
        if survivors.is_empty() {
            return Vec::new();
        }

        let messages = self.draft_messages(&survivors).await;

        let mut delivered = Vec::with_capacity(survivors.len());
        for (i, (gap, skills)) in survivors.into_iter().enumerate() {
            let message = messages
                .as_ref()
                .and_then(|m| m.get(i).cloned())
                .unwrap_or_else(|| template_message(&gap, &skills[0]));
            let recommendation = Recommendation {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                gap: gap.clone(),
                skills: skills.clone(),
                message: message.clone(),
                created_at: Utc::now(),
            };

            if let Err(e) = self.store.record_recommendation(&RecommendationRecord {
                user_id: user_id.to_string(),
                keywords: gap.keywords.clone(),
                created_at: recommendation.created_at,
            }) {
                tracing::warn!(target: "axon::discovery", error = %e, "dedup record failed");
            }
            let top = &skills[0];
            if let Err(e) = self
                .notifier
                .create_notification(
                    user_id,
                    "skill_recommendation",
                    &format!("Skill suggestion: {}", top.skill.name),
                    &message,
                    Some(&format!("/marketplace/skills/{}", top.skill.id)),
                    serde_json::json!({
                        "skill_id": top.skill.id,
                        "composite_score": top.composite_score,
                    }),
                )
                .await
            {
                tracing::warn!(target: "axon::discovery", error = %e, "notification failed");
            }
            if let Err(e) = self
                .activity
                .record(
                    user_id,
                    "skill_discovery",
                    "skill_recommendation",
                    &format!("Recommended {}", top.skill.name),
                    &gap.description,
                    top.composite_score as f32,
                    serde_json::json!({ "keywords": gap.keywords }),
                )
                .await
            {
                tracing::warn!(target: "axon::discovery", error = %e, "activity record failed");
            }
            delivered.push(recommendation);
        }
        delivered
    }

    /// One LLM call for all surviving gaps; `None` means fall back to the
    /// deterministic template — delivery is never blocked by generation.
    async fn draft_messages(
        &self,
        survivors: &[(GapReport, Vec<SkillRecommendation>)],
    ) -> Option<Vec<String>> {
        let mut prompt = String::new();
        for (i, (gap, skills)) in survivors.iter().enumerate() {
            let top = &skills[0];
            prompt.push_str(&format!(
                "Gap {}: {}\nSuggested skill: {} — {}\nData access: {}\n\n",
                i + 1,
                gap.description,
                top.skill.name,
                top.skill.description,
                top.data_access,
            ));
        }
        let raw = self
            .llm
            .generate(&[ChatTurn::user(prompt)], Some(MESSAGE_DRAFT_PROMPT), 1024, 0.5)
            .await
            .map_err(|e| {
                tracing::warn!(target: "axon::discovery", error = %e, "message drafting failed");
            })
            .ok()?;
        let parsed: Vec<String> = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| {
                tracing::warn!(target: "axon::discovery", error = %e, "message parse failed");
            })
            .ok()?;
        (parsed.len() == survivors.len()).then_some(parsed)
    }
}

/// Deterministic fallback message when drafting fails.
fn template_message(gap: &GapReport, top: &SkillRecommendation) -> String {
    format!(
        "I noticed a recurring pattern: {}. The '{}' skill could help — {}. It needs {} access. Want me to install it?",
        gap.description,
        top.skill.name,
        top.skill.description,
        if top.data_access.is_empty() {
            "unspecified"
        } else {
            &top.data_access
        },
    )
}

/// Parses the synthesis output into at most [`MAX_GAPS`] reports. Rows with
/// an unknown gap_type are skipped; anything unparseable degrades to empty.
fn parse_gap_reports(raw: &str, user_id: &str) -> Vec<GapReport> {
    let parsed: Vec<LlmGap> = match serde_json::from_str(strip_code_fences(raw)) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(target: "axon::discovery", error = %e, "gap parse failed");
            return Vec::new();
        }
    };
    let now = Utc::now();
    parsed
        .into_iter()
        .filter_map(|g| {
            let gap_type = match g.gap_type.as_str() {
                "slow_execution" => GapType::SlowExecution,
                "failed_task" => GapType::FailedTask,
                "unhandled_request" => GapType::UnhandledRequest,
                "manual_workaround" => GapType::ManualWorkaround,
                other => {
                    tracing::debug!(target: "axon::discovery", gap_type = other, "unknown gap type");
                    return None;
                }
            };
            Some(GapReport {
                user_id: user_id.to_string(),
                gap_type,
                description: g.description,
                evidence: g.evidence,
                frequency: g.frequency.max(1),
                last_seen: now,
                keywords: g.keywords,
            })
        })
        .take(MAX_GAPS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_gap_reports_tolerates_fences_and_unknown_types() {
        let raw = r#"```json
[
  {"gap_type": "failed_task", "description": "CRM exports keep failing", "keywords": ["crm", "export"]},
  {"gap_type": "mystery", "description": "ignored", "keywords": []}
]
```"#;
        let gaps = parse_gap_reports(raw, "u1");
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].gap_type, GapType::FailedTask);
        assert_eq!(gaps[0].frequency, 1);
    }

    #[test]
    fn parse_gap_reports_caps_at_ten() {
        let rows: Vec<String> = (0..15)
            .map(|i| {
                format!(
                    r#"{{"gap_type": "unhandled_request", "description": "gap {}", "keywords": []}}"#,
                    i
                )
            })
            .collect();
        let raw = format!("[{}]", rows.join(","));
        assert_eq!(parse_gap_reports(&raw, "u1").len(), 10);
    }

    #[test]
    fn parse_gap_reports_malformed_is_empty() {
        assert!(parse_gap_reports("not json at all", "u1").is_empty());
    }

    #[test]
    fn template_message_names_skill_and_access() {
        let gap = GapReport {
            user_id: "u1".into(),
            gap_type: GapType::ManualWorkaround,
            description: "weekly formulary checks done by hand".into(),
            evidence: vec![],
            frequency: 4,
            last_seen: Utc::now(),
            keywords: vec!["formulary".into()],
        };
        let top = SkillRecommendation {
            skill: axon_core::MarketplaceSkill {
                id: "mp-1".into(),
                name: "Formulary Watch".into(),
                description: "Tracks payer coverage changes".into(),
                tags: vec![],
                trust_level: axon_core::TrustLevel::Verified,
                permissions: vec![],
                data_access: "read-only".into(),
                life_sciences_relevant: true,
                install_count: 10,
            },
            relevance_score: 1.0,
            trust_level: axon_core::TrustLevel::Verified,
            data_access: "read-only".into(),
            life_sciences_relevant: true,
            install_count: 10,
            composite_score: 0.9,
        };
        let message = template_message(&gap, &top);
        assert!(message.contains("Formulary Watch"));
        assert!(message.contains("read-only"));
    }
}
