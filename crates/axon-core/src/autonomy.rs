//! Autonomy service: per-(user, skill, risk) auto-approve decisions.
//!
//! HIGH/CRITICAL gating never reaches this service; it only answers for LOW
//! and MEDIUM actions. The store-backed `TrustLedger` auto-approves once a
//! skill has a streak of approved successes at that risk level. Any failure
//! in the check is treated by callers as "approval required".

use crate::shared::RiskLevel;
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of an approval check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub auto_approved: bool,
}

/// Per-(user, skill, risk) auto-approve decision from trust history.
#[async_trait::async_trait]
pub trait AutonomyService: Send + Sync {
    async fn check_approval(
        &self,
        user_id: &str,
        skill_id: &str,
        risk_level: RiskLevel,
    ) -> Result<ApprovalDecision, Box<dyn std::error::Error + Send + Sync>>;
}

/// Trust history row for one (user, skill, risk) triple.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustHistory {
    /// Consecutive approved-and-successful executions. Reset on failure.
    pub approved_successes: u32,
    pub total_executions: u64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Store-backed autonomy service.
pub struct TrustLedger {
    store: Arc<Store>,
    /// Streak of approved successes required before auto-approval.
    streak: u32,
}

impl TrustLedger {
    pub fn new(store: Arc<Store>, streak: u32) -> Self {
        Self {
            store,
            streak: streak.max(1),
        }
    }

    fn key(user_id: &str, skill_id: &str, risk_level: RiskLevel) -> String {
        format!("{}/{}/{}", user_id, skill_id, risk_level.as_str())
    }

    /// Folds one supervised outcome into the ledger. A failure resets the streak.
    pub fn record_outcome(
        &self,
        user_id: &str,
        skill_id: &str,
        risk_level: RiskLevel,
        success: bool,
    ) -> Result<(), crate::store::StoreError> {
        let key = Self::key(user_id, skill_id, risk_level);
        let mut history: TrustHistory = self.store.get_trust_row(&key)?.unwrap_or_default();
        if success {
            history.approved_successes += 1;
        } else {
            history.approved_successes = 0;
        }
        history.total_executions += 1;
        history.last_updated = Some(Utc::now());
        self.store.put_trust_row(&key, &history)
    }
}

#[async_trait::async_trait]
impl AutonomyService for TrustLedger {
    async fn check_approval(
        &self,
        user_id: &str,
        skill_id: &str,
        risk_level: RiskLevel,
    ) -> Result<ApprovalDecision, Box<dyn std::error::Error + Send + Sync>> {
        if risk_level >= RiskLevel::High {
            return Ok(ApprovalDecision {
                auto_approved: false,
            });
        }
        let key = Self::key(user_id, skill_id, risk_level);
        let history: TrustHistory = self.store.get_trust_row(&key)?.unwrap_or_default();
        Ok(ApprovalDecision {
            auto_approved: history.approved_successes >= self.streak,
        })
    }
}
