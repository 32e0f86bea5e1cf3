//! Competitor Scan: collects recent public activity for tracked competitors.

use super::match_score;
use crate::capability::Capability;
use axon_core::TaskSpec;

const SKILL_NAME: &str = "CompetitorScan";

pub struct CompetitorScan;

#[async_trait::async_trait]
impl Capability for CompetitorScan {
    fn name(&self) -> &'static str {
        SKILL_NAME
    }

    fn description(&self) -> &'static str {
        "Scans public sources for recent activity of tracked competitors and topics"
    }

    fn agent_types(&self) -> &'static [&'static str] {
        &["analyst"]
    }

    fn data_classes(&self) -> &'static [&'static str] {
        &["public_web"]
    }

    fn life_sciences_relevant(&self) -> bool {
        true
    }

    async fn can_handle(
        &self,
        task: &TaskSpec,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match_score(
            task,
            &["scan_competitor", "competitor_scan"],
            &["competitor", "scan", "monitor", "news", "funding"],
        ))
    }
}
