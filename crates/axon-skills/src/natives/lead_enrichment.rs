//! Lead Enrichment: research a lead's company, role, and therapeutic-area
//! context before outreach.

use super::match_score;
use crate::capability::Capability;
use axon_core::TaskSpec;

const SKILL_NAME: &str = "LeadEnrichment";

pub struct LeadEnrichment;

#[async_trait::async_trait]
impl Capability for LeadEnrichment {
    fn name(&self) -> &'static str {
        SKILL_NAME
    }

    fn description(&self) -> &'static str {
        "Enriches a lead with company background, role, and therapeutic-area context from public sources"
    }

    fn agent_types(&self) -> &'static [&'static str] {
        &["hunter"]
    }

    fn data_classes(&self) -> &'static [&'static str] {
        &["crm", "public_web"]
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
            &["enrich_lead", "lead_enrichment"],
            &["enrich", "lead", "research", "background", "prospect"],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exact_task_type_dominates() {
        let score = LeadEnrichment
            .can_handle(&TaskSpec::new("enrich_lead", ""))
            .await
            .unwrap();
        assert!(score > 0.8);
    }

    #[tokio::test]
    async fn empty_task_scores_zero() {
        let score = LeadEnrichment.can_handle(&TaskSpec::default()).await.unwrap();
        assert_eq!(score, 0.0);
    }
}
