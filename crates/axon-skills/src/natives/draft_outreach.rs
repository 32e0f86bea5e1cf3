//! Draft Outreach: LLM-assisted first-touch and follow-up drafting.

use super::match_score;
use crate::capability::Capability;
use axon_core::TaskSpec;

const SKILL_NAME: &str = "DraftOutreach";

pub struct DraftOutreach;

#[async_trait::async_trait]
impl Capability for DraftOutreach {
    fn name(&self) -> &'static str {
        SKILL_NAME
    }

    fn description(&self) -> &'static str {
        "Drafts personalized outreach emails and follow-ups for a lead"
    }

    fn agent_types(&self) -> &'static [&'static str] {
        &["closer"]
    }

    fn data_classes(&self) -> &'static [&'static str] {
        &["crm", "documents"]
    }

    async fn can_handle(
        &self,
        task: &TaskSpec,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match_score(
            task,
            &["draft_outreach", "draft_email"],
            &["draft", "email", "outreach", "follow-up", "message"],
        ))
    }
}
