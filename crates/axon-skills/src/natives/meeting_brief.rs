//! Meeting Brief: assembles a pre-call brief from CRM history and signals.

use super::match_score;
use crate::capability::Capability;
use axon_core::TaskSpec;

const SKILL_NAME: &str = "MeetingBrief";

pub struct MeetingBrief;

#[async_trait::async_trait]
impl Capability for MeetingBrief {
    fn name(&self) -> &'static str {
        SKILL_NAME
    }

    fn description(&self) -> &'static str {
        "Assembles a pre-meeting brief from CRM history, signals, and account context"
    }

    fn agent_types(&self) -> &'static [&'static str] {
        &["analyst", "closer"]
    }

    fn data_classes(&self) -> &'static [&'static str] {
        &["crm", "calendar"]
    }

    async fn can_handle(
        &self,
        task: &TaskSpec,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match_score(
            task,
            &["meeting_brief", "prepare_meeting"],
            &["meeting", "brief", "call", "prep", "agenda"],
        ))
    }
}
