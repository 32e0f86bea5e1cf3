//! CRM Sync: writes lead and account updates back to the CRM.

use super::match_score;
use crate::capability::Capability;
use axon_core::TaskSpec;

const SKILL_NAME: &str = "CrmSync";

pub struct CrmSync;

#[async_trait::async_trait]
impl Capability for CrmSync {
    fn name(&self) -> &'static str {
        SKILL_NAME
    }

    fn description(&self) -> &'static str {
        "Updates lead status, notes, and account fields in the connected CRM"
    }

    fn agent_types(&self) -> &'static [&'static str] {
        &["hunter", "closer"]
    }

    fn data_classes(&self) -> &'static [&'static str] {
        &["crm"]
    }

    async fn can_handle(
        &self,
        task: &TaskSpec,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match_score(
            task,
            &["update_crm", "crm_sync"],
            &["crm", "update", "status", "account", "pipeline"],
        ))
    }
}
