//! Trait implemented by live (compiled-in) agent capabilities.

use axon_core::{SkillEntry, SkillType, TaskSpec, TrustLevel};

/// A live capability instance the registry can rank against a task.
/// Execution itself belongs to the external executor; this interface only
/// exposes what ranking and cataloging need.
#[async_trait::async_trait]
pub trait Capability: Send + Sync {
    /// Unique skill name for catalog ids and routing.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Agent roles permitted to use this capability.
    fn agent_types(&self) -> &'static [&'static str];

    /// Data classification labels the capability may touch.
    fn data_classes(&self) -> &'static [&'static str] {
        &[]
    }

    fn trust_level(&self) -> TrustLevel {
        TrustLevel::Core
    }

    fn life_sciences_relevant(&self) -> bool {
        false
    }

    /// Applicability of this capability to the task, in [0, 1].
    /// A raised error is scored 0 by the registry; it never aborts ranking.
    async fn can_handle(
        &self,
        task: &TaskSpec,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
}

/// Builds the catalog entry for a live capability.
pub fn entry_for(capability: &dyn Capability) -> SkillEntry {
    SkillEntry {
        id: SkillEntry::skill_id(SkillType::Native, capability.name()),
        name: capability.name().to_string(),
        description: capability.description().to_string(),
        skill_type: SkillType::Native,
        agent_types: capability
            .agent_types()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        trust_level: capability.trust_level(),
        data_classes: capability
            .data_classes()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        life_sciences_relevant: capability.life_sciences_relevant(),
        performance_metrics: Default::default(),
    }
}
