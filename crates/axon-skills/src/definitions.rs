//! Static manifest of LLM-defined skills (DEFINITION provenance).
//!
//! These skills have no compiled instance; their behavior is an LLM prompt
//! owned by the executor. The manifest replaces runtime discovery: the set
//! is closed and versioned with the crate.

use axon_core::{SkillEntry, SkillType, TrustLevel};

/// One manifest row for an LLM-defined skill.
#[derive(Debug, Clone, Copy)]
pub struct SkillDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub agent_types: &'static [&'static str],
    pub data_classes: &'static [&'static str],
    pub life_sciences_relevant: bool,
}

/// The closed set of LLM-defined skills, in registration order.
pub const SKILL_DEFINITIONS: &[SkillDefinition] = &[
    SkillDefinition {
        name: "TerritoryPulse",
        description: "Summarizes weekly territory activity, wins, and stalled accounts",
        agent_types: &["analyst"],
        data_classes: &["crm"],
        life_sciences_relevant: false,
    },
    SkillDefinition {
        name: "FormularyWatch",
        description: "Tracks formulary and payer-coverage changes for the user's products",
        agent_types: &["analyst", "hunter"],
        data_classes: &["public_web"],
        life_sciences_relevant: true,
    },
    SkillDefinition {
        name: "KolMapper",
        description: "Maps key opinion leaders and their institutional affiliations in a therapeutic area",
        agent_types: &["hunter"],
        data_classes: &["public_web"],
        life_sciences_relevant: true,
    },
];

impl SkillDefinition {
    /// Builds the catalog entry for this definition. Definitions ship
    /// reviewed prompts, so they register as verified.
    pub fn entry(&self) -> SkillEntry {
        SkillEntry {
            id: SkillEntry::skill_id(SkillType::Definition, self.name),
            name: self.name.to_string(),
            description: self.description.to_string(),
            skill_type: SkillType::Definition,
            agent_types: self.agent_types.iter().map(|s| s.to_string()).collect(),
            trust_level: TrustLevel::Verified,
            data_classes: self.data_classes.iter().map(|s| s.to_string()).collect(),
            life_sciences_relevant: self.life_sciences_relevant,
            performance_metrics: Default::default(),
        }
    }
}
