//! Compiled-in native capabilities.
//!
//! The native skill set is closed and known ahead of time;
//! [`native_capabilities`] is the one registration list the registry
//! bootstraps from.

mod competitor_scan;
mod crm_sync;
mod draft_outreach;
mod lead_enrichment;
mod meeting_brief;

pub use competitor_scan::CompetitorScan;
pub use crm_sync::CrmSync;
pub use draft_outreach::DraftOutreach;
pub use lead_enrichment::LeadEnrichment;
pub use meeting_brief::MeetingBrief;

use crate::capability::Capability;
use axon_core::TaskSpec;
use std::sync::Arc;

/// The fixed enumeration of native capabilities, in registration order.
pub fn native_capabilities() -> Vec<Arc<dyn Capability>> {
    vec![
        Arc::new(LeadEnrichment),
        Arc::new(CrmSync),
        Arc::new(DraftOutreach),
        Arc::new(CompetitorScan),
        Arc::new(MeetingBrief),
    ]
}

/// Shared applicability heuristic for native capabilities: a direct
/// task-type hit dominates; otherwise keyword hits in the task text each
/// contribute a fraction, capped at 0.6.
pub(crate) fn match_score(task: &TaskSpec, exact_types: &[&str], keywords: &[&str]) -> f64 {
    if task.is_empty() {
        return 0.0;
    }
    let task_type = task.task_type.trim().to_lowercase();
    if exact_types.iter().any(|t| *t == task_type) {
        return 0.9;
    }
    let text = format!("{} {}", task.task_type, task.description).to_lowercase();
    let hits = keywords.iter().filter(|k| text.contains(**k)).count();
    if hits == 0 {
        return 0.0;
    }
    ((hits as f64) * 0.2).min(0.6)
}
