//! Scoring utilities shared by the registry and the discovery agent.

use axon_core::{TaskSpec, TrustLevel};
use std::collections::HashSet;

/// Composite-score weights for marketplace candidates.
const W_RELEVANCE: f64 = 0.40;
const W_SECURITY: f64 = 0.25;
const W_COMMUNITY: f64 = 0.20;
const W_LIFE_SCIENCES: f64 = 0.15;

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_string)
        .collect()
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Keyword heuristic for catalog entries without a live instance.
///
/// An exact task-type-to-name match contributes 0.4; token overlap between
/// the task text and name+description contributes up to 0.6. The result is
/// clamped to [0, 1]; an empty task always scores 0.
pub fn keyword_relevance(task: &TaskSpec, name: &str, description: &str) -> f64 {
    if task.is_empty() {
        return 0.0;
    }
    let mut score = 0.0;
    if !task.task_type.trim().is_empty()
        && normalize_name(&task.task_type) == normalize_name(name)
    {
        score += 0.4;
    }
    let task_tokens = tokenize(&format!("{} {}", task.task_type, task.description));
    if !task_tokens.is_empty() {
        let entry_tokens = tokenize(&format!("{} {}", name, description));
        let overlap = task_tokens.intersection(&entry_tokens).count() as f64;
        score += 0.6 * (overlap / task_tokens.len() as f64);
    }
    score.clamp(0.0, 1.0)
}

/// Fraction of gap keywords found in a marketplace entry's searchable text.
pub fn gap_relevance(keywords: &[String], name: &str, description: &str, tags: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let haystack = format!("{} {} {}", name, description, tags.join(" ")).to_lowercase();
    let hits = keywords
        .iter()
        .filter(|k| haystack.contains(&k.to_lowercase()))
        .count();
    hits as f64 / keywords.len() as f64
}

/// Trust-based security score, discounted for broad permission surfaces.
pub fn security_score(trust_level: TrustLevel, permission_count: usize) -> f64 {
    let base = match trust_level {
        TrustLevel::Core => 1.0,
        TrustLevel::Verified => 0.9,
        TrustLevel::User => 0.6,
        TrustLevel::Community => 0.4,
    };
    if permission_count > 5 {
        base * 0.7
    } else if permission_count > 3 {
        base * 0.85
    } else {
        base
    }
}

/// Install-count popularity, log-compressed and normalized against the
/// largest install count in the result set. Zero until counts are known.
pub fn community_score(install_count: u64, max_install_count: u64) -> f64 {
    if max_install_count == 0 {
        return 0.0;
    }
    (install_count as f64).ln_1p() / (max_install_count as f64).ln_1p()
}

/// Weighted composite used to rank marketplace candidates against a gap.
pub fn composite_score(
    relevance: f64,
    security: f64,
    community: f64,
    life_sciences_relevant: bool,
) -> f64 {
    let bonus = if life_sciences_relevant { 1.0 } else { 0.0 };
    W_RELEVANCE * relevance + W_SECURITY * security + W_COMMUNITY * community
        + W_LIFE_SCIENCES * bonus
}

/// Fraction of `gap_keywords` present in `delivered_keywords`. Used for the
/// 7-day recommendation dedup (> 0.5 suppresses the gap).
pub fn keyword_overlap(gap_keywords: &[String], delivered_keywords: &[String]) -> f64 {
    if gap_keywords.is_empty() {
        return 0.0;
    }
    let delivered: HashSet<String> = delivered_keywords
        .iter()
        .map(|k| k.to_lowercase())
        .collect();
    let hits = gap_keywords
        .iter()
        .filter(|k| delivered.contains(&k.to_lowercase()))
        .count();
    hits as f64 / gap_keywords.len() as f64
}
