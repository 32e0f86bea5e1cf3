//! Core configuration loaded from the environment.
//!
//! Change behavior without code edits. Unset or invalid values fall back to
//! the defaults documented per field.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_slow_run_threshold_ms() -> u64 {
    30_000
}

fn default_autonomy_streak() -> u32 {
    3
}

/// Configuration loaded from environment.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | AXON_MARKETPLACE_URL | unset | Base URL of the marketplace export API; sync is skipped when unset. |
/// | AXON_MODEL | bridge default | Model id passed to the OpenRouter bridge. |
/// | AXON_DISCOVERY_ENABLED | true | Run the weekly gap-discovery loop. |
/// | AXON_SLOW_RUN_THRESHOLD_MS | 30000 | Execution duration above which a plan counts as slow evidence. |
/// | AXON_AUTONOMY_STREAK | 3 | Approved successes required before LOW/MEDIUM actions auto-execute. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// AXON_MARKETPLACE_URL: marketplace export endpoint base.
    #[serde(default)]
    pub marketplace_url: Option<String>,
    /// AXON_MODEL: model id for the LLM bridge.
    #[serde(default)]
    pub model: Option<String>,
    /// AXON_DISCOVERY_ENABLED: gate for the scheduled discovery run.
    #[serde(default = "default_true")]
    pub discovery_enabled: bool,
    /// AXON_SLOW_RUN_THRESHOLD_MS: slow-execution evidence threshold.
    #[serde(default = "default_slow_run_threshold_ms")]
    pub slow_run_threshold_ms: u64,
    /// AXON_AUTONOMY_STREAK: trust-ledger streak for auto-approval.
    #[serde(default = "default_autonomy_streak")]
    pub autonomy_streak: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            marketplace_url: None,
            model: None,
            discovery_enabled: true,
            slow_run_threshold_ms: default_slow_run_threshold_ms(),
            autonomy_streak: default_autonomy_streak(),
        }
    }
}

impl CoreConfig {
    /// Loads toggles from environment. Unset or invalid => defaults.
    pub fn from_env() -> Self {
        Self {
            marketplace_url: env_opt_string("AXON_MARKETPLACE_URL"),
            model: env_opt_string("AXON_MODEL"),
            discovery_enabled: env_bool("AXON_DISCOVERY_ENABLED", true),
            slow_run_threshold_ms: env_u64(
                "AXON_SLOW_RUN_THRESHOLD_MS",
                default_slow_run_threshold_ms(),
            ),
            autonomy_streak: env_u64("AXON_AUTONOMY_STREAK", default_autonomy_streak() as u64)
                as u32,
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
