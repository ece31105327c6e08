//! Exact, case-insensitive phrase lookup.

use std::sync::Arc;

use crate::config::{TriggerConfig, TriggerRule};

/// Case-fold message text the same way trigger phrases are stored.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

/// Find the rule whose phrase equals the whole message. Substrings and
/// individual words never match.
pub fn match_trigger(config: &TriggerConfig, normalized: &str) -> Option<Arc<TriggerRule>> {
    config.rule_for(normalized).cloned()
}
