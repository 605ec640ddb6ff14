//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};

/// What to do when an effect's own write re-triggers it while it is still
/// running on the same thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Skip the nested run and log a warning.
    #[default]
    Skip,
    /// Panic at the write that closed the cycle.
    Panic,
}

/// Settings for a [`Runtime`](crate::Runtime).
///
/// ```
/// use ripple_core::{CyclePolicy, RuntimeConfig};
///
/// let config = RuntimeConfig::from_json(r#"{ "label": "ui", "cycle_policy": "panic" }"#)?;
/// assert_eq!(config.cycle_policy, CyclePolicy::Panic);
/// # Ok::<(), ripple_core::ReactiveError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Name attached to the runtime's log events.
    pub label: Option<String>,
    /// Reaction to an effect re-triggering itself on the same thread.
    pub cycle_policy: CyclePolicy,
}

impl RuntimeConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ReactiveError::Config(e.to_string()))
    }

    /// Set the log label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the cycle policy.
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = RuntimeConfig::from_json("{}").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.cycle_policy, CyclePolicy::Skip);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = RuntimeConfig::from_json(r#"{ "batching": true }"#);
        assert!(matches!(err, Err(ReactiveError::Config(_))));
    }

    #[test]
    fn builders_set_fields() {
        let config = RuntimeConfig::default()
            .with_label("test")
            .with_cycle_policy(CyclePolicy::Panic);
        assert_eq!(config.label.as_deref(), Some("test"));
        assert_eq!(config.cycle_policy, CyclePolicy::Panic);
    }
}
