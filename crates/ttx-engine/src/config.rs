//! Engine configuration
//!
//! Scenario-level knobs (budget, herring ratio, rubric) live in the scenario
//! document. [`EngineConfig`] holds the operator-level ones.
//!
//! ```toml
//! relevance_threshold = 0.0
//! pacing_slack = 1.0
//! render_timeout_ms = 10000
//! hint_limit = 3
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operator-level engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// An item is relevant when its score is strictly greater than this
    pub relevance_threshold: f64,
    /// Width of the running herring-ratio band, in disclosures
    pub pacing_slack: f64,
    /// Deadline for one narrative render
    pub render_timeout_ms: u64,
    /// Hints allowed per session
    pub hint_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.0,
            pacing_slack: 1.0,
            render_timeout_ms: 10_000,
            hint_limit: 3,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML configuration
    ///
    /// # Errors
    /// `ConfigError::Parse` for unknown keys or bad syntax,
    /// `ConfigError::Invalid` for out-of-range values
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.relevance_threshold.is_finite() || self.relevance_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                field: "relevance_threshold",
                reason: format!("{} is not a non-negative number", self.relevance_threshold),
            });
        }
        if !self.pacing_slack.is_finite() || self.pacing_slack < 0.0 {
            return Err(ConfigError::Invalid {
                field: "pacing_slack",
                reason: format!("{} is not a non-negative number", self.pacing_slack),
            });
        }
        if self.render_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "render_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Set relevance threshold
    #[inline]
    #[must_use]
    pub fn with_relevance_threshold(mut self, threshold: f64) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    /// Set pacing slack
    #[inline]
    #[must_use]
    pub fn with_pacing_slack(mut self, slack: f64) -> Self {
        self.pacing_slack = slack;
        self
    }

    /// Set render timeout
    #[inline]
    #[must_use]
    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set hint limit
    #[inline]
    #[must_use]
    pub fn with_hint_limit(mut self, limit: u32) -> Self {
        self.hint_limit = limit;
        self
    }

    /// Render timeout as a duration
    #[inline]
    #[must_use]
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.relevance_threshold, 0.0);
        assert_eq!(config.pacing_slack, 1.0);
        assert_eq!(config.render_timeout(), Duration::from_secs(10));
        assert_eq!(config.hint_limit, 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("hint_limit = 5\n").unwrap();
        assert_eq!(config.hint_limit, 5);
        assert_eq!(config.render_timeout_ms, 10_000);
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = EngineConfig::from_toml_str("hint_limt = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn negative_slack_rejected() {
        let err = EngineConfig::from_toml_str("pacing_slack = -0.5\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "pacing_slack",
                ..
            }
        ));
    }

    #[test]
    fn builder() {
        let config = EngineConfig::default()
            .with_hint_limit(0)
            .with_render_timeout(Duration::from_millis(250));
        assert_eq!(config.hint_limit, 0);
        assert_eq!(config.render_timeout_ms, 250);
    }
}
