//! Error types for the investigation engine
//!
//! Provides error handling for:
//! - Budget and evidence exhaustion
//! - Illegal session lifecycle transitions
//! - Narrative rendering failures (always recovered locally)
//! - Snapshot encoding and session store failures
//! - Configuration parsing

use crate::state::SessionStatus;
use ttx_scenario::ValidationError;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No further investigations possible
    #[error("investigation exhausted: {0}")]
    Exhausted(#[from] ExhaustedError),

    /// Operation not allowed in the current session status
    #[error("cannot {action} while session is {from}")]
    InvalidStateTransition {
        /// Status at the time of the call
        from: SessionStatus,
        /// Attempted operation
        action: &'static str,
    },

    /// Hint allowance used up
    #[error("hint limit of {limit} reached")]
    HintLimitReached {
        /// Configured limit
        limit: u32,
    },

    /// Every phase already has disclosed evidence
    #[error("no hint available")]
    NoHintAvailable,

    /// State belongs to another scenario
    #[error("state is bound to scenario {found}, engine runs {expected}")]
    ScenarioMismatch {
        /// Engine scenario
        expected: String,
        /// State scenario
        found: String,
    },

    /// Scenario could not be loaded
    #[error("scenario error: {0}")]
    Scenario(#[from] ValidationError),

    /// Snapshot capture or restore failed
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Session store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Engine configuration is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Whether the session can continue after this error
    ///
    /// Only scenario and configuration problems are fatal; every session-level
    /// error leaves the state untouched.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Scenario(_) | Self::Config(_))
    }

    /// Short, non-technical message for the player
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Exhausted(ExhaustedError::BudgetSpent { .. }) => {
                "No more investigations allowed. Submit your theory when ready.".to_string()
            }
            Self::Exhausted(ExhaustedError::EvidenceDepleted { .. }) => {
                "Every piece of evidence has been uncovered. Submit your theory when ready."
                    .to_string()
            }
            Self::InvalidStateTransition { from, .. } => match from {
                SessionStatus::Active => "That action is not available right now.".to_string(),
                SessionStatus::TheorySubmitted | SessionStatus::Completed => {
                    "This investigation is already closed; your theory has been submitted."
                        .to_string()
                }
                SessionStatus::Abandoned => "This investigation was abandoned.".to_string(),
            },
            Self::HintLimitReached { limit } => {
                format!("You have used all {limit} hints for this investigation.")
            }
            Self::NoHintAvailable => "There is nothing left to hint at.".to_string(),
            Self::ScenarioMismatch { .. } | Self::Snapshot(_) => {
                "This saved investigation cannot be resumed.".to_string()
            }
            Self::Store(StoreError::NotFound(id)) => format!("No saved investigation named {id}."),
            Self::Store(_) => "The investigation could not be saved or loaded.".to_string(),
            Self::Scenario(_) => "This scenario is broken and cannot be played.".to_string(),
            Self::Config(_) => "The engine is misconfigured.".to_string(),
        }
    }
}

/// Budget or evidence pool exhausted (recoverable)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExhaustedError {
    /// Remaining budget is zero
    #[error("investigation budget of {budget} spent")]
    BudgetSpent {
        /// Initial budget
        budget: u32,
    },

    /// All evidence already disclosed
    #[error("all {pool} evidence items disclosed")]
    EvidenceDepleted {
        /// Pool size
        pool: usize,
    },
}

/// Narrative backend failure (never surfaced to the player)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// Backend error (network, quota, auth, ...)
    #[error("narrative backend unavailable: {reason}")]
    Unavailable {
        /// Backend-specific reason
        reason: String,
    },

    /// Backend did not answer within the deadline
    #[error("narrative rendering timed out after {after_ms}ms")]
    TimedOut {
        /// Deadline in milliseconds
        after_ms: u64,
    },
}

impl RenderError {
    /// Create unavailable error
    #[inline]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Snapshot capture / restore errors
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// JSON encoding or decoding failed
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot was written by an incompatible version
    #[error("unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Supported version
        expected: u32,
        /// Version in the snapshot
        found: u32,
    },

    /// Payload does not match its checksum
    #[error("snapshot checksum mismatch (expected {expected}, computed {actual})")]
    ChecksumMismatch {
        /// Recorded checksum
        expected: String,
        /// Checksum of the payload
        actual: String,
    },

    /// Snapshot belongs to another scenario
    #[error("snapshot is for scenario {found}, not {expected}")]
    ScenarioMismatch {
        /// Scenario being resumed against
        expected: String,
        /// Scenario recorded in the snapshot
        found: String,
    },

    /// Payload decoded but is internally inconsistent
    #[error("snapshot is corrupt: {0}")]
    Corrupt(String),
}

/// Session store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No snapshot saved under this session ID
    #[error("session {0} not found")]
    NotFound(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session ID cannot be used as a storage key
    #[error("invalid session id {0:?}")]
    InvalidId(String),

    /// Other backend failure
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Engine configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_scenario_and_config_errors_are_fatal() {
        let exhausted = EngineError::from(ExhaustedError::BudgetSpent { budget: 20 });
        assert!(exhausted.is_recoverable());

        let transition = EngineError::InvalidStateTransition {
            from: SessionStatus::Completed,
            action: "submit a theory",
        };
        assert!(transition.is_recoverable());

        let config = EngineError::from(ConfigError::Invalid {
            field: "pacing_slack",
            reason: "must not be negative".into(),
        });
        assert!(!config.is_recoverable());
    }

    #[test]
    fn user_messages_are_not_technical() {
        let err = EngineError::from(ExhaustedError::BudgetSpent { budget: 3 });
        assert_eq!(
            err.user_message(),
            "No more investigations allowed. Submit your theory when ready."
        );

        let err = EngineError::InvalidStateTransition {
            from: SessionStatus::Completed,
            action: "submit a theory",
        };
        assert!(err.user_message().contains("already closed"));
        assert_eq!(
            err.to_string(),
            "cannot submit a theory while session is completed"
        );
    }
}
