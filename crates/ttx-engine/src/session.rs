//! Session persistence contract
//!
//! The engine never does I/O itself. A [`SessionSnapshot`] is a
//! self-verifying JSON encoding of an [`InvestigationState`]; a
//! [`SessionStore`] keeps snapshots by session ID.

use crate::error::{SnapshotError, StoreError};
use crate::state::{InvestigationState, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ttx_scenario::ScenarioModel;

/// Current snapshot format
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

fn checksum(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

/// Serialized investigation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Format version
    pub format_version: u32,
    /// Session the state belongs to
    pub session_id: SessionId,
    /// Scenario the state is bound to
    pub scenario_id: String,
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,
    /// Hex SHA-256 of `payload`
    pub checksum: String,
    /// JSON-encoded state
    pub payload: String,
}

impl SessionSnapshot {
    /// Capture a state
    ///
    /// # Errors
    /// `SnapshotError::Serialization` if the state cannot be encoded
    pub fn capture(state: &InvestigationState) -> Result<Self, SnapshotError> {
        let payload = serde_json::to_string(state)?;
        Ok(Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            session_id: state.session_id().clone(),
            scenario_id: state.scenario_id().to_string(),
            saved_at: Utc::now(),
            checksum: checksum(&payload),
            payload,
        })
    }

    /// Check version and checksum
    ///
    /// # Errors
    /// `UnsupportedVersion` or `ChecksumMismatch`
    pub fn verify(&self) -> Result<(), SnapshotError> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                expected: SNAPSHOT_FORMAT_VERSION,
                found: self.format_version,
            });
        }
        let actual = checksum(&self.payload);
        if actual != self.checksum {
            return Err(SnapshotError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Rebuild the state for `scenario`
    ///
    /// The restored state behaves exactly like the captured one: same budget,
    /// timeline, discovered phases and pacing.
    ///
    /// # Errors
    /// Verification failures, `ScenarioMismatch`, or `Corrupt` when the
    /// payload disagrees with the header or the scenario
    pub fn restore(&self, scenario: &ScenarioModel) -> Result<InvestigationState, SnapshotError> {
        self.verify()?;
        if self.scenario_id != scenario.id() {
            return Err(SnapshotError::ScenarioMismatch {
                expected: scenario.id().to_string(),
                found: self.scenario_id.clone(),
            });
        }
        let state: InvestigationState = serde_json::from_str(&self.payload)?;
        if state.session_id() != &self.session_id || state.scenario_id() != self.scenario_id {
            return Err(SnapshotError::Corrupt(
                "payload does not match snapshot header".to_string(),
            ));
        }
        if let Some(issue) = state.consistency_issue(scenario) {
            return Err(SnapshotError::Corrupt(issue));
        }
        Ok(state)
    }

    /// Encode for storage
    ///
    /// # Errors
    /// Propagates serializer failures
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from storage (not verified)
    ///
    /// # Errors
    /// Propagates deserializer failures
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Snapshot persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Save or overwrite the snapshot for `id`
    ///
    /// # Errors
    /// Backend failures
    async fn save(&self, id: &SessionId, snapshot: &SessionSnapshot) -> Result<(), StoreError>;

    /// Load the snapshot for `id`
    ///
    /// # Errors
    /// `StoreError::NotFound` if nothing is saved under `id`
    async fn load(&self, id: &SessionId) -> Result<SessionSnapshot, StoreError>;
}
