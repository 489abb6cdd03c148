//! Per-session investigation state
//!
//! [`InvestigationState`] is a plain container: remaining budget, the
//! disclosure log and the lifecycle status. Everything else (discovered
//! phases, herring counts) is derived from the log on demand. Mutation is
//! crate-private; only the clue policy and theory submission change a state.

use crate::clue::PacingPlan;
use crate::error::EngineError;
use crate::scoring::GradedReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use ttx_scenario::{EvidenceId, EvidenceItem, PhaseId, ScenarioModel};

/// Session identifier (`INC-YYYYMMDD-xxxxxxxx` when generated)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh incident-style identifier for the given day
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let random = format!("{:032x}", ulid::Ulid::new().random());
        Self(format!("INC-{}-{}", now.format("%Y%m%d"), &random[24..]))
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting investigations
    Active,
    /// Theory received, grading in progress
    TheorySubmitted,
    /// Graded
    Completed,
    /// Ended without a theory
    Abandoned,
}

impl SessionStatus {
    /// Statuses reachable from this one
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [SessionStatus] {
        match self {
            Self::Active => &[Self::TheorySubmitted, Self::Abandoned],
            Self::TheorySubmitted => &[Self::Completed],
            Self::Completed | Self::Abandoned => &[],
        }
    }

    /// No further transitions possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::TheorySubmitted => "theory submitted",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        })
    }
}

/// Validate a lifecycle transition
///
/// # Errors
/// `EngineError::InvalidStateTransition` if `to` is not reachable from `from`
pub fn validate_transition(
    from: SessionStatus,
    to: SessionStatus,
    action: &'static str,
) -> Result<(), EngineError> {
    if from.allowed_transitions().contains(&to) {
        Ok(())
    } else {
        Err(EngineError::InvalidStateTransition { from, action })
    }
}

/// One entry of the investigation timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisclosureRecord {
    /// 1-based position in the timeline
    pub sequence: u32,
    /// Disclosed item
    pub evidence_id: EvidenceId,
    /// Player request that produced it
    pub request: String,
    /// Disclosure time
    pub timestamp: DateTime<Utc>,
    /// Whether the item was a red herring
    pub red_herring: bool,
    /// Phase the item substantiates (genuine items only)
    pub phase: Option<PhaseId>,
}

/// Mutable state of one investigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationState {
    session_id: SessionId,
    scenario_id: String,
    started_at: DateTime<Utc>,
    initial_budget: u32,
    remaining_budget: u32,
    pacing: PacingPlan,
    log: Vec<DisclosureRecord>,
    status: SessionStatus,
    hints_used: u32,
    report: Option<GradedReport>,
}

impl InvestigationState {
    /// Create a fresh state bound to a scenario
    #[must_use]
    pub fn new(session_id: SessionId, scenario: &ScenarioModel, started_at: DateTime<Utc>) -> Self {
        let budget = scenario.investigation_budget();
        Self {
            session_id,
            scenario_id: scenario.id().to_string(),
            started_at,
            initial_budget: budget,
            remaining_budget: budget,
            pacing: PacingPlan::for_scenario(scenario),
            log: Vec::new(),
            status: SessionStatus::Active,
            hints_used: 0,
            report: None,
        }
    }

    /// Session ID
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Bound scenario ID
    #[inline]
    #[must_use]
    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    /// Session start time
    #[inline]
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Budget at session start
    #[inline]
    #[must_use]
    pub fn initial_budget(&self) -> u32 {
        self.initial_budget
    }

    /// Investigations left
    #[inline]
    #[must_use]
    pub fn remaining_budget(&self) -> u32 {
        self.remaining_budget
    }

    /// Herring pacing fixed at session start
    #[inline]
    #[must_use]
    pub fn pacing(&self) -> &PacingPlan {
        &self.pacing
    }

    /// Disclosure log in insertion order
    ///
    /// Restartable: call again or clone the iterator to walk it twice.
    pub fn timeline(&self) -> impl ExactSizeIterator<Item = &DisclosureRecord> + Clone + '_ {
        self.log.iter()
    }

    /// Disclosure log as a slice
    #[inline]
    #[must_use]
    pub fn log(&self) -> &[DisclosureRecord] {
        &self.log
    }

    /// Number of disclosures so far
    #[inline]
    #[must_use]
    pub fn disclosed_count(&self) -> usize {
        self.log.len()
    }

    /// Number of disclosed red herrings
    #[must_use]
    pub fn herrings_disclosed(&self) -> usize {
        self.log.iter().filter(|r| r.red_herring).count()
    }

    /// Whether an item has been disclosed
    #[must_use]
    pub fn is_disclosed(&self, id: &EvidenceId) -> bool {
        self.log.iter().any(|r| &r.evidence_id == id)
    }

    /// Phases substantiated by disclosed genuine evidence
    #[must_use]
    pub fn discovered_phases(&self) -> BTreeSet<PhaseId> {
        self.log
            .iter()
            .filter(|r| !r.red_herring)
            .filter_map(|r| r.phase.clone())
            .collect()
    }

    /// Disclosed genuine evidence for one phase, in timeline order
    #[must_use]
    pub fn evidence_for_phase(&self, phase: &PhaseId) -> Vec<EvidenceId> {
        self.log
            .iter()
            .filter(|r| !r.red_herring && r.phase.as_ref() == Some(phase))
            .map(|r| r.evidence_id.clone())
            .collect()
    }

    /// Lifecycle status
    #[inline]
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Submission is allowed whenever the session is active, even mid-budget
    #[inline]
    #[must_use]
    pub fn can_submit_theory(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Hints taken so far
    #[inline]
    #[must_use]
    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    /// Final report once completed
    #[inline]
    #[must_use]
    pub fn report(&self) -> Option<&GradedReport> {
        self.report.as_ref()
    }

    pub(crate) fn ensure_active(&self, action: &'static str) -> Result<(), EngineError> {
        if self.status == SessionStatus::Active {
            Ok(())
        } else {
            Err(EngineError::InvalidStateTransition {
                from: self.status,
                action,
            })
        }
    }

    pub(crate) fn transition(
        &mut self,
        to: SessionStatus,
        action: &'static str,
    ) -> Result<(), EngineError> {
        validate_transition(self.status, to, action)?;
        tracing::debug!(
            session = %self.session_id,
            from = %self.status,
            to = %to,
            "Session transition"
        );
        self.status = to;
        Ok(())
    }

    /// Append a disclosure and spend one unit of budget
    pub(crate) fn record_disclosure(
        &mut self,
        item: &EvidenceItem,
        request: &str,
        timestamp: DateTime<Utc>,
    ) -> &DisclosureRecord {
        self.remaining_budget = self.remaining_budget.saturating_sub(1);
        let sequence = u32::try_from(self.log.len() + 1).unwrap_or(u32::MAX);
        self.log.push(DisclosureRecord {
            sequence,
            evidence_id: item.id.clone(),
            request: request.to_string(),
            timestamp,
            red_herring: item.red_herring,
            phase: item.linked_phase().cloned(),
        });
        &self.log[self.log.len() - 1]
    }

    pub(crate) fn use_hint(&mut self) {
        self.hints_used += 1;
    }

    pub(crate) fn set_report(&mut self, report: GradedReport) {
        self.report = Some(report);
    }

    /// Internal consistency of a decoded state against its scenario
    pub(crate) fn consistency_issue(&self, scenario: &ScenarioModel) -> Option<String> {
        if self.remaining_budget > self.initial_budget {
            return Some("remaining budget exceeds initial budget".to_string());
        }
        let spent = (self.initial_budget - self.remaining_budget) as usize;
        if spent != self.log.len() {
            return Some(format!(
                "log has {} entries but {spent} investigations were spent",
                self.log.len()
            ));
        }
        let mut seen = BTreeSet::new();
        for record in &self.log {
            let Some(item) = scenario.evidence(&record.evidence_id) else {
                return Some(format!("unknown evidence {}", record.evidence_id));
            };
            if item.red_herring != record.red_herring || item.phase != record.phase {
                return Some(format!("record for {} disagrees with scenario", record.evidence_id));
            }
            if !seen.insert(&record.evidence_id) {
                return Some(format!("{} disclosed twice", record.evidence_id));
            }
        }
        None
    }
}
