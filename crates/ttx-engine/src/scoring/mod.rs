//! Theory scoring
//!
//! - [`engine`]: the grader
//! - [`report`]: graded report, verdicts and letter grades
//! - [`sequence`]: order matching for the sequence bonus

pub mod engine;
pub mod report;
pub mod sequence;

pub use engine::ScoringEngine;
pub use report::{
    EfficiencyRating, GradedReport, Grade, HerringPenalty, InvestigationMetrics, PhaseVerdict,
};

use serde::{Deserialize, Serialize};
use ttx_scenario::{EvidenceId, PhaseId};

/// A player's account of the attack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theory {
    /// Claimed phases in claimed attack order
    pub phases: Vec<PhaseId>,
    /// Evidence the player cites as proof; cited red herrings are penalized
    #[serde(default)]
    pub accused_evidence: Vec<EvidenceId>,
}

impl Theory {
    /// Theory from an ordered phase list
    pub fn new(phases: impl IntoIterator<Item = impl Into<PhaseId>>) -> Self {
        Self {
            phases: phases.into_iter().map(Into::into).collect(),
            accused_evidence: Vec::new(),
        }
    }

    /// Cite evidence as proof
    #[must_use]
    pub fn citing(mut self, evidence: impl IntoIterator<Item = impl Into<EvidenceId>>) -> Self {
        self.accused_evidence
            .extend(evidence.into_iter().map(Into::into));
        self
    }
}
