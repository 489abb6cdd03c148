//! Error types for scenario loading
//!
//! A scenario is either fully valid or unusable. Structural problems are
//! collected into [`StructuralIssue`]s and reported together so an author can
//! fix a document in one pass.

use crate::ids::{EvidenceId, PhaseId};

/// Scenario load failure (fatal for the scenario)
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The document is not well-formed YAML or does not match the format
    #[error("scenario document is malformed: {0}")]
    Malformed(#[from] serde_yaml::Error),

    /// The document parsed but violates structural invariants
    #[error("scenario failed validation with {} issue(s): {}", .issues.len(), join_issues(.issues))]
    Inconsistent {
        /// Every violated invariant
        issues: Vec<StructuralIssue>,
    },
}

impl ValidationError {
    /// Issues behind an `Inconsistent` error (empty for `Malformed`)
    #[must_use]
    pub fn issues(&self) -> &[StructuralIssue] {
        match self {
            Self::Inconsistent { issues } => issues,
            Self::Malformed(_) => &[],
        }
    }
}

fn join_issues(issues: &[StructuralIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single violated scenario invariant
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StructuralIssue {
    /// Blank identifier
    #[error("{what} has an empty id")]
    EmptyId {
        /// Kind of entity
        what: &'static str,
    },

    /// Evidence ID used twice
    #[error("duplicate evidence id {0}")]
    DuplicateEvidenceId(EvidenceId),

    /// Phase ID used twice
    #[error("duplicate phase id {0}")]
    DuplicatePhaseId(PhaseId),

    /// Phase references evidence not in the pool
    #[error("phase {phase} references missing evidence {evidence}")]
    MissingEvidence {
        /// Referencing phase
        phase: PhaseId,
        /// Missing evidence
        evidence: EvidenceId,
    },

    /// Evidence links to a phase that does not exist
    #[error("evidence {evidence} links to unknown phase {phase}")]
    UnknownLinkedPhase {
        /// Linking evidence
        evidence: EvidenceId,
        /// Unknown phase
        phase: PhaseId,
    },

    /// Red herring carries a phase link
    #[error("red herring {evidence} must not link to phase {phase}")]
    HerringLinkedToPhase {
        /// Herring
        evidence: EvidenceId,
        /// Linked phase
        phase: PhaseId,
    },

    /// Phase lists a red herring as substantiating evidence
    #[error("phase {phase} cites red herring {evidence}")]
    PhaseCitesHerring {
        /// Citing phase
        phase: PhaseId,
        /// Herring
        evidence: EvidenceId,
    },

    /// Genuine evidence without a linked phase
    #[error("genuine evidence {0} is not linked to any phase")]
    UnlinkedGenuineEvidence(EvidenceId),

    /// Phase list and evidence link disagree
    #[error("phase {phase} and evidence {evidence} disagree about their link")]
    PhaseEvidenceMismatch {
        /// Phase side
        phase: PhaseId,
        /// Evidence side
        evidence: EvidenceId,
    },

    /// Kill chain has no phases
    #[error("kill chain is empty")]
    EmptyKillChain,

    /// Pool has no genuine evidence
    #[error("evidence pool has no genuine evidence")]
    NoGenuineEvidence,

    /// Herring ratio outside [0, 1]
    #[error("red herring ratio {0} is outside [0, 1]")]
    RatioOutOfRange(f64),

    /// Partial credit fraction outside [0, 1]
    #[error("unsubstantiated fraction {0} is outside [0, 1]")]
    FractionOutOfRange(f64),

    /// Budget of zero investigations
    #[error("investigation budget must be positive")]
    ZeroBudget,

    /// Max score not positive
    #[error("max score {0} must be positive")]
    NonPositiveMaxScore(f64),

    /// Negative points value
    #[error("{field} is negative ({value})")]
    NegativePoints {
        /// Rubric field or phase
        field: String,
        /// Offending value
        value: f64,
    },

    /// NaN or infinite number where points are expected
    #[error("{field} is not a finite number")]
    NonFiniteNumber {
        /// Rubric field or phase
        field: String,
    },

    /// Rubric components do not add up to the max score
    #[error("rubric totals {rubric_total} but max score is {max_score}")]
    RubricMismatch {
        /// Summed phase points plus sequence bonus
        rubric_total: f64,
        /// Declared max
        max_score: f64,
    },

    /// ATT&CK tag with the wrong shape
    #[error("phase {phase} has malformed ATT&CK tag {tag:?}")]
    MalformedAttackTag {
        /// Tagged phase
        phase: PhaseId,
        /// Tag text
        tag: String,
    },
}
