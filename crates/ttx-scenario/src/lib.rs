//! TTX Scenario - validated tabletop incident scenarios
//!
//! A scenario is the ground truth for one exercise: the opening alert, the
//! attacker's kill chain in canonical order, the evidence pool (genuine items
//! and red herrings) and the rubric used to grade a player's theory.
//!
//! # Example
//!
//! ```rust,ignore
//! use ttx_scenario::ScenarioModel;
//!
//! let raw = std::fs::read_to_string("scenarios/library/lanternfish.yaml")?;
//! let scenario = ScenarioModel::load(&raw)?;
//! println!("{} phases, budget {}", scenario.phases().len(), scenario.investigation_budget());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod document;
pub mod error;
pub mod ids;
pub mod model;
pub mod validation;

// Re-exports for convenience
pub use document::{
    Difficulty, EvidenceItem, InitialAlert, KillChainPhase, ScenarioDocument, ScoringRubric,
    Severity, DEFAULT_INVESTIGATION_BUDGET, DEFAULT_RED_HERRING_RATIO,
    DEFAULT_UNSUBSTANTIATED_FRACTION,
};
pub use error::{StructuralIssue, ValidationError};
pub use ids::{EvidenceId, PhaseId};
pub use model::ScenarioModel;
pub use validation::{validate_document, RUBRIC_TOLERANCE};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
