//! TTX Engine - investigation and scoring for tabletop incident exercises
//!
//! Provides:
//! - Investigation state machine (budget, disclosure timeline, lifecycle)
//! - Clue policy: request relevance, red-herring pacing, narrative fallback
//! - Theory scoring against the scenario's kill chain
//! - Session snapshot and store contracts
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ttx_engine::prelude::*;
//!
//! let engine = InvestigationEngine::from_yaml(&raw)?;
//! let mut state = engine.start_session();
//! let disclosure = engine.disclose(&mut state, "check the mail gateway").await?;
//! println!("{}", disclosure.narrative);
//! let report = engine.submit_theory(&mut state, &Theory::new(["P1", "P2"]))?;
//! println!("{} ({})", report.total_score, report.grade);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod clue;
pub mod config;
pub mod engine;
pub mod error;
pub mod narrative;
pub mod scoring;
pub mod session;
pub mod state;

// Re-exports for convenience
pub use clue::{CluePolicy, Disclosure, PacingPlan, Selection, SelectionReason};
pub use config::EngineConfig;
pub use engine::{Hint, InvestigationEngine};
pub use error::{
    ConfigError, EngineError, ExhaustedError, RenderError, SnapshotError, StoreError,
};
pub use narrative::{NarrativeBackend, NarrativeSource, TemplateNarrator};
pub use scoring::{
    EfficiencyRating, GradedReport, Grade, InvestigationMetrics, PhaseVerdict, ScoringEngine,
    Theory,
};
pub use session::{SessionSnapshot, SessionStore, SNAPSHOT_FORMAT_VERSION};
pub use state::{DisclosureRecord, InvestigationState, SessionId, SessionStatus};

/// Prelude for common imports
pub mod prelude {
    pub use crate::clue::{RelevanceScorer, TagOverlapScorer, ThesaurusScorer};
    pub use crate::{
        Disclosure, EngineConfig, EngineError, GradedReport, InvestigationEngine,
        InvestigationState, NarrativeBackend, SessionId, SessionStatus, SessionStore, Theory,
    };
    pub use ttx_scenario::{EvidenceId, PhaseId, ScenarioModel};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
