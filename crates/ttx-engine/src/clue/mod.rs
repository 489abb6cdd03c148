//! Clue policy: which evidence answers a player request
//!
//! - [`relevance`]: request/evidence relevance strategies
//! - [`pacing`]: session-wide red-herring pacing
//! - [`policy`]: selection, recording and rendering

pub mod pacing;
pub mod policy;
pub mod relevance;

pub use pacing::{PacingDecision, PacingPlan, PacingReason};
pub use policy::{CluePolicy, Disclosure, Selection, SelectionReason};
pub use relevance::{RelevanceScorer, RequestTerms, TagOverlapScorer, ThesaurusScorer};
