//! Clue selection and disclosure
//!
//! Disclosure runs in three steps:
//! 1. [`CluePolicy::select`] picks an item (pure, deterministic)
//! 2. the state records it (budget spent, log appended)
//! 3. the narrative backend renders it, falling back to the raw finding
//!
//! Nothing is mutated when step 1 fails.

use crate::clue::pacing::{self, PacingDecision, PacingInput};
use crate::clue::relevance::{RelevanceScorer, RequestTerms, TagOverlapScorer};
use crate::config::EngineConfig;
use crate::error::{EngineError, ExhaustedError};
use crate::narrative::{self, NarrativeBackend, NarrativeSource};
use crate::state::{DisclosureRecord, InvestigationState};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use ttx_scenario::{EvidenceId, EvidenceItem, ScenarioModel};

/// How an item was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Highest-ranked undisclosed item
    BestMatch,
    /// Pacing required a genuine item
    PacedGenuine,
    /// Pacing required a herring
    PacedHerring,
    /// Nothing was relevant; a random herring stood in
    HerringSubstitute,
    /// Nothing was relevant and no herring was left
    FallbackGenuine,
}

/// Outcome of clue selection
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Chosen item
    pub evidence_id: EvidenceId,
    /// Its relevance score
    pub score: f64,
    /// Why it was chosen
    pub reason: SelectionReason,
}

/// A completed disclosure
#[derive(Debug, Clone, PartialEq)]
pub struct Disclosure {
    /// Timeline entry that was appended
    pub record: DisclosureRecord,
    /// Disclosed item
    pub evidence: EvidenceItem,
    /// Prose shown to the player
    pub narrative: String,
    /// Rendered or fallback
    pub narrative_source: NarrativeSource,
    /// Budget left after this disclosure
    pub remaining_budget: u32,
}

struct Candidate<'a> {
    item: &'a EvidenceItem,
    score: f64,
}

/// Ranking: score descending, genuine before herring, lowest ID
fn rank(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.item.red_herring.cmp(&b.item.red_herring))
        .then_with(|| a.item.id.cmp(&b.item.id))
}

/// Chooses which evidence answers a request
#[derive(Debug, Clone)]
pub struct CluePolicy {
    scorer: Arc<dyn RelevanceScorer>,
    threshold: f64,
    slack: f64,
    render_timeout: Duration,
}

impl Default for CluePolicy {
    fn default() -> Self {
        Self::new(Arc::new(TagOverlapScorer), &EngineConfig::default())
    }
}

impl CluePolicy {
    /// Create policy with a relevance strategy
    #[must_use]
    pub fn new(scorer: Arc<dyn RelevanceScorer>, config: &EngineConfig) -> Self {
        Self {
            scorer,
            threshold: config.relevance_threshold,
            slack: config.pacing_slack,
            render_timeout: config.render_timeout(),
        }
    }

    /// Relevance strategy in use
    #[inline]
    #[must_use]
    pub fn scorer(&self) -> &Arc<dyn RelevanceScorer> {
        &self.scorer
    }

    /// Pick the next item for `request` without touching the state
    ///
    /// # Errors
    /// `ExhaustedError` when the budget is spent or every item is disclosed
    pub fn select(
        &self,
        scenario: &ScenarioModel,
        state: &InvestigationState,
        request: &str,
    ) -> Result<Selection, ExhaustedError> {
        if state.remaining_budget() == 0 {
            return Err(ExhaustedError::BudgetSpent {
                budget: state.initial_budget(),
            });
        }

        let terms = RequestTerms::parse(request);
        let mut candidates: Vec<Candidate<'_>> = scenario
            .evidence_items()
            .filter(|item| !state.is_disclosed(&item.id))
            .map(|item| Candidate {
                item,
                score: self.scorer.score(&terms, item),
            })
            .collect();
        if candidates.is_empty() {
            return Err(ExhaustedError::EvidenceDepleted {
                pool: scenario.evidence_count(),
            });
        }
        candidates.sort_by(rank);

        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        let herrings_left = count(candidates.iter().filter(|c| c.item.red_herring).count());
        let input = PacingInput {
            disclosed: count(state.disclosed_count()),
            herrings_disclosed: count(state.herrings_disclosed()),
            genuine_left: count(candidates.len()) - herrings_left,
            herrings_left,
        };
        let decision = pacing::decide(state.pacing(), input, self.slack);

        let best_genuine = candidates.iter().find(|c| !c.item.red_herring);
        let best_herring = candidates.iter().find(|c| c.item.red_herring);

        let (chosen, reason) = match decision {
            PacingDecision::Genuine(_) => (best_genuine, SelectionReason::PacedGenuine),
            PacingDecision::Herring(_) => match best_herring {
                Some(c) if c.score > self.threshold => (Some(c), SelectionReason::PacedHerring),
                _ => (
                    self.random_herring(scenario, state, request, &candidates),
                    SelectionReason::PacedHerring,
                ),
            },
            PacingDecision::Free => {
                let top = &candidates[0];
                if top.score > self.threshold {
                    (Some(top), SelectionReason::BestMatch)
                } else if herrings_left > 0 {
                    (
                        self.random_herring(scenario, state, request, &candidates),
                        SelectionReason::HerringSubstitute,
                    )
                } else {
                    (best_genuine, SelectionReason::FallbackGenuine)
                }
            }
        };

        // Pacing never asks for a kind the pool no longer has
        let chosen = chosen.unwrap_or(&candidates[0]);

        tracing::debug!(
            scorer = self.scorer.name(),
            keywords = terms.keywords().len(),
            decision = ?decision,
            evidence = %chosen.item.id,
            score = chosen.score,
            "Selected clue"
        );

        Ok(Selection {
            evidence_id: chosen.item.id.clone(),
            score: chosen.score,
            reason,
        })
    }

    /// Seeded choice among undisclosed herrings
    fn random_herring<'c, 'a>(
        &self,
        scenario: &ScenarioModel,
        state: &InvestigationState,
        request: &str,
        candidates: &'c [Candidate<'a>],
    ) -> Option<&'c Candidate<'a>> {
        let mut herrings: Vec<&Candidate<'a>> =
            candidates.iter().filter(|c| c.item.red_herring).collect();
        if herrings.is_empty() {
            return None;
        }
        herrings.sort_by(|a, b| a.item.id.cmp(&b.item.id));
        let sequence = state.disclosed_count() as u64 + 1;
        let mut rng = StdRng::seed_from_u64(selection_seed(scenario.id(), sequence, request));
        Some(herrings[rng.random_range(0..herrings.len())])
    }

    /// Select, record and render one disclosure
    ///
    /// Rendering failures and timeouts fall back to the raw finding text;
    /// they never fail the disclosure.
    ///
    /// # Errors
    /// - `EngineError::InvalidStateTransition` if the session is not active
    /// - `EngineError::Exhausted` when nothing more can be disclosed
    pub async fn disclose(
        &self,
        scenario: &ScenarioModel,
        state: &mut InvestigationState,
        request: &str,
        narrator: &dyn NarrativeBackend,
    ) -> Result<Disclosure, EngineError> {
        state.ensure_active("investigate")?;
        let selection = self.select(scenario, state, request)?;
        let item = scenario
            .evidence(&selection.evidence_id)
            .ok_or(ExhaustedError::EvidenceDepleted {
                pool: scenario.evidence_count(),
            })?
            .clone();

        let record = state.record_disclosure(&item, request, Utc::now()).clone();
        tracing::info!(
            session = %state.session_id(),
            sequence = record.sequence,
            evidence = %item.id,
            remaining = state.remaining_budget(),
            "Disclosed evidence"
        );

        let prior = &state.log()[..state.log().len() - 1];
        let (narrative, narrative_source) =
            narrative::render_or_fallback(narrator, &item, request, prior, self.render_timeout)
                .await;

        Ok(Disclosure {
            record,
            evidence: item,
            narrative,
            narrative_source,
            remaining_budget: state.remaining_budget(),
        })
    }
}

/// First eight bytes of SHA-256(scenario id, sequence, request)
fn selection_seed(scenario_id: &str, sequence: u64, request: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(scenario_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(sequence.to_le_bytes());
    hasher.update(request.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
