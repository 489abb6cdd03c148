//! Investigation engine facade
//!
//! [`InvestigationEngine`] binds one validated scenario to a clue policy, a
//! narrative backend and the scoring engine. It holds no per-session data and
//! is shared across sessions behind an `Arc`; each [`InvestigationState`] is
//! passed in by `&mut`, so mutating calls on one session are serialized by
//! the borrow checker while independent sessions proceed concurrently.

use crate::clue::{CluePolicy, Disclosure, RelevanceScorer, Selection, TagOverlapScorer};
use crate::config::EngineConfig;
use crate::error::{EngineError, StoreError};
use crate::narrative::{NarrativeBackend, TemplateNarrator};
use crate::scoring::{GradedReport, ScoringEngine, Theory};
use crate::session::{SessionSnapshot, SessionStore};
use crate::state::{InvestigationState, SessionId, SessionStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ttx_scenario::{PhaseId, ScenarioModel};

/// Investigative nudge that costs no budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    /// Category worth looking into
    pub category: String,
    /// Narrative hook of the hinted item, if it has one
    pub hook: Option<String>,
    /// Player-facing text
    pub text: String,
    /// Hints left after this one
    pub hints_remaining: u32,
}

/// Scenario-bound engine shared by all its sessions
#[derive(Debug, Clone)]
pub struct InvestigationEngine {
    scenario: Arc<ScenarioModel>,
    config: EngineConfig,
    scorer: Arc<dyn RelevanceScorer>,
    policy: CluePolicy,
    narrator: Arc<dyn NarrativeBackend>,
    scoring: ScoringEngine,
}

impl InvestigationEngine {
    /// Engine with default config, tag-overlap relevance and the template narrator
    #[must_use]
    pub fn new(scenario: Arc<ScenarioModel>) -> Self {
        let config = EngineConfig::default();
        let scorer: Arc<dyn RelevanceScorer> = Arc::new(TagOverlapScorer);
        Self {
            policy: CluePolicy::new(Arc::clone(&scorer), &config),
            scenario,
            config,
            scorer,
            narrator: Arc::new(TemplateNarrator),
            scoring: ScoringEngine::new(),
        }
    }

    /// Load a scenario and build an engine for it
    ///
    /// # Errors
    /// `EngineError::Scenario` if the scenario fails validation
    pub fn from_yaml(raw: &str) -> Result<Self, EngineError> {
        Ok(Self::new(Arc::new(ScenarioModel::load(raw)?)))
    }

    /// Set configuration
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.policy = CluePolicy::new(Arc::clone(&self.scorer), &config);
        self.config = config;
        self
    }

    /// Set relevance strategy
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.policy = CluePolicy::new(Arc::clone(&scorer), &self.config);
        self.scorer = scorer;
        self
    }

    /// Set narrative backend
    #[must_use]
    pub fn with_narrator(mut self, narrator: Arc<dyn NarrativeBackend>) -> Self {
        self.narrator = narrator;
        self
    }

    /// Bound scenario
    #[inline]
    #[must_use]
    pub fn scenario(&self) -> &Arc<ScenarioModel> {
        &self.scenario
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a session with a generated `INC-` ID
    #[must_use]
    pub fn start_session(&self) -> InvestigationState {
        let now = Utc::now();
        self.start_session_with_id(SessionId::generate(now))
    }

    /// Start a session with a caller-chosen ID
    #[must_use]
    pub fn start_session_with_id(&self, id: SessionId) -> InvestigationState {
        let state = InvestigationState::new(id, &self.scenario, Utc::now());
        tracing::info!(
            session = %state.session_id(),
            scenario = %self.scenario.id(),
            budget = state.initial_budget(),
            "Investigation started"
        );
        state
    }

    fn ensure_bound(&self, state: &InvestigationState) -> Result<(), EngineError> {
        if state.scenario_id() == self.scenario.id() {
            Ok(())
        } else {
            Err(EngineError::ScenarioMismatch {
                expected: self.scenario.id().to_string(),
                found: state.scenario_id().to_string(),
            })
        }
    }

    /// Which item `request` would disclose, without disclosing it
    ///
    /// # Errors
    /// Same as [`Self::disclose`]
    pub fn preview(
        &self,
        state: &InvestigationState,
        request: &str,
    ) -> Result<Selection, EngineError> {
        self.ensure_bound(state)?;
        state.ensure_active("investigate")?;
        Ok(self.policy.select(&self.scenario, state, request)?)
    }

    /// Answer an investigation request with one piece of evidence
    ///
    /// # Errors
    /// - `InvalidStateTransition` if the session is not active
    /// - `Exhausted` when the budget or evidence pool is used up
    ///
    /// The state is unchanged on error.
    pub async fn disclose(
        &self,
        state: &mut InvestigationState,
        request: &str,
    ) -> Result<Disclosure, EngineError> {
        self.ensure_bound(state)?;
        self.policy
            .disclose(&self.scenario, state, request, self.narrator.as_ref())
            .await
    }

    /// Investigative nudge toward the earliest undiscovered phase
    ///
    /// # Errors
    /// - `InvalidStateTransition` if the session is not active
    /// - `HintLimitReached` once the configured allowance is spent
    /// - `NoHintAvailable` if every phase with evidence is discovered
    pub fn hint(&self, state: &mut InvestigationState) -> Result<Hint, EngineError> {
        self.ensure_bound(state)?;
        state.ensure_active("ask for a hint")?;
        if state.hints_used() >= self.config.hint_limit {
            return Err(EngineError::HintLimitReached {
                limit: self.config.hint_limit,
            });
        }

        let discovered = state.discovered_phases();
        let item = self
            .scenario
            .phases()
            .iter()
            .filter(|phase| !discovered.contains(&phase.id))
            .find_map(|phase| {
                phase
                    .evidence
                    .iter()
                    .filter(|id| !state.is_disclosed(id))
                    .min()
                    .and_then(|id| self.scenario.evidence(id))
            })
            .ok_or(EngineError::NoHintAvailable)?;

        state.use_hint();
        let hook = item.narrative_hooks.first().cloned();
        let text = match &hook {
            Some(hook) => format!("Consider looking at {} evidence; {hook}.", item.category),
            None => format!("Consider looking at {} evidence.", item.category),
        };
        tracing::debug!(
            session = %state.session_id(),
            hints_used = state.hints_used(),
            "Hint given"
        );

        Ok(Hint {
            category: item.category.clone(),
            hook,
            text,
            hints_remaining: self.config.hint_limit - state.hints_used(),
        })
    }

    /// Grade a theory without changing the state
    #[must_use]
    pub fn score(&self, state: &InvestigationState, theory: &Theory) -> GradedReport {
        self.scoring.score(state, &self.scenario, theory)
    }

    /// Submit the final theory; the session becomes `Completed`
    ///
    /// # Errors
    /// `InvalidStateTransition` unless the session is active
    pub fn submit_theory(
        &self,
        state: &mut InvestigationState,
        theory: &Theory,
    ) -> Result<GradedReport, EngineError> {
        self.ensure_bound(state)?;
        if let Err(err) = state.transition(SessionStatus::TheorySubmitted, "submit a theory") {
            tracing::warn!(
                session = %state.session_id(),
                status = %state.status(),
                "Rejected theory submission"
            );
            return Err(err);
        }

        let report = self.scoring.score(state, &self.scenario, theory);
        state.set_report(report.clone());
        state.transition(SessionStatus::Completed, "grade a theory")?;

        tracing::info!(
            session = %state.session_id(),
            score = report.total_score,
            max = report.max_score,
            grade = %report.grade,
            "Theory graded"
        );
        Ok(report)
    }

    /// End the session without a theory
    ///
    /// # Errors
    /// `ScenarioMismatch` for a state from another scenario;
    /// `InvalidStateTransition` unless the session is active
    pub fn abandon(&self, state: &mut InvestigationState) -> Result<(), EngineError> {
        self.ensure_bound(state)?;
        state.transition(SessionStatus::Abandoned, "abandon the investigation")?;
        tracing::info!(session = %state.session_id(), "Investigation abandoned");
        Ok(())
    }

    /// Phases not yet substantiated, in canonical order
    #[must_use]
    pub fn undiscovered_phases(&self, state: &InvestigationState) -> Vec<PhaseId> {
        let discovered = state.discovered_phases();
        self.scenario
            .phases()
            .iter()
            .map(|phase| phase.id.clone())
            .filter(|id| !discovered.contains(id))
            .collect()
    }

    /// Capture a snapshot
    ///
    /// # Errors
    /// `EngineError::Snapshot` if encoding fails
    pub fn snapshot(&self, state: &InvestigationState) -> Result<SessionSnapshot, EngineError> {
        Ok(SessionSnapshot::capture(state)?)
    }

    /// Restore a snapshot against this engine's scenario
    ///
    /// # Errors
    /// `EngineError::Snapshot` on verification or consistency failure
    pub fn restore(&self, snapshot: &SessionSnapshot) -> Result<InvestigationState, EngineError> {
        Ok(snapshot.restore(&self.scenario)?)
    }

    /// Snapshot and save a session
    ///
    /// # Errors
    /// Snapshot or store failures
    pub async fn save(
        &self,
        store: &dyn SessionStore,
        state: &InvestigationState,
    ) -> Result<(), EngineError> {
        let snapshot = self.snapshot(state)?;
        store.save(state.session_id(), &snapshot).await?;
        tracing::debug!(session = %state.session_id(), "Session saved");
        Ok(())
    }

    /// Load and restore a session
    ///
    /// # Errors
    /// `Store(NotFound)` for unknown IDs, snapshot failures otherwise
    pub async fn resume(
        &self,
        store: &dyn SessionStore,
        id: &SessionId,
    ) -> Result<InvestigationState, EngineError> {
        let snapshot = store.load(id).await?;
        if &snapshot.session_id != id {
            return Err(StoreError::Backend(format!(
                "store returned session {} for {id}",
                snapshot.session_id
            ))
            .into());
        }
        let state = self.restore(&snapshot)?;
        tracing::info!(
            session = %id,
            remaining = state.remaining_budget(),
            status = %state.status(),
            "Session resumed"
        );
        Ok(state)
    }
}
