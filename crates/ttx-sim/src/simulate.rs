//! Randomized full-session simulation
//!
//! Plays many sessions against one scenario with seeded random requests
//! and checks two properties of the clue policy:
//! - Herring ratio lands within tolerance once the budget is spent
//! - Replaying the same requests yields the same timeline

use futures::future::join_all;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ttx_engine::{EngineError, InvestigationEngine, InvestigationState, SessionId, Theory};

/// Allowed gap between observed and target herring ratio
pub(crate) const RATIO_TOLERANCE: f64 = 0.10;

const NOISE: &[&str] = &[
    "weather",
    "coffee machine",
    "parking garage",
    "holiday schedule",
    "quarterly results",
];

/// Simulation parameters
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulatorConfig {
    pub(crate) seed: u64,
    pub(crate) sessions: usize,
}

/// Outcome of one simulated session
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SessionOutcome {
    pub(crate) session_id: SessionId,
    pub(crate) disclosed: usize,
    pub(crate) herrings: usize,
    pub(crate) budget_spent: bool,
    pub(crate) observed_ratio: f64,
    pub(crate) score: f64,
    #[serde(skip)]
    pub(crate) requests: Vec<String>,
    #[serde(skip)]
    pub(crate) timeline: Vec<String>,
}

impl SessionOutcome {
    fn within_tolerance(&self, target: f64) -> bool {
        !self.budget_spent || (self.observed_ratio - target).abs() <= RATIO_TOLERANCE
    }
}

/// Aggregate simulation results
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SimulationReport {
    pub(crate) scenario_id: String,
    pub(crate) seed: u64,
    pub(crate) target_ratio: f64,
    pub(crate) mean_ratio: f64,
    pub(crate) mean_score: f64,
    pub(crate) out_of_tolerance: Vec<SessionId>,
    pub(crate) deterministic: bool,
    pub(crate) sessions: Vec<SessionOutcome>,
}

impl SimulationReport {
    /// Every check held
    pub(crate) fn passed(&self) -> bool {
        self.deterministic && self.out_of_tolerance.is_empty()
    }

    /// Human-readable summary
    pub(crate) fn generate_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Simulation Report: {}", self.scenario_id);
        let _ = writeln!(out, "  Seed: {}", self.seed);
        let _ = writeln!(out, "  Sessions: {}", self.sessions.len());
        let _ = writeln!(out, "  Target herring ratio: {:.3}", self.target_ratio);
        let _ = writeln!(out, "  Mean herring ratio: {:.3}", self.mean_ratio);
        let _ = writeln!(out, "  Mean score: {:.2}", self.mean_score);
        let _ = writeln!(
            out,
            "  Ratio within +/-{RATIO_TOLERANCE:.2}: {}",
            if self.out_of_tolerance.is_empty() { "PASS" } else { "FAIL" }
        );
        for id in &self.out_of_tolerance {
            let _ = writeln!(out, "    out of tolerance: {id}");
        }
        let _ = writeln!(
            out,
            "  Deterministic replay: {}",
            if self.deterministic { "PASS" } else { "FAIL" }
        );
        out
    }
}

/// Draw a request: mostly scenario vocabulary, sometimes noise or blank
fn random_request(rng: &mut StdRng, vocabulary: &[String]) -> String {
    match rng.random_range(0..10) {
        0 => String::new(),
        1 | 2 => NOISE[rng.random_range(0..NOISE.len())].to_string(),
        _ if vocabulary.is_empty() => "check the logs".to_string(),
        _ => {
            let a = &vocabulary[rng.random_range(0..vocabulary.len())];
            let b = &vocabulary[rng.random_range(0..vocabulary.len())];
            format!("check {a} and {b} activity")
        }
    }
}

fn vocabulary(engine: &InvestigationEngine) -> Vec<String> {
    engine
        .scenario()
        .evidence_items()
        .flat_map(|item| item.tags.iter().chain(std::iter::once(&item.category)))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Disclose until the engine refuses, returning the requests actually used
async fn play(
    engine: &InvestigationEngine,
    state: &mut InvestigationState,
    mut next_request: impl FnMut() -> String,
) -> Result<Vec<String>, EngineError> {
    let mut used = Vec::new();
    loop {
        let request = next_request();
        match engine.disclose(state, &request).await {
            Ok(_) => used.push(request),
            Err(EngineError::Exhausted(reason)) => {
                debug!(session = %state.session_id(), %reason, "session exhausted");
                return Ok(used);
            }
            Err(e) => return Err(e),
        }
    }
}

fn timeline(state: &InvestigationState) -> Vec<String> {
    state.timeline().map(|r| r.evidence_id.to_string()).collect()
}

async fn run_session(
    engine: Arc<InvestigationEngine>,
    vocabulary: Arc<Vec<String>>,
    seed: u64,
    index: usize,
) -> Result<(SessionOutcome, InvestigationState), EngineError> {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
    let mut state = engine.start_session_with_id(SessionId::new(format!("SIM-{seed}-{index:04}")));
    let requests = play(&engine, &mut state, || random_request(&mut rng, &vocabulary)).await?;

    // Claim exactly what was substantiated, in canonical order
    let discovered = state.discovered_phases();
    let claimed = engine
        .scenario()
        .phases()
        .iter()
        .filter(|phase| discovered.contains(&phase.id))
        .map(|phase| phase.id.clone());
    let report = engine.submit_theory(&mut state, &Theory::new(claimed))?;

    let disclosed = state.disclosed_count();
    let herrings = state.herrings_disclosed();
    #[allow(clippy::cast_precision_loss)]
    let observed_ratio = if disclosed == 0 {
        0.0
    } else {
        herrings as f64 / disclosed as f64
    };

    let outcome = SessionOutcome {
        session_id: state.session_id().clone(),
        disclosed,
        herrings,
        budget_spent: state.remaining_budget() == 0,
        observed_ratio,
        score: report.total_score,
        timeline: timeline(&state),
        requests,
    };
    Ok((outcome, state))
}

/// Play `config.sessions` sessions concurrently and replay the first one
///
/// # Errors
/// Any engine error other than exhaustion
pub(crate) async fn run_simulator(
    engine: Arc<InvestigationEngine>,
    config: SimulatorConfig,
) -> Result<(SimulationReport, Vec<InvestigationState>), EngineError> {
    let vocabulary = Arc::new(vocabulary(&engine));
    let target_ratio = engine.scenario().red_herring_ratio();

    let results = join_all((0..config.sessions).map(|index| {
        run_session(
            Arc::clone(&engine),
            Arc::clone(&vocabulary),
            config.seed,
            index,
        )
    }))
    .await;

    let mut sessions = Vec::with_capacity(results.len());
    let mut states = Vec::with_capacity(results.len());
    for result in results {
        let (outcome, state) = result?;
        sessions.push(outcome);
        states.push(state);
    }

    let deterministic = match sessions.first() {
        Some(first) => {
            let mut replay = engine.start_session_with_id(SessionId::new("SIM-REPLAY"));
            let mut requests = first.requests.iter().cloned();
            let _ = play(&engine, &mut replay, || requests.next().unwrap_or_default()).await?;
            timeline(&replay) == first.timeline
        }
        None => true,
    };
    if !deterministic {
        warn!("replay diverged from the original session");
    }

    let out_of_tolerance = sessions
        .iter()
        .filter(|s| !s.within_tolerance(target_ratio))
        .map(|s| s.session_id.clone())
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let count = sessions.len().max(1) as f64;
    let report = SimulationReport {
        scenario_id: engine.scenario().id().to_string(),
        seed: config.seed,
        target_ratio,
        mean_ratio: sessions.iter().map(|s| s.observed_ratio).sum::<f64>() / count,
        mean_score: sessions.iter().map(|s| s.score).sum::<f64>() / count,
        out_of_tolerance,
        deterministic,
        sessions,
    };
    info!(
        scenario = %report.scenario_id,
        sessions = report.sessions.len(),
        mean_ratio = report.mean_ratio,
        passed = report.passed(),
        "simulation finished"
    );
    Ok((report, states))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttx_test_utils::lanternfish;

    #[tokio::test]
    async fn lanternfish_simulation_passes() {
        let engine = Arc::new(InvestigationEngine::new(lanternfish()));
        let config = SimulatorConfig {
            seed: 42,
            sessions: 8,
        };
        let (report, states) = run_simulator(engine, config).await.unwrap();

        assert_eq!(report.sessions.len(), 8);
        assert_eq!(states.len(), 8);
        assert!(report.deterministic);
        assert!(report.passed(), "{}", report.generate_text());
        assert!(report
            .sessions
            .iter()
            .all(|s| s.score >= 0.0 && s.score <= 100.0));
    }

    #[tokio::test]
    async fn same_seed_same_outcome() {
        let engine = Arc::new(InvestigationEngine::new(lanternfish()));
        let config = SimulatorConfig { seed: 7, sessions: 3 };
        let (a, _) = run_simulator(Arc::clone(&engine), config).await.unwrap();
        let (b, _) = run_simulator(engine, config).await.unwrap();

        let timelines = |r: &SimulationReport| {
            r.sessions.iter().map(|s| s.timeline.clone()).collect::<Vec<_>>()
        };
        assert_eq!(timelines(&a), timelines(&b));
    }
}
