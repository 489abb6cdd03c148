//! Theory grading
//!
//! Points are computed in rubric units and scaled to `max_score`:
//! - each claimed phase earns its points in full if substantiated by
//!   disclosed evidence, or `unsubstantiated_fraction` of them otherwise
//! - the sequence bonus is all-or-nothing, granted when enough phases are
//!   correct and their claimed order agrees with the kill chain
//! - every distinct red herring cited as proof costs `herring_penalty`
//!
//! The total is clamped to `[0, max_score]` and rounded to two decimals.

use crate::scoring::report::{
    EfficiencyRating, GradedReport, Grade, HerringPenalty, InvestigationMetrics, PhaseVerdict,
};
use crate::scoring::sequence::follows_canonical_order;
use crate::scoring::Theory;
use crate::state::InvestigationState;
use std::collections::{BTreeSet, HashSet};
use ttx_scenario::ScenarioModel;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Deterministic theory grader
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    /// Create new scoring engine
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Grade `theory` against the scenario and what the session uncovered
    #[must_use]
    pub fn score(
        &self,
        state: &InvestigationState,
        scenario: &ScenarioModel,
        theory: &Theory,
    ) -> GradedReport {
        let rubric = scenario.rubric();
        let discovered = state.discovered_phases();

        // Canonical positions of correct phases, in the player's order
        let mut claimed = Vec::new();
        let mut seen = HashSet::new();
        let mut unknown_phases = Vec::new();
        for phase in &theory.phases {
            match scenario.phase_index(phase) {
                Some(index) if seen.insert(index) => claimed.push(index),
                Some(_) => {}
                None if !unknown_phases.contains(phase) => unknown_phases.push(phase.clone()),
                None => {}
            }
        }

        let rubric_total = scenario.rubric_total();
        let scale = if rubric_total > 0.0 {
            rubric.max_score / rubric_total
        } else {
            0.0
        };

        let (verdicts, phase_raw): (Vec<PhaseVerdict>, Vec<f64>) = scenario
            .phases()
            .iter()
            .enumerate()
            .map(|(index, phase)| {
                let matched = seen.contains(&index);
                let substantiated = discovered.contains(&phase.id);
                let raw = match (matched, substantiated) {
                    (false, _) => 0.0,
                    (true, true) => scenario.phase_points(phase),
                    (true, false) => {
                        scenario.phase_points(phase) * rubric.unsubstantiated_fraction
                    }
                };
                let verdict = PhaseVerdict {
                    phase_id: phase.id.clone(),
                    name: phase.name.clone(),
                    matched,
                    substantiated,
                    matched_evidence_ids: state.evidence_for_phase(&phase.id),
                    points_awarded: round2(raw * scale),
                };
                (verdict, raw)
            })
            .unzip();

        let required = 2.min(scenario.phases().len());
        let sequence_bonus_awarded =
            claimed.len() >= required && follows_canonical_order(&claimed);
        let sequence_raw = if sequence_bonus_awarded {
            rubric.sequence_bonus
        } else {
            0.0
        };

        // Raw points in canonical order, scaled once
        let raw_points = phase_raw.iter().sum::<f64>() + sequence_raw;
        let scaled = raw_points * scale;

        let mut cited = BTreeSet::new();
        let mut herring_penalties = Vec::new();
        let mut unknown_evidence = Vec::new();
        for id in &theory.accused_evidence {
            if !cited.insert(id) {
                continue;
            }
            match scenario.evidence(id) {
                Some(item) if item.red_herring => herring_penalties.push(HerringPenalty {
                    evidence_id: id.clone(),
                    points: rubric.herring_penalty,
                }),
                Some(_) => {}
                None => unknown_evidence.push(id.clone()),
            }
        }
        let penalty: f64 = herring_penalties.iter().map(|p| p.points).sum();

        let total_score = round2((scaled - penalty).clamp(0.0, rubric.max_score));
        let percentage = round2(total_score / rubric.max_score * 100.0);
        let grade = Grade::from_percentage(percentage);

        let (strengths, improvements) =
            feedback(&verdicts, sequence_bonus_awarded, claimed.len(), &herring_penalties);
        let summary = summarize(&verdicts, sequence_bonus_awarded, herring_penalties.len(), grade);

        GradedReport {
            session_id: state.session_id().to_string(),
            scenario_id: scenario.id().to_string(),
            verdicts,
            sequence_bonus_awarded,
            sequence_points: round2(sequence_raw * scale),
            herring_penalties,
            unknown_phases,
            unknown_evidence,
            total_score,
            max_score: rubric.max_score,
            percentage,
            grade,
            summary,
            strengths,
            improvements,
            metrics: metrics(state, scenario),
        }
    }
}

/// Elapsed time runs to the last disclosure, so grading stays repeatable
fn metrics(state: &InvestigationState, scenario: &ScenarioModel) -> InvestigationMetrics {
    let herrings_disclosed = state.herrings_disclosed();
    let genuine_disclosed = state.disclosed_count().saturating_sub(herrings_disclosed);
    let genuine_total = scenario.genuine_count();
    #[allow(clippy::cast_precision_loss)]
    let genuine_coverage = if genuine_total == 0 {
        0.0
    } else {
        round2(genuine_disclosed as f64 / genuine_total as f64)
    };

    let elapsed_secs = state
        .log()
        .last()
        .map(|record| (record.timestamp - state.started_at()).num_seconds().max(0));
    let expected_secs = scenario
        .metadata()
        .expected_duration()
        .map(|d| d.num_seconds());
    #[allow(clippy::cast_precision_loss)]
    let efficiency = match (elapsed_secs, expected_secs) {
        (Some(elapsed), Some(expected)) if expected > 0 => {
            EfficiencyRating::from_ratio(elapsed as f64 / expected as f64)
        }
        _ => EfficiencyRating::Unknown,
    };

    InvestigationMetrics {
        budget_used: state.initial_budget().saturating_sub(state.remaining_budget()),
        budget_total: state.initial_budget(),
        herrings_disclosed,
        genuine_disclosed,
        genuine_total,
        genuine_coverage,
        phases_discovered: state.discovered_phases().len(),
        elapsed_secs,
        expected_secs,
        efficiency,
    }
}

fn feedback(
    verdicts: &[PhaseVerdict],
    in_order: bool,
    correct: usize,
    penalties: &[HerringPenalty],
) -> (Vec<String>, Vec<String>) {
    let mut strengths = Vec::new();
    let mut improvements = Vec::new();

    for verdict in verdicts {
        let label = if verdict.name.is_empty() {
            verdict.phase_id.to_string()
        } else {
            verdict.name.clone()
        };
        match (verdict.matched, verdict.substantiated) {
            (true, true) => strengths.push(format!("Identified {label} and backed it with evidence")),
            (true, false) => improvements.push(format!(
                "{label} was correct but no supporting evidence was uncovered"
            )),
            (false, true) => improvements.push(format!(
                "Evidence for {label} was found but the phase was left out of the theory"
            )),
            (false, false) => improvements.push(format!("Missed {label}")),
        }
    }

    if in_order && correct > 1 {
        strengths.push("Attack sequence matches the actual progression".to_string());
    } else if correct > 1 {
        improvements.push("Phases are out of order relative to the attack".to_string());
    }

    for penalty in penalties {
        improvements.push(format!(
            "Cited red herring {} as proof",
            penalty.evidence_id
        ));
    }

    (strengths, improvements)
}

fn summarize(verdicts: &[PhaseVerdict], in_order: bool, herrings: usize, grade: Grade) -> String {
    let total = verdicts.len();
    let matched = verdicts.iter().filter(|v| v.matched).count();
    let backed = verdicts.iter().filter(|v| v.matched && v.substantiated).count();

    let assessment = match grade {
        Grade::APlus | Grade::A | Grade::AMinus => "Excellent work",
        Grade::BPlus | Grade::B | Grade::BMinus => "Solid investigation",
        Grade::CPlus | Grade::C | Grade::CMinus => "Partial reconstruction",
        Grade::DPlus | Grade::D => "Significant gaps",
        Grade::F => "The attack was not reconstructed",
    };
    let order = if in_order { ", in the right order" } else { "" };
    let mut summary = format!(
        "{assessment}: {matched} of {total} phases identified ({backed} backed by evidence){order}."
    );
    if herrings > 0 {
        summary.push_str(&format!(" {herrings} red herring(s) were mistaken for proof."));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionId;
    use chrono::Utc;
    use ttx_scenario::{EvidenceId, PhaseId};

    const SCENARIO: &str = r#"
scenario:
  metadata: { id: SCORE-1, name: Scoring }
  attack_overview:
    kill_chain:
      - { id: P1, name: Initial Access, tactics: [TA0001], evidence: [E1] }
      - { id: P2, name: Lateral Movement, tactics: [TA0008], evidence: [E3] }
      - { id: P3, name: Exfiltration, tactics: [TA0010], evidence: [E4] }
  initial_alert: { timestamp: "2024-01-01 00:00:00", description: alert }
  evidence:
    items:
      - { id: E1, category: email, phase: P1, finding: one }
      - { id: E2, category: vpn, red_herring: true, finding: two }
      - { id: E3, category: smb, phase: P2, finding: three }
      - { id: E4, category: cloud, phase: P3, finding: four }
  scoring: { phase_points: 20, sequence_bonus: 40, herring_penalty: 5, max_score: 100 }
"#;

    fn played(disclosed: &[&str]) -> (ScenarioModel, InvestigationState) {
        let scenario = ScenarioModel::load(SCENARIO).unwrap();
        let mut state = InvestigationState::new(SessionId::from("INC-S"), &scenario, Utc::now());
        for id in disclosed {
            let item = scenario.evidence(&EvidenceId::from(*id)).unwrap().clone();
            state.record_disclosure(&item, "request", Utc::now());
        }
        (scenario, state)
    }

    fn theory(phases: &[&str], accused: &[&str]) -> Theory {
        Theory {
            phases: phases.iter().map(|p| PhaseId::from(*p)).collect(),
            accused_evidence: accused.iter().map(|e| EvidenceId::from(*e)).collect(),
        }
    }

    #[test]
    fn perfect_theory_scores_max() {
        let (scenario, state) = played(&["E1", "E3", "E4"]);
        let report = ScoringEngine.score(&state, &scenario, &theory(&["P1", "P2", "P3"], &[]));
        assert_eq!(report.total_score, 100.0);
        assert_eq!(report.grade, Grade::APlus);
        assert!(report.sequence_bonus_awarded);
    }

    #[test]
    fn unsubstantiated_phase_earns_half() {
        let (scenario, state) = played(&["E1", "E3"]);
        let report = ScoringEngine.score(&state, &scenario, &theory(&["P1", "P2", "P3"], &[]));
        assert_eq!(report.verdicts[2].points_awarded, 10.0);
        assert_eq!(report.total_score, 90.0);
    }

    #[test]
    fn skipped_phase_keeps_bonus_swapped_loses_it() {
        let (scenario, state) = played(&["E1", "E3", "E4"]);
        let skipped = ScoringEngine.score(&state, &scenario, &theory(&["P1", "P3"], &[]));
        assert!(skipped.sequence_bonus_awarded);
        assert_eq!(skipped.total_score, 80.0);

        let swapped = ScoringEngine.score(&state, &scenario, &theory(&["P3", "P1", "P2"], &[]));
        assert!(!swapped.sequence_bonus_awarded);
        assert_eq!(swapped.total_score, 60.0);
    }

    #[test]
    fn single_phase_earns_no_bonus() {
        let (scenario, state) = played(&["E1"]);
        let report = ScoringEngine.score(&state, &scenario, &theory(&["P1"], &[]));
        assert!(!report.sequence_bonus_awarded);
        assert_eq!(report.total_score, 20.0);
    }

    #[test]
    fn herring_penalty_applies_once_per_item_and_floors() {
        let (scenario, state) = played(&["E1", "E2"]);
        let report =
            ScoringEngine.score(&state, &scenario, &theory(&["P1"], &["E2", "E2", "E1"]));
        assert_eq!(report.herring_penalties.len(), 1);
        assert_eq!(report.total_score, 15.0);

        let report = ScoringEngine.score(&state, &scenario, &theory(&[], &["E2"]));
        assert_eq!(report.total_score, 0.0);
    }

    #[test]
    fn unknown_ids_are_listed_not_scored() {
        let (scenario, state) = played(&["E1"]);
        let report = ScoringEngine.score(
            &state,
            &scenario,
            &theory(&["P9", "P1", "P9", "P1"], &["E42"]),
        );
        assert_eq!(report.unknown_phases, vec![PhaseId::from("P9")]);
        assert_eq!(report.unknown_evidence, vec![EvidenceId::from("E42")]);
        assert_eq!(report.matched_count(), 1);
        assert_eq!(report.total_score, 20.0);
    }

    #[test]
    fn scoring_is_idempotent() {
        let (scenario, state) = played(&["E1", "E4"]);
        let t = theory(&["P1", "P3"], &["E2"]);
        assert_eq!(
            ScoringEngine.score(&state, &scenario, &t),
            ScoringEngine.score(&state, &scenario, &t)
        );
    }

    #[test]
    fn metrics_break_down_play_without_touching_score() {
        let yaml = SCENARIO.replace(
            "name: Scoring }",
            "name: Scoring, estimated_duration: 40 minutes }",
        );
        let scenario = ScenarioModel::load(&yaml).unwrap();
        let start = Utc::now();
        let mut state = InvestigationState::new(SessionId::from("INC-M"), &scenario, start);
        for (minutes, id) in [(5, "E1"), (10, "E2"), (20, "E3")] {
            let item = scenario.evidence(&EvidenceId::from(id)).unwrap().clone();
            state.record_disclosure(&item, "request", start + chrono::Duration::minutes(minutes));
        }

        let report = ScoringEngine.score(&state, &scenario, &theory(&["P1", "P2"], &[]));
        let metrics = &report.metrics;
        assert_eq!(metrics.budget_used, 3);
        assert_eq!(metrics.herrings_disclosed, 1);
        assert_eq!(metrics.genuine_disclosed, 2);
        assert_eq!(metrics.genuine_total, 3);
        assert_eq!(metrics.genuine_coverage, 0.67);
        assert_eq!(metrics.phases_discovered, 2);
        assert_eq!(metrics.elapsed_secs, Some(1200));
        assert_eq!(metrics.expected_secs, Some(2400));
        assert_eq!(metrics.efficiency, EfficiencyRating::Excellent);

        // 40 for two phases plus the 40 bonus; the breakdown adds nothing
        assert_eq!(report.total_score, 80.0);
    }

    #[test]
    fn efficiency_unknown_without_estimate_or_disclosures() {
        let (scenario, state) = played(&["E1"]);
        let report = ScoringEngine.score(&state, &scenario, &theory(&["P1"], &[]));
        assert_eq!(report.metrics.expected_secs, None);
        assert_eq!(report.metrics.efficiency, EfficiencyRating::Unknown);

        let (scenario, state) = played(&[]);
        let report = ScoringEngine.score(&state, &scenario, &theory(&[], &[]));
        assert_eq!(report.metrics.elapsed_secs, None);
        assert_eq!(report.metrics.budget_used, 0);
        assert_eq!(report.metrics.efficiency, EfficiencyRating::Unknown);
    }
}
