//! Structural validation of scenario documents
//!
//! Checks run in a fixed order and never stop early; the caller gets every
//! issue in the document.

use crate::document::{EvidenceItem, ScenarioDocument};
use crate::error::StructuralIssue;
use crate::ids::{EvidenceId, PhaseId};
use std::collections::{HashMap, HashSet};

/// Allowed gap between summed rubric points and `max_score`
pub const RUBRIC_TOLERANCE: f64 = 0.01;

/// Validate a scenario document
///
/// # Returns
/// Every violated invariant; empty means the document is usable.
#[must_use]
pub fn validate_document(doc: &ScenarioDocument) -> Vec<StructuralIssue> {
    let mut issues = Vec::new();

    let evidence = index_evidence(&doc.evidence.items, &mut issues);
    let phases = index_phases(doc, &mut issues);

    check_phase_references(doc, &evidence, &mut issues);
    check_evidence_links(&doc.evidence.items, &phases, &mut issues);

    if !doc.evidence.items.iter().any(EvidenceItem::is_genuine) {
        issues.push(StructuralIssue::NoGenuineEvidence);
    }

    check_rubric(doc, &mut issues);
    issues
}

fn index_evidence<'a>(
    items: &'a [EvidenceItem],
    issues: &mut Vec<StructuralIssue>,
) -> HashMap<&'a EvidenceId, &'a EvidenceItem> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        if item.id.as_str().trim().is_empty() {
            issues.push(StructuralIssue::EmptyId { what: "evidence item" });
        }
        if index.insert(&item.id, item).is_some() {
            issues.push(StructuralIssue::DuplicateEvidenceId(item.id.clone()));
        }
    }
    index
}

fn index_phases<'a>(
    doc: &'a ScenarioDocument,
    issues: &mut Vec<StructuralIssue>,
) -> HashMap<&'a PhaseId, HashSet<&'a EvidenceId>> {
    let kill_chain = &doc.attack_overview.kill_chain;
    if kill_chain.is_empty() {
        issues.push(StructuralIssue::EmptyKillChain);
    }

    let mut index = HashMap::with_capacity(kill_chain.len());
    for phase in kill_chain {
        if phase.id.as_str().trim().is_empty() {
            issues.push(StructuralIssue::EmptyId { what: "kill-chain phase" });
        }
        if index
            .insert(&phase.id, phase.evidence.iter().collect())
            .is_some()
        {
            issues.push(StructuralIssue::DuplicatePhaseId(phase.id.clone()));
        }
    }
    index
}

fn check_phase_references(
    doc: &ScenarioDocument,
    evidence: &HashMap<&EvidenceId, &EvidenceItem>,
    issues: &mut Vec<StructuralIssue>,
) {
    for phase in &doc.attack_overview.kill_chain {
        for tag in phase.tactics.iter().filter(|t| !is_tactic_tag(t)) {
            issues.push(StructuralIssue::MalformedAttackTag {
                phase: phase.id.clone(),
                tag: tag.clone(),
            });
        }
        for tag in phase.techniques.iter().filter(|t| !is_technique_tag(t)) {
            issues.push(StructuralIssue::MalformedAttackTag {
                phase: phase.id.clone(),
                tag: tag.clone(),
            });
        }

        if let Some(points) = phase.points {
            check_points(format!("phase {} points", phase.id), points, issues);
        }

        for id in &phase.evidence {
            match evidence.get(id) {
                None => issues.push(StructuralIssue::MissingEvidence {
                    phase: phase.id.clone(),
                    evidence: id.clone(),
                }),
                Some(item) if item.red_herring => {
                    issues.push(StructuralIssue::PhaseCitesHerring {
                        phase: phase.id.clone(),
                        evidence: id.clone(),
                    });
                }
                Some(item) if item.phase.as_ref() != Some(&phase.id) => {
                    issues.push(StructuralIssue::PhaseEvidenceMismatch {
                        phase: phase.id.clone(),
                        evidence: id.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }
}

fn check_evidence_links(
    items: &[EvidenceItem],
    phases: &HashMap<&PhaseId, HashSet<&EvidenceId>>,
    issues: &mut Vec<StructuralIssue>,
) {
    for item in items {
        match (item.red_herring, &item.phase) {
            (true, Some(phase)) => issues.push(StructuralIssue::HerringLinkedToPhase {
                evidence: item.id.clone(),
                phase: phase.clone(),
            }),
            (true, None) => {}
            (false, None) => {
                issues.push(StructuralIssue::UnlinkedGenuineEvidence(item.id.clone()));
            }
            (false, Some(phase)) => match phases.get(phase) {
                None => issues.push(StructuralIssue::UnknownLinkedPhase {
                    evidence: item.id.clone(),
                    phase: phase.clone(),
                }),
                Some(listed) if !listed.contains(&item.id) => {
                    issues.push(StructuralIssue::PhaseEvidenceMismatch {
                        phase: phase.clone(),
                        evidence: item.id.clone(),
                    });
                }
                Some(_) => {}
            },
        }
    }
}

fn check_rubric(doc: &ScenarioDocument, issues: &mut Vec<StructuralIssue>) {
    let ratio = doc.evidence.red_herring_ratio;
    if !(0.0..=1.0).contains(&ratio) {
        issues.push(StructuralIssue::RatioOutOfRange(ratio));
    }
    if doc.investigation_budget == 0 {
        issues.push(StructuralIssue::ZeroBudget);
    }

    let rubric = &doc.scoring;
    if !(0.0..=1.0).contains(&rubric.unsubstantiated_fraction) {
        issues.push(StructuralIssue::FractionOutOfRange(
            rubric.unsubstantiated_fraction,
        ));
    }
    let mut finite = true;
    for (field, value) in [
        ("phase_points", rubric.phase_points),
        ("sequence_bonus", rubric.sequence_bonus),
        ("herring_penalty", rubric.herring_penalty),
    ] {
        finite &= check_points(field.to_string(), value, issues);
    }
    finite &= doc
        .attack_overview
        .kill_chain
        .iter()
        .filter_map(|phase| phase.points)
        .all(f64::is_finite);

    if !rubric.max_score.is_finite() {
        issues.push(StructuralIssue::NonFiniteNumber {
            field: "max_score".to_string(),
        });
        return;
    }
    if rubric.max_score <= 0.0 {
        issues.push(StructuralIssue::NonPositiveMaxScore(rubric.max_score));
        return;
    }
    if !finite {
        return;
    }

    let rubric_total = doc
        .attack_overview
        .kill_chain
        .iter()
        .map(|phase| phase.points.unwrap_or(rubric.phase_points))
        .sum::<f64>()
        + rubric.sequence_bonus;
    if (rubric_total - rubric.max_score).abs() > RUBRIC_TOLERANCE {
        issues.push(StructuralIssue::RubricMismatch {
            rubric_total,
            max_score: rubric.max_score,
        });
    }
}

/// Points must be finite and non-negative; returns whether the value is finite
fn check_points(field: String, value: f64, issues: &mut Vec<StructuralIssue>) -> bool {
    if !value.is_finite() {
        issues.push(StructuralIssue::NonFiniteNumber { field });
        return false;
    }
    if value < 0.0 {
        issues.push(StructuralIssue::NegativePoints { field, value });
    }
    true
}

/// `TA` followed by four digits
fn is_tactic_tag(tag: &str) -> bool {
    tag.strip_prefix("TA")
        .is_some_and(|rest| rest.len() == 4 && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// `T####` or `T####.###`
fn is_technique_tag(tag: &str) -> bool {
    let Some(rest) = tag.strip_prefix('T') else {
        return false;
    };
    let (base, sub) = match rest.split_once('.') {
        Some((base, sub)) => (base, Some(sub)),
        None => (rest, None),
    };
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
    digits(base, 4) && sub.map_or(true, |s| digits(s, 3))
}
