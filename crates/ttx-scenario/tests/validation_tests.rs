//! Scenario loading must fail fast on every structural violation.

use pretty_assertions::assert_eq;
use ttx_scenario::{EvidenceId, PhaseId, ScenarioModel, StructuralIssue, ValidationError};

/// Two phases, two genuine items, one herring. Each test perturbs one field.
fn base_yaml() -> String {
    r#"
scenario:
  metadata: { id: VAL-1, name: Validation Fixture, difficulty: easy }
  attack_overview:
    summary: Phish then pivot
    kill_chain:
      - { id: P1, name: Initial Access, tactics: [TA0001], techniques: [T1566.001], evidence: [E1] }
      - { id: P2, name: Lateral Movement, tactics: [TA0008], techniques: [T1021.002], evidence: [E3] }
  initial_alert:
    alert_type: edr
    severity: high
    timestamp: "2024-03-02 09:14:00"
    source: EDR
    description: Suspicious SMB session
  evidence:
    red_herring_ratio: 0.25
    items:
      - { id: E1, category: email, tags: [phishing, attachment], phase: P1, finding: "Macro document from lookalike domain" }
      - { id: E2, category: endpoint, tags: [printer], red_herring: true, finding: "Print spooler restarted" }
      - { id: E3, category: network, tags: [smb, lateral], phase: P2, finding: "Admin share access from HR laptop" }
  scoring: { phase_points: 40, sequence_bonus: 20, herring_penalty: 5, max_score: 100 }
  investigation_budget: 3
"#
    .to_string()
}

fn issues_for(yaml: &str) -> Vec<StructuralIssue> {
    match ScenarioModel::load(yaml) {
        Err(ValidationError::Inconsistent { issues }) => issues,
        Err(other) => panic!("expected structural issues, got {other}"),
        Ok(_) => panic!("expected load to fail"),
    }
}

#[test]
fn valid_fixture_loads() {
    let model = ScenarioModel::load(&base_yaml()).expect("fixture is valid");
    assert!(model.validate().is_empty());
    assert_eq!(model.investigation_budget(), 3);
    assert_eq!(model.phases().len(), 2);
}

#[test]
fn duplicate_evidence_id_rejected() {
    let yaml = base_yaml().replace("id: E2,", "id: E1,");
    let issues = issues_for(&yaml);
    assert!(issues.contains(&StructuralIssue::DuplicateEvidenceId(EvidenceId::from("E1"))));
}

#[test]
fn phase_referencing_missing_evidence_rejected() {
    let yaml = base_yaml().replace("evidence: [E3]", "evidence: [E3, E9]");
    let issues = issues_for(&yaml);
    assert_eq!(
        issues,
        vec![StructuralIssue::MissingEvidence {
            phase: PhaseId::from("P2"),
            evidence: EvidenceId::from("E9"),
        }]
    );
}

#[test]
fn herring_with_linked_phase_rejected() {
    let yaml = base_yaml().replace("red_herring: true,", "red_herring: true, phase: P1,");
    let issues = issues_for(&yaml);
    assert!(issues.contains(&StructuralIssue::HerringLinkedToPhase {
        evidence: EvidenceId::from("E2"),
        phase: PhaseId::from("P1"),
    }));
}

#[test]
fn rubric_mismatch_rejected() {
    let yaml = base_yaml().replace("max_score: 100", "max_score: 120");
    let issues = issues_for(&yaml);
    assert_eq!(
        issues,
        vec![StructuralIssue::RubricMismatch {
            rubric_total: 100.0,
            max_score: 120.0,
        }]
    );
}

#[test]
fn rubric_within_tolerance_accepted() {
    let yaml = base_yaml().replace("max_score: 100", "max_score: 100.005");
    assert!(ScenarioModel::load(&yaml).is_ok());
}

#[test]
fn evidence_linking_unknown_phase_rejected() {
    let yaml = base_yaml().replace("phase: P2, finding", "phase: P7, finding");
    let issues = issues_for(&yaml);
    assert!(issues.contains(&StructuralIssue::UnknownLinkedPhase {
        evidence: EvidenceId::from("E3"),
        phase: PhaseId::from("P7"),
    }));
    // P2 still lists E3, which now points elsewhere
    assert!(issues.contains(&StructuralIssue::PhaseEvidenceMismatch {
        phase: PhaseId::from("P2"),
        evidence: EvidenceId::from("E3"),
    }));
}

#[test]
fn several_issues_reported_together() {
    let yaml = base_yaml()
        .replace("red_herring_ratio: 0.25", "red_herring_ratio: 1.5")
        .replace("investigation_budget: 3", "investigation_budget: 0")
        .replace("tactics: [TA0008]", "tactics: [lateral]");
    let issues = issues_for(&yaml);
    assert!(issues.contains(&StructuralIssue::RatioOutOfRange(1.5)));
    assert!(issues.contains(&StructuralIssue::ZeroBudget));
    assert!(issues.contains(&StructuralIssue::MalformedAttackTag {
        phase: PhaseId::from("P2"),
        tag: "lateral".into(),
    }));
}

#[test]
fn malformed_yaml_is_not_a_structural_issue() {
    let err = ScenarioModel::load("scenario: [unterminated").unwrap_err();
    assert!(matches!(err, ValidationError::Malformed(_)));
}

#[test]
fn missing_wrapper_key_is_malformed() {
    let yaml = base_yaml().replacen("scenario:", "exercise:", 1);
    assert!(matches!(
        ScenarioModel::load(&yaml),
        Err(ValidationError::Malformed(_))
    ));
}

#[test]
fn duplicate_phase_id_rejected() {
    let yaml = base_yaml().replace("{ id: P2, name: Lateral", "{ id: P1, name: Lateral");
    let issues = issues_for(&yaml);
    assert!(issues.contains(&StructuralIssue::DuplicatePhaseId(PhaseId::from("P1"))));
}

#[test]
fn empty_evidence_id_rejected() {
    let yaml = base_yaml().replace("id: E2,", "id: \"\",");
    let issues = issues_for(&yaml);
    assert!(issues.contains(&StructuralIssue::EmptyId { what: "evidence item" }));
}

#[test]
fn genuine_evidence_without_phase_rejected() {
    let yaml = base_yaml().replace("phase: P2, finding", "finding");
    let issues = issues_for(&yaml);
    assert!(issues.contains(&StructuralIssue::UnlinkedGenuineEvidence(EvidenceId::from("E3"))));
}

#[test]
fn phase_citing_herring_rejected() {
    let yaml = base_yaml().replace("evidence: [E1]", "evidence: [E1, E2]");
    assert_eq!(
        issues_for(&yaml),
        vec![StructuralIssue::PhaseCitesHerring {
            phase: PhaseId::from("P1"),
            evidence: EvidenceId::from("E2"),
        }]
    );
}

#[test]
fn phase_listing_evidence_of_another_phase_rejected() {
    let yaml = base_yaml().replace("evidence: [E3]", "evidence: [E3, E1]");
    assert_eq!(
        issues_for(&yaml),
        vec![StructuralIssue::PhaseEvidenceMismatch {
            phase: PhaseId::from("P2"),
            evidence: EvidenceId::from("E1"),
        }]
    );
}

#[test]
fn empty_kill_chain_rejected() {
    let yaml = base_yaml()
        .lines()
        .filter(|line| !line.trim_start().starts_with("- { id: P"))
        .map(|line| {
            if line.trim() == "kill_chain:" {
                "    kill_chain: []"
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    let issues = issues_for(&yaml);
    assert!(issues.contains(&StructuralIssue::EmptyKillChain));
}

#[test]
fn pool_without_genuine_evidence_rejected() {
    let yaml = base_yaml()
        .replace("phase: P1, finding", "red_herring: true, finding")
        .replace("phase: P2, finding", "red_herring: true, finding");
    let issues = issues_for(&yaml);
    assert!(issues.contains(&StructuralIssue::NoGenuineEvidence));
}

#[test]
fn ratio_outside_unit_interval_rejected() {
    let yaml = base_yaml().replace("red_herring_ratio: 0.25", "red_herring_ratio: -0.1");
    assert_eq!(issues_for(&yaml), vec![StructuralIssue::RatioOutOfRange(-0.1)]);
}

#[test]
fn unsubstantiated_fraction_outside_unit_interval_rejected() {
    let yaml = base_yaml().replace(
        "scoring: { phase_points: 40,",
        "scoring: { phase_points: 40, unsubstantiated_fraction: 1.5,",
    );
    assert_eq!(issues_for(&yaml), vec![StructuralIssue::FractionOutOfRange(1.5)]);
}

#[test]
fn zero_budget_rejected() {
    let yaml = base_yaml().replace("investigation_budget: 3", "investigation_budget: 0");
    assert_eq!(issues_for(&yaml), vec![StructuralIssue::ZeroBudget]);
}

#[test]
fn non_positive_max_score_rejected() {
    let yaml = base_yaml().replace("max_score: 100", "max_score: 0");
    assert_eq!(issues_for(&yaml), vec![StructuralIssue::NonPositiveMaxScore(0.0)]);
}

#[test]
fn negative_rubric_points_rejected() {
    let yaml = base_yaml().replace("herring_penalty: 5", "herring_penalty: -5");
    assert_eq!(
        issues_for(&yaml),
        vec![StructuralIssue::NegativePoints {
            field: "herring_penalty".into(),
            value: -5.0,
        }]
    );
}

#[test]
fn negative_phase_points_rejected() {
    let yaml = base_yaml().replace("evidence: [E3] }", "evidence: [E3], points: -10 }");
    let issues = issues_for(&yaml);
    assert!(issues.contains(&StructuralIssue::NegativePoints {
        field: "phase P2 points".into(),
        value: -10.0,
    }));
}

#[test]
fn nan_phase_points_rejected() {
    let yaml = base_yaml().replace("evidence: [E3] }", "evidence: [E3], points: .nan }");
    assert_eq!(
        issues_for(&yaml),
        vec![StructuralIssue::NonFiniteNumber {
            field: "phase P2 points".into(),
        }]
    );
}

#[test]
fn non_finite_rubric_values_rejected() {
    let yaml = base_yaml().replace("phase_points: 40", "phase_points: .nan");
    assert_eq!(
        issues_for(&yaml),
        vec![StructuralIssue::NonFiniteNumber {
            field: "phase_points".into(),
        }]
    );

    let yaml = base_yaml().replace("sequence_bonus: 20", "sequence_bonus: .inf");
    assert_eq!(
        issues_for(&yaml),
        vec![StructuralIssue::NonFiniteNumber {
            field: "sequence_bonus".into(),
        }]
    );

    let yaml = base_yaml().replace("max_score: 100", "max_score: .inf");
    assert_eq!(
        issues_for(&yaml),
        vec![StructuralIssue::NonFiniteNumber {
            field: "max_score".into(),
        }]
    );
}
