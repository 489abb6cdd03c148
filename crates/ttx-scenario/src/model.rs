//! Validated scenario model
//!
//! [`ScenarioModel`] can only be obtained through [`ScenarioModel::load`] or
//! [`ScenarioModel::from_document`], both of which refuse documents with any
//! structural issue. Once built it is never mutated; sessions share it
//! behind an `Arc`.

use crate::document::{
    EvidenceItem, EvidencePool, Environment, InitialAlert, Inspiration, KillChainPhase, Metadata,
    ScenarioDocument, ScenarioFile, ScoringRubric, AttackOverview,
};
use crate::error::{StructuralIssue, ValidationError};
use crate::ids::{EvidenceId, PhaseId};
use crate::validation::validate_document;
use std::collections::BTreeMap;

/// Immutable, validated scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioModel {
    metadata: Metadata,
    inspiration: Inspiration,
    environment: Environment,
    summary: String,
    alert: InitialAlert,
    phases: Vec<KillChainPhase>,
    evidence: BTreeMap<EvidenceId, EvidenceItem>,
    red_herring_ratio: f64,
    rubric: ScoringRubric,
    investigation_budget: u32,
}

impl ScenarioModel {
    /// Parse and validate a YAML scenario description
    ///
    /// # Errors
    /// - `ValidationError::Malformed` if the text is not a scenario document
    /// - `ValidationError::Inconsistent` listing every structural issue
    pub fn load(raw: &str) -> Result<Self, ValidationError> {
        let file: ScenarioFile = serde_yaml::from_str(raw)?;
        Self::from_document(file.scenario)
    }

    /// Validate an already-parsed document
    ///
    /// # Errors
    /// `ValidationError::Inconsistent` listing every structural issue
    pub fn from_document(doc: ScenarioDocument) -> Result<Self, ValidationError> {
        let issues = validate_document(&doc);
        if !issues.is_empty() {
            tracing::warn!(
                scenario = %doc.metadata.id,
                issues = issues.len(),
                "Rejected scenario"
            );
            return Err(ValidationError::Inconsistent { issues });
        }

        let evidence = doc
            .evidence
            .items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        let model = Self {
            metadata: doc.metadata,
            inspiration: doc.inspiration,
            environment: doc.environment,
            summary: doc.attack_overview.summary,
            alert: doc.initial_alert,
            phases: doc.attack_overview.kill_chain,
            evidence,
            red_herring_ratio: doc.evidence.red_herring_ratio,
            rubric: doc.scoring,
            investigation_budget: doc.investigation_budget,
        };

        tracing::info!(
            scenario = %model.metadata.id,
            phases = model.phases.len(),
            evidence = model.evidence.len(),
            "Loaded scenario"
        );
        Ok(model)
    }

    /// Re-check structural invariants (empty for every loaded model)
    #[must_use]
    pub fn validate(&self) -> Vec<StructuralIssue> {
        validate_document(&self.to_document())
    }

    /// Rebuild the document form (evidence in ID order)
    #[must_use]
    pub fn to_document(&self) -> ScenarioDocument {
        ScenarioDocument {
            metadata: self.metadata.clone(),
            inspiration: self.inspiration.clone(),
            environment: self.environment.clone(),
            attack_overview: AttackOverview {
                summary: self.summary.clone(),
                kill_chain: self.phases.clone(),
            },
            initial_alert: self.alert.clone(),
            evidence: EvidencePool {
                red_herring_ratio: self.red_herring_ratio,
                items: self.evidence.values().cloned().collect(),
            },
            scoring: self.rubric,
            investigation_budget: self.investigation_budget,
        }
    }

    /// Serialize back to the YAML format
    ///
    /// # Errors
    /// Propagates serializer failures
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&ScenarioFile {
            scenario: self.to_document(),
        })
    }

    /// Scenario ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// Metadata
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Inspiration
    #[inline]
    #[must_use]
    pub fn inspiration(&self) -> &Inspiration {
        &self.inspiration
    }

    /// Environment
    #[inline]
    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Attack summary
    #[inline]
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Opening alert
    #[inline]
    #[must_use]
    pub fn alert(&self) -> &InitialAlert {
        &self.alert
    }

    /// Kill-chain phases in canonical order
    #[inline]
    #[must_use]
    pub fn phases(&self) -> &[KillChainPhase] {
        &self.phases
    }

    /// Look up a phase
    #[must_use]
    pub fn phase(&self, id: &PhaseId) -> Option<&KillChainPhase> {
        self.phases.iter().find(|p| &p.id == id)
    }

    /// Canonical position of a phase
    #[must_use]
    pub fn phase_index(&self, id: &PhaseId) -> Option<usize> {
        self.phases.iter().position(|p| &p.id == id)
    }

    /// Points for a phase (override or rubric default)
    #[must_use]
    pub fn phase_points(&self, phase: &KillChainPhase) -> f64 {
        phase.points.unwrap_or(self.rubric.phase_points)
    }

    /// Summed phase points plus sequence bonus, in canonical order
    #[must_use]
    pub fn rubric_total(&self) -> f64 {
        self.phases
            .iter()
            .map(|phase| self.phase_points(phase))
            .sum::<f64>()
            + self.rubric.sequence_bonus
    }

    /// Look up an evidence item
    #[inline]
    #[must_use]
    pub fn evidence(&self, id: &EvidenceId) -> Option<&EvidenceItem> {
        self.evidence.get(id)
    }

    /// All evidence, ordered by ID
    pub fn evidence_items(&self) -> impl Iterator<Item = &EvidenceItem> {
        self.evidence.values()
    }

    /// Size of the evidence pool
    #[inline]
    #[must_use]
    pub fn evidence_count(&self) -> usize {
        self.evidence.len()
    }

    /// Number of genuine items
    #[must_use]
    pub fn genuine_count(&self) -> usize {
        self.evidence.values().filter(|e| e.is_genuine()).count()
    }

    /// Number of red herrings
    #[must_use]
    pub fn herring_count(&self) -> usize {
        self.evidence.len() - self.genuine_count()
    }

    /// Advisory herring fraction
    #[inline]
    #[must_use]
    pub fn red_herring_ratio(&self) -> f64 {
        self.red_herring_ratio
    }

    /// Points schedule
    #[inline]
    #[must_use]
    pub fn rubric(&self) -> &ScoringRubric {
        &self.rubric
    }

    /// Investigation budget
    #[inline]
    #[must_use]
    pub fn investigation_budget(&self) -> u32 {
        self.investigation_budget
    }
}
