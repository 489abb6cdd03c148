//! Testing utilities for TTX workspace
//!
//! Shared scenarios, a programmatic scenario builder and misbehaving
//! narrative backends.

#![allow(missing_docs)]

use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ttx_engine::{DisclosureRecord, NarrativeBackend, RenderError};
use ttx_scenario::document::{
    AttackOverview, Environment, EvidencePool, InitialAlert, Inspiration, KillChainPhase, Metadata,
    ScenarioDocument, ScoringRubric,
};
use ttx_scenario::{Difficulty, EvidenceId, EvidenceItem, PhaseId, ScenarioModel, Severity};

/// Library scenario with five phases, twelve genuine items and four herrings
pub const LANTERNFISH_YAML: &str = include_str!("../../../scenarios/library/lanternfish.yaml");

/// Three-item scenario: E1 -> P1, E2 herring, E3 -> P2, budget 3
pub const MINI_YAML: &str = r#"
scenario:
  metadata: { id: MINI-1, name: Three Clues, difficulty: easy }
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
    title: Suspicious SMB session
    description: Workstation opened an admin share on the file server
  evidence:
    red_herring_ratio: 0.25
    items:
      - id: E1
        category: email
        tags: [phishing, attachment]
        phase: P1
        source: Mail gateway
        finding: Macro document delivered from a lookalike domain
        narrative_hooks: [the sender domain has an extra hyphen]
      - id: E2
        category: authentication
        tags: [vpn, login]
        red_herring: true
        source: VPN concentrator
        finding: Sales manager logged in from a hotel abroad
      - id: E3
        category: network
        tags: [smb, lateral]
        phase: P2
        source: Firewall
        finding: Admin share accessed from the accounting laptop
  scoring: { phase_points: 40, sequence_bonus: 20, herring_penalty: 5, max_score: 100 }
  investigation_budget: 3
"#;

pub fn lanternfish() -> Arc<ScenarioModel> {
    Arc::new(ScenarioModel::load(LANTERNFISH_YAML).unwrap())
}

pub fn mini_scenario() -> Arc<ScenarioModel> {
    Arc::new(ScenarioModel::load(MINI_YAML).unwrap())
}

/// Run a future on a fresh current-thread runtime
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

/// Topic words used to tag generated evidence
pub const TOPICS: &[&str] = &[
    "email", "dns", "proxy", "login", "process", "registry", "share", "archive", "upload",
    "firewall", "printer", "vpn",
];

/// Programmatic scenario for property tests
///
/// Phases are `P1..Pn`; genuine items are spread round-robin over phases;
/// items are tagged from [`TOPICS`] so generated requests hit some of them.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    id: String,
    phases: usize,
    genuine: usize,
    herrings: usize,
    ratio: f64,
    budget: u32,
}

impl ScenarioBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            phases: 3,
            genuine: 6,
            herrings: 2,
            ratio: 0.25,
            budget: 8,
        }
    }

    pub fn phases(mut self, phases: usize) -> Self {
        self.phases = phases.max(1);
        self
    }

    pub fn genuine(mut self, genuine: usize) -> Self {
        self.genuine = genuine.max(1);
        self
    }

    pub fn herrings(mut self, herrings: usize) -> Self {
        self.herrings = herrings;
        self
    }

    pub fn ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn budget(mut self, budget: u32) -> Self {
        self.budget = budget;
        self
    }

    pub fn document(&self) -> ScenarioDocument {
        let phase_ids: Vec<PhaseId> = (1..=self.phases).map(|i| PhaseId::new(format!("P{i}"))).collect();
        let mut kill_chain: Vec<KillChainPhase> = phase_ids
            .iter()
            .map(|id| KillChainPhase {
                id: id.clone(),
                name: format!("Phase {id}"),
                description: String::new(),
                tactics: vec!["TA0001".to_string()],
                techniques: vec!["T1566".to_string()],
                evidence: Vec::new(),
                points: None,
            })
            .collect();

        let mut items = Vec::new();
        for i in 0..self.genuine {
            let id = EvidenceId::new(format!("G{:03}", i + 1));
            let phase = i % self.phases;
            kill_chain[phase].evidence.push(id.clone());
            items.push(EvidenceItem {
                id,
                category: TOPICS[i % TOPICS.len()].to_string(),
                tags: vec![TOPICS[(i * 7 + 3) % TOPICS.len()].to_string()],
                red_herring: false,
                phase: Some(phase_ids[phase].clone()),
                finding: format!("genuine finding {}", i + 1),
                narrative_hooks: vec![format!("hook {}", i + 1)],
                source: None,
            });
        }
        for i in 0..self.herrings {
            items.push(EvidenceItem {
                id: EvidenceId::new(format!("H{:03}", i + 1)),
                category: TOPICS[(i * 5 + 1) % TOPICS.len()].to_string(),
                tags: vec![TOPICS[(i + 9) % TOPICS.len()].to_string()],
                red_herring: true,
                phase: None,
                finding: format!("misleading finding {}", i + 1),
                narrative_hooks: Vec::new(),
                source: None,
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let phase_points = 80.0 / self.phases as f64;
        ScenarioDocument {
            metadata: Metadata {
                id: self.id.clone(),
                name: format!("Generated {}", self.id),
                version: "1.0".to_string(),
                difficulty: Difficulty::Intermediate,
                estimated_duration: None,
                description: String::new(),
            },
            inspiration: Inspiration::default(),
            environment: Environment::default(),
            attack_overview: AttackOverview {
                summary: String::new(),
                kill_chain,
            },
            initial_alert: InitialAlert {
                alert_type: "siem".to_string(),
                severity: Severity::High,
                timestamp: "2024-01-01 00:00:00".to_string(),
                source: "SIEM".to_string(),
                title: String::new(),
                description: "generated alert".to_string(),
                raw_data: String::new(),
            },
            evidence: EvidencePool {
                red_herring_ratio: self.ratio,
                items,
            },
            scoring: ScoringRubric {
                phase_points,
                sequence_bonus: 20.0,
                unsubstantiated_fraction: 0.5,
                herring_penalty: 5.0,
                max_score: 100.0,
            },
            investigation_budget: self.budget,
        }
    }

    pub fn build(&self) -> Arc<ScenarioModel> {
        Arc::new(ScenarioModel::from_document(self.document()).unwrap())
    }
}

/// Backend that always fails
#[derive(Debug, Default)]
pub struct FailingNarrator {
    calls: AtomicUsize,
}

impl FailingNarrator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarrativeBackend for FailingNarrator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn render(
        &self,
        _item: &EvidenceItem,
        _request: &str,
        _prior: &[DisclosureRecord],
    ) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RenderError::unavailable("quota exceeded"))
    }
}

/// Backend that answers after a delay
#[derive(Debug)]
pub struct SlowNarrator {
    pub delay: Duration,
}

#[async_trait]
impl NarrativeBackend for SlowNarrator {
    fn name(&self) -> &str {
        "slow"
    }

    async fn render(
        &self,
        item: &EvidenceItem,
        _request: &str,
        _prior: &[DisclosureRecord],
    ) -> Result<String, RenderError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("Eventually: {}", item.finding))
    }
}
