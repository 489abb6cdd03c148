//! Scenario document format
//!
//! Serde mirror of the authored YAML. Everything under the top-level
//! `scenario:` key lands here unvalidated; [`crate::ScenarioModel`] is the
//! only consumer and refuses documents with structural issues.
//!
//! ```yaml
//! scenario:
//!   metadata: { id: LANTERN-01, name: Operation Lanternfish, difficulty: intermediate }
//!   attack_overview:
//!     kill_chain:
//!       - { id: P1, name: Initial Access, tactics: [TA0001], techniques: [T1566.001], evidence: [E1] }
//!   initial_alert: { alert_type: edr, severity: high, timestamp: "2024-03-02 09:14:00", ... }
//!   evidence:
//!     red_herring_ratio: 0.25
//!     items:
//!       - { id: E1, category: email, tags: [phishing], phase: P1, finding: "..." }
//!   scoring: { phase_points: 20, sequence_bonus: 20, herring_penalty: 5, max_score: 100 }
//!   investigation_budget: 20
//! ```

use crate::ids::{EvidenceId, PhaseId};
use serde::{Deserialize, Serialize};

/// Default investigation budget when the document omits one
pub const DEFAULT_INVESTIGATION_BUDGET: u32 = 20;

/// Default fraction of disclosures that should be red herrings
pub const DEFAULT_RED_HERRING_RATIO: f64 = 0.25;

/// Default partial credit for a correct but unsubstantiated phase
pub const DEFAULT_UNSUBSTANTIATED_FRACTION: f64 = 0.5;

fn default_budget() -> u32 {
    DEFAULT_INVESTIGATION_BUDGET
}

fn default_ratio() -> f64 {
    DEFAULT_RED_HERRING_RATIO
}

fn default_fraction() -> f64 {
    DEFAULT_UNSUBSTANTIATED_FRACTION
}

fn default_version() -> String {
    "1.0".to_string()
}

/// File-level wrapper (`scenario:` key)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// Wrapped document
    pub scenario: ScenarioDocument,
}

/// Complete scenario document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDocument {
    /// Identification and difficulty
    pub metadata: Metadata,
    /// Real-world attack the scenario is modelled on
    #[serde(default)]
    pub inspiration: Inspiration,
    /// Victim organization
    #[serde(default)]
    pub environment: Environment,
    /// Ground-truth attack narrative and kill chain
    pub attack_overview: AttackOverview,
    /// Alert that opens the exercise
    pub initial_alert: InitialAlert,
    /// Discoverable evidence
    pub evidence: EvidencePool,
    /// Points schedule
    pub scoring: ScoringRubric,
    /// Maximum number of investigation requests
    #[serde(default = "default_budget")]
    pub investigation_budget: u32,
}

/// Scenario metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Stable scenario identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Document version
    #[serde(default = "default_version")]
    pub version: String,
    /// Difficulty tier
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Free-form duration estimate ("45 minutes")
    #[serde(default)]
    pub estimated_duration: Option<String>,
    /// Short description
    #[serde(default)]
    pub description: String,
}

impl Metadata {
    /// `estimated_duration` as a duration
    ///
    /// Accepts a number followed by an optional unit (`45 minutes`, `1.5h`,
    /// `90 min`, `2 hours`); a bare number is minutes.
    #[must_use]
    pub fn expected_duration(&self) -> Option<chrono::Duration> {
        parse_duration_estimate(self.estimated_duration.as_deref()?)
    }
}

fn parse_duration_estimate(raw: &str) -> Option<chrono::Duration> {
    let raw = raw.trim().to_ascii_lowercase();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let value: f64 = number.parse().ok()?;
    let seconds_per_unit = match unit.trim() {
        "" | "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600.0,
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        _ => return None,
    };
    let seconds = value * seconds_per_unit;
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(chrono::Duration::seconds(seconds.round() as i64))
}

/// Difficulty tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Introductory
    #[serde(alias = "easy")]
    Beginner,
    /// Default tier
    #[default]
    #[serde(alias = "medium")]
    Intermediate,
    /// Experienced responders
    #[serde(alias = "hard")]
    Advanced,
    /// Expert
    Expert,
}

/// Historical attack inspiration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inspiration {
    /// Attack or campaign name
    #[serde(default)]
    pub attack_name: String,
    /// Year observed
    #[serde(default)]
    pub year: Option<u16>,
    /// Attributed actor, if any
    #[serde(default)]
    pub attribution: Option<String>,
    /// Public write-ups
    #[serde(default)]
    pub references: Vec<String>,
}

/// Victim environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Industry sector
    #[serde(default)]
    pub sector: String,
    /// Organization profile
    #[serde(default)]
    pub organization: Organization,
    /// Infrastructure profile
    #[serde(default)]
    pub infrastructure: Infrastructure,
}

/// Organization profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization name
    #[serde(default)]
    pub name: String,
    /// Size class
    #[serde(default)]
    pub size: String,
    /// Head count
    #[serde(default)]
    pub employee_count: Option<u32>,
}

/// Infrastructure profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Infrastructure {
    /// on-premises / cloud / hybrid
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Systems that matter to the business
    #[serde(default)]
    pub critical_systems: Vec<String>,
}

/// Attack overview with the canonical kill chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackOverview {
    /// Narrative summary
    #[serde(default)]
    pub summary: String,
    /// Phases in canonical attack order
    pub kill_chain: Vec<KillChainPhase>,
}

/// One phase of the kill chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillChainPhase {
    /// Phase identifier
    pub id: PhaseId,
    /// Display name ("Lateral Movement")
    #[serde(default)]
    pub name: String,
    /// Narrative description
    #[serde(default)]
    pub description: String,
    /// ATT&CK tactic IDs (`TA0008`)
    #[serde(default)]
    pub tactics: Vec<String>,
    /// ATT&CK technique IDs (`T1021.002`)
    #[serde(default)]
    pub techniques: Vec<String>,
    /// Evidence substantiating this phase
    #[serde(default)]
    pub evidence: Vec<EvidenceId>,
    /// Points override; rubric `phase_points` otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Low,
    /// Needs triage
    #[default]
    Medium,
    /// Likely incident
    High,
    /// Active incident
    Critical,
}

/// Opening alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialAlert {
    /// Alert kind (edr, siem, user-report, ...)
    #[serde(default)]
    pub alert_type: String,
    /// Severity
    #[serde(default)]
    pub severity: Severity,
    /// When the alert fired
    pub timestamp: String,
    /// Detecting system
    #[serde(default)]
    pub source: String,
    /// One-line title
    #[serde(default)]
    pub title: String,
    /// Narrative description
    pub description: String,
    /// Raw alert payload
    #[serde(default)]
    pub raw_data: String,
}

impl InitialAlert {
    /// Parse the timestamp (RFC 3339 or `YYYY-MM-DD HH:MM:SS`, taken as UTC)
    #[must_use]
    pub fn parsed_timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(ts.with_timezone(&chrono::Utc));
        }
        chrono::NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Evidence pool section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePool {
    /// Advisory herring fraction over a full session
    #[serde(default = "default_ratio")]
    pub red_herring_ratio: f64,
    /// All discoverable items
    pub items: Vec<EvidenceItem>,
}

/// A discoverable artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Unique identifier
    pub id: EvidenceId,
    /// Topic (`email`, `network`, `endpoint`, ...)
    pub category: String,
    /// Topic tags used for relevance matching
    #[serde(default)]
    pub tags: Vec<String>,
    /// Deliberately misleading item
    #[serde(default)]
    pub red_herring: bool,
    /// Phase this item substantiates; always `None` for herrings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<PhaseId>,
    /// Raw finding text (also the narrative fallback)
    pub finding: String,
    /// Phrases a narrator can weave into prose
    #[serde(default)]
    pub narrative_hooks: Vec<String>,
    /// Where the artifact came from ("Exchange message trace")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl EvidenceItem {
    /// True unless the item is a red herring
    #[inline]
    #[must_use]
    pub fn is_genuine(&self) -> bool {
        !self.red_herring
    }

    /// Linked phase, if any
    #[inline]
    #[must_use]
    pub fn linked_phase(&self) -> Option<&PhaseId> {
        self.phase.as_ref()
    }
}

/// Points schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringRubric {
    /// Points for each correctly identified phase
    pub phase_points: f64,
    /// All-or-nothing bonus for canonical ordering
    #[serde(default)]
    pub sequence_bonus: f64,
    /// Fraction of phase points for a correct but unsubstantiated phase
    #[serde(default = "default_fraction")]
    pub unsubstantiated_fraction: f64,
    /// Deduction per accused red herring
    #[serde(default)]
    pub herring_penalty: f64,
    /// Maximum attainable score
    pub max_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_accepts_aliases() {
        let d: Difficulty = serde_yaml::from_str("hard").unwrap();
        assert_eq!(d, Difficulty::Advanced);
        let d: Difficulty = serde_yaml::from_str("expert").unwrap();
        assert_eq!(d, Difficulty::Expert);
    }

    #[test]
    fn rubric_defaults_partial_credit_to_half() {
        let rubric: ScoringRubric =
            serde_yaml::from_str("phase_points: 10\nmax_score: 30\n").unwrap();
        assert_eq!(rubric.unsubstantiated_fraction, 0.5);
        assert_eq!(rubric.sequence_bonus, 0.0);
    }

    #[test]
    fn duration_estimates_parse() {
        let minutes = |raw: &str| parse_duration_estimate(raw).map(|d| d.num_minutes());
        assert_eq!(minutes("45 minutes"), Some(45));
        assert_eq!(minutes("90 min"), Some(90));
        assert_eq!(minutes("1.5h"), Some(90));
        assert_eq!(minutes("2 Hours"), Some(120));
        assert_eq!(minutes("30"), Some(30));
        assert_eq!(minutes("soon"), None);
        assert_eq!(minutes("0 minutes"), None);
        assert_eq!(minutes("3 days"), None);
    }

    #[test]
    fn alert_timestamp_formats() {
        let mut alert = InitialAlert {
            alert_type: "edr".into(),
            severity: Severity::High,
            timestamp: "2024-01-15 14:23:17".into(),
            source: "EDR".into(),
            title: String::new(),
            description: "beacon".into(),
            raw_data: String::new(),
        };
        assert!(alert.parsed_timestamp().is_some());

        alert.timestamp = "2024-01-15T14:23:17Z".into();
        assert!(alert.parsed_timestamp().is_some());

        alert.timestamp = "yesterday".into();
        assert!(alert.parsed_timestamp().is_none());
    }
}
