//! Graded report types

use serde::{Deserialize, Serialize};
use std::fmt;
use ttx_scenario::{EvidenceId, PhaseId};

/// Verdict for one canonical phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseVerdict {
    /// Phase
    pub phase_id: PhaseId,
    /// Display name
    pub name: String,
    /// Claimed in the theory
    pub matched: bool,
    /// Backed by disclosed genuine evidence
    pub substantiated: bool,
    /// Disclosed evidence supporting the phase, in timeline order
    pub matched_evidence_ids: Vec<EvidenceId>,
    /// Points after scaling
    pub points_awarded: f64,
}

/// Deduction for citing a red herring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HerringPenalty {
    /// Cited herring
    pub evidence_id: EvidenceId,
    /// Points deducted
    pub points: f64,
}

/// Letter grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// 90 and above
    #[serde(rename = "A+")]
    APlus,
    /// 85
    A,
    /// 80
    #[serde(rename = "A-")]
    AMinus,
    /// 75
    #[serde(rename = "B+")]
    BPlus,
    /// 70
    B,
    /// 65
    #[serde(rename = "B-")]
    BMinus,
    /// 60
    #[serde(rename = "C+")]
    CPlus,
    /// 55
    C,
    /// 50
    #[serde(rename = "C-")]
    CMinus,
    /// 45
    #[serde(rename = "D+")]
    DPlus,
    /// 40
    D,
    /// Below 40
    F,
}

const GRADE_THRESHOLDS: &[(f64, Grade)] = &[
    (90.0, Grade::APlus),
    (85.0, Grade::A),
    (80.0, Grade::AMinus),
    (75.0, Grade::BPlus),
    (70.0, Grade::B),
    (65.0, Grade::BMinus),
    (60.0, Grade::CPlus),
    (55.0, Grade::C),
    (50.0, Grade::CMinus),
    (45.0, Grade::DPlus),
    (40.0, Grade::D),
];

impl Grade {
    /// Grade for a percentage of the maximum score
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        GRADE_THRESHOLDS
            .iter()
            .find(|(min, _)| percentage >= *min)
            .map_or(Self::F, |(_, grade)| *grade)
    }

    /// Display label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::DPlus => "D+",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pace of the investigation against the scenario's estimated duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyRating {
    /// At most 70 % of the estimate
    Excellent,
    /// At most 90 %
    VeryGood,
    /// At most 110 %
    Good,
    /// At most 130 %
    Average,
    /// At most 150 %
    BelowAverage,
    /// Over 150 %
    NeedsImprovement,
    /// No estimate or nothing disclosed yet
    Unknown,
}

const EFFICIENCY_BANDS: &[(f64, EfficiencyRating)] = &[
    (0.7, EfficiencyRating::Excellent),
    (0.9, EfficiencyRating::VeryGood),
    (1.1, EfficiencyRating::Good),
    (1.3, EfficiencyRating::Average),
    (1.5, EfficiencyRating::BelowAverage),
];

impl EfficiencyRating {
    /// Rating for `elapsed / expected`
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Self::Unknown;
        }
        EFFICIENCY_BANDS
            .iter()
            .find(|(max, _)| ratio <= *max)
            .map_or(Self::NeedsImprovement, |(_, rating)| *rating)
    }

    /// Display label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::VeryGood => "Very Good",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::BelowAverage => "Below Average",
            Self::NeedsImprovement => "Needs Improvement",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for EfficiencyRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the session was played; informational only, never part of the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestigationMetrics {
    /// Investigations spent
    pub budget_used: u32,
    /// Budget at session start
    pub budget_total: u32,
    /// Red herrings among the disclosures
    pub herrings_disclosed: usize,
    /// Genuine items disclosed
    pub genuine_disclosed: usize,
    /// Genuine items in the pool
    pub genuine_total: usize,
    /// `genuine_disclosed / genuine_total`, rounded to two decimals
    pub genuine_coverage: f64,
    /// Phases with disclosed evidence
    pub phases_discovered: usize,
    /// Seconds from session start to the last disclosure
    pub elapsed_secs: Option<i64>,
    /// Scenario estimate in seconds
    pub expected_secs: Option<i64>,
    /// Elapsed time against the estimate
    pub efficiency: EfficiencyRating,
}

/// Result of grading one theory
///
/// Contains no timestamps: grading the same inputs twice yields equal reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedReport {
    /// Graded session
    pub session_id: String,
    /// Scenario graded against
    pub scenario_id: String,
    /// One verdict per canonical phase, in canonical order
    pub verdicts: Vec<PhaseVerdict>,
    /// Sequence bonus granted
    pub sequence_bonus_awarded: bool,
    /// Bonus points after scaling
    pub sequence_points: f64,
    /// Per-herring deductions
    pub herring_penalties: Vec<HerringPenalty>,
    /// Claimed phases that do not exist
    pub unknown_phases: Vec<PhaseId>,
    /// Cited evidence that does not exist
    pub unknown_evidence: Vec<EvidenceId>,
    /// Final score in `[0, max_score]`
    pub total_score: f64,
    /// Maximum attainable score
    pub max_score: f64,
    /// `total_score` as a percentage of `max_score`
    pub percentage: f64,
    /// Letter grade
    pub grade: Grade,
    /// One-paragraph summary
    pub summary: String,
    /// What went well
    pub strengths: Vec<String>,
    /// What to work on
    pub improvements: Vec<String>,
    /// Budget, herring, coverage and pace breakdown
    pub metrics: InvestigationMetrics,
}

impl GradedReport {
    /// Phases claimed correctly
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.matched).count()
    }

    /// Pretty JSON export
    ///
    /// # Errors
    /// Propagates serializer failures
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_thresholds() {
        assert_eq!(Grade::from_percentage(100.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(90.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(89.99), Grade::A);
        assert_eq!(Grade::from_percentage(62.0), Grade::CPlus);
        assert_eq!(Grade::from_percentage(40.0), Grade::D);
        assert_eq!(Grade::from_percentage(12.5), Grade::F);
        assert_eq!(Grade::from_percentage(0.0), Grade::F);
    }

    #[test]
    fn efficiency_bands() {
        assert_eq!(EfficiencyRating::from_ratio(0.5), EfficiencyRating::Excellent);
        assert_eq!(EfficiencyRating::from_ratio(0.7), EfficiencyRating::Excellent);
        assert_eq!(EfficiencyRating::from_ratio(0.85), EfficiencyRating::VeryGood);
        assert_eq!(EfficiencyRating::from_ratio(1.0), EfficiencyRating::Good);
        assert_eq!(EfficiencyRating::from_ratio(1.25), EfficiencyRating::Average);
        assert_eq!(EfficiencyRating::from_ratio(1.5), EfficiencyRating::BelowAverage);
        assert_eq!(EfficiencyRating::from_ratio(3.0), EfficiencyRating::NeedsImprovement);
        assert_eq!(EfficiencyRating::from_ratio(0.0), EfficiencyRating::Unknown);
        assert_eq!(EfficiencyRating::from_ratio(f64::NAN), EfficiencyRating::Unknown);
        assert_eq!(EfficiencyRating::VeryGood.to_string(), "Very Good");
    }

    #[test]
    fn grade_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Grade::BMinus).unwrap(), "\"B-\"");
        assert_eq!(Grade::AMinus.to_string(), "A-");
    }
}
