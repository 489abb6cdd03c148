//! Red-herring pacing
//!
//! The herring ratio is a soft, session-wide target. At session start a
//! [`PacingPlan`] fixes how many of the planned disclosures should be
//! herrings; before each disclosure [`decide`] turns the running count into
//! one of three constraints for the selector.
//!
//! Rules, first match wins:
//! - no genuine item left: herring
//! - no herring left, or first disclosure: genuine
//! - remaining quota fills every remaining slot: herring
//! - quota met: genuine
//! - running count below the expected band: herring
//! - running count would exceed the band: genuine
//! - otherwise free (best relevance match)
//!
//! When every planned disclosure happens the quota is met exactly.

use serde::{Deserialize, Serialize};
use ttx_scenario::ScenarioModel;

/// Herring quota for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingPlan {
    /// Disclosures the session can make (`min(budget, pool)`)
    pub planned: u32,
    /// Herrings among them
    pub herring_quota: u32,
}

impl PacingPlan {
    /// Plan from pool composition and target ratio
    ///
    /// The quota is `round(ratio * planned)`, clamped so the plan is always
    /// feasible and leaves at least one genuine slot for the first disclosure.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn new(budget: u32, genuine: u32, herrings: u32, ratio: f64) -> Self {
        let planned = budget.min(genuine + herrings);
        if planned == 0 {
            return Self {
                planned,
                herring_quota: 0,
            };
        }
        let target = (ratio.clamp(0.0, 1.0) * f64::from(planned)).round() as u32;
        let floor = planned.saturating_sub(genuine);
        let ceiling = herrings.min(planned - 1).max(floor);
        Self {
            planned,
            herring_quota: target.clamp(floor, ceiling),
        }
    }

    /// Plan for a scenario
    #[must_use]
    pub fn for_scenario(scenario: &ScenarioModel) -> Self {
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        Self::new(
            scenario.investigation_budget(),
            count(scenario.genuine_count()),
            count(scenario.herring_count()),
            scenario.red_herring_ratio(),
        )
    }

    /// Ratio the plan converges to
    #[must_use]
    pub fn planned_ratio(&self) -> f64 {
        if self.planned == 0 {
            0.0
        } else {
            f64::from(self.herring_quota) / f64::from(self.planned)
        }
    }
}

/// Running counts before a disclosure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingInput {
    /// Disclosures made so far
    pub disclosed: u32,
    /// Herrings among them
    pub herrings_disclosed: u32,
    /// Undisclosed genuine items
    pub genuine_left: u32,
    /// Undisclosed herrings
    pub herrings_left: u32,
}

/// Constraint on the next disclosure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingDecision {
    /// Must be genuine
    Genuine(PacingReason),
    /// Must be a herring
    Herring(PacingReason),
    /// Best match wins
    Free,
}

/// Why a constraint applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingReason {
    /// Only one kind left in the pool
    PoolExhausted,
    /// First disclosure of the session
    FirstDisclosure,
    /// Remaining slots all needed for the quota
    QuotaDue,
    /// Quota already met
    QuotaMet,
    /// Running count below the band
    BelowBand,
    /// Running count above the band
    AboveBand,
}

/// Constraint for the next disclosure
#[must_use]
pub fn decide(plan: &PacingPlan, input: PacingInput, slack: f64) -> PacingDecision {
    use PacingDecision::{Free, Genuine, Herring};
    use PacingReason::*;

    if input.genuine_left == 0 {
        return Herring(PoolExhausted);
    }
    if input.herrings_left == 0 {
        return Genuine(PoolExhausted);
    }
    if input.disclosed == 0 {
        return Genuine(FirstDisclosure);
    }

    let remaining = i64::from(plan.planned) - i64::from(input.disclosed);
    let need = i64::from(plan.herring_quota) - i64::from(input.herrings_disclosed);
    if remaining > 0 && need >= remaining {
        return Herring(QuotaDue);
    }
    if need <= 0 {
        return Genuine(QuotaMet);
    }

    let expected = plan.planned_ratio() * f64::from(input.disclosed + 1);
    let herrings = f64::from(input.herrings_disclosed);
    if herrings < expected - slack {
        Herring(BelowBand)
    } else if herrings + 1.0 > expected + slack {
        Genuine(AboveBand)
    } else {
        Free
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(disclosed: u32, herrings: u32, genuine_left: u32, herrings_left: u32) -> PacingInput {
        PacingInput {
            disclosed,
            herrings_disclosed: herrings,
            genuine_left,
            herrings_left,
        }
    }

    #[test]
    fn quota_rounds_and_clamps() {
        assert_eq!(PacingPlan::new(20, 12, 4, 0.25).herring_quota, 4);
        assert_eq!(PacingPlan::new(20, 12, 4, 0.25).planned, 16);
        // round(0.75) = 1
        assert_eq!(PacingPlan::new(3, 2, 1, 0.25).herring_quota, 1);
        // pool forces at least budget - genuine herrings
        assert_eq!(PacingPlan::new(5, 2, 3, 0.0).herring_quota, 3);
        // never every slot
        assert_eq!(PacingPlan::new(4, 4, 4, 1.0).herring_quota, 3);
        // not more herrings than exist
        assert_eq!(PacingPlan::new(10, 10, 1, 0.5).herring_quota, 1);
    }

    #[test]
    fn first_disclosure_is_genuine() {
        let plan = PacingPlan::new(3, 2, 1, 0.9);
        assert_eq!(
            decide(&plan, input(0, 0, 2, 1), 1.0),
            PacingDecision::Genuine(PacingReason::FirstDisclosure)
        );
    }

    #[test]
    fn quota_due_forces_herring() {
        let plan = PacingPlan::new(4, 3, 2, 0.5);
        assert_eq!(plan.herring_quota, 2);
        assert_eq!(
            decide(&plan, input(2, 0, 1, 2), 1.0),
            PacingDecision::Herring(PacingReason::QuotaDue)
        );
    }

    #[test]
    fn quota_met_forces_genuine() {
        let plan = PacingPlan::new(16, 12, 4, 0.25);
        assert_eq!(
            decide(&plan, input(6, 4, 8, 0), 1.0),
            PacingDecision::Genuine(PacingReason::PoolExhausted)
        );
        let plan = PacingPlan::new(8, 12, 4, 0.25);
        assert_eq!(
            decide(&plan, input(3, 2, 11, 2), 1.0),
            PacingDecision::Genuine(PacingReason::QuotaMet)
        );
    }

    #[test]
    fn band_steers_running_count() {
        let plan = PacingPlan::new(16, 12, 4, 0.25);
        // expected after 9 = 2.25, nothing yet
        assert_eq!(
            decide(&plan, input(8, 0, 4, 4), 1.0),
            PacingDecision::Herring(PacingReason::BelowBand)
        );
        // expected after 2 = 0.5, one already
        assert_eq!(
            decide(&plan, input(1, 1, 12, 3), 0.25),
            PacingDecision::Genuine(PacingReason::AboveBand)
        );
        assert_eq!(decide(&plan, input(3, 0, 9, 4), 1.0), PacingDecision::Free);
    }

    #[test]
    fn following_decisions_meets_quota_exactly() {
        for (budget, genuine, herrings, ratio) in
            [(20, 12, 4, 0.25), (10, 7, 5, 0.3), (3, 2, 1, 0.25), (12, 9, 9, 0.4)]
        {
            let plan = PacingPlan::new(budget, genuine, herrings, ratio);
            let mut state = input(0, 0, genuine, herrings);
            while state.disclosed < plan.planned {
                // Free picks genuine here; the band and quota must still converge
                let herring = matches!(decide(&plan, state, 1.0), PacingDecision::Herring(_));
                state.disclosed += 1;
                if herring {
                    state.herrings_disclosed += 1;
                    state.herrings_left -= 1;
                } else {
                    state.genuine_left -= 1;
                }
            }
            assert_eq!(state.herrings_disclosed, plan.herring_quota);
        }
    }
}
