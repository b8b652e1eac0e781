use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{AllocationSnapshot, GoalMetrics, GoalParameters};
use crate::status::GoalStatusClassifier;
use crate::time_value;

/// Per-goal metrics from the goal's parameters and its current allocation.
///
/// Pure: never runs a simulation and never fetches allocation data. The
/// success probability is whatever the caller last recorded, if anything.
pub struct GoalMetricsAggregator;

impl GoalMetricsAggregator {
    pub fn compute(
        params: &GoalParameters,
        snapshot: &AllocationSnapshot,
        latest_success_probability: Option<Decimal>,
    ) -> Result<GoalMetrics> {
        params.validate()?;
        let current_allocation = snapshot.current_allocation.max(Decimal::ZERO);

        let present_value = time_value::present_value(
            params.target_amount,
            params.expected_return,
            params.years_until_due,
        )?;

        let shortfall = (present_value - current_allocation).max(Decimal::ZERO);

        let required_monthly_contribution = if shortfall > Decimal::ZERO {
            time_value::required_monthly_contribution(
                shortfall,
                params.expected_return,
                params.years_until_due,
            )?
        } else {
            Decimal::ZERO
        };

        let status = GoalStatusClassifier::classify(
            current_allocation,
            present_value,
            latest_success_probability,
        );

        Ok(GoalMetrics {
            present_value: present_value.round_dp(2),
            current_allocation: current_allocation.round_dp(2),
            shortfall: shortfall.round_dp(2),
            required_monthly_contribution,
            status,
            success_probability: latest_success_probability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GoalStatus;
    use rust_decimal_macros::dec;

    fn snapshot(amount: Decimal) -> AllocationSnapshot {
        AllocationSnapshot::new(amount).unwrap()
    }

    #[test]
    fn test_unfunded_goal() {
        let params = GoalParameters::new(dec!(1000000), 10);
        let metrics = GoalMetricsAggregator::compute(&params, &snapshot(dec!(0)), None).unwrap();
        assert_eq!(metrics.present_value, dec!(385543.29));
        assert_eq!(metrics.shortfall, dec!(385543.29));
        assert_eq!(metrics.required_monthly_contribution, dec!(1882.12));
        assert_eq!(metrics.status, GoalStatus::Red);
        assert_eq!(metrics.success_probability, None);
    }

    #[test]
    fn test_partially_funded_goal_is_yellow() {
        let params = GoalParameters::new(dec!(1000000), 10);
        let metrics =
            GoalMetricsAggregator::compute(&params, &snapshot(dec!(200000)), None).unwrap();
        assert_eq!(metrics.shortfall, dec!(185543.29));
        assert!(metrics.required_monthly_contribution > Decimal::ZERO);
        assert_eq!(metrics.status, GoalStatus::Yellow);
    }

    #[test]
    fn test_overfunded_goal_has_no_shortfall() {
        let params = GoalParameters::new(dec!(100000), 5);
        let metrics =
            GoalMetricsAggregator::compute(&params, &snapshot(dec!(90000)), None).unwrap();
        assert_eq!(metrics.shortfall, Decimal::ZERO);
        assert_eq!(metrics.required_monthly_contribution, Decimal::ZERO);
        assert_eq!(metrics.status, GoalStatus::Green);
    }

    #[test]
    fn test_due_goal_needs_full_target() {
        let params = GoalParameters::new(dec!(50000), 0);
        let metrics =
            GoalMetricsAggregator::compute(&params, &snapshot(dec!(10000)), None).unwrap();
        assert_eq!(metrics.present_value, dec!(50000));
        assert_eq!(metrics.shortfall, dec!(40000));
        assert_eq!(metrics.required_monthly_contribution, Decimal::ZERO);
        assert_eq!(metrics.status, GoalStatus::Red);
    }

    #[test]
    fn test_recorded_probability_feeds_status() {
        let params = GoalParameters::new(dec!(1000000), 10);
        let metrics =
            GoalMetricsAggregator::compute(&params, &snapshot(dec!(0)), Some(dec!(72.4)))
                .unwrap();
        assert_eq!(metrics.status, GoalStatus::Green);
        assert_eq!(metrics.success_probability, Some(dec!(72.4)));
    }

    #[test]
    fn test_invalid_goal_is_rejected() {
        let params = GoalParameters::new(dec!(-1), 10);
        assert!(GoalMetricsAggregator::compute(&params, &snapshot(dec!(0)), None).is_err());
    }
}
