use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::GoalStatus;

const GREEN_ALLOCATION_RATIO: Decimal = dec!(0.8);
const YELLOW_ALLOCATION_RATIO: Decimal = dec!(0.5);
const GREEN_SUCCESS_PROBABILITY: Decimal = dec!(70);
const YELLOW_SUCCESS_PROBABILITY: Decimal = dec!(50);

/// Tri-state goal health from allocation ratio and simulated success.
///
/// Either signal alone is enough to lift a goal into a tier.
pub struct GoalStatusClassifier;

impl GoalStatusClassifier {
    pub fn classify(
        current_allocation: Decimal,
        required_pv: Decimal,
        success_probability: Option<Decimal>,
    ) -> GoalStatus {
        if required_pv.is_zero() {
            return GoalStatus::Green;
        }

        let allocation_ratio = current_allocation
            .checked_div(required_pv)
            .unwrap_or(Decimal::ZERO);
        let success_at_least =
            |threshold: Decimal| success_probability.is_some_and(|p| p >= threshold);

        if allocation_ratio >= GREEN_ALLOCATION_RATIO || success_at_least(GREEN_SUCCESS_PROBABILITY)
        {
            GoalStatus::Green
        } else if allocation_ratio >= YELLOW_ALLOCATION_RATIO
            || success_at_least(YELLOW_SUCCESS_PROBABILITY)
        {
            GoalStatus::Yellow
        } else {
            GoalStatus::Red
        }
    }
}
