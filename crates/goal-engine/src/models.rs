use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Annual return assumed when a goal carries none (10%).
pub const DEFAULT_EXPECTED_RETURN: Decimal = dec!(0.10);

/// Annual volatility assumed when a goal carries none (12%).
pub const DEFAULT_VOLATILITY: Decimal = dec!(0.12);

fn default_expected_return() -> Decimal {
    DEFAULT_EXPECTED_RETURN
}

fn default_volatility() -> Decimal {
    DEFAULT_VOLATILITY
}

/// Immutable inputs describing a single goal.
///
/// Rates are decimal fractions (`0.10` = 10% a year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalParameters {
    pub target_amount: Decimal,
    pub years_until_due: i32,
    #[serde(default = "default_expected_return")]
    pub expected_return: Decimal,
    #[serde(default = "default_volatility")]
    pub volatility: Decimal,
}

impl GoalParameters {
    /// Goal with the default return and volatility assumptions.
    pub fn new(target_amount: Decimal, years_until_due: i32) -> Self {
        Self {
            target_amount,
            years_until_due,
            expected_return: DEFAULT_EXPECTED_RETURN,
            volatility: DEFAULT_VOLATILITY,
        }
    }

    pub fn with_expected_return(mut self, expected_return: Decimal) -> Self {
        self.expected_return = expected_return;
        self
    }

    pub fn with_volatility(mut self, volatility: Decimal) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_amount <= Decimal::ZERO {
            return Err(EngineError::InvalidArgument(format!(
                "target_amount must be positive, got {}",
                self.target_amount
            )));
        }
        if self.expected_return <= Decimal::NEGATIVE_ONE {
            return Err(EngineError::InvalidArgument(format!(
                "expected_return must be greater than -1, got {}",
                self.expected_return
            )));
        }
        if self.volatility < Decimal::ZERO {
            return Err(EngineError::InvalidArgument(format!(
                "volatility must be non-negative, got {}",
                self.volatility
            )));
        }
        Ok(())
    }
}

/// One holding mapped to a goal. Missing values count as zero, a missing
/// allocation percentage as 100%.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub current_value: Option<Decimal>,
    pub allocation_percentage: Option<Decimal>,
}

impl Holding {
    pub fn allocated_value(&self) -> Result<Decimal> {
        let value = self.current_value.unwrap_or(Decimal::ZERO);
        let pct = self.allocation_percentage.unwrap_or(Decimal::ONE_HUNDRED);
        value
            .checked_mul(pct / Decimal::ONE_HUNDRED)
            .ok_or_else(|| {
                EngineError::Overflow(format!("holding value {value} at {pct}% allocation"))
            })
    }
}

/// Present value of the holdings attributed to a goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationSnapshot {
    pub current_allocation: Decimal,
}

impl AllocationSnapshot {
    pub fn new(current_allocation: Decimal) -> Result<Self> {
        if current_allocation < Decimal::ZERO {
            return Err(EngineError::InvalidArgument(format!(
                "current_allocation must be non-negative, got {current_allocation}"
            )));
        }
        Ok(Self { current_allocation })
    }

    /// Sum of the weighted holdings. Same non-negativity rule as [`Self::new`].
    pub fn from_holdings<'a, I>(holdings: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Holding>,
    {
        let total = holdings
            .into_iter()
            .try_fold(Decimal::ZERO, |total, holding| {
                let value = holding.allocated_value()?;
                total
                    .checked_add(value)
                    .ok_or_else(|| EngineError::Overflow("allocation total".to_string()))
            })?;
        Self::new(total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Green,
    Yellow,
    Red,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Green => "green",
            GoalStatus::Yellow => "yellow",
            GoalStatus::Red => "red",
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic health figures for one goal, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalMetrics {
    pub present_value: Decimal,
    pub current_allocation: Decimal,
    pub shortfall: Decimal,
    pub required_monthly_contribution: Decimal,
    pub status: GoalStatus,
    /// Carried over from the latest simulation, if one was ever run.
    pub success_probability: Option<Decimal>,
}

/// Outcome distribution summary of one Monte Carlo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub median_outcome: Decimal,
    /// 10th percentile.
    pub worst_case: Decimal,
    /// 90th percentile.
    pub best_case: Decimal,
    /// Percentage (0-100) of trials ending at or above the target.
    pub success_probability: Decimal,
    pub num_trials: u32,
}

/// Month-indexed percentile paths for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPaths {
    pub median_path: Vec<Decimal>,
    pub worst_path: Vec<Decimal>,
    pub best_path: Vec<Decimal>,
    pub required_path: Vec<Decimal>,
}

impl ProjectionPaths {
    pub fn len(&self) -> usize {
        self.median_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.median_path.is_empty()
    }
}

/// Parameters of a single stochastic projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub current_allocation: Decimal,
    pub target_amount: Decimal,
    pub years: i32,
    pub annual_return: Decimal,
    pub annual_volatility: Decimal,
    pub monthly_contribution: Decimal,
}

impl SimulationRequest {
    /// Projection of a goal at its own return/volatility assumptions.
    pub fn for_goal(
        params: &GoalParameters,
        current_allocation: Decimal,
        monthly_contribution: Decimal,
    ) -> Self {
        Self {
            current_allocation,
            target_amount: params.target_amount,
            years: params.years_until_due,
            annual_return: params.expected_return,
            annual_volatility: params.volatility,
            monthly_contribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_parameters_defaults() {
        let params = GoalParameters::new(dec!(500000), 5);
        assert_eq!(params.expected_return, dec!(0.10));
        assert_eq!(params.volatility, dec!(0.12));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_goal_parameters_deserialize_defaults() {
        let params: GoalParameters =
            serde_json::from_str(r#"{"target_amount": 250000.0, "years_until_due": 8}"#).unwrap();
        assert_eq!(params.target_amount, dec!(250000));
        assert_eq!(params.expected_return, DEFAULT_EXPECTED_RETURN);
        assert_eq!(params.volatility, DEFAULT_VOLATILITY);
    }

    #[test]
    fn test_goal_parameters_rejects_bad_inputs() {
        assert!(GoalParameters::new(dec!(0), 5).validate().is_err());
        assert!(GoalParameters::new(dec!(-10), 5).validate().is_err());
        assert!(GoalParameters::new(dec!(100), 5)
            .with_expected_return(dec!(-1))
            .validate()
            .is_err());
        assert!(GoalParameters::new(dec!(100), 5)
            .with_volatility(dec!(-0.01))
            .validate()
            .is_err());
    }

    #[test]
    fn test_snapshot_from_holdings() {
        let holdings = vec![
            Holding {
                current_value: Some(dec!(10000)),
                allocation_percentage: None,
            },
            Holding {
                current_value: Some(dec!(20000)),
                allocation_percentage: Some(dec!(25)),
            },
            Holding {
                current_value: None,
                allocation_percentage: Some(dec!(50)),
            },
        ];
        let snapshot = AllocationSnapshot::from_holdings(&holdings).unwrap();
        assert_eq!(snapshot.current_allocation, dec!(15000));
    }

    #[test]
    fn test_snapshot_from_huge_holding_overflows() {
        let half = [Holding {
            current_value: Some(Decimal::MAX),
            allocation_percentage: Some(dec!(50)),
        }];
        assert!(AllocationSnapshot::from_holdings(&half).unwrap().current_allocation > Decimal::ZERO);

        let holdings = [Holding {
            current_value: Some(Decimal::MAX),
            allocation_percentage: Some(dec!(150)),
        }];
        assert!(matches!(
            AllocationSnapshot::from_holdings(&holdings),
            Err(EngineError::Overflow(_))
        ));

        let holdings = [
            Holding {
                current_value: Some(Decimal::MAX),
                allocation_percentage: None,
            },
            Holding {
                current_value: Some(Decimal::MAX),
                allocation_percentage: None,
            },
        ];
        assert!(matches!(
            AllocationSnapshot::from_holdings(&holdings),
            Err(EngineError::Overflow(_))
        ));
    }

    #[test]
    fn test_snapshot_from_holdings_rejects_negative_total() {
        let holdings = [
            Holding {
                current_value: Some(dec!(1000)),
                allocation_percentage: None,
            },
            Holding {
                current_value: Some(dec!(-3000)),
                allocation_percentage: Some(dec!(50)),
            },
        ];
        assert!(matches!(
            AllocationSnapshot::from_holdings(&holdings),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_snapshot_rejects_negative() {
        assert!(AllocationSnapshot::new(dec!(-1)).is_err());
        assert_eq!(
            AllocationSnapshot::new(dec!(0)).unwrap().current_allocation,
            Decimal::ZERO
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&GoalStatus::Yellow).unwrap();
        assert_eq!(json, "\"yellow\"");
        assert_eq!(GoalStatus::Red.to_string(), "red");
    }
}
