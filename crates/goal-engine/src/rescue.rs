use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::models::{GoalMetrics, GoalParameters, GoalStatus, SimulationRequest};
use crate::projection::{RunOptions, StochasticProjector};
use crate::time_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// A fixed risk/return profile offered as a remediation option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyProfile {
    pub name: &'static str,
    pub risk_level: RiskLevel,
    pub annual_return: Decimal,
    pub annual_volatility: Decimal,
    pub description: &'static str,
}

pub const STRATEGY_PROFILES: [StrategyProfile; 3] = [
    StrategyProfile {
        name: "Safe Strategy",
        risk_level: RiskLevel::Low,
        annual_return: dec!(0.08),
        annual_volatility: dec!(0.06),
        description: "Focus on debt funds and fixed deposits with lower volatility",
    },
    StrategyProfile {
        name: "Balanced Strategy",
        risk_level: RiskLevel::Medium,
        annual_return: dec!(0.10),
        annual_volatility: dec!(0.10),
        description: "Mix of equity and debt funds with moderate risk",
    },
    StrategyProfile {
        name: "Aggressive Strategy",
        risk_level: RiskLevel::High,
        annual_return: dec!(0.14),
        annual_volatility: dec!(0.18),
        description: "Focus on equity funds and growth stocks with higher potential",
    },
];

/// One evaluated remediation option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescueStrategy {
    pub strategy_name: String,
    pub risk_level: RiskLevel,
    pub annual_return: Decimal,
    pub annual_volatility: Decimal,
    pub required_monthly_contribution: Decimal,
    pub success_probability: Decimal,
    pub description: String,
}

/// Compares the fixed strategy profiles for a goal that is not on track.
#[derive(Debug, Clone)]
pub struct RescueStrategyGenerator {
    projector: StochasticProjector,
    trials: u32,
    profiles: Vec<StrategyProfile>,
}

impl Default for RescueStrategyGenerator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl RescueStrategyGenerator {
    pub fn new(projector: StochasticProjector, trials: u32) -> Self {
        Self {
            projector,
            trials,
            profiles: STRATEGY_PROFILES.to_vec(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(StochasticProjector::from_config(config), config.rescue_trials)
    }

    pub fn with_profiles(mut self, profiles: Vec<StrategyProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn profiles(&self) -> &[StrategyProfile] {
        &self.profiles
    }

    /// Evaluate every profile in order. Green goals need no rescue.
    pub fn generate(
        &self,
        params: &GoalParameters,
        metrics: &GoalMetrics,
        options: &RunOptions,
    ) -> Result<Vec<RescueStrategy>> {
        if metrics.status == GoalStatus::Green {
            return Ok(Vec::new());
        }

        let base_seed = options.resolve_seed();
        self.profiles
            .iter()
            .enumerate()
            .map(|(index, profile)| -> Result<RescueStrategy> {
                let contribution = time_value::required_monthly_contribution(
                    metrics.shortfall,
                    profile.annual_return,
                    params.years_until_due,
                )?;

                let request = SimulationRequest {
                    current_allocation: metrics.current_allocation,
                    target_amount: params.target_amount,
                    years: params.years_until_due,
                    annual_return: profile.annual_return,
                    annual_volatility: profile.annual_volatility,
                    monthly_contribution: contribution,
                };
                let seed = profile_seed(base_seed, index);
                let simulation =
                    self.projector
                        .simulate(&request, self.trials, &options.reseeded(seed))?;

                debug!(
                    strategy = profile.name,
                    contribution = %contribution,
                    success_probability = %simulation.success_probability,
                    "Evaluated rescue strategy"
                );

                Ok(RescueStrategy {
                    strategy_name: profile.name.to_string(),
                    risk_level: profile.risk_level,
                    annual_return: profile.annual_return,
                    annual_volatility: profile.annual_volatility,
                    required_monthly_contribution: contribution,
                    success_probability: simulation.success_probability,
                    description: profile.description.to_string(),
                })
            })
            .collect()
    }
}

/// Distinct, reproducible seed per profile.
fn profile_seed(base: u64, index: usize) -> u64 {
    base.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
