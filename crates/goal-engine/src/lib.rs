//! goal-engine: goal metrics and stochastic projection for household
//! financial goals.
//!
//! Converts a goal's target, horizon and return assumptions plus the capital
//! currently allocated to it into present-value figures, a health status,
//! Monte Carlo outcome estimates and a ranked set of rescue strategies.

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod projection;
pub mod rescue;
pub mod status;
pub mod time_value;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use metrics::GoalMetricsAggregator;
pub use models::*;
pub use projection::{CancellationToken, RunOptions, StochasticProjector};
pub use rescue::{RescueStrategy, RescueStrategyGenerator, RiskLevel, StrategyProfile, STRATEGY_PROFILES};
pub use status::GoalStatusClassifier;
