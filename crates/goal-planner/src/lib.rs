//! goal-planner: household goal records and the service that evaluates
//! them with goal-engine.

pub mod error;
pub mod models;
pub mod planner;
pub mod store;
#[cfg(test)]
mod tests;

pub use error::{PlannerError, Result};
pub use models::*;
pub use planner::GoalPlanner;
pub use store::{GoalStore, InMemoryGoalStore};
