use goal_engine::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Goal not found: {0}")]
    GoalNotFound(i64),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error("Simulation task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
