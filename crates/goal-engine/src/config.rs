use std::time::Duration;

/// Tunables for simulation runs.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Trials for an authoritative goal simulation.
    pub default_trials: u32,
    /// Trials per profile for the comparative rescue scan.
    pub rescue_trials: u32,
    /// Paths kept for chart projections.
    pub projection_paths: u32,
    /// Trials per parallel batch; each batch owns one random stream.
    pub batch_size: usize,
    /// Fixed seed for reproducible runs. `None` seeds every run afresh.
    pub seed: Option<u64>,
    /// Per-run wall-clock budget.
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_trials: 5000,
            rescue_trials: 1000,
            projection_paths: 100,
            batch_size: 250,
            seed: None,
            timeout: None,
        }
    }
}

impl EngineConfig {
    /// Load from environment variables, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_trials: env_parse("GOAL_ENGINE_TRIALS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.default_trials),
            rescue_trials: env_parse("GOAL_ENGINE_RESCUE_TRIALS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.rescue_trials),
            projection_paths: env_parse("GOAL_ENGINE_PATHS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.projection_paths),
            batch_size: env_parse("GOAL_ENGINE_BATCH_SIZE")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.batch_size),
            seed: env_parse("GOAL_ENGINE_SEED"),
            timeout: env_parse::<u64>("GOAL_ENGINE_TIMEOUT_MS").map(Duration::from_millis),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_trials, 5000);
        assert_eq!(config.rescue_trials, 1000);
        assert_eq!(config.projection_paths, 100);
        assert!(config.seed.is_none());
        assert!(config.timeout.is_none());
    }
}
