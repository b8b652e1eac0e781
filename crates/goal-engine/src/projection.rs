//! Monte Carlo projection of a goal's future value.
//!
//! Each trial starts from the current allocation and, month by month, adds
//! the contribution and then compounds by a normally distributed monthly
//! return. Trials are split into fixed-size batches that run on rayon; every
//! batch draws from its own ChaCha stream derived from the run seed, so a
//! fixed seed reproduces the same outcomes regardless of scheduling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::distributions::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rust_decimal::prelude::*;
use statrs::distribution::Normal;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{ProjectionPaths, SimulationRequest, SimulationResult};
use crate::time_value::MONTHS_PER_YEAR;

pub const WORST_CASE_PERCENTILE: f64 = 10.0;
pub const MEDIAN_PERCENTILE: f64 = 50.0;
pub const BEST_CASE_PERCENTILE: f64 = 90.0;

/// Shared flag used to abandon a running simulation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-run controls: seed, cancellation and deadline.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub seed: Option<u64>,
    pub cancel: Option<CancellationToken>,
    pub deadline: Option<Instant>,
}

impl RunOptions {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Options derived from engine config; the timeout starts now.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut options = Self {
            seed: config.seed,
            ..Self::default()
        };
        if let Some(timeout) = config.timeout {
            options = options.with_timeout(timeout);
        }
        options
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Same controls with a different seed.
    pub fn reseeded(&self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self.clone()
        }
    }

    fn check(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(EngineError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(EngineError::DeadlineExceeded);
        }
        Ok(())
    }

    pub(crate) fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| rand::thread_rng().gen())
    }
}

enum MonthlyReturn {
    Fixed(f64),
    Normal(Normal),
}

impl MonthlyReturn {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            MonthlyReturn::Fixed(rate) => *rate,
            MonthlyReturn::Normal(normal) => normal.sample(rng),
        }
    }
}

/// The contribute-then-compound process of one goal.
struct MonthlyProcess {
    start: f64,
    contribution: f64,
    months: usize,
    returns: MonthlyReturn,
}

impl MonthlyProcess {
    fn from_request(request: &SimulationRequest) -> Result<Self> {
        let annual_return = to_f64(request.annual_return, "annual_return")?;
        let annual_volatility = to_f64(request.annual_volatility, "annual_volatility")?;
        let months_per_year = f64::from(MONTHS_PER_YEAR);

        let mean = annual_return / months_per_year;
        // Independent monthly increments: deviation scales with sqrt(time).
        let std_dev = annual_volatility / months_per_year.sqrt();
        let returns = if std_dev == 0.0 {
            MonthlyReturn::Fixed(mean)
        } else {
            MonthlyReturn::Normal(Normal::new(mean, std_dev).map_err(|e| {
                EngineError::InvalidArgument(format!("monthly return distribution: {e}"))
            })?)
        };

        Ok(Self {
            start: to_f64(request.current_allocation, "current_allocation")?,
            contribution: to_f64(request.monthly_contribution, "monthly_contribution")?,
            months: request.years.max(0) as usize * MONTHS_PER_YEAR as usize,
            returns,
        })
    }

    fn run<R: Rng + ?Sized>(&self, rng: &mut R, mut observe: impl FnMut(f64)) -> f64 {
        let mut value = self.start;
        for _ in 0..self.months {
            value += self.contribution;
            value *= 1.0 + self.returns.sample(rng);
            observe(value);
        }
        value
    }
}

/// Monte Carlo engine for goal outcomes.
#[derive(Debug, Clone)]
pub struct StochasticProjector {
    batch_size: usize,
}

impl Default for StochasticProjector {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl StochasticProjector {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.batch_size)
    }

    /// Simulate `num_trials` independent paths and summarise the final values.
    pub fn simulate(
        &self,
        request: &SimulationRequest,
        num_trials: u32,
        options: &RunOptions,
    ) -> Result<SimulationResult> {
        if num_trials == 0 {
            return Err(EngineError::InvalidArgument(
                "num_trials must be at least 1".to_string(),
            ));
        }
        validate_request(request)?;

        if request.years <= 0 {
            let reached = request.current_allocation >= request.target_amount;
            return Ok(SimulationResult {
                median_outcome: request.current_allocation,
                worst_case: request.current_allocation,
                best_case: request.current_allocation,
                success_probability: if reached {
                    Decimal::ONE_HUNDRED
                } else {
                    Decimal::ZERO
                },
                num_trials,
            });
        }

        let process = MonthlyProcess::from_request(request)?;
        let target = to_f64(request.target_amount, "target_amount")?;
        let seed = options.resolve_seed();
        let started = Instant::now();
        debug!(
            num_trials,
            months = process.months,
            seed,
            "Starting goal simulation"
        );

        let mut outcomes = self
            .run_batches(num_trials as usize, seed, options, |rng| {
                process.run(rng, |_| {})
            })
            .inspect_err(|e| warn!("Goal simulation aborted: {e}"))?;

        let successes = outcomes.iter().filter(|&&value| value >= target).count();
        outcomes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let result = SimulationResult {
            median_outcome: to_money(percentile(&outcomes, MEDIAN_PERCENTILE))?,
            worst_case: to_money(percentile(&outcomes, WORST_CASE_PERCENTILE))?,
            best_case: to_money(percentile(&outcomes, BEST_CASE_PERCENTILE))?,
            success_probability: (Decimal::from(successes) * Decimal::ONE_HUNDRED
                / Decimal::from(num_trials))
            .round_dp(2),
            num_trials,
        };

        info!(
            num_trials,
            success_probability = %result.success_probability,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Goal simulation complete"
        );
        Ok(result)
    }

    /// Keep every trial's trajectory and reduce to percentile paths per month,
    /// plus a straight-line "required" path from today's allocation to the target.
    pub fn project_paths(
        &self,
        request: &SimulationRequest,
        num_paths: u32,
        options: &RunOptions,
    ) -> Result<ProjectionPaths> {
        if num_paths == 0 {
            return Err(EngineError::InvalidArgument(
                "num_paths must be at least 1".to_string(),
            ));
        }
        validate_request(request)?;

        let process = MonthlyProcess::from_request(request)?;
        let required_path = required_path(
            request.current_allocation,
            request.target_amount,
            process.months,
        )?;
        if process.months == 0 {
            let start = vec![request.current_allocation];
            return Ok(ProjectionPaths {
                median_path: start.clone(),
                worst_path: start.clone(),
                best_path: start,
                required_path,
            });
        }

        let seed = options.resolve_seed();
        debug!(num_paths, months = process.months, seed, "Projecting goal paths");

        let trajectories = self
            .run_batches(num_paths as usize, seed, options, |rng| {
                let mut path = Vec::with_capacity(process.months + 1);
                path.push(process.start);
                process.run(rng, |value| path.push(value));
                path
            })
            .inspect_err(|e| warn!("Goal projection aborted: {e}"))?;

        let bands: Vec<(f64, f64, f64)> = (0..=process.months)
            .into_par_iter()
            .map(|month| {
                let mut column: Vec<f64> = trajectories.iter().map(|path| path[month]).collect();
                column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                (
                    percentile(&column, MEDIAN_PERCENTILE),
                    percentile(&column, WORST_CASE_PERCENTILE),
                    percentile(&column, BEST_CASE_PERCENTILE),
                )
            })
            .collect();

        let mut paths = ProjectionPaths {
            median_path: Vec::with_capacity(bands.len()),
            worst_path: Vec::with_capacity(bands.len()),
            best_path: Vec::with_capacity(bands.len()),
            required_path,
        };
        for (median, worst, best) in bands {
            paths.median_path.push(to_money(median)?);
            paths.worst_path.push(to_money(worst)?);
            paths.best_path.push(to_money(best)?);
        }
        Ok(paths)
    }

    /// Run `trials` calls of `trial` across rayon batches. Results come back in
    /// batch order once every batch has finished.
    fn run_batches<T, F>(
        &self,
        trials: usize,
        seed: u64,
        options: &RunOptions,
        trial: F,
    ) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(&mut ChaCha8Rng) -> T + Sync,
    {
        let batch_size = self.batch_size;
        let batch_count = trials.div_ceil(batch_size);

        let batches = (0..batch_count)
            .into_par_iter()
            .map(|batch| {
                options.check()?;
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(batch as u64);
                let len = batch_size.min(trials - batch * batch_size);
                Ok((0..len).map(|_| trial(&mut rng)).collect::<Vec<T>>())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(batches.into_iter().flatten().collect())
    }
}

/// Percentile of sorted data with linear interpolation between order statistics.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

fn required_path(start: Decimal, target: Decimal, months: usize) -> Result<Vec<Decimal>> {
    if months == 0 {
        return Ok(vec![target]);
    }
    let steps = Decimal::from(months);
    let gap = target
        .checked_sub(start)
        .ok_or_else(|| EngineError::Overflow("required path gap".to_string()))?;
    (0..=months)
        .map(|month| {
            gap.checked_mul(Decimal::from(month))
                .map(|progress| progress / steps)
                .and_then(|step| start.checked_add(step))
                .map(|value| value.round_dp(2))
                .ok_or_else(|| EngineError::Overflow(format!("required path at month {month}")))
        })
        .collect()
}

fn validate_request(request: &SimulationRequest) -> Result<()> {
    if request.current_allocation < Decimal::ZERO {
        return Err(EngineError::InvalidArgument(format!(
            "current_allocation must be non-negative, got {}",
            request.current_allocation
        )));
    }
    if request.annual_volatility < Decimal::ZERO {
        return Err(EngineError::InvalidArgument(format!(
            "annual_volatility must be non-negative, got {}",
            request.annual_volatility
        )));
    }
    Ok(())
}

fn to_f64(value: Decimal, field: &str) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| EngineError::InvalidArgument(format!("{field} is not representable: {value}")))
}

fn to_money(value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .ok_or_else(|| EngineError::Overflow(format!("simulated value {value} out of range")))
}
