use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use goal_engine::{
    AllocationSnapshot, EngineConfig, EngineError, GoalMetrics, GoalMetricsAggregator, GoalStatus, Holding,
    ProjectionPaths, RescueStrategy, RescueStrategyGenerator, RunOptions, SimulationRequest,
    StochasticProjector,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{PlannerError, Result};
use crate::models::*;
use crate::store::GoalStore;

/// Goals shown as cards on the dashboard.
const DASHBOARD_GOAL_CARDS: usize = 6;

/// Goal planning service: resolves allocations from stored holdings, runs
/// the engine and appends simulation/history records.
pub struct GoalPlanner<S: GoalStore> {
    store: Arc<S>,
    config: EngineConfig,
    projector: StochasticProjector,
    rescue: RescueStrategyGenerator,
}

impl<S: GoalStore> GoalPlanner<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            projector: StochasticProjector::from_config(&config),
            rescue: RescueStrategyGenerator::from_config(&config),
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn require_goal(&self, goal_id: i64) -> Result<Goal> {
        self.store
            .get_goal(goal_id)
            .await?
            .ok_or(PlannerError::GoalNotFound(goal_id))
    }

    /// Sum of mapped holdings, each weighted by its allocation percentage.
    pub async fn current_allocation(&self, goal_id: i64) -> Result<AllocationSnapshot> {
        let mappings = self.store.get_goal_mappings(goal_id).await?;
        let mut holdings = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            match self.store.get_investment(mapping.investment_id).await? {
                Some(investment) => holdings.push(Holding {
                    current_value: investment.current_value,
                    allocation_percentage: mapping.allocation_percentage,
                }),
                None => warn!(
                    goal_id,
                    investment_id = mapping.investment_id,
                    "Goal mapping references a missing investment"
                ),
            }
        }
        Ok(AllocationSnapshot::from_holdings(&holdings)?)
    }

    /// Live metrics for a stored goal, using the latest recorded simulation.
    pub async fn goal_metrics(&self, goal: &Goal) -> Result<GoalMetrics> {
        let snapshot = self.current_allocation(goal.goal_id).await?;
        let latest = self
            .store
            .latest_simulation(goal.goal_id)
            .await?
            .map(|record| record.result.success_probability);
        let metrics = GoalMetricsAggregator::compute(&goal.parameters(), &snapshot, latest)?;
        debug!(goal_id = goal.goal_id, status = %metrics.status, "Computed goal metrics");
        Ok(metrics)
    }

    pub async fn goal_details(&self, goal_id: i64) -> Result<GoalDetails> {
        let goal = self.require_goal(goal_id).await?;
        self.details_for(goal).await
    }

    async fn details_for(&self, goal: Goal) -> Result<GoalDetails> {
        let beneficiary_name = self
            .store
            .get_member(goal.beneficiary_member_id)
            .await?
            .map(|member| member.name);
        let metrics = self.goal_metrics(&goal).await?;
        Ok(GoalDetails {
            goal_id: goal.goal_id,
            goal_name: goal.goal_name,
            target_amount: goal.target_amount,
            years_until_due: goal.years_until_due,
            horizon: goal.horizon,
            expected_return: goal.expected_return,
            volatility: goal.volatility,
            beneficiary_member_id: goal.beneficiary_member_id,
            beneficiary_name,
            created_at: goal.created_at,
            metrics,
        })
    }

    pub async fn goals_summary(&self, user_id: i64) -> Result<Vec<GoalDetails>> {
        let goals = self.store.get_goals_for_user(user_id).await?;
        let mut summary = Vec::with_capacity(goals.len());
        for goal in goals {
            summary.push(self.details_for(goal).await?);
        }
        Ok(summary)
    }

    /// Run a fresh simulation for the goal and append it to its history.
    pub async fn run_simulation(
        &self,
        goal_id: i64,
        num_trials: Option<u32>,
    ) -> Result<SimulationRecord> {
        let goal = self.require_goal(goal_id).await?;
        let metrics = self.goal_metrics(&goal).await?;
        let request = SimulationRequest::for_goal(
            &goal.parameters(),
            metrics.current_allocation,
            metrics.required_monthly_contribution,
        );
        let num_trials = num_trials.unwrap_or(self.config.default_trials);

        let projector = self.projector.clone();
        let options = RunOptions::from_config(&self.config);
        let result = tokio::task::spawn_blocking(move || {
            projector.simulate(&request, num_trials, &options)
        })
        .await
        .map_err(|e| PlannerError::TaskFailed(e.to_string()))??;

        let record = self
            .store
            .append_simulation(goal_id, Utc::now(), result)
            .await?;
        info!(
            goal_id,
            sim_id = record.sim_id,
            success_probability = %record.result.success_probability,
            "Recorded goal simulation"
        );
        Ok(record)
    }

    pub async fn simulation_history(&self, goal_id: i64) -> Result<Vec<SimulationRecord>> {
        self.require_goal(goal_id).await?;
        Ok(self.store.simulation_history(goal_id).await?)
    }

    /// Percentile paths for charting. Never recorded, never used for status.
    pub async fn projection_paths(
        &self,
        goal_id: i64,
        num_paths: Option<u32>,
    ) -> Result<ProjectionPaths> {
        let goal = self.require_goal(goal_id).await?;
        let metrics = self.goal_metrics(&goal).await?;
        let request = SimulationRequest::for_goal(
            &goal.parameters(),
            metrics.current_allocation,
            metrics.required_monthly_contribution,
        );
        let num_paths = num_paths.unwrap_or(self.config.projection_paths);

        let projector = self.projector.clone();
        let options = RunOptions::from_config(&self.config);
        let paths = tokio::task::spawn_blocking(move || {
            projector.project_paths(&request, num_paths, &options)
        })
        .await
        .map_err(|e| PlannerError::TaskFailed(e.to_string()))??;
        Ok(paths)
    }

    /// Alternative strategies for a goal that is not green.
    pub async fn rescue_strategies(&self, goal_id: i64) -> Result<Vec<RescueStrategy>> {
        let goal = self.require_goal(goal_id).await?;
        let metrics = self.goal_metrics(&goal).await?;
        if metrics.status == GoalStatus::Green {
            return Ok(Vec::new());
        }

        let params = goal.parameters();
        let generator = self.rescue.clone();
        let options = RunOptions::from_config(&self.config);
        let strategies = tokio::task::spawn_blocking(move || {
            generator.generate(&params, &metrics, &options)
        })
        .await
        .map_err(|e| PlannerError::TaskFailed(e.to_string()))??;
        Ok(strategies)
    }

    /// Append today's (or any date's) metrics to the goal's tracking history.
    pub async fn record_history_snapshot(
        &self,
        goal_id: i64,
        snapshot_date: NaiveDate,
    ) -> Result<GoalHistoryEntry> {
        let goal = self.require_goal(goal_id).await?;
        let metrics = self.goal_metrics(&goal).await?;
        let entry = self
            .store
            .append_history(
                goal_id,
                snapshot_date,
                metrics.current_allocation,
                metrics.present_value,
                metrics.success_probability,
            )
            .await?;
        Ok(entry)
    }

    pub async fn goal_history(&self, goal_id: i64) -> Result<Vec<GoalHistoryEntry>> {
        self.require_goal(goal_id).await?;
        Ok(self.store.goal_history(goal_id).await?)
    }

    /// Current and invested totals across every family member's investments.
    pub async fn portfolio_value(&self, user_id: i64) -> Result<PortfolioValue> {
        let members = self.store.get_members_for_user(user_id).await?;
        let member_ids: Vec<i64> = members.iter().map(|m| m.member_id).collect();
        let investments = self.store.get_investments_for_members(&member_ids).await?;

        let total_current_value = checked_total(investments.iter().map(|i| i.current_value))?;
        let total_invested_value = checked_total(investments.iter().map(|i| i.invested_value))?;
        let total_gain_loss = gain_loss(total_current_value, total_invested_value)?;

        Ok(PortfolioValue {
            total_current_value: total_current_value.round_dp(2),
            total_invested_value: total_invested_value.round_dp(2),
            total_gain_loss: total_gain_loss.round_dp(2),
            gain_loss_percentage: gain_loss_percentage(total_gain_loss, total_invested_value)?,
        })
    }

    /// Per-member totals, in member order.
    pub async fn member_allocation(&self, user_id: i64) -> Result<Vec<MemberAllocation>> {
        let members = self.store.get_members_for_user(user_id).await?;
        let mut allocations = Vec::with_capacity(members.len());
        for member in members {
            let investments = self
                .store
                .get_investments_for_members(&[member.member_id])
                .await?;
            let current_value = checked_total(investments.iter().map(|i| i.current_value))?;
            let invested_value = checked_total(investments.iter().map(|i| i.invested_value))?;
            allocations.push(MemberAllocation {
                member_id: member.member_id,
                member_name: member.name,
                relation: member.relation,
                current_value: current_value.round_dp(2),
                invested_value: invested_value.round_dp(2),
                gain_loss: gain_loss(current_value, invested_value)?.round_dp(2),
                num_investments: investments.len(),
            });
        }
        Ok(allocations)
    }

    /// Every investment held by the user's family, with its gain or loss.
    pub async fn investment_performance(&self, user_id: i64) -> Result<Vec<InvestmentPerformance>> {
        let members = self.store.get_members_for_user(user_id).await?;
        let member_ids: Vec<i64> = members.iter().map(|m| m.member_id).collect();
        let investments = self.store.get_investments_for_members(&member_ids).await?;

        investments
            .into_iter()
            .map(|investment| -> Result<InvestmentPerformance> {
                let current_value = investment.current_value.unwrap_or(Decimal::ZERO);
                let invested_value = investment.invested_value.unwrap_or(Decimal::ZERO);
                let change = gain_loss(current_value, invested_value)?;
                let member_name = members
                    .iter()
                    .find(|m| m.member_id == investment.member_id)
                    .map(|m| m.name.clone())
                    .unwrap_or_default();
                Ok(InvestmentPerformance {
                    investment_id: investment.investment_id,
                    name: investment.name,
                    symbol: investment.symbol,
                    member_name,
                    invested_value: invested_value.round_dp(2),
                    current_value: current_value.round_dp(2),
                    gain_loss: change.round_dp(2),
                    gain_loss_percentage: gain_loss_percentage(change, invested_value)?,
                })
            })
            .collect()
    }

    /// Best `limit` investments by gain percentage, best first.
    pub async fn top_performers(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<InvestmentPerformance>> {
        let mut performance = self.investment_performance(user_id).await?;
        performance.sort_by(|a, b| b.gain_loss_percentage.cmp(&a.gain_loss_percentage));
        performance.truncate(limit);
        Ok(performance)
    }

    /// Worst `limit` investments by gain percentage, worst first.
    pub async fn worst_performers(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<InvestmentPerformance>> {
        let mut performance = self.investment_performance(user_id).await?;
        performance.sort_by(|a, b| a.gain_loss_percentage.cmp(&b.gain_loss_percentage));
        performance.truncate(limit);
        Ok(performance)
    }

    pub async fn dashboard(&self, user_id: i64) -> Result<DashboardSummary> {
        let portfolio = self.portfolio_value(user_id).await?;
        let goals = self.goals_summary(user_id).await?;

        let mut status_counts = GoalStatusCounts::default();
        for goal in &goals {
            match goal.metrics.status {
                GoalStatus::Green => status_counts.green += 1,
                GoalStatus::Yellow => status_counts.yellow += 1,
                GoalStatus::Red => status_counts.red += 1,
            }
        }

        Ok(DashboardSummary {
            portfolio,
            num_goals: goals.len(),
            status_counts,
            goals_summary: goals.into_iter().take(DASHBOARD_GOAL_CARDS).collect(),
        })
    }
}

/// Sum of optional amounts, missing ones counting as zero.
fn checked_total(values: impl Iterator<Item = Option<Decimal>>) -> Result<Decimal> {
    values
        .map(|value| value.unwrap_or(Decimal::ZERO))
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or_else(|| EngineError::Overflow("portfolio total".to_string()).into())
}

fn gain_loss(current_value: Decimal, invested_value: Decimal) -> Result<Decimal> {
    current_value
        .checked_sub(invested_value)
        .ok_or_else(|| EngineError::Overflow("gain/loss".to_string()).into())
}

/// Gain as a percent of the invested amount, 0 when nothing was invested.
fn gain_loss_percentage(gain_loss: Decimal, invested_value: Decimal) -> Result<Decimal> {
    if invested_value <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    gain_loss
        .checked_div(invested_value)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp(2))
        .ok_or_else(|| EngineError::Overflow("gain/loss percentage".to_string()).into())
}
