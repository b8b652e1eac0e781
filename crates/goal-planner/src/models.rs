use chrono::{DateTime, NaiveDate, Utc};
use goal_engine::{GoalMetrics, GoalParameters, SimulationResult, DEFAULT_EXPECTED_RETURN, DEFAULT_VOLATILITY};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalHorizon {
    Short,
    Medium,
    Long,
    Retirement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    #[serde(rename = "self")]
    Myself,
    Spouse,
    Son,
    Daughter,
    Father,
    Mother,
    Sister,
    Brother,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub member_id: i64,
    pub user_id: i64,
    pub name: String,
    pub relation: Relation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub investment_id: i64,
    pub member_id: i64,
    pub name: String,
    pub symbol: Option<String>,
    pub invested_value: Option<Decimal>,
    pub current_value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalInvestmentMapping {
    pub goal_id: i64,
    pub investment_id: i64,
    /// Percent of the investment earmarked for the goal; `None` means all of it.
    pub allocation_percentage: Option<Decimal>,
}

/// A stored goal. Rates are kept in percent (`10` = 10% a year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub goal_id: i64,
    pub created_by_user_id: i64,
    pub beneficiary_member_id: i64,
    pub goal_name: String,
    pub target_amount: Decimal,
    pub years_until_due: i32,
    pub horizon: GoalHorizon,
    pub expected_return: Option<Decimal>,
    pub volatility: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Engine inputs, with percent rates converted to fractions.
    pub fn parameters(&self) -> GoalParameters {
        let fraction = |pct: Decimal| pct / Decimal::ONE_HUNDRED;
        GoalParameters {
            target_amount: self.target_amount,
            years_until_due: self.years_until_due,
            expected_return: self.expected_return.map(fraction).unwrap_or(DEFAULT_EXPECTED_RETURN),
            volatility: self.volatility.map(fraction).unwrap_or(DEFAULT_VOLATILITY),
        }
    }
}

/// Fields needed to create a goal; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalInput {
    pub created_by_user_id: i64,
    pub beneficiary_member_id: i64,
    pub goal_name: String,
    pub target_amount: Decimal,
    pub years_until_due: i32,
    pub horizon: GoalHorizon,
    pub expected_return: Option<Decimal>,
    pub volatility: Option<Decimal>,
}

/// Immutable record of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub sim_id: i64,
    pub goal_id: i64,
    pub run_timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub result: SimulationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalHistoryEntry {
    pub history_id: i64,
    pub goal_id: i64,
    pub snapshot_date: NaiveDate,
    pub current_allocation: Decimal,
    pub required_pv: Decimal,
    pub success_probability: Option<Decimal>,
}

/// A goal as rendered on read: record, beneficiary and live metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDetails {
    pub goal_id: i64,
    pub goal_name: String,
    pub target_amount: Decimal,
    pub years_until_due: i32,
    pub horizon: GoalHorizon,
    pub expected_return: Option<Decimal>,
    pub volatility: Option<Decimal>,
    pub beneficiary_member_id: i64,
    pub beneficiary_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub metrics: GoalMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValue {
    pub total_current_value: Decimal,
    pub total_invested_value: Decimal,
    pub total_gain_loss: Decimal,
    pub gain_loss_percentage: Decimal,
}

/// One family member's share of the household portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAllocation {
    pub member_id: i64,
    pub member_name: String,
    pub relation: Relation,
    pub current_value: Decimal,
    pub invested_value: Decimal,
    pub gain_loss: Decimal,
    pub num_investments: usize,
}

/// An investment with its gain or loss, for performer rankings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentPerformance {
    pub investment_id: i64,
    pub name: String,
    pub symbol: Option<String>,
    pub member_name: String,
    pub invested_value: Decimal,
    pub current_value: Decimal,
    pub gain_loss: Decimal,
    pub gain_loss_percentage: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStatusCounts {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(flatten)]
    pub portfolio: PortfolioValue,
    pub num_goals: usize,
    pub status_counts: GoalStatusCounts,
    /// First goals, for the dashboard cards.
    pub goals_summary: Vec<GoalDetails>,
}
