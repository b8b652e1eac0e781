use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use goal_engine::SimulationResult;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::models::*;

/// Storage seam for household records and per-goal history.
///
/// Simulation records and history entries are append-only.
#[async_trait]
pub trait GoalStore: Send + Sync {
    async fn get_goal(&self, goal_id: i64) -> Result<Option<Goal>>;

    async fn get_goals_for_user(&self, user_id: i64) -> Result<Vec<Goal>>;

    async fn get_member(&self, member_id: i64) -> Result<Option<FamilyMember>>;

    async fn get_members_for_user(&self, user_id: i64) -> Result<Vec<FamilyMember>>;

    async fn get_investment(&self, investment_id: i64) -> Result<Option<Investment>>;

    async fn get_investments_for_members(&self, member_ids: &[i64]) -> Result<Vec<Investment>>;

    async fn get_goal_mappings(&self, goal_id: i64) -> Result<Vec<GoalInvestmentMapping>>;

    /// Most recent simulation run for a goal, if any.
    async fn latest_simulation(&self, goal_id: i64) -> Result<Option<SimulationRecord>>;

    /// Simulation runs for a goal, oldest first.
    async fn simulation_history(&self, goal_id: i64) -> Result<Vec<SimulationRecord>>;

    async fn append_simulation(
        &self,
        goal_id: i64,
        run_timestamp: DateTime<Utc>,
        result: SimulationResult,
    ) -> Result<SimulationRecord>;

    /// History snapshots for a goal in date order.
    async fn goal_history(&self, goal_id: i64) -> Result<Vec<GoalHistoryEntry>>;

    async fn append_history(
        &self,
        goal_id: i64,
        snapshot_date: NaiveDate,
        current_allocation: Decimal,
        required_pv: Decimal,
        success_probability: Option<Decimal>,
    ) -> Result<GoalHistoryEntry>;
}

#[derive(Debug, Default)]
struct Tables {
    goals: HashMap<i64, Goal>,
    members: HashMap<i64, FamilyMember>,
    investments: HashMap<i64, Investment>,
    mappings: Vec<GoalInvestmentMapping>,
    simulations: Vec<SimulationRecord>,
    history: Vec<GoalHistoryEntry>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local store, used by the CLI and in tests.
#[derive(Debug, Default)]
pub struct InMemoryGoalStore {
    tables: RwLock<Tables>,
}

impl InMemoryGoalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_member(&self, user_id: i64, name: &str, relation: Relation) -> i64 {
        let mut tables = self.tables.write().await;
        let member_id = tables.next_id();
        tables.members.insert(
            member_id,
            FamilyMember {
                member_id,
                user_id,
                name: name.to_string(),
                relation,
            },
        );
        member_id
    }

    pub async fn add_investment(
        &self,
        member_id: i64,
        name: &str,
        invested_value: Option<Decimal>,
        current_value: Option<Decimal>,
    ) -> Result<i64> {
        let mut tables = self.tables.write().await;
        if !tables.members.contains_key(&member_id) {
            bail!("member {member_id} does not exist");
        }
        let investment_id = tables.next_id();
        tables.investments.insert(
            investment_id,
            Investment {
                investment_id,
                member_id,
                name: name.to_string(),
                symbol: None,
                invested_value,
                current_value,
            },
        );
        Ok(investment_id)
    }

    /// Refresh an investment's current value, e.g. after a quote lookup.
    pub async fn set_current_value(&self, investment_id: i64, current_value: Decimal) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.investments.get_mut(&investment_id) {
            Some(investment) => {
                investment.current_value = Some(current_value);
                Ok(())
            }
            None => bail!("investment {investment_id} does not exist"),
        }
    }

    pub async fn add_goal(&self, input: GoalInput) -> Result<i64> {
        let mut tables = self.tables.write().await;
        if !tables.members.contains_key(&input.beneficiary_member_id) {
            bail!("beneficiary {} does not exist", input.beneficiary_member_id);
        }
        let goal_id = tables.next_id();
        tables.goals.insert(
            goal_id,
            Goal {
                goal_id,
                created_by_user_id: input.created_by_user_id,
                beneficiary_member_id: input.beneficiary_member_id,
                goal_name: input.goal_name,
                target_amount: input.target_amount,
                years_until_due: input.years_until_due,
                horizon: input.horizon,
                expected_return: input.expected_return,
                volatility: input.volatility,
                created_at: Utc::now(),
            },
        );
        Ok(goal_id)
    }

    pub async fn map_investment(
        &self,
        goal_id: i64,
        investment_id: i64,
        allocation_percentage: Option<Decimal>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.goals.contains_key(&goal_id) {
            bail!("goal {goal_id} does not exist");
        }
        tables.mappings.push(GoalInvestmentMapping {
            goal_id,
            investment_id,
            allocation_percentage,
        });
        Ok(())
    }
}

#[async_trait]
impl GoalStore for InMemoryGoalStore {
    async fn get_goal(&self, goal_id: i64) -> Result<Option<Goal>> {
        Ok(self.tables.read().await.goals.get(&goal_id).cloned())
    }

    async fn get_goals_for_user(&self, user_id: i64) -> Result<Vec<Goal>> {
        let tables = self.tables.read().await;
        let mut goals: Vec<Goal> = tables
            .goals
            .values()
            .filter(|g| g.created_by_user_id == user_id)
            .cloned()
            .collect();
        goals.sort_by_key(|g| g.goal_id);
        Ok(goals)
    }

    async fn get_member(&self, member_id: i64) -> Result<Option<FamilyMember>> {
        Ok(self.tables.read().await.members.get(&member_id).cloned())
    }

    async fn get_members_for_user(&self, user_id: i64) -> Result<Vec<FamilyMember>> {
        let tables = self.tables.read().await;
        let mut members: Vec<FamilyMember> = tables
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.member_id);
        Ok(members)
    }

    async fn get_investment(&self, investment_id: i64) -> Result<Option<Investment>> {
        Ok(self.tables.read().await.investments.get(&investment_id).cloned())
    }

    async fn get_investments_for_members(&self, member_ids: &[i64]) -> Result<Vec<Investment>> {
        let tables = self.tables.read().await;
        let mut investments: Vec<Investment> = tables
            .investments
            .values()
            .filter(|i| member_ids.contains(&i.member_id))
            .cloned()
            .collect();
        investments.sort_by_key(|i| i.investment_id);
        Ok(investments)
    }

    async fn get_goal_mappings(&self, goal_id: i64) -> Result<Vec<GoalInvestmentMapping>> {
        let tables = self.tables.read().await;
        Ok(tables
            .mappings
            .iter()
            .filter(|m| m.goal_id == goal_id)
            .cloned()
            .collect())
    }

    async fn latest_simulation(&self, goal_id: i64) -> Result<Option<SimulationRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .simulations
            .iter()
            .filter(|s| s.goal_id == goal_id)
            .max_by_key(|s| (s.run_timestamp, s.sim_id))
            .cloned())
    }

    async fn simulation_history(&self, goal_id: i64) -> Result<Vec<SimulationRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<SimulationRecord> = tables
            .simulations
            .iter()
            .filter(|s| s.goal_id == goal_id)
            .cloned()
            .collect();
        records.sort_by_key(|s| (s.run_timestamp, s.sim_id));
        Ok(records)
    }

    async fn append_simulation(
        &self,
        goal_id: i64,
        run_timestamp: DateTime<Utc>,
        result: SimulationResult,
    ) -> Result<SimulationRecord> {
        let mut tables = self.tables.write().await;
        if !tables.goals.contains_key(&goal_id) {
            bail!("goal {goal_id} does not exist");
        }
        let record = SimulationRecord {
            sim_id: tables.next_id(),
            goal_id,
            run_timestamp,
            result,
        };
        tables.simulations.push(record.clone());
        Ok(record)
    }

    async fn goal_history(&self, goal_id: i64) -> Result<Vec<GoalHistoryEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<GoalHistoryEntry> = tables
            .history
            .iter()
            .filter(|h| h.goal_id == goal_id)
            .cloned()
            .collect();
        entries.sort_by_key(|h| (h.snapshot_date, h.history_id));
        Ok(entries)
    }

    async fn append_history(
        &self,
        goal_id: i64,
        snapshot_date: NaiveDate,
        current_allocation: Decimal,
        required_pv: Decimal,
        success_probability: Option<Decimal>,
    ) -> Result<GoalHistoryEntry> {
        let mut tables = self.tables.write().await;
        if !tables.goals.contains_key(&goal_id) {
            bail!("goal {goal_id} does not exist");
        }
        let entry = GoalHistoryEntry {
            history_id: tables.next_id(),
            goal_id,
            snapshot_date,
            current_allocation,
            required_pv,
            success_probability,
        };
        tables.history.push(entry.clone());
        Ok(entry)
    }
}
