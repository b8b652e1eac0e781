//! JSON inputs for the CLI: single-goal scenarios and whole households.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use goal_engine::{GoalParameters, Holding};
use goal_planner::{GoalHorizon, GoalInput, InMemoryGoalStore, Relation};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One goal with the holdings earmarked for it.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub goal: GoalParameters,
    #[serde(default)]
    pub holdings: Vec<Holding>,
    /// Probability (0-100) from an earlier run, fed into the status.
    pub success_probability: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct Household {
    pub user_id: i64,
    pub members: Vec<MemberEntry>,
    #[serde(default)]
    pub goals: Vec<GoalEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MemberEntry {
    pub name: String,
    pub relation: Relation,
    #[serde(default)]
    pub investments: Vec<InvestmentEntry>,
}

#[derive(Debug, Deserialize)]
pub struct InvestmentEntry {
    pub name: String,
    pub invested_value: Option<Decimal>,
    pub current_value: Option<Decimal>,
}

/// Goal record; rates in percent, beneficiary and holdings referenced by name.
#[derive(Debug, Deserialize)]
pub struct GoalEntry {
    pub goal_name: String,
    pub beneficiary: String,
    pub target_amount: Decimal,
    pub years_until_due: i32,
    pub horizon: GoalHorizon,
    pub expected_return: Option<Decimal>,
    pub volatility: Option<Decimal>,
    #[serde(default)]
    pub investments: Vec<AllocationEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AllocationEntry {
    pub name: String,
    pub allocation_percentage: Option<Decimal>,
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

impl Household {
    /// Populate a fresh store; returns the store and the ids of the goals in file order.
    pub async fn into_store(self) -> Result<(InMemoryGoalStore, Vec<i64>)> {
        let store = InMemoryGoalStore::new();
        let mut member_ids = HashMap::new();
        let mut investment_ids = HashMap::new();

        for member in self.members {
            let member_id = store
                .add_member(self.user_id, &member.name, member.relation)
                .await;
            for investment in member.investments {
                let investment_id = store
                    .add_investment(
                        member_id,
                        &investment.name,
                        investment.invested_value,
                        investment.current_value,
                    )
                    .await?;
                investment_ids.insert(investment.name, investment_id);
            }
            member_ids.insert(member.name, member_id);
        }

        let mut goal_ids = Vec::with_capacity(self.goals.len());
        for goal in self.goals {
            let Some(&beneficiary_member_id) = member_ids.get(&goal.beneficiary) else {
                bail!(
                    "goal '{}' names unknown beneficiary '{}'",
                    goal.goal_name,
                    goal.beneficiary
                );
            };
            let goal_id = store
                .add_goal(GoalInput {
                    created_by_user_id: self.user_id,
                    beneficiary_member_id,
                    goal_name: goal.goal_name.clone(),
                    target_amount: goal.target_amount,
                    years_until_due: goal.years_until_due,
                    horizon: goal.horizon,
                    expected_return: goal.expected_return,
                    volatility: goal.volatility,
                })
                .await?;
            for allocation in goal.investments {
                let Some(&investment_id) = investment_ids.get(&allocation.name) else {
                    bail!(
                        "goal '{}' maps unknown investment '{}'",
                        goal.goal_name,
                        allocation.name
                    );
                };
                store
                    .map_investment(goal_id, investment_id, allocation.allocation_percentage)
                    .await?;
            }
            goal_ids.push(goal_id);
        }

        Ok((store, goal_ids))
    }
}
