#[cfg(test)]
mod goal_planner_tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use goal_engine::{EngineConfig, EngineError, GoalStatus};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::error::PlannerError;
    use crate::models::*;
    use crate::planner::GoalPlanner;
    use crate::store::{GoalStore, InMemoryGoalStore};

    const USER_ID: i64 = 1;

    struct Fixture {
        planner: GoalPlanner<InMemoryGoalStore>,
        education_goal: i64,
        emergency_goal: i64,
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            default_trials: 2000,
            rescue_trials: 300,
            projection_paths: 50,
            seed: Some(42),
            ..EngineConfig::default()
        }
    }

    async fn setup() -> Fixture {
        let store = InMemoryGoalStore::new();
        let parent = store.add_member(USER_ID, "Asha", Relation::Myself).await;
        let child = store.add_member(USER_ID, "Kiran", Relation::Son).await;

        let index_fund = store
            .add_investment(parent, "Index Fund", Some(dec!(100000)), Some(dec!(150000)))
            .await
            .unwrap();
        let debt_fund = store
            .add_investment(parent, "Debt Fund", Some(dec!(90000)), Some(dec!(80000)))
            .await
            .unwrap();
        store
            .add_investment(child, "Unpriced Bond", Some(dec!(5000)), None)
            .await
            .unwrap();

        let education_goal = store
            .add_goal(GoalInput {
                created_by_user_id: USER_ID,
                beneficiary_member_id: child,
                goal_name: "Education".to_string(),
                target_amount: dec!(1000000),
                years_until_due: 10,
                horizon: GoalHorizon::Long,
                expected_return: None,
                volatility: None,
            })
            .await
            .unwrap();
        store.map_investment(education_goal, index_fund, None).await.unwrap();
        store
            .map_investment(education_goal, debt_fund, Some(dec!(50)))
            .await
            .unwrap();

        let emergency_goal = store
            .add_goal(GoalInput {
                created_by_user_id: USER_ID,
                beneficiary_member_id: parent,
                goal_name: "Emergency Fund".to_string(),
                target_amount: dec!(50000),
                years_until_due: 1,
                horizon: GoalHorizon::Short,
                expected_return: Some(dec!(8)),
                volatility: Some(dec!(4)),
            })
            .await
            .unwrap();
        store
            .map_investment(emergency_goal, debt_fund, Some(dec!(50)))
            .await
            .unwrap();

        Fixture {
            planner: GoalPlanner::new(Arc::new(store), test_config()),
            education_goal,
            emergency_goal,
        }
    }

    #[tokio::test]
    async fn test_unknown_goal_is_not_found() {
        let fx = setup().await;
        let err = fx.planner.goal_details(999).await.unwrap_err();
        assert!(matches!(err, PlannerError::GoalNotFound(999)));
        let err = fx.planner.run_simulation(999, None).await.unwrap_err();
        assert!(matches!(err, PlannerError::GoalNotFound(999)));
        let err = fx.planner.rescue_strategies(999).await.unwrap_err();
        assert!(matches!(err, PlannerError::GoalNotFound(999)));
    }

    #[tokio::test]
    async fn test_allocation_weights_mapped_holdings() {
        let fx = setup().await;
        let snapshot = fx.planner.current_allocation(fx.education_goal).await.unwrap();
        // 150000 * 100% + 80000 * 50%
        assert_eq!(snapshot.current_allocation, dec!(190000));
    }

    #[tokio::test]
    async fn test_mapping_to_missing_investment_is_skipped() {
        let fx = setup().await;
        fx.planner
            .store()
            .map_investment(fx.education_goal, 12345, None)
            .await
            .unwrap();
        let snapshot = fx.planner.current_allocation(fx.education_goal).await.unwrap();
        assert_eq!(snapshot.current_allocation, dec!(190000));
    }

    #[tokio::test]
    async fn test_goal_details() {
        let fx = setup().await;
        let details = fx.planner.goal_details(fx.education_goal).await.unwrap();
        assert_eq!(details.goal_name, "Education");
        assert_eq!(details.beneficiary_name.as_deref(), Some("Kiran"));
        assert_eq!(details.metrics.present_value, dec!(385543.29));
        assert_eq!(details.metrics.current_allocation, dec!(190000));
        assert_eq!(details.metrics.shortfall, dec!(195543.29));
        assert!(details.metrics.required_monthly_contribution > Decimal::ZERO);
        assert_eq!(details.metrics.status, GoalStatus::Red);
        assert_eq!(details.metrics.success_probability, None);

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["status"], "red");
        assert_eq!(json["horizon"], "long");
    }

    #[tokio::test]
    async fn test_goal_parameters_convert_percent_rates() {
        let fx = setup().await;
        let goal = fx
            .planner
            .store()
            .get_goal(fx.emergency_goal)
            .await
            .unwrap()
            .unwrap();
        let params = goal.parameters();
        assert_eq!(params.expected_return, dec!(0.08));
        assert_eq!(params.volatility, dec!(0.04));

        let education = fx
            .planner
            .store()
            .get_goal(fx.education_goal)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(education.parameters().expected_return, dec!(0.10));
        assert_eq!(education.parameters().volatility, dec!(0.12));
    }

    #[tokio::test]
    async fn test_simulation_is_recorded_and_feeds_metrics() {
        let fx = setup().await;
        let record = fx.planner.run_simulation(fx.education_goal, None).await.unwrap();
        assert_eq!(record.goal_id, fx.education_goal);
        assert_eq!(record.result.num_trials, 2000);
        assert!(record.result.worst_case <= record.result.median_outcome);
        assert!(record.result.median_outcome <= record.result.best_case);

        let details = fx.planner.goal_details(fx.education_goal).await.unwrap();
        assert_eq!(
            details.metrics.success_probability,
            Some(record.result.success_probability)
        );

        let second = fx
            .planner
            .run_simulation(fx.education_goal, Some(500))
            .await
            .unwrap();
        assert_ne!(second.sim_id, record.sim_id);
        let history = fx.planner.simulation_history(fx.education_goal).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], record);
        assert_eq!(history[1], second);
    }

    #[tokio::test]
    async fn test_zero_trials_is_invalid_argument() {
        let fx = setup().await;
        let err = fx
            .planner
            .run_simulation(fx.education_goal, Some(0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlannerError::Engine(EngineError::InvalidArgument(_))
        ));
        let history = fx.planner.simulation_history(fx.education_goal).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_rescue_strategies() {
        let fx = setup().await;
        let strategies = fx.planner.rescue_strategies(fx.education_goal).await.unwrap();
        assert_eq!(strategies.len(), 3);
        assert_eq!(strategies[0].strategy_name, "Safe Strategy");
        assert_eq!(strategies[1].strategy_name, "Balanced Strategy");
        assert_eq!(strategies[2].strategy_name, "Aggressive Strategy");

        let none = fx.planner.rescue_strategies(fx.emergency_goal).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_projection_paths() {
        let fx = setup().await;
        let paths = fx
            .planner
            .projection_paths(fx.education_goal, None)
            .await
            .unwrap();
        assert_eq!(paths.len(), 121);
        assert_eq!(paths.required_path[0], dec!(190000));
        assert_eq!(paths.required_path[120], dec!(1000000));
        // Charting never records a simulation.
        let history = fx.planner.simulation_history(fx.education_goal).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_snapshots_are_date_ordered() {
        let fx = setup().await;
        let later = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let earlier = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        fx.planner
            .record_history_snapshot(fx.education_goal, later)
            .await
            .unwrap();
        let first = fx
            .planner
            .record_history_snapshot(fx.education_goal, earlier)
            .await
            .unwrap();
        assert_eq!(first.required_pv, dec!(385543.29));
        assert_eq!(first.current_allocation, dec!(190000));

        let history = fx.planner.goal_history(fx.education_goal).await.unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(|h| h.snapshot_date).collect();
        assert_eq!(dates, vec![earlier, later]);

        assert!(matches!(
            fx.planner.goal_history(404).await,
            Err(PlannerError::GoalNotFound(404))
        ));
    }

    #[tokio::test]
    async fn test_portfolio_value() {
        let fx = setup().await;
        let value = fx.planner.portfolio_value(USER_ID).await.unwrap();
        assert_eq!(value.total_current_value, dec!(230000));
        assert_eq!(value.total_invested_value, dec!(195000));
        assert_eq!(value.total_gain_loss, dec!(35000));
        assert_eq!(value.gain_loss_percentage, dec!(17.95));

        let empty = fx.planner.portfolio_value(2).await.unwrap();
        assert_eq!(empty, PortfolioValue::default());
    }

    #[tokio::test]
    async fn test_member_allocation() {
        let fx = setup().await;
        let members = fx.planner.member_allocation(USER_ID).await.unwrap();
        assert_eq!(members.len(), 2);

        assert_eq!(members[0].member_name, "Asha");
        assert_eq!(members[0].relation, Relation::Myself);
        assert_eq!(members[0].current_value, dec!(230000));
        assert_eq!(members[0].invested_value, dec!(190000));
        assert_eq!(members[0].gain_loss, dec!(40000));
        assert_eq!(members[0].num_investments, 2);

        assert_eq!(members[1].member_name, "Kiran");
        assert_eq!(members[1].current_value, Decimal::ZERO);
        assert_eq!(members[1].invested_value, dec!(5000));
        assert_eq!(members[1].gain_loss, dec!(-5000));
        assert_eq!(members[1].num_investments, 1);

        assert!(fx.planner.member_allocation(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_top_and_worst_performers() {
        let fx = setup().await;
        let top = fx.planner.top_performers(USER_ID, 2).await.unwrap();
        let names: Vec<&str> = top.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Index Fund", "Debt Fund"]);
        assert_eq!(top[0].gain_loss_percentage, dec!(50));
        assert_eq!(top[0].member_name, "Asha");
        assert_eq!(top[1].gain_loss, dec!(-10000));
        assert_eq!(top[1].gain_loss_percentage, dec!(-11.11));

        let worst = fx.planner.worst_performers(USER_ID, 1).await.unwrap();
        assert_eq!(worst.len(), 1);
        assert_eq!(worst[0].name, "Unpriced Bond");
        assert_eq!(worst[0].member_name, "Kiran");
        assert_eq!(worst[0].current_value, Decimal::ZERO);
        assert_eq!(worst[0].gain_loss_percentage, dec!(-100));

        let all = fx.planner.worst_performers(USER_ID, 10).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_oversized_holding_is_an_engine_error() {
        let fx = setup().await;
        let member = fx
            .planner
            .store()
            .add_member(USER_ID, "Ravi", Relation::Brother)
            .await;
        let huge = fx
            .planner
            .store()
            .add_investment(member, "Huge Fund", None, Some(Decimal::MAX))
            .await
            .unwrap();
        fx.planner
            .store()
            .map_investment(fx.emergency_goal, huge, Some(dec!(150)))
            .await
            .unwrap();
        assert!(matches!(
            fx.planner.goal_details(fx.emergency_goal).await,
            Err(PlannerError::Engine(EngineError::Overflow(_)))
        ));
    }

    #[tokio::test]
    async fn test_dashboard_counts_statuses() {
        let fx = setup().await;
        let dashboard = fx.planner.dashboard(USER_ID).await.unwrap();
        assert_eq!(dashboard.num_goals, 2);
        assert_eq!(
            dashboard.status_counts,
            GoalStatusCounts {
                green: 1,
                yellow: 0,
                red: 1
            }
        );
        assert_eq!(dashboard.goals_summary.len(), 2);
        assert_eq!(dashboard.portfolio.total_current_value, dec!(230000));
    }
}
