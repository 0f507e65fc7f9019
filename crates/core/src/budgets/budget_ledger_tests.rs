#[cfg(test)]
mod tests {
    use crate::budgets::impact_calculator::{apply_delta, recompute_aggregates, reverse_delta};
    use crate::budgets::*;
    use crate::errors::{DatabaseError, Error, Result};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    // --- Mock BudgetRepository ---
    #[derive(Default)]
    struct State {
        budgets: Vec<BudgetWithAllocations>,
        impacts: Vec<ImpactEntry>,
        next_id: u32,
    }

    #[derive(Clone, Default)]
    struct MockBudgetRepository {
        state: Arc<Mutex<State>>,
    }

    impl MockBudgetRepository {
        fn add_budget(&self, budget: BudgetWithAllocations) {
            self.state.lock().unwrap().budgets.push(budget);
        }

        fn impact_count(&self) -> usize {
            self.state.lock().unwrap().impacts.len()
        }

        /// Corrupts stored aggregates to simulate drift.
        fn set_total_spent(&self, budget_id: &str, total: Decimal) {
            let mut state = self.state.lock().unwrap();
            let b = state
                .budgets
                .iter_mut()
                .find(|b| b.budget.id == budget_id)
                .unwrap();
            b.budget.total_spent = total;
            for a in &mut b.allocations {
                a.spent_amount = total;
            }
        }
    }

    fn not_found(id: &str) -> Error {
        Error::Database(DatabaseError::NotFound(format!("Budget {id}")))
    }

    #[async_trait]
    impl BudgetRepositoryTrait for MockBudgetRepository {
        fn get_budget(&self, budget_id: &str) -> Result<Budget> {
            self.get_budget_with_allocations(budget_id).map(|b| b.budget)
        }

        fn get_budget_with_allocations(&self, budget_id: &str) -> Result<BudgetWithAllocations> {
            let state = self.state.lock().unwrap();
            state
                .budgets
                .iter()
                .find(|b| b.budget.id == budget_id)
                .cloned()
                .ok_or_else(|| not_found(budget_id))
        }

        fn get_allocation(
            &self,
            budget_id: &str,
            category_id: &str,
        ) -> Result<Option<BudgetCategoryAllocation>> {
            let budget = self.get_budget_with_allocations(budget_id)?;
            Ok(budget.allocation_for(category_id).cloned())
        }

        fn list_budgets_for_user(&self, user_id: &str) -> Result<Vec<Budget>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .budgets
                .iter()
                .filter(|b| b.budget.user_id == user_id)
                .map(|b| b.budget.clone())
                .collect())
        }

        fn list_active_budgets_covering(
            &self,
            user_id: &str,
            date: NaiveDate,
        ) -> Result<Vec<BudgetWithAllocations>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .budgets
                .iter()
                .filter(|b| b.budget.user_id == user_id && b.budget.covers(date))
                .cloned()
                .collect())
        }

        fn list_impacts_for_transaction(&self, transaction_id: &str) -> Result<Vec<ImpactEntry>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .impacts
                .iter()
                .filter(|i| i.transaction_id == transaction_id)
                .cloned()
                .collect())
        }

        fn list_impacts_for_budget(&self, budget_id: &str) -> Result<Vec<ImpactEntry>> {
            let state = self.state.lock().unwrap();
            Ok(state
                .impacts
                .iter()
                .filter(|i| i.budget_id == budget_id)
                .cloned()
                .collect())
        }

        async fn create_budget(&self, new_budget: NewBudget) -> Result<BudgetWithAllocations> {
            let id = new_budget.id.clone().unwrap_or_else(|| "generated".to_string());
            let created = BudgetWithAllocations {
                budget: Budget {
                    id: id.clone(),
                    user_id: new_budget.user_id.clone(),
                    name: new_budget.name.clone(),
                    start_date: new_budget.start_date,
                    end_date: new_budget.end_date,
                    total_allocated: new_budget.total_allocated(),
                    total_spent: Decimal::ZERO,
                    status: BudgetStatus::Active,
                    created_at: NaiveDateTime::default(),
                    updated_at: NaiveDateTime::default(),
                },
                allocations: new_budget
                    .allocations
                    .iter()
                    .map(|a| BudgetCategoryAllocation {
                        id: format!("{id}-{}", a.category_id),
                        budget_id: id.clone(),
                        category_id: a.category_id.clone(),
                        allocated_amount: a.allocated_amount,
                        spent_amount: Decimal::ZERO,
                    })
                    .collect(),
            };
            self.add_budget(created.clone());
            Ok(created)
        }

        async fn update_budget_status(
            &self,
            budget_id: &str,
            status: BudgetStatus,
        ) -> Result<Budget> {
            let mut state = self.state.lock().unwrap();
            let b = state
                .budgets
                .iter_mut()
                .find(|b| b.budget.id == budget_id)
                .ok_or_else(|| not_found(budget_id))?;
            b.budget.status = status;
            Ok(b.budget.clone())
        }

        async fn delete_budget(&self, _budget_id: &str) -> Result<usize> {
            unimplemented!()
        }

        async fn commit_impacts(
            &self,
            transaction_id: &str,
            planned: Vec<PlannedImpact>,
        ) -> Result<Vec<ImpactEntry>> {
            let mut state = self.state.lock().unwrap();
            if state.impacts.iter().any(|i| i.transaction_id == transaction_id) {
                return Err(Error::ImpactAlreadyApplied(transaction_id.to_string()));
            }
            let mut written = Vec::new();
            for p in planned {
                state.next_id += 1;
                let entry = ImpactEntry {
                    id: format!("impact-{}", state.next_id),
                    transaction_id: transaction_id.to_string(),
                    budget_id: p.budget_id.clone(),
                    category_id: p.category_id.clone(),
                    amount: p.amount,
                    created_at: NaiveDateTime::default(),
                };
                let b = state
                    .budgets
                    .iter_mut()
                    .find(|b| b.budget.id == p.budget_id)
                    .ok_or_else(|| not_found(&p.budget_id))?;
                b.budget.total_spent = apply_delta(b.budget.total_spent, p.amount);
                for a in b.allocations.iter_mut().filter(|a| a.id == p.allocation_id) {
                    a.spent_amount = apply_delta(a.spent_amount, p.amount);
                }
                state.impacts.push(entry.clone());
                written.push(entry);
            }
            Ok(written)
        }

        async fn remove_impacts(&self, transaction_id: &str) -> Result<Vec<ImpactEntry>> {
            let mut state = self.state.lock().unwrap();
            let (removed, kept): (Vec<_>, Vec<_>) = state
                .impacts
                .drain(..)
                .partition(|i| i.transaction_id == transaction_id);
            state.impacts = kept;
            for entry in &removed {
                if let Some(b) = state
                    .budgets
                    .iter_mut()
                    .find(|b| b.budget.id == entry.budget_id)
                {
                    b.budget.total_spent = reverse_delta(b.budget.total_spent, entry.amount);
                    for a in b
                        .allocations
                        .iter_mut()
                        .filter(|a| a.category_id == entry.category_id)
                    {
                        a.spent_amount = reverse_delta(a.spent_amount, entry.amount);
                    }
                }
            }
            Ok(removed)
        }

        async fn recompute_aggregates(&self, budget_id: &str) -> Result<BudgetWithAllocations> {
            let mut state = self.state.lock().unwrap();
            let impacts = state.impacts.clone();
            let b = state
                .budgets
                .iter_mut()
                .find(|b| b.budget.id == budget_id)
                .ok_or_else(|| not_found(budget_id))?;
            let rebuilt = recompute_aggregates(b, &impacts);
            b.budget.total_spent = rebuilt.total_spent;
            for (allocation_id, spent) in rebuilt.allocation_spent {
                if let Some(a) = b.allocations.iter_mut().find(|a| a.id == allocation_id) {
                    a.spent_amount = spent;
                }
            }
            Ok(b.clone())
        }
    }

    // --- Helpers ---
    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_budget(id: &str, start: NaiveDate, end: NaiveDate, food: Decimal) -> NewBudget {
        NewBudget {
            id: Some(id.to_string()),
            user_id: "user-1".to_string(),
            name: id.to_uppercase(),
            start_date: start,
            end_date: end,
            allocations: vec![NewAllocation {
                category_id: "food".to_string(),
                allocated_amount: food,
            }],
        }
    }

    fn food_request(tx: &str, amount: Decimal, on: NaiveDate) -> ImpactRequest {
        ImpactRequest {
            user_id: "user-1".to_string(),
            category_id: "food".to_string(),
            amount,
            date: on,
            transaction_id: tx.to_string(),
        }
    }

    async fn setup() -> (BudgetLedger, MockBudgetRepository) {
        let repo = MockBudgetRepository::default();
        let ledger = BudgetLedger::new(Arc::new(repo.clone()));
        ledger
            .create_budget(new_budget("jan", date(2024, 1, 1), date(2024, 1, 31), dec!(300)))
            .await
            .unwrap();
        (ledger, repo)
    }

    #[tokio::test]
    async fn apply_increments_budget_and_allocation() {
        let (ledger, repo) = setup().await;

        let applied = ledger
            .apply_impact(food_request("tx-1", dec!(120.40), date(2024, 1, 10)))
            .await
            .unwrap();

        assert_eq!(
            applied,
            vec![AppliedImpact {
                budget_id: "jan".to_string(),
                budget_name: "JAN".to_string(),
                amount: dec!(120.40),
            }]
        );
        let budget = repo.get_budget_with_allocations("jan").unwrap();
        assert_eq!(budget.budget.total_spent, dec!(120.40));
        assert_eq!(budget.allocations[0].spent_amount, dec!(120.40));
        assert_eq!(repo.list_impacts_for_transaction("tx-1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn apply_outside_period_or_category_is_not_an_error() {
        let (ledger, repo) = setup().await;

        let outside = ledger
            .apply_impact(food_request("tx-1", dec!(10), date(2024, 2, 1)))
            .await
            .unwrap();
        let mut rent = food_request("tx-2", dec!(10), date(2024, 1, 5));
        rent.category_id = "rent".to_string();
        let unbudgeted = ledger.apply_impact(rent).await.unwrap();

        assert!(outside.is_empty());
        assert!(unbudgeted.is_empty());
        assert_eq!(repo.impact_count(), 0);
    }

    #[tokio::test]
    async fn apply_twice_is_rejected_without_double_counting() {
        let (ledger, repo) = setup().await;
        let request = food_request("tx-1", dec!(50), date(2024, 1, 10));

        ledger.apply_impact(request.clone()).await.unwrap();
        let second = ledger.apply_impact(request).await;

        assert!(matches!(second, Err(Error::ImpactAlreadyApplied(id)) if id == "tx-1"));
        assert_eq!(repo.get_budget("jan").unwrap().total_spent, dec!(50));
    }

    #[tokio::test]
    async fn apply_rejects_non_positive_amount() {
        let (ledger, _) = setup().await;
        let result = ledger
            .apply_impact(food_request("tx-1", Decimal::ZERO, date(2024, 1, 10)))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn overlapping_budgets_each_take_full_amount() {
        let (ledger, repo) = setup().await;
        ledger
            .create_budget(new_budget("year", date(2024, 1, 1), date(2024, 12, 31), dec!(3000)))
            .await
            .unwrap();

        let applied = ledger
            .apply_impact(food_request("tx-1", dec!(75), date(2024, 1, 20)))
            .await
            .unwrap();

        assert_eq!(applied.len(), 2);
        assert_eq!(repo.impact_count(), 2);
        assert_eq!(repo.get_budget("jan").unwrap().total_spent, dec!(75));
        assert_eq!(repo.get_budget("year").unwrap().total_spent, dec!(75));
    }

    #[tokio::test]
    async fn reverse_is_exact_inverse_of_apply() {
        let (ledger, repo) = setup().await;
        ledger
            .apply_impact(food_request("tx-0", dec!(33.33), date(2024, 1, 3)))
            .await
            .unwrap();
        let before = repo.get_budget_with_allocations("jan").unwrap();

        ledger
            .apply_impact(food_request("tx-1", dec!(19.99), date(2024, 1, 4)))
            .await
            .unwrap();
        let removed = ledger.reverse_impact("tx-1").await.unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(repo.get_budget_with_allocations("jan").unwrap(), before);
        assert!(repo.list_impacts_for_transaction("tx-1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn reverse_without_impacts_is_a_no_op() {
        let (ledger, repo) = setup().await;
        let removed = ledger.reverse_impact("never-applied").await.unwrap();
        assert!(removed.is_empty());
        assert_eq!(repo.get_budget("jan").unwrap().total_spent, Decimal::ZERO);
    }

    #[tokio::test]
    async fn recompute_repairs_drift() {
        let (ledger, repo) = setup().await;
        for (tx, amount) in [("a", dec!(10)), ("b", dec!(20)), ("c", dec!(30))] {
            ledger
                .apply_impact(food_request(tx, amount, date(2024, 1, 15)))
                .await
                .unwrap();
        }
        ledger.reverse_impact("b").await.unwrap();
        repo.set_total_spent("jan", dec!(999));

        let rebuilt = ledger.recompute_budget("jan").await.unwrap();

        assert_eq!(rebuilt.budget.total_spent, dec!(40));
        assert_eq!(rebuilt.allocations[0].spent_amount, dec!(40));
    }

    #[tokio::test]
    async fn over_limit_reports_only_exceeding_allocations() {
        let (ledger, _) = setup().await;
        ledger
            .apply_impact(food_request("tx-1", dec!(300), date(2024, 1, 2)))
            .await
            .unwrap();
        assert!(!ledger.is_over_limit("jan", "food").unwrap());
        assert!(ledger.over_limit_categories("jan").unwrap().is_empty());

        ledger
            .apply_impact(food_request("tx-2", dec!(0.01), date(2024, 1, 3)))
            .await
            .unwrap();
        assert!(ledger.is_over_limit("jan", "food").unwrap());
        assert!(!ledger.is_over_limit("jan", "rent").unwrap());
        let over = ledger.over_limit_categories("jan").unwrap();
        assert_eq!(over.len(), 1);
        assert_eq!(over[0].category_id, "food");
    }

    #[tokio::test]
    async fn over_limit_on_unknown_budget_is_not_found() {
        let (ledger, _) = setup().await;

        let err = ledger.is_over_limit("missing", "food").unwrap_err();

        assert!(err.is_not_found());
        assert!(!ledger.is_over_limit("jan", "rent").unwrap());
    }

    #[tokio::test]
    async fn cancelled_budget_stops_collecting_impacts() {
        let (ledger, repo) = setup().await;
        ledger
            .set_budget_status("jan", BudgetStatus::Cancelled)
            .await
            .unwrap();
        let applied = ledger
            .apply_impact(food_request("tx-1", dec!(10), date(2024, 1, 10)))
            .await
            .unwrap();
        assert!(applied.is_empty());
        assert_eq!(repo.impact_count(), 0);
    }

    #[tokio::test]
    async fn create_budget_rejects_inverted_period() {
        let (ledger, _) = setup().await;
        let result = ledger
            .create_budget(new_budget("bad", date(2024, 2, 1), date(2024, 1, 1), dec!(1)))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
