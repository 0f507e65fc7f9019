#[cfg(test)]
mod tests {
    use crate::budgets::{
        AppliedImpact, Budget, BudgetCategoryAllocation, BudgetLedgerTrait, BudgetStatus,
        BudgetWithAllocations, ImpactEntry, ImpactRequest, NewBudget,
    };
    use crate::errors::{DatabaseError, Error, Result};
    use crate::recurrence::TransactionType;
    use crate::transactions::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    // --- Mock TransactionRepository ---
    #[derive(Clone, Default)]
    struct MockTransactionRepository {
        transactions: Arc<Mutex<Vec<MaterializedTransaction>>>,
        fail_updates: Arc<Mutex<bool>>,
    }

    impl MockTransactionRepository {
        fn len(&self) -> usize {
            self.transactions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TransactionRepositoryTrait for MockTransactionRepository {
        fn get_transaction(&self, transaction_id: &str) -> Result<MaterializedTransaction> {
            self.transactions
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == transaction_id)
                .cloned()
                .ok_or_else(|| {
                    Error::Database(DatabaseError::NotFound(transaction_id.to_string()))
                })
        }

        fn count_transactions_for_rule(&self, _rule_id: &str) -> Result<u64> {
            unimplemented!()
        }

        fn find_transaction_for_rule(
            &self,
            _rule_id: &str,
            _date: NaiveDate,
        ) -> Result<Option<String>> {
            unimplemented!()
        }

        fn list_transactions_for_rule(
            &self,
            _rule_id: &str,
        ) -> Result<Vec<MaterializedTransaction>> {
            unimplemented!()
        }

        async fn create_transaction(
            &self,
            new_transaction: NewTransaction,
        ) -> Result<MaterializedTransaction> {
            let mut transactions = self.transactions.lock().unwrap();
            let created = MaterializedTransaction {
                id: new_transaction
                    .id
                    .unwrap_or_else(|| format!("tx-{}", transactions.len() + 1)),
                recurrence_rule_id: new_transaction.recurrence_rule_id,
                user_id: new_transaction.user_id,
                category_id: new_transaction.category_id,
                transaction_type: new_transaction.transaction_type,
                amount: new_transaction.amount,
                date: new_transaction.date,
                description: new_transaction.description,
                created_at: NaiveDateTime::default(),
            };
            transactions.push(created.clone());
            Ok(created)
        }

        async fn update_transaction(
            &self,
            update: TransactionUpdate,
        ) -> Result<MaterializedTransaction> {
            if *self.fail_updates.lock().unwrap() {
                return Err(Error::Database(DatabaseError::QueryFailed(
                    "disk full".to_string(),
                )));
            }
            let mut transactions = self.transactions.lock().unwrap();
            let t = transactions
                .iter_mut()
                .find(|t| t.id == update.id)
                .ok_or_else(|| Error::Database(DatabaseError::NotFound(update.id.clone())))?;
            t.category_id = update.category_id;
            t.transaction_type = update.transaction_type;
            t.amount = update.amount;
            t.date = update.date;
            t.description = update.description;
            Ok(t.clone())
        }

        async fn delete_transaction(&self, transaction_id: &str) -> Result<usize> {
            let mut transactions = self.transactions.lock().unwrap();
            let before = transactions.len();
            transactions.retain(|t| t.id != transaction_id);
            Ok(before - transactions.len())
        }
    }

    // --- Mock BudgetLedger ---
    /// Records calls and keeps one impact per applied transaction.
    #[derive(Clone, Default)]
    struct MockLedger {
        calls: Arc<Mutex<Vec<String>>>,
        applied: Arc<Mutex<Vec<ImpactRequest>>>,
        fail_category: Arc<Mutex<Option<String>>>,
    }

    impl MockLedger {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn applied(&self) -> Vec<ImpactRequest> {
            self.applied.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BudgetLedgerTrait for MockLedger {
        async fn create_budget(&self, _new_budget: NewBudget) -> Result<BudgetWithAllocations> {
            unimplemented!()
        }

        async fn set_budget_status(
            &self,
            _budget_id: &str,
            _status: BudgetStatus,
        ) -> Result<Budget> {
            unimplemented!()
        }

        async fn apply_impact(&self, request: ImpactRequest) -> Result<Vec<AppliedImpact>> {
            self.calls.lock().unwrap().push(format!(
                "apply:{}:{}:{}",
                request.transaction_id, request.category_id, request.amount
            ));
            if self.fail_category.lock().unwrap().as_deref() == Some(request.category_id.as_str())
            {
                return Err(Error::Unexpected("ledger unavailable".to_string()));
            }
            let impact = AppliedImpact {
                budget_id: "budget-1".to_string(),
                budget_name: "Monthly".to_string(),
                amount: request.amount,
            };
            self.applied.lock().unwrap().push(request);
            Ok(vec![impact])
        }

        async fn reverse_impact(&self, transaction_id: &str) -> Result<Vec<ImpactEntry>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("reverse:{transaction_id}"));
            let mut applied = self.applied.lock().unwrap();
            let removed: Vec<ImpactEntry> = applied
                .iter()
                .filter(|r| r.transaction_id == transaction_id)
                .map(|r| ImpactEntry {
                    id: format!("impact-{}", r.transaction_id),
                    transaction_id: r.transaction_id.clone(),
                    budget_id: "budget-1".to_string(),
                    category_id: r.category_id.clone(),
                    amount: r.amount,
                    created_at: NaiveDateTime::default(),
                })
                .collect();
            applied.retain(|r| r.transaction_id != transaction_id);
            Ok(removed)
        }

        async fn recompute_budget(&self, _budget_id: &str) -> Result<BudgetWithAllocations> {
            unimplemented!()
        }

        fn is_over_limit(&self, _budget_id: &str, _category_id: &str) -> Result<bool> {
            unimplemented!()
        }

        fn over_limit_categories(
            &self,
            _budget_id: &str,
        ) -> Result<Vec<BudgetCategoryAllocation>> {
            unimplemented!()
        }
    }

    // --- Helpers ---
    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_expense(category: &str, amount: Decimal) -> NewTransaction {
        NewTransaction {
            id: None,
            recurrence_rule_id: None,
            user_id: "user-1".to_string(),
            category_id: category.to_string(),
            transaction_type: TransactionType::Expense,
            amount,
            date: date(2024, 1, 10),
            description: "Dinner".to_string(),
        }
    }

    fn setup() -> (TransactionService, MockTransactionRepository, MockLedger) {
        let repo = MockTransactionRepository::default();
        let ledger = MockLedger::default();
        let service = TransactionService::new(Arc::new(repo.clone()), Arc::new(ledger.clone()));
        (service, repo, ledger)
    }

    #[tokio::test]
    async fn create_expense_applies_impact() {
        let (service, repo, ledger) = setup();

        let (created, applied) = service
            .create_transaction(new_expense("food", dec!(42)))
            .await
            .unwrap();

        assert_eq!(repo.len(), 1);
        assert_eq!(applied.len(), 1);
        assert_eq!(ledger.calls(), vec![format!("apply:{}:food:42", created.id)]);
    }

    #[tokio::test]
    async fn create_income_is_routed_through_the_ledger() {
        let (service, repo, ledger) = setup();
        let mut income = new_expense("salary", dec!(3000));
        income.transaction_type = TransactionType::Income;

        let (created, _) = service.create_transaction(income).await.unwrap();

        assert_eq!(repo.len(), 1);
        assert_eq!(
            ledger.calls(),
            vec![format!("apply:{}:salary:3000", created.id)]
        );
    }

    #[tokio::test]
    async fn create_removes_transaction_when_apply_fails() {
        let (service, repo, ledger) = setup();
        *ledger.fail_category.lock().unwrap() = Some("food".to_string());

        let result = service.create_transaction(new_expense("food", dec!(10))).await;

        assert!(result.is_err());
        assert_eq!(repo.len(), 0);
    }

    #[tokio::test]
    async fn create_rejects_invalid_amount() {
        let (service, repo, _) = setup();
        let result = service
            .create_transaction(new_expense("food", dec!(-5)))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(repo.len(), 0);
    }

    #[tokio::test]
    async fn update_reverses_before_reapplying() {
        let (service, _, ledger) = setup();
        let (created, _) = service
            .create_transaction(new_expense("food", dec!(42)))
            .await
            .unwrap();

        let (updated, _) = service
            .update_transaction(TransactionUpdate {
                id: created.id.clone(),
                category_id: "fun".to_string(),
                transaction_type: TransactionType::Expense,
                amount: dec!(17),
                date: date(2024, 2, 3),
                description: "Cinema".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(updated.category_id, "fun");
        assert_eq!(
            ledger.calls(),
            vec![
                format!("apply:{}:food:42", created.id),
                format!("reverse:{}", created.id),
                format!("apply:{}:fun:17", created.id),
            ]
        );
        let applied = ledger.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].date, date(2024, 2, 3));
    }

    #[tokio::test]
    async fn update_to_income_reapplies_like_any_edit() {
        let (service, _, ledger) = setup();
        let (created, _) = service
            .create_transaction(new_expense("food", dec!(42)))
            .await
            .unwrap();

        let (_, applied) = service
            .update_transaction(TransactionUpdate {
                id: created.id.clone(),
                category_id: "food".to_string(),
                transaction_type: TransactionType::Income,
                amount: dec!(42),
                date: created.date,
                description: "Refund".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(applied.len(), 1);
        assert_eq!(
            ledger.calls(),
            vec![
                format!("apply:{}:food:42", created.id),
                format!("reverse:{}", created.id),
                format!("apply:{}:food:42", created.id),
            ]
        );
    }

    #[tokio::test]
    async fn failed_update_restores_previous_impact() {
        let (service, repo, ledger) = setup();
        let (created, _) = service
            .create_transaction(new_expense("food", dec!(42)))
            .await
            .unwrap();
        *repo.fail_updates.lock().unwrap() = true;

        let result = service
            .update_transaction(TransactionUpdate {
                id: created.id.clone(),
                category_id: "fun".to_string(),
                transaction_type: TransactionType::Expense,
                amount: dec!(1),
                date: created.date,
                description: "x".to_string(),
            })
            .await;

        assert!(result.is_err());
        let applied = ledger.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].category_id, "food");
        assert_eq!(applied[0].amount, dec!(42));
    }

    #[tokio::test]
    async fn failed_reapply_rolls_back_the_edit() {
        let (service, repo, ledger) = setup();
        let (created, _) = service
            .create_transaction(new_expense("food", dec!(42)))
            .await
            .unwrap();
        *ledger.fail_category.lock().unwrap() = Some("fun".to_string());

        let result = service
            .update_transaction(TransactionUpdate {
                id: created.id.clone(),
                category_id: "fun".to_string(),
                transaction_type: TransactionType::Expense,
                amount: dec!(5),
                date: created.date,
                description: "x".to_string(),
            })
            .await;

        assert!(result.is_err());
        let stored = repo.get_transaction(&created.id).unwrap();
        assert_eq!(stored.category_id, "food");
        assert_eq!(stored.amount, dec!(42));
        assert_eq!(ledger.applied().len(), 1);
    }

    #[tokio::test]
    async fn delete_reverses_then_removes() {
        let (service, repo, ledger) = setup();
        let (created, _) = service
            .create_transaction(new_expense("food", dec!(42)))
            .await
            .unwrap();

        let deleted = service.delete_transaction(&created.id).await.unwrap();

        assert_eq!(deleted.id, created.id);
        assert_eq!(repo.len(), 0);
        assert!(ledger.applied().is_empty());
        assert_eq!(ledger.calls().last().unwrap(), &format!("reverse:{}", created.id));
    }

    #[tokio::test]
    async fn delete_missing_transaction_is_not_found() {
        let (service, _, ledger) = setup();
        let result = service.delete_transaction("nope").await;
        assert!(matches!(result, Err(e) if e.is_not_found()));
        assert!(ledger.calls().is_empty());
    }
}
