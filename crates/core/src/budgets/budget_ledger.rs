use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use rust_decimal::Decimal;

use super::budgets_model::{
    AppliedImpact, Budget, BudgetCategoryAllocation, BudgetStatus, BudgetWithAllocations,
    ImpactEntry, ImpactRequest, NewBudget,
};
use super::budgets_traits::{BudgetLedgerTrait, BudgetRepositoryTrait};
use super::impact_calculator::plan_impacts;
use crate::errors::{Result, ValidationError};

/// Keeps budget aggregates equal to the sum of their impact entries.
pub struct BudgetLedger {
    repository: Arc<dyn BudgetRepositoryTrait>,
}

impl BudgetLedger {
    pub fn new(repository: Arc<dyn BudgetRepositoryTrait>) -> Self {
        BudgetLedger { repository }
    }

    fn validate_request(request: &ImpactRequest) -> Result<()> {
        if request.transaction_id.trim().is_empty() {
            return Err(ValidationError::MissingField("transactionId".to_string()).into());
        }
        if request.amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount(request.amount).into());
        }
        Ok(())
    }
}

#[async_trait]
impl BudgetLedgerTrait for BudgetLedger {
    async fn create_budget(&self, new_budget: NewBudget) -> Result<BudgetWithAllocations> {
        new_budget.validate()?;
        self.repository.create_budget(new_budget).await
    }

    async fn set_budget_status(&self, budget_id: &str, status: BudgetStatus) -> Result<Budget> {
        self.repository.update_budget_status(budget_id, status).await
    }

    async fn apply_impact(&self, request: ImpactRequest) -> Result<Vec<AppliedImpact>> {
        Self::validate_request(&request)?;

        let candidates = self
            .repository
            .list_active_budgets_covering(&request.user_id, request.date)?;
        let planned = plan_impacts(&request, &candidates);
        if planned.is_empty() {
            debug!(
                "Transaction {} on {} matches no budget allocation",
                request.transaction_id, request.date
            );
            return Ok(Vec::new());
        }

        let applied: Vec<AppliedImpact> = planned.iter().map(AppliedImpact::from).collect();
        self.repository
            .commit_impacts(&request.transaction_id, planned)
            .await?;

        debug!(
            "Applied transaction {} to {} budget(s)",
            request.transaction_id,
            applied.len()
        );
        Ok(applied)
    }

    async fn reverse_impact(&self, transaction_id: &str) -> Result<Vec<ImpactEntry>> {
        let removed = self.repository.remove_impacts(transaction_id).await?;
        if !removed.is_empty() {
            debug!(
                "Reversed {} impact entr(ies) of transaction {}",
                removed.len(),
                transaction_id
            );
        }
        Ok(removed)
    }

    async fn recompute_budget(&self, budget_id: &str) -> Result<BudgetWithAllocations> {
        let before = self.repository.get_budget(budget_id)?;
        let rebuilt = self.repository.recompute_aggregates(budget_id).await?;
        if before.total_spent != rebuilt.budget.total_spent {
            info!(
                "Budget {} drifted: stored total {} rebuilt as {}",
                budget_id, before.total_spent, rebuilt.budget.total_spent
            );
        }
        Ok(rebuilt)
    }

    fn is_over_limit(&self, budget_id: &str, category_id: &str) -> Result<bool> {
        self.repository.get_budget(budget_id)?;
        Ok(self
            .repository
            .get_allocation(budget_id, category_id)?
            .is_some_and(|allocation| allocation.is_over_limit()))
    }

    fn over_limit_categories(&self, budget_id: &str) -> Result<Vec<BudgetCategoryAllocation>> {
        let budget = self.repository.get_budget_with_allocations(budget_id)?;
        Ok(budget
            .allocations
            .into_iter()
            .filter(BudgetCategoryAllocation::is_over_limit)
            .collect())
    }
}
