use crate::budgets::budgets_model::{
    AppliedImpact, Budget, BudgetCategoryAllocation, BudgetStatus, BudgetWithAllocations,
    ImpactEntry, ImpactRequest, NewBudget, PlannedImpact,
};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Trait for budget, allocation and impact storage.
///
/// `commit_impacts`, `remove_impacts` and `recompute_aggregates` are atomic:
/// impact rows and the aggregates they feed are written in one unit.
#[async_trait]
pub trait BudgetRepositoryTrait: Send + Sync {
    fn get_budget(&self, budget_id: &str) -> Result<Budget>;
    fn get_budget_with_allocations(&self, budget_id: &str) -> Result<BudgetWithAllocations>;
    fn get_allocation(
        &self,
        budget_id: &str,
        category_id: &str,
    ) -> Result<Option<BudgetCategoryAllocation>>;
    fn list_budgets_for_user(&self, user_id: &str) -> Result<Vec<Budget>>;
    /// Active budgets of `user_id` whose period contains `date`.
    fn list_active_budgets_covering(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<BudgetWithAllocations>>;
    fn list_impacts_for_transaction(&self, transaction_id: &str) -> Result<Vec<ImpactEntry>>;
    fn list_impacts_for_budget(&self, budget_id: &str) -> Result<Vec<ImpactEntry>>;

    async fn create_budget(&self, new_budget: NewBudget) -> Result<BudgetWithAllocations>;
    async fn update_budget_status(&self, budget_id: &str, status: BudgetStatus) -> Result<Budget>;
    async fn delete_budget(&self, budget_id: &str) -> Result<usize>;

    /// Inserts one impact entry per planned impact and increments the
    /// matching allocation and budget totals. Fails with
    /// `Error::ImpactAlreadyApplied` if the transaction already has entries.
    async fn commit_impacts(
        &self,
        transaction_id: &str,
        planned: Vec<PlannedImpact>,
    ) -> Result<Vec<ImpactEntry>>;

    /// Decrements aggregates by every entry of the transaction (floored at
    /// zero) and deletes those entries. Returns the removed entries.
    async fn remove_impacts(&self, transaction_id: &str) -> Result<Vec<ImpactEntry>>;

    /// Rewrites the budget's aggregates from its impact log.
    async fn recompute_aggregates(&self, budget_id: &str) -> Result<BudgetWithAllocations>;
}

/// Trait for the budget impact ledger
#[async_trait]
pub trait BudgetLedgerTrait: Send + Sync {
    async fn create_budget(&self, new_budget: NewBudget) -> Result<BudgetWithAllocations>;
    async fn set_budget_status(&self, budget_id: &str, status: BudgetStatus) -> Result<Budget>;

    /// Counts a transaction against every active budget that covers its date
    /// and allocates its category.
    async fn apply_impact(&self, request: ImpactRequest) -> Result<Vec<AppliedImpact>>;

    /// Undoes every impact of a transaction. A transaction without impacts is
    /// a no-op and yields an empty list.
    async fn reverse_impact(&self, transaction_id: &str) -> Result<Vec<ImpactEntry>>;

    /// Rebuilds a budget's totals from its impact entries.
    async fn recompute_budget(&self, budget_id: &str) -> Result<BudgetWithAllocations>;

    /// `spent > allocated` for the category. False when the budget does not
    /// allocate the category.
    fn is_over_limit(&self, budget_id: &str, category_id: &str) -> Result<bool>;

    fn over_limit_categories(&self, budget_id: &str) -> Result<Vec<BudgetCategoryAllocation>>;
}
