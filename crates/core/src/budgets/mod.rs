//! Budgets module - impact ledger, models, and traits.

mod budget_ledger;
mod budgets_model;
mod budgets_traits;
pub mod impact_calculator;

#[cfg(test)]
mod budget_ledger_tests;

pub use budget_ledger::BudgetLedger;
pub use budgets_model::{
    AppliedImpact, Budget, BudgetAggregates, BudgetCategoryAllocation, BudgetStatus,
    BudgetWithAllocations, ImpactEntry, ImpactRequest, NewAllocation, NewBudget, PlannedImpact,
};
pub use budgets_traits::{BudgetLedgerTrait, BudgetRepositoryTrait};
