//! Pure aggregate arithmetic for the budget ledger.
//!
//! Storage adapters call these inside their write transactions so that the
//! numbers written are the same ones exercised by the tests below.

use rust_decimal::Decimal;

use super::budgets_model::{
    BudgetAggregates, BudgetWithAllocations, ImpactEntry, ImpactRequest, PlannedImpact,
};

/// Aggregate after counting `amount` against it.
pub fn apply_delta(aggregate: Decimal, amount: Decimal) -> Decimal {
    aggregate + amount
}

/// Aggregate after un-counting `amount`, never below zero.
pub fn reverse_delta(aggregate: Decimal, amount: Decimal) -> Decimal {
    (aggregate - amount).max(Decimal::ZERO)
}

/// The impact entries a transaction produces against `candidates`.
///
/// A budget is hit when it belongs to the same user, is active, covers the
/// date and allocates the category. Each hit carries the full amount; nothing
/// is split across overlapping budgets.
pub fn plan_impacts(
    request: &ImpactRequest,
    candidates: &[BudgetWithAllocations],
) -> Vec<PlannedImpact> {
    candidates
        .iter()
        .filter(|b| b.budget.user_id == request.user_id && b.budget.covers(request.date))
        .filter_map(|b| {
            b.allocation_for(&request.category_id)
                .map(|allocation| PlannedImpact {
                    budget_id: b.budget.id.clone(),
                    budget_name: b.budget.name.clone(),
                    allocation_id: allocation.id.clone(),
                    category_id: allocation.category_id.clone(),
                    amount: request.amount,
                })
        })
        .collect()
}

/// Rebuilds a budget's aggregates from its impact entries.
///
/// Entries for other budgets are ignored, so callers may pass a wider log.
pub fn recompute_aggregates(
    budget: &BudgetWithAllocations,
    impacts: &[ImpactEntry],
) -> BudgetAggregates {
    let own: Vec<&ImpactEntry> = impacts
        .iter()
        .filter(|i| i.budget_id == budget.budget.id)
        .collect();

    let total_spent = own.iter().map(|i| i.amount).sum();
    let allocation_spent = budget
        .allocations
        .iter()
        .map(|allocation| {
            let spent = own
                .iter()
                .filter(|i| i.category_id == allocation.category_id)
                .map(|i| i.amount)
                .sum();
            (allocation.id.clone(), spent)
        })
        .collect();

    BudgetAggregates {
        budget_id: budget.budget.id.clone(),
        total_spent,
        allocation_spent,
    }
}
