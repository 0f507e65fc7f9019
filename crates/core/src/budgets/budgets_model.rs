//! Budget, allocation and impact models.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{BUDGET_STATUS_ACTIVE, BUDGET_STATUS_CANCELLED, BUDGET_STATUS_COMPLETED};
use crate::errors::{Error, Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    Active,
    Completed,
    Cancelled,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Active => BUDGET_STATUS_ACTIVE,
            BudgetStatus::Completed => BUDGET_STATUS_COMPLETED,
            BudgetStatus::Cancelled => BUDGET_STATUS_CANCELLED,
        }
    }
}

impl FromStr for BudgetStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            BUDGET_STATUS_ACTIVE => Ok(BudgetStatus::Active),
            BUDGET_STATUS_COMPLETED => Ok(BudgetStatus::Completed),
            BUDGET_STATUS_CANCELLED => Ok(BudgetStatus::Cancelled),
            other => Err(ValidationError::UnknownCode {
                kind: "budget status",
                value: other.to_string(),
            }
            .into()),
        }
    }
}

/// A spending plan over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_allocated: Decimal,
    /// Running sum of every impact entry recorded against this budget.
    pub total_spent: Decimal,
    pub status: BudgetStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Budget {
    /// Active and `start_date <= date <= end_date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.status == BudgetStatus::Active && self.start_date <= date && date <= self.end_date
    }
}

/// Per-category slice of a budget. At most one per (budget, category).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategoryAllocation {
    pub id: String,
    pub budget_id: String,
    pub category_id: String,
    pub allocated_amount: Decimal,
    pub spent_amount: Decimal,
}

impl BudgetCategoryAllocation {
    pub fn is_over_limit(&self) -> bool {
        self.spent_amount > self.allocated_amount
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetWithAllocations {
    pub budget: Budget,
    pub allocations: Vec<BudgetCategoryAllocation>,
}

impl BudgetWithAllocations {
    pub fn allocation_for(&self, category_id: &str) -> Option<&BudgetCategoryAllocation> {
        self.allocations
            .iter()
            .find(|a| a.category_id == category_id)
    }
}

/// Immutable record that a transaction counted against a budget category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactEntry {
    pub id: String,
    pub transaction_id: String,
    pub budget_id: String,
    pub category_id: String,
    pub amount: Decimal,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAllocation {
    pub category_id: String,
    pub allocated_amount: Decimal,
}

/// Input model for creating a budget together with its allocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub allocations: Vec<NewAllocation>,
}

impl NewBudget {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingField("userId".to_string()).into());
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        if self.start_date > self.end_date {
            return Err(ValidationError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            }
            .into());
        }
        let mut seen = HashSet::new();
        for allocation in &self.allocations {
            if allocation.allocated_amount < Decimal::ZERO {
                return Err(ValidationError::InvalidAmount(allocation.allocated_amount).into());
            }
            if !seen.insert(allocation.category_id.as_str()) {
                return Err(ValidationError::InvalidInput(format!(
                    "Category {} is allocated more than once",
                    allocation.category_id
                ))
                .into());
            }
        }
        Ok(())
    }

    pub fn total_allocated(&self) -> Decimal {
        self.allocations.iter().map(|a| a.allocated_amount).sum()
    }
}

/// What `apply_impact` needs to know about a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactRequest {
    pub user_id: String,
    pub category_id: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub transaction_id: String,
}

/// One impact entry about to be written, with the allocation it increments.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedImpact {
    pub budget_id: String,
    pub budget_name: String,
    pub allocation_id: String,
    pub category_id: String,
    pub amount: Decimal,
}

/// Returned to callers of `apply_impact` for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedImpact {
    pub budget_id: String,
    pub budget_name: String,
    pub amount: Decimal,
}

impl From<&PlannedImpact> for AppliedImpact {
    fn from(planned: &PlannedImpact) -> Self {
        Self {
            budget_id: planned.budget_id.clone(),
            budget_name: planned.budget_name.clone(),
            amount: planned.amount,
        }
    }
}

/// Aggregate values rebuilt from the impact log.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetAggregates {
    pub budget_id: String,
    pub total_spent: Decimal,
    /// `(allocation_id, spent_amount)` for every allocation of the budget.
    pub allocation_spent: Vec<(String, Decimal)>,
}
