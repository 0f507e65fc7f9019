//! Database models for budgets, allocations and impact entries.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use tallybook_core::budgets::{
    Budget, BudgetCategoryAllocation, BudgetWithAllocations, ImpactEntry,
};
use tallybook_core::errors::Error;

use crate::utils::parse_decimal;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::budgets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct BudgetDB {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_allocated: String,
    pub total_spent: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Associations,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(belongs_to(BudgetDB, foreign_key = budget_id))]
#[diesel(table_name = crate::schema::budget_categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategoryDB {
    pub id: String,
    pub budget_id: String,
    pub category_id: String,
    pub allocated_amount: String,
    pub spent_amount: String,
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::budget_impacts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct BudgetImpactDB {
    pub id: String,
    pub transaction_id: String,
    pub budget_id: String,
    pub category_id: String,
    pub amount: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<BudgetDB> for Budget {
    type Error = Error;

    fn try_from(db: BudgetDB) -> Result<Self, Self::Error> {
        Ok(Budget {
            total_allocated: parse_decimal(&db.total_allocated, "total_allocated")?,
            total_spent: parse_decimal(&db.total_spent, "total_spent")?,
            status: db.status.parse()?,
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            start_date: db.start_date,
            end_date: db.end_date,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl TryFrom<BudgetCategoryDB> for BudgetCategoryAllocation {
    type Error = Error;

    fn try_from(db: BudgetCategoryDB) -> Result<Self, Self::Error> {
        Ok(BudgetCategoryAllocation {
            allocated_amount: parse_decimal(&db.allocated_amount, "allocated_amount")?,
            spent_amount: parse_decimal(&db.spent_amount, "spent_amount")?,
            id: db.id,
            budget_id: db.budget_id,
            category_id: db.category_id,
        })
    }
}

impl TryFrom<BudgetImpactDB> for ImpactEntry {
    type Error = Error;

    fn try_from(db: BudgetImpactDB) -> Result<Self, Self::Error> {
        Ok(ImpactEntry {
            amount: parse_decimal(&db.amount, "amount")?,
            id: db.id,
            transaction_id: db.transaction_id,
            budget_id: db.budget_id,
            category_id: db.category_id,
            created_at: db.created_at,
        })
    }
}

/// Assembles a budget and its allocation rows.
pub fn with_allocations(
    budget: BudgetDB,
    allocations: Vec<BudgetCategoryDB>,
) -> Result<BudgetWithAllocations, Error> {
    Ok(BudgetWithAllocations {
        budget: budget.try_into()?,
        allocations: allocations
            .into_iter()
            .map(BudgetCategoryAllocation::try_from)
            .collect::<Result<Vec<_>, _>>()?,
    })
}
