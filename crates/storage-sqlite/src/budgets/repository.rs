use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use rust_decimal::Decimal;
use uuid::Uuid;

use tallybook_core::budgets::impact_calculator::{self, apply_delta, reverse_delta};
use tallybook_core::budgets::{
    Budget, BudgetCategoryAllocation, BudgetRepositoryTrait, BudgetStatus, BudgetWithAllocations,
    ImpactEntry, NewBudget, PlannedImpact,
};
use tallybook_core::constants::{BUDGET_STATUS_ACTIVE, DECIMAL_PRECISION};
use tallybook_core::errors::Error;
use tallybook_core::Result;

use super::model::{with_allocations, BudgetCategoryDB, BudgetDB, BudgetImpactDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{budget_categories, budget_impacts, budgets};
use crate::utils::{format_decimal, parse_decimal};

pub struct BudgetRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl BudgetRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        BudgetRepository { pool, writer }
    }
}

fn load_budget(conn: &mut SqliteConnection, budget_id: &str) -> Result<BudgetWithAllocations> {
    let budget = budgets::table
        .find(budget_id)
        .first::<BudgetDB>(conn)
        .map_err(StorageError::from)?;
    let allocations = BudgetCategoryDB::belonging_to(&budget)
        .order(budget_categories::category_id.asc())
        .load::<BudgetCategoryDB>(conn)
        .map_err(StorageError::from)?;
    with_allocations(budget, allocations)
}

fn load_impacts(rows: Vec<BudgetImpactDB>) -> Result<Vec<ImpactEntry>> {
    rows.into_iter().map(ImpactEntry::try_from).collect()
}

fn set_allocation_spent(
    conn: &mut SqliteConnection,
    allocation_id: &str,
    spent: Decimal,
) -> Result<()> {
    diesel::update(budget_categories::table.find(allocation_id))
        .set(budget_categories::spent_amount.eq(format_decimal(spent)))
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

fn set_budget_spent(conn: &mut SqliteConnection, budget_id: &str, total: Decimal) -> Result<()> {
    diesel::update(budgets::table.find(budget_id))
        .set((
            budgets::total_spent.eq(format_decimal(total)),
            budgets::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

#[async_trait]
impl BudgetRepositoryTrait for BudgetRepository {
    fn get_budget(&self, budget_id: &str) -> Result<Budget> {
        let mut conn = get_connection(&self.pool)?;
        let row = budgets::table
            .find(budget_id)
            .first::<BudgetDB>(&mut conn)
            .map_err(StorageError::from)?;
        row.try_into()
    }

    fn get_budget_with_allocations(&self, budget_id: &str) -> Result<BudgetWithAllocations> {
        let mut conn = get_connection(&self.pool)?;
        load_budget(&mut conn, budget_id)
    }

    fn get_allocation(
        &self,
        budget_id: &str,
        category_id: &str,
    ) -> Result<Option<BudgetCategoryAllocation>> {
        let mut conn = get_connection(&self.pool)?;
        budget_categories::table
            .filter(budget_categories::budget_id.eq(budget_id))
            .filter(budget_categories::category_id.eq(category_id))
            .first::<BudgetCategoryDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(BudgetCategoryAllocation::try_from)
            .transpose()
    }

    fn list_budgets_for_user(&self, user_id: &str) -> Result<Vec<Budget>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = budgets::table
            .filter(budgets::user_id.eq(user_id))
            .order((budgets::start_date.asc(), budgets::id.asc()))
            .load::<BudgetDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(Budget::try_from).collect()
    }

    fn list_active_budgets_covering(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<BudgetWithAllocations>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = budgets::table
            .filter(budgets::user_id.eq(user_id))
            .filter(budgets::status.eq(BUDGET_STATUS_ACTIVE))
            .filter(budgets::start_date.le(date))
            .filter(budgets::end_date.ge(date))
            .order((budgets::start_date.asc(), budgets::id.asc()))
            .load::<BudgetDB>(&mut conn)
            .map_err(StorageError::from)?;
        let allocations = BudgetCategoryDB::belonging_to(&rows)
            .order(budget_categories::category_id.asc())
            .load::<BudgetCategoryDB>(&mut conn)
            .map_err(StorageError::from)?
            .grouped_by(&rows);

        rows.into_iter()
            .zip(allocations)
            .map(|(budget, allocations)| with_allocations(budget, allocations))
            .collect()
    }

    fn list_impacts_for_transaction(&self, transaction_id: &str) -> Result<Vec<ImpactEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = budget_impacts::table
            .filter(budget_impacts::transaction_id.eq(transaction_id))
            .order(budget_impacts::budget_id.asc())
            .load::<BudgetImpactDB>(&mut conn)
            .map_err(StorageError::from)?;
        load_impacts(rows)
    }

    fn list_impacts_for_budget(&self, budget_id: &str) -> Result<Vec<ImpactEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = budget_impacts::table
            .filter(budget_impacts::budget_id.eq(budget_id))
            .order((budget_impacts::created_at.asc(), budget_impacts::id.asc()))
            .load::<BudgetImpactDB>(&mut conn)
            .map_err(StorageError::from)?;
        load_impacts(rows)
    }

    async fn create_budget(&self, new_budget: NewBudget) -> Result<BudgetWithAllocations> {
        new_budget.validate()?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<BudgetWithAllocations> {
                let now = Utc::now().naive_utc();
                let budget_id = new_budget
                    .id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let budget_row = BudgetDB {
                    id: budget_id.clone(),
                    user_id: new_budget.user_id.clone(),
                    name: new_budget.name.clone(),
                    start_date: new_budget.start_date,
                    end_date: new_budget.end_date,
                    total_allocated: format_decimal(new_budget.total_allocated()),
                    total_spent: format_decimal(Decimal::ZERO),
                    status: BudgetStatus::Active.as_str().to_string(),
                    created_at: now,
                    updated_at: now,
                };
                diesel::insert_into(budgets::table)
                    .values(&budget_row)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                let allocation_rows: Vec<BudgetCategoryDB> = new_budget
                    .allocations
                    .iter()
                    .map(|allocation| BudgetCategoryDB {
                        id: Uuid::new_v4().to_string(),
                        budget_id: budget_id.clone(),
                        category_id: allocation.category_id.clone(),
                        allocated_amount: format_decimal(allocation.allocated_amount),
                        spent_amount: format_decimal(Decimal::ZERO),
                    })
                    .collect();
                if !allocation_rows.is_empty() {
                    diesel::insert_into(budget_categories::table)
                        .values(&allocation_rows)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }

                load_budget(conn, &budget_id)
            })
            .await
    }

    async fn update_budget_status(&self, budget_id: &str, status: BudgetStatus) -> Result<Budget> {
        let budget_id = budget_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Budget> {
                let updated = diesel::update(budgets::table.find(budget_id))
                    .set((
                        budgets::status.eq(status.as_str()),
                        budgets::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .returning(BudgetDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                updated.try_into()
            })
            .await
    }

    async fn delete_budget(&self, budget_id: &str) -> Result<usize> {
        let budget_id = budget_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(budgets::table.find(budget_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }

    async fn commit_impacts(
        &self,
        transaction_id: &str,
        planned: Vec<PlannedImpact>,
    ) -> Result<Vec<ImpactEntry>> {
        let transaction_id = transaction_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Vec<ImpactEntry>> {
                let existing = budget_impacts::table
                    .filter(budget_impacts::transaction_id.eq(&transaction_id))
                    .count()
                    .get_result::<i64>(conn)
                    .map_err(StorageError::from)?;
                if existing > 0 {
                    return Err(Error::ImpactAlreadyApplied(transaction_id));
                }

                let now = Utc::now().naive_utc();
                let mut written = Vec::with_capacity(planned.len());
                for impact in planned {
                    let amount = impact.amount.round_dp(DECIMAL_PRECISION);

                    let allocation = budget_categories::table
                        .find(&impact.allocation_id)
                        .first::<BudgetCategoryDB>(conn)
                        .map_err(StorageError::from)?;
                    let spent = parse_decimal(&allocation.spent_amount, "spent_amount")?;
                    set_allocation_spent(conn, &allocation.id, apply_delta(spent, amount))?;

                    let budget = budgets::table
                        .find(&impact.budget_id)
                        .first::<BudgetDB>(conn)
                        .map_err(StorageError::from)?;
                    let total = parse_decimal(&budget.total_spent, "total_spent")?;
                    set_budget_spent(conn, &budget.id, apply_delta(total, amount))?;

                    let row = BudgetImpactDB {
                        id: Uuid::new_v4().to_string(),
                        transaction_id: transaction_id.clone(),
                        budget_id: impact.budget_id,
                        category_id: impact.category_id,
                        amount: format_decimal(amount),
                        created_at: now,
                    };
                    diesel::insert_into(budget_impacts::table)
                        .values(&row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    written.push(ImpactEntry::try_from(row)?);
                }
                Ok(written)
            })
            .await
    }

    async fn remove_impacts(&self, transaction_id: &str) -> Result<Vec<ImpactEntry>> {
        let transaction_id = transaction_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Vec<ImpactEntry>> {
                let rows = budget_impacts::table
                    .filter(budget_impacts::transaction_id.eq(&transaction_id))
                    .load::<BudgetImpactDB>(conn)
                    .map_err(StorageError::from)?;
                let entries = load_impacts(rows)?;

                for entry in &entries {
                    let allocation = budget_categories::table
                        .filter(budget_categories::budget_id.eq(&entry.budget_id))
                        .filter(budget_categories::category_id.eq(&entry.category_id))
                        .first::<BudgetCategoryDB>(conn)
                        .optional()
                        .map_err(StorageError::from)?;
                    if let Some(allocation) = allocation {
                        let spent = parse_decimal(&allocation.spent_amount, "spent_amount")?;
                        set_allocation_spent(conn, &allocation.id, reverse_delta(spent, entry.amount))?;
                    }

                    let budget = budgets::table
                        .find(&entry.budget_id)
                        .first::<BudgetDB>(conn)
                        .map_err(StorageError::from)?;
                    let total = parse_decimal(&budget.total_spent, "total_spent")?;
                    set_budget_spent(conn, &budget.id, reverse_delta(total, entry.amount))?;
                }

                let deleted = diesel::delete(
                    budget_impacts::table.filter(budget_impacts::transaction_id.eq(&transaction_id)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                debug!(
                    "Removed {} impact row(s) for transaction {}",
                    deleted, transaction_id
                );
                Ok(entries)
            })
            .await
    }

    async fn recompute_aggregates(&self, budget_id: &str) -> Result<BudgetWithAllocations> {
        let budget_id = budget_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<BudgetWithAllocations> {
                let current = load_budget(conn, &budget_id)?;
                let rows = budget_impacts::table
                    .filter(budget_impacts::budget_id.eq(&budget_id))
                    .load::<BudgetImpactDB>(conn)
                    .map_err(StorageError::from)?;
                let impacts = load_impacts(rows)?;

                let aggregates = impact_calculator::recompute_aggregates(&current, &impacts);
                set_budget_spent(conn, &budget_id, aggregates.total_spent)?;
                for (allocation_id, spent) in &aggregates.allocation_spent {
                    set_allocation_spent(conn, allocation_id, *spent)?;
                }

                load_budget(conn, &budget_id)
            })
            .await
    }
}
