use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use uuid::Uuid;

use tallybook_core::transactions::{
    MaterializedTransaction, NewTransaction, TransactionRepositoryTrait, TransactionUpdate,
};
use tallybook_core::Result;

use super::model::TransactionDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::transactions;
use crate::utils::format_decimal;

pub struct TransactionRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl TransactionRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        TransactionRepository { pool, writer }
    }
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    fn get_transaction(&self, transaction_id: &str) -> Result<MaterializedTransaction> {
        let mut conn = get_connection(&self.pool)?;
        let row = transactions::table
            .find(transaction_id)
            .first::<TransactionDB>(&mut conn)
            .map_err(StorageError::from)?;
        row.try_into()
    }

    fn count_transactions_for_rule(&self, rule_id: &str) -> Result<u64> {
        let mut conn = get_connection(&self.pool)?;
        let count = transactions::table
            .filter(transactions::recurrence_rule_id.eq(rule_id))
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(count.max(0) as u64)
    }

    fn find_transaction_for_rule(
        &self,
        rule_id: &str,
        date: NaiveDate,
    ) -> Result<Option<String>> {
        let mut conn = get_connection(&self.pool)?;
        let found = transactions::table
            .filter(transactions::recurrence_rule_id.eq(rule_id))
            .filter(transactions::date.eq(date))
            .select(transactions::id)
            .first::<String>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(found)
    }

    fn list_transactions_for_rule(&self, rule_id: &str) -> Result<Vec<MaterializedTransaction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = transactions::table
            .filter(transactions::recurrence_rule_id.eq(rule_id))
            .order(transactions::date.asc())
            .load::<TransactionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(MaterializedTransaction::try_from)
            .collect()
    }

    async fn create_transaction(
        &self,
        new_transaction: NewTransaction,
    ) -> Result<MaterializedTransaction> {
        new_transaction.validate()?;
        let transaction_id = new_transaction
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let row = TransactionDB::from_new(transaction_id, new_transaction, Utc::now().naive_utc());

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<MaterializedTransaction> {
                let created = diesel::insert_into(transactions::table)
                    .values(&row)
                    .returning(TransactionDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                created.try_into()
            })
            .await
    }

    async fn update_transaction(
        &self,
        update: TransactionUpdate,
    ) -> Result<MaterializedTransaction> {
        update.validate()?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<MaterializedTransaction> {
                let updated = diesel::update(transactions::table.find(&update.id))
                    .set((
                        transactions::category_id.eq(&update.category_id),
                        transactions::transaction_type.eq(update.transaction_type.as_str()),
                        transactions::amount.eq(format_decimal(update.amount)),
                        transactions::date.eq(update.date),
                        transactions::description.eq(&update.description),
                    ))
                    .returning(TransactionDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                updated.try_into()
            })
            .await
    }

    async fn delete_transaction(&self, transaction_id: &str) -> Result<usize> {
        let transaction_id = transaction_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(transactions::table.find(transaction_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}
