//! Database models for transactions.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use tallybook_core::errors::Error;
use tallybook_core::transactions::{MaterializedTransaction, NewTransaction};

use crate::utils::{format_decimal, parse_decimal};

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
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct TransactionDB {
    pub id: String,
    pub recurrence_rule_id: Option<String>,
    pub user_id: String,
    pub category_id: String,
    pub transaction_type: String,
    pub amount: String,
    pub date: NaiveDate,
    pub description: String,
    pub created_at: NaiveDateTime,
}

impl TransactionDB {
    pub fn from_new(id: String, new_transaction: NewTransaction, now: NaiveDateTime) -> Self {
        TransactionDB {
            id,
            recurrence_rule_id: new_transaction.recurrence_rule_id,
            user_id: new_transaction.user_id,
            category_id: new_transaction.category_id,
            transaction_type: new_transaction.transaction_type.as_str().to_string(),
            amount: format_decimal(new_transaction.amount),
            date: new_transaction.date,
            description: new_transaction.description,
            created_at: now,
        }
    }
}

impl TryFrom<TransactionDB> for MaterializedTransaction {
    type Error = Error;

    fn try_from(db: TransactionDB) -> Result<Self, Self::Error> {
        Ok(MaterializedTransaction {
            amount: parse_decimal(&db.amount, "amount")?,
            transaction_type: db.transaction_type.parse()?,
            id: db.id,
            recurrence_rule_id: db.recurrence_rule_id,
            user_id: db.user_id,
            category_id: db.category_id,
            date: db.date,
            description: db.description,
            created_at: db.created_at,
        })
    }
}
