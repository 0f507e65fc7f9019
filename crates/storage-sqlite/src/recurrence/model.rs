//! Database models for recurrence rules.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use tallybook_core::errors::{Error, ValidationError};
use tallybook_core::recurrence::{NewRecurrenceRule, RecurrenceRule, Terminator};

use crate::utils::{format_decimal, parse_decimal};

/// Database model for recurrence rules.
///
/// The terminator is split over two nullable columns; a table CHECK keeps
/// exactly one of them set.
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::recurrence_rules)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRuleDB {
    pub id: String,
    pub user_id: String,
    pub category_id: String,
    pub transaction_type: String,
    pub amount: String,
    pub description: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub occurrence_cap: Option<i32>,
    pub auto_apply: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RecurrenceRuleDB {
    pub fn from_new(id: String, rule: NewRecurrenceRule, now: NaiveDateTime) -> Result<Self, Error> {
        let occurrence_cap = rule
            .terminator
            .occurrence_cap()
            .map(i32::try_from)
            .transpose()
            .map_err(|_| Error::Validation(ValidationError::InvalidOccurrenceCap))?;
        Ok(RecurrenceRuleDB {
            id,
            user_id: rule.user_id,
            category_id: rule.category_id,
            transaction_type: rule.transaction_type.as_str().to_string(),
            amount: format_decimal(rule.amount),
            description: rule.description,
            frequency: rule.frequency.as_str().to_string(),
            start_date: rule.start_date,
            end_date: rule.terminator.end_date(),
            occurrence_cap,
            auto_apply: rule.auto_apply,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

impl TryFrom<RecurrenceRuleDB> for RecurrenceRule {
    type Error = Error;

    fn try_from(db: RecurrenceRuleDB) -> Result<Self, Self::Error> {
        let occurrence_cap = db
            .occurrence_cap
            .map(u32::try_from)
            .transpose()
            .map_err(|_| Error::Validation(ValidationError::InvalidOccurrenceCap))?;
        Ok(RecurrenceRule {
            amount: parse_decimal(&db.amount, "amount")?,
            transaction_type: db.transaction_type.parse()?,
            frequency: db.frequency.parse()?,
            terminator: Terminator::from_parts(db.end_date, occurrence_cap)?,
            id: db.id,
            user_id: db.user_id,
            category_id: db.category_id,
            description: db.description,
            start_date: db.start_date,
            auto_apply: db.auto_apply,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
