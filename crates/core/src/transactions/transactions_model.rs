//! Ledger transaction models.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::budgets::ImpactRequest;
use crate::errors::{Result, ValidationError};
use crate::recurrence::{RecurrenceRule, TransactionType};

/// One concrete ledger entry, entered manually or materialized from a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedTransaction {
    pub id: String,
    /// `None` for manually entered transactions.
    pub recurrence_rule_id: Option<String>,
    pub user_id: String,
    pub category_id: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub created_at: NaiveDateTime,
}

impl MaterializedTransaction {
    pub fn impact_request(&self) -> ImpactRequest {
        ImpactRequest {
            user_id: self.user_id.clone(),
            category_id: self.category_id.clone(),
            amount: self.amount,
            date: self.date,
            transaction_id: self.id.clone(),
        }
    }
}

/// Input model for creating a new transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub recurrence_rule_id: Option<String>,
    pub user_id: String,
    pub category_id: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
}

impl NewTransaction {
    /// The firing of `rule` on `date`.
    pub fn from_rule(rule: &RecurrenceRule, date: NaiveDate) -> Self {
        Self {
            id: None,
            recurrence_rule_id: Some(rule.id.clone()),
            user_id: rule.user_id.clone(),
            category_id: rule.category_id.clone(),
            transaction_type: rule.transaction_type,
            amount: rule.amount,
            date,
            description: rule.description.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingField("userId".to_string()).into());
        }
        if self.category_id.trim().is_empty() {
            return Err(ValidationError::MissingField("categoryId".to_string()).into());
        }
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount(self.amount).into());
        }
        Ok(())
    }
}

/// Editable fields of an existing transaction.
///
/// The owning user and the originating rule never change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub id: String,
    pub category_id: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
}

impl TransactionUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingField("id".to_string()).into());
        }
        if self.category_id.trim().is_empty() {
            return Err(ValidationError::MissingField("categoryId".to_string()).into());
        }
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount(self.amount).into());
        }
        Ok(())
    }
}
