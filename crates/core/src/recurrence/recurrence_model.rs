//! Recurrence domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::errors::{Error, Result, ValidationError};

/// Direction of money flow for a rule or a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => TRANSACTION_TYPE_INCOME,
            TransactionType::Expense => TRANSACTION_TYPE_EXPENSE,
        }
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            TRANSACTION_TYPE_INCOME => Ok(TransactionType::Income),
            TRANSACTION_TYPE_EXPENSE => Ok(TransactionType::Expense),
            other => Err(ValidationError::UnknownCode {
                kind: "transaction type",
                value: other.to_string(),
            }
            .into()),
        }
    }
}

/// How often a recurring definition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    /// A calendar month of variable length.
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => FREQUENCY_DAILY,
            Frequency::Weekly => FREQUENCY_WEEKLY,
            Frequency::Monthly => FREQUENCY_MONTHLY,
            Frequency::Yearly => FREQUENCY_YEARLY,
        }
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            FREQUENCY_DAILY => Ok(Frequency::Daily),
            FREQUENCY_WEEKLY => Ok(Frequency::Weekly),
            FREQUENCY_MONTHLY => Ok(Frequency::Monthly),
            FREQUENCY_YEARLY => Ok(Frequency::Yearly),
            other => Err(ValidationError::UnknownCode {
                kind: "frequency",
                value: other.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a rule stops firing. A rule always has exactly one terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Terminator {
    /// Last date (inclusive) on which the rule may fire.
    EndDate(NaiveDate),
    /// Total number of transactions the rule may ever materialize.
    OccurrenceCap(u32),
}

impl Terminator {
    /// Builds a terminator from the two nullable columns a store keeps.
    pub fn from_parts(end_date: Option<NaiveDate>, occurrence_cap: Option<u32>) -> Result<Self> {
        match (end_date, occurrence_cap) {
            (Some(end), None) => Ok(Terminator::EndDate(end)),
            (None, Some(cap)) => Ok(Terminator::OccurrenceCap(cap)),
            _ => Err(ValidationError::TerminatorConflict.into()),
        }
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        match self {
            Terminator::EndDate(end) => Some(*end),
            Terminator::OccurrenceCap(_) => None,
        }
    }

    pub fn occurrence_cap(&self) -> Option<u32> {
        match self {
            Terminator::EndDate(_) => None,
            Terminator::OccurrenceCap(cap) => Some(*cap),
        }
    }
}

/// A user-defined template describing a repeating transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub id: String,
    pub user_id: String,
    pub category_id: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    pub frequency: Frequency,
    /// Immutable after creation.
    pub start_date: NaiveDate,
    pub terminator: Terminator,
    /// Whether a due firing materializes a transaction automatically.
    pub auto_apply: bool,
    /// Paused rules are ignored by the sweep.
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for creating a new recurrence rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecurrenceRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    pub category_id: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub terminator: Terminator,
    pub auto_apply: bool,
}

impl NewRecurrenceRule {
    /// Rejects rules the engine must never see.
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
        match self.terminator {
            Terminator::EndDate(end) if end <= self.start_date => {
                Err(ValidationError::EndDateNotAfterStart {
                    start: self.start_date,
                    end,
                }
                .into())
            }
            Terminator::OccurrenceCap(0) => Err(ValidationError::InvalidOccurrenceCap.into()),
            _ => Ok(()),
        }
    }
}

/// One projected firing, used for "upcoming transactions" listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingFiring {
    pub rule_id: String,
    pub category_id: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    /// False for rules whose due amounts are informational only.
    pub auto_apply: bool,
}

/// Tunables for a single sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepOptions {
    /// Maximum number of rules processed concurrently. Zero is treated as one.
    pub max_concurrency: usize,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_SWEEP_CONCURRENCY,
        }
    }
}

/// A rule that could not be processed during a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    pub rule_id: String,
    pub message: String,
}

/// Outcome of one `process_due` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub as_of: NaiveDate,
    /// Ids of the transactions materialized by this sweep, in rule order.
    pub created: Vec<String>,
    /// Due rules whose firing for `as_of` already existed.
    pub already_processed: usize,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            created: Vec::new(),
            already_processed: 0,
            failures: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
