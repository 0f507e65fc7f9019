use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::lock::Mutex;
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};

use super::recurrence_model::{
    NewRecurrenceRule, RecurrenceRule, SweepFailure, SweepOptions, SweepReport, UpcomingFiring,
};
use super::recurrence_schedule::next_firing_date;
use super::recurrence_traits::{RecurrenceEngineTrait, RecurrenceRepositoryTrait};
use crate::budgets::BudgetLedgerTrait;
use crate::categories::CategoryRepositoryTrait;
use crate::errors::{Error, Result, ValidationError};
use crate::transactions::{NewTransaction, TransactionRepositoryTrait};
use crate::utils::time_utils::{add_days, get_days_between};

/// What happened to one rule during a sweep.
#[derive(Debug, Clone, PartialEq)]
enum RuleOutcome {
    Created(String),
    AlreadyProcessed,
    NotDue,
}

/// Materializes due recurrence rules and routes them through the budget ledger.
pub struct RecurrenceEngine {
    rule_repository: Arc<dyn RecurrenceRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    category_repository: Arc<dyn CategoryRepositoryTrait>,
    ledger: Arc<dyn BudgetLedgerTrait>,
    options: SweepOptions,
    /// Held for the whole of a sweep so sweeps never overlap.
    sweep_lock: Mutex<()>,
}

impl RecurrenceEngine {
    pub fn new(
        rule_repository: Arc<dyn RecurrenceRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        category_repository: Arc<dyn CategoryRepositoryTrait>,
        ledger: Arc<dyn BudgetLedgerTrait>,
        options: SweepOptions,
    ) -> Self {
        RecurrenceEngine {
            rule_repository,
            transaction_repository,
            category_repository,
            ledger,
            options,
            sweep_lock: Mutex::new(()),
        }
    }

    async fn process_rule(&self, rule_id: &str, as_of: NaiveDate) -> Result<RuleOutcome> {
        // Loaded per rule so that one undecodable row fails only itself.
        let rule = match self.rule_repository.get_rule(rule_id) {
            Ok(rule) => rule,
            Err(e) if e.is_not_found() => {
                debug!("Rule {} was deleted before the sweep reached it", rule_id);
                return Ok(RuleOutcome::NotDue);
            }
            Err(e) => return Err(e),
        };
        if !rule.is_active {
            return Ok(RuleOutcome::NotDue);
        }

        let occurrences = self
            .transaction_repository
            .count_transactions_for_rule(&rule.id)?;
        let due = next_firing_date(&rule, occurrences, as_of);
        if due != Some(as_of) || !rule.auto_apply {
            return Ok(RuleOutcome::NotDue);
        }

        if self
            .transaction_repository
            .find_transaction_for_rule(&rule.id, as_of)?
            .is_some()
        {
            return Ok(RuleOutcome::AlreadyProcessed);
        }

        if !self.category_repository.category_exists(&rule.category_id)? {
            return Err(Error::Reference(format!(
                "Category {} of rule {} no longer exists",
                rule.category_id, rule.id
            )));
        }

        let created = match self
            .transaction_repository
            .create_transaction(NewTransaction::from_rule(&rule, as_of))
            .await
        {
            Ok(created) => created,
            Err(e) if e.is_unique_violation() => {
                debug!("Rule {} on {} was materialized concurrently", rule.id, as_of);
                return Ok(RuleOutcome::AlreadyProcessed);
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.ledger.apply_impact(created.impact_request()).await {
            // Drop the transaction so the next sweep can retry this date.
            if let Err(delete_err) = self
                .transaction_repository
                .delete_transaction(&created.id)
                .await
            {
                error!(
                    "Failed to remove transaction {} after impact failure: {}",
                    created.id, delete_err
                );
            }
            return Err(e);
        }

        Ok(RuleOutcome::Created(created.id))
    }

    async fn set_active(&self, rule_id: &str, is_active: bool) -> Result<RecurrenceRule> {
        let rule = self
            .rule_repository
            .set_rule_active(rule_id, is_active)
            .await?;
        info!(
            "Recurrence rule {} {}",
            rule.id,
            if is_active { "resumed" } else { "paused" }
        );
        Ok(rule)
    }
}

#[async_trait]
impl RecurrenceEngineTrait for RecurrenceEngine {
    async fn create_rule(&self, new_rule: NewRecurrenceRule) -> Result<RecurrenceRule> {
        new_rule.validate()?;
        if !self
            .category_repository
            .category_exists(&new_rule.category_id)?
        {
            return Err(Error::Reference(format!(
                "Category {} does not exist",
                new_rule.category_id
            )));
        }
        self.rule_repository.create_rule(new_rule).await
    }

    async fn pause_rule(&self, rule_id: &str) -> Result<RecurrenceRule> {
        self.set_active(rule_id, false).await
    }

    async fn resume_rule(&self, rule_id: &str) -> Result<RecurrenceRule> {
        self.set_active(rule_id, true).await
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<usize> {
        self.rule_repository.delete_rule(rule_id).await
    }

    fn next_firing_date(
        &self,
        rule: &RecurrenceRule,
        as_of: NaiveDate,
    ) -> Result<Option<NaiveDate>> {
        let occurrences = self
            .transaction_repository
            .count_transactions_for_rule(&rule.id)?;
        Ok(next_firing_date(rule, occurrences, as_of))
    }

    fn upcoming(
        &self,
        user_id: &str,
        as_of: NaiveDate,
        horizon_days: u32,
    ) -> Result<Vec<UpcomingFiring>> {
        let horizon_end = add_days(as_of, u64::from(horizon_days)).unwrap_or(NaiveDate::MAX);

        let mut upcoming = Vec::new();
        for rule in self
            .rule_repository
            .list_rules_for_user(user_id)?
            .into_iter()
            .filter(|r| r.is_active)
        {
            let Some(date) = self.next_firing_date(&rule, as_of)? else {
                continue;
            };
            if date > horizon_end {
                continue;
            }
            upcoming.push(UpcomingFiring {
                rule_id: rule.id,
                category_id: rule.category_id,
                transaction_type: rule.transaction_type,
                amount: rule.amount,
                description: rule.description,
                date,
                auto_apply: rule.auto_apply,
            });
        }
        upcoming.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.rule_id.cmp(&b.rule_id)));
        Ok(upcoming)
    }

    async fn process_due(&self, as_of: NaiveDate) -> Result<SweepReport> {
        let _guard = self.sweep_lock.lock().await;

        let rule_ids = self.rule_repository.list_due_rule_ids(as_of)?;
        debug!("Sweep {}: {} candidate rule(s)", as_of, rule_ids.len());

        let outcomes: Vec<(String, Result<RuleOutcome>)> = stream::iter(rule_ids)
            .map(|rule_id| async move {
                let outcome = self.process_rule(&rule_id, as_of).await;
                (rule_id, outcome)
            })
            .buffered(self.options.max_concurrency.max(1))
            .collect()
            .await;

        let mut report = SweepReport::new(as_of);
        for (rule_id, outcome) in outcomes {
            match outcome {
                Ok(RuleOutcome::Created(transaction_id)) => report.created.push(transaction_id),
                Ok(RuleOutcome::AlreadyProcessed) => report.already_processed += 1,
                Ok(RuleOutcome::NotDue) => {}
                Err(e) => {
                    warn!("Sweep {}: rule {} failed: {}", as_of, rule_id, e);
                    report.failures.push(SweepFailure {
                        rule_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Sweep {} finished: {} created, {} already processed, {} failed",
            as_of,
            report.created.len(),
            report.already_processed,
            report.failures.len()
        );
        Ok(report)
    }

    async fn process_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<SweepReport>> {
        if start > end {
            return Err(ValidationError::InvalidDateRange { start, end }.into());
        }
        let mut reports = Vec::new();
        for day in get_days_between(start, end) {
            reports.push(self.process_due(day).await?);
        }
        Ok(reports)
    }
}
