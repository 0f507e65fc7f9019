use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error};

use super::transactions_model::{MaterializedTransaction, NewTransaction, TransactionUpdate};
use super::transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};
use crate::budgets::{AppliedImpact, BudgetLedgerTrait};
use crate::errors::Result;

/// Manual transaction writes routed through the budget ledger.
pub struct TransactionService {
    repository: Arc<dyn TransactionRepositoryTrait>,
    ledger: Arc<dyn BudgetLedgerTrait>,
}

impl TransactionService {
    pub fn new(
        repository: Arc<dyn TransactionRepositoryTrait>,
        ledger: Arc<dyn BudgetLedgerTrait>,
    ) -> Self {
        TransactionService { repository, ledger }
    }

    async fn apply(&self, transaction: &MaterializedTransaction) -> Result<Vec<AppliedImpact>> {
        self.ledger.apply_impact(transaction.impact_request()).await
    }

    /// Puts `previous` back after a failed edit. Failures are logged; the
    /// original error is what the caller sees.
    async fn restore(&self, previous: &MaterializedTransaction) {
        let rollback = TransactionUpdate {
            id: previous.id.clone(),
            category_id: previous.category_id.clone(),
            transaction_type: previous.transaction_type,
            amount: previous.amount,
            date: previous.date,
            description: previous.description.clone(),
        };
        if let Err(e) = self.repository.update_transaction(rollback).await {
            error!("Failed to restore transaction {}: {}", previous.id, e);
            return;
        }
        if let Err(e) = self.apply(previous).await {
            error!(
                "Failed to re-apply budget impact of transaction {}: {}",
                previous.id, e
            );
        }
    }
}

#[async_trait]
impl TransactionServiceTrait for TransactionService {
    fn get_transaction(&self, transaction_id: &str) -> Result<MaterializedTransaction> {
        self.repository.get_transaction(transaction_id)
    }

    async fn create_transaction(
        &self,
        new_transaction: NewTransaction,
    ) -> Result<(MaterializedTransaction, Vec<AppliedImpact>)> {
        new_transaction.validate()?;
        let created = self.repository.create_transaction(new_transaction).await?;

        match self.apply(&created).await {
            Ok(applied) => Ok((created, applied)),
            Err(e) => {
                if let Err(delete_err) = self.repository.delete_transaction(&created.id).await {
                    error!(
                        "Failed to remove transaction {} after impact failure: {}",
                        created.id, delete_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn update_transaction(
        &self,
        update: TransactionUpdate,
    ) -> Result<(MaterializedTransaction, Vec<AppliedImpact>)> {
        update.validate()?;
        let previous = self.repository.get_transaction(&update.id)?;

        // Edits never patch aggregates in place.
        self.ledger.reverse_impact(&previous.id).await?;

        let updated = match self.repository.update_transaction(update).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Err(reapply_err) = self.apply(&previous).await {
                    error!(
                        "Failed to re-apply budget impact of transaction {}: {}",
                        previous.id, reapply_err
                    );
                }
                return Err(e);
            }
        };

        match self.apply(&updated).await {
            Ok(applied) => {
                debug!(
                    "Transaction {} updated, {} budget impact(s)",
                    updated.id,
                    applied.len()
                );
                Ok((updated, applied))
            }
            Err(e) => {
                self.restore(&previous).await;
                Err(e)
            }
        }
    }

    async fn delete_transaction(&self, transaction_id: &str) -> Result<MaterializedTransaction> {
        let existing = self.repository.get_transaction(transaction_id)?;
        self.ledger.reverse_impact(transaction_id).await?;

        if let Err(e) = self.repository.delete_transaction(transaction_id).await {
            if let Err(reapply_err) = self.apply(&existing).await {
                error!(
                    "Failed to re-apply budget impact of transaction {}: {}",
                    transaction_id, reapply_err
                );
            }
            return Err(e);
        }
        Ok(existing)
    }
}
