use crate::budgets::AppliedImpact;
use crate::errors::Result;
use crate::transactions::transactions_model::{
    MaterializedTransaction, NewTransaction, TransactionUpdate,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Trait for transaction repository operations
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    fn get_transaction(&self, transaction_id: &str) -> Result<MaterializedTransaction>;
    fn count_transactions_for_rule(&self, rule_id: &str) -> Result<u64>;
    /// Id of the transaction materialized for `rule_id` on `date`, if any.
    fn find_transaction_for_rule(&self, rule_id: &str, date: NaiveDate)
        -> Result<Option<String>>;
    fn list_transactions_for_rule(&self, rule_id: &str) -> Result<Vec<MaterializedTransaction>>;
    /// Fails with `DatabaseError::UniqueViolation` when the rule already has a
    /// transaction on the same date.
    async fn create_transaction(
        &self,
        new_transaction: NewTransaction,
    ) -> Result<MaterializedTransaction>;
    async fn update_transaction(
        &self,
        update: TransactionUpdate,
    ) -> Result<MaterializedTransaction>;
    async fn delete_transaction(&self, transaction_id: &str) -> Result<usize>;
}

/// Trait for transaction service operations
///
/// Every write keeps budget aggregates in step with the ledger.
#[async_trait]
pub trait TransactionServiceTrait: Send + Sync {
    fn get_transaction(&self, transaction_id: &str) -> Result<MaterializedTransaction>;
    async fn create_transaction(
        &self,
        new_transaction: NewTransaction,
    ) -> Result<(MaterializedTransaction, Vec<AppliedImpact>)>;
    /// Reverses the previous impact and re-applies it with the new values.
    async fn update_transaction(
        &self,
        update: TransactionUpdate,
    ) -> Result<(MaterializedTransaction, Vec<AppliedImpact>)>;
    async fn delete_transaction(&self, transaction_id: &str) -> Result<MaterializedTransaction>;
}
