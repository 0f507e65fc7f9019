use crate::errors::Result;
use crate::recurrence::recurrence_model::{
    NewRecurrenceRule, RecurrenceRule, SweepReport, UpcomingFiring,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Trait for recurrence rule repository operations
#[async_trait]
pub trait RecurrenceRepositoryTrait: Send + Sync {
    fn get_rule(&self, rule_id: &str) -> Result<RecurrenceRule>;
    fn list_rules_for_user(&self, user_id: &str) -> Result<Vec<RecurrenceRule>>;
    /// Ids of active rules with `start_date <= as_of`, ordered by id. Only
    /// key columns are read, so a row that fails to decode is still listed.
    fn list_due_rule_ids(&self, as_of: NaiveDate) -> Result<Vec<String>>;
    async fn create_rule(&self, new_rule: NewRecurrenceRule) -> Result<RecurrenceRule>;
    async fn set_rule_active(&self, rule_id: &str, is_active: bool) -> Result<RecurrenceRule>;
    async fn delete_rule(&self, rule_id: &str) -> Result<usize>;
}

/// Trait for the recurring transaction engine
#[async_trait]
pub trait RecurrenceEngineTrait: Send + Sync {
    async fn create_rule(&self, new_rule: NewRecurrenceRule) -> Result<RecurrenceRule>;
    async fn pause_rule(&self, rule_id: &str) -> Result<RecurrenceRule>;
    async fn resume_rule(&self, rule_id: &str) -> Result<RecurrenceRule>;
    async fn delete_rule(&self, rule_id: &str) -> Result<usize>;

    /// Next due date of `rule` as seen on `as_of`, using the stored count of
    /// its materialized transactions.
    fn next_firing_date(&self, rule: &RecurrenceRule, as_of: NaiveDate)
        -> Result<Option<NaiveDate>>;

    /// Next firing of each of the user's active rules that falls within
    /// `horizon_days` of `as_of`, sorted by date.
    fn upcoming(
        &self,
        user_id: &str,
        as_of: NaiveDate,
        horizon_days: u32,
    ) -> Result<Vec<UpcomingFiring>>;

    /// Materializes every auto-applying rule due on `as_of`.
    async fn process_due(&self, as_of: NaiveDate) -> Result<SweepReport>;

    /// Runs `process_due` for each day of the inclusive range, oldest first.
    async fn process_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<SweepReport>>;
}
