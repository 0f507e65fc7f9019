use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use uuid::Uuid;

use tallybook_core::recurrence::{NewRecurrenceRule, RecurrenceRepositoryTrait, RecurrenceRule};
use tallybook_core::Result;

use super::model::RecurrenceRuleDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::recurrence_rules::dsl::*;

pub struct RecurrenceRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl RecurrenceRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        RecurrenceRepository { pool, writer }
    }

    fn to_domain(rows: Vec<RecurrenceRuleDB>) -> Result<Vec<RecurrenceRule>> {
        rows.into_iter().map(RecurrenceRule::try_from).collect()
    }
}

#[async_trait]
impl RecurrenceRepositoryTrait for RecurrenceRepository {
    fn get_rule(&self, rule_id: &str) -> Result<RecurrenceRule> {
        let mut conn = get_connection(&self.pool)?;
        let row = recurrence_rules
            .find(rule_id)
            .first::<RecurrenceRuleDB>(&mut conn)
            .map_err(StorageError::from)?;
        row.try_into()
    }

    fn list_rules_for_user(&self, owner: &str) -> Result<Vec<RecurrenceRule>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = recurrence_rules
            .filter(user_id.eq(owner))
            .order((start_date.asc(), id.asc()))
            .load::<RecurrenceRuleDB>(&mut conn)
            .map_err(StorageError::from)?;
        Self::to_domain(rows)
    }

    fn list_due_rule_ids(&self, as_of: NaiveDate) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        let ids = recurrence_rules
            .select(id)
            .filter(is_active.eq(true))
            .filter(start_date.le(as_of))
            .order(id.asc())
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(ids)
    }

    async fn create_rule(&self, new_rule: NewRecurrenceRule) -> Result<RecurrenceRule> {
        new_rule.validate()?;
        let rule_id = new_rule
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let row = RecurrenceRuleDB::from_new(rule_id, new_rule, Utc::now().naive_utc())?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<RecurrenceRule> {
                let created = diesel::insert_into(recurrence_rules)
                    .values(&row)
                    .returning(RecurrenceRuleDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                created.try_into()
            })
            .await
    }

    async fn set_rule_active(&self, rule_id: &str, active: bool) -> Result<RecurrenceRule> {
        let rule_id = rule_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<RecurrenceRule> {
                let updated = diesel::update(recurrence_rules.find(rule_id))
                    .set((is_active.eq(active), updated_at.eq(Utc::now().naive_utc())))
                    .returning(RecurrenceRuleDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                updated.try_into()
            })
            .await
    }

    async fn delete_rule(&self, rule_id: &str) -> Result<usize> {
        let rule_id = rule_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(recurrence_rules.find(rule_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}
