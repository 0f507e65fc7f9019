use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use uuid::Uuid;

use tallybook_core::categories::{Category, CategoryRepositoryTrait, NewCategory};
use tallybook_core::Result;

use super::model::CategoryDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::categories;

pub struct CategoryRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl CategoryRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        CategoryRepository { pool, writer }
    }
}

#[async_trait]
impl CategoryRepositoryTrait for CategoryRepository {
    fn category_exists(&self, category_id: &str) -> Result<bool> {
        let mut conn = get_connection(&self.pool)?;
        let exists = diesel::select(diesel::dsl::exists(
            categories::table.filter(categories::id.eq(category_id)),
        ))
        .get_result::<bool>(&mut conn)
        .map_err(StorageError::from)?;
        Ok(exists)
    }

    fn get_category(&self, category_id: &str) -> Result<Category> {
        let mut conn = get_connection(&self.pool)?;
        let category = categories::table
            .find(category_id)
            .first::<CategoryDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(category.into())
    }

    fn list_categories_for_user(&self, user_id: &str) -> Result<Vec<Category>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = categories::table
            .filter(categories::user_id.eq(user_id))
            .order(categories::name.asc())
            .load::<CategoryDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn create_category(&self, new_category: NewCategory) -> Result<Category> {
        new_category.validate()?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Category> {
                let row = CategoryDB {
                    id: new_category
                        .id
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    user_id: new_category.user_id,
                    name: new_category.name,
                    created_at: Utc::now().naive_utc(),
                };
                let created = diesel::insert_into(categories::table)
                    .values(&row)
                    .returning(CategoryDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(created.into())
            })
            .await
    }

    async fn delete_category(&self, category_id: &str) -> Result<usize> {
        let category_id = category_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                Ok(diesel::delete(categories::table.find(category_id))
                    .execute(conn)
                    .map_err(StorageError::from)?)
            })
            .await
    }
}
