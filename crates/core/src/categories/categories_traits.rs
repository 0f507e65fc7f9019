use crate::categories::categories_model::{Category, NewCategory};
use crate::errors::Result;
use async_trait::async_trait;

/// Trait for category repository operations
#[async_trait]
pub trait CategoryRepositoryTrait: Send + Sync {
    fn category_exists(&self, category_id: &str) -> Result<bool>;
    fn get_category(&self, category_id: &str) -> Result<Category>;
    fn list_categories_for_user(&self, user_id: &str) -> Result<Vec<Category>>;
    async fn create_category(&self, new_category: NewCategory) -> Result<Category>;
    async fn delete_category(&self, category_id: &str) -> Result<usize>;
}
