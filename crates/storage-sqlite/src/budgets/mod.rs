//! SQLite storage implementation for budgets and the impact ledger.

mod model;
mod repository;

pub use model::{BudgetCategoryDB, BudgetDB, BudgetImpactDB};
pub use repository::BudgetRepository;
