//! SQLite storage implementation for Tallybook.
//!
//! Implements the repository traits defined in `tallybook-core` with Diesel
//! on SQLite: pooled read connections, embedded migrations and a single
//! writer actor that runs every write job inside one `IMMEDIATE` transaction.
//!
//! ```text
//!   core (engine, ledger)
//!          │
//!          ▼
//!   storage-sqlite (this crate)
//!          │
//!          ▼
//!      SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod budgets;
pub mod categories;
pub mod recurrence;
pub mod transactions;

pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

pub use errors::{IntoCore, StorageError};

pub use tallybook_core::errors::{DatabaseError, Error, Result};
