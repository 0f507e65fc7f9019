use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use tallybook_core::{
    budgets::BudgetLedger,
    recurrence::{RecurrenceEngine, RecurrenceEngineTrait, SweepOptions},
};
use tallybook_storage_sqlite::{
    budgets::BudgetRepository, categories::CategoryRepository, db,
    recurrence::RecurrenceRepository, transactions::TransactionRepository,
};

pub struct AppState {
    pub engine: Arc<dyn RecurrenceEngineTrait>,
    pub timezone: Tz,
    pub sweep_interval: Duration,
}

pub fn init_tracing() {
    let log_format = std::env::var("TALLYBOOK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let rule_repository = Arc::new(RecurrenceRepository::new(pool.clone(), writer.clone()));
    let transaction_repository = Arc::new(TransactionRepository::new(pool.clone(), writer.clone()));
    let category_repository = Arc::new(CategoryRepository::new(pool.clone(), writer.clone()));
    let budget_repository = Arc::new(BudgetRepository::new(pool.clone(), writer));

    let ledger = Arc::new(BudgetLedger::new(budget_repository));
    let engine = Arc::new(RecurrenceEngine::new(
        rule_repository,
        transaction_repository,
        category_repository,
        ledger,
        SweepOptions {
            max_concurrency: config.sweep_concurrency,
        },
    ));

    Ok(Arc::new(AppState {
        engine,
        timezone: config.timezone,
        sweep_interval: config.sweep_interval,
    }))
}
