//! Background scheduler for the daily recurrence sweep.
//!
//! The sweep is idempotent per (rule, date), so ticking more often than once
//! a day only re-checks rules that are already processed.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::main_lib::AppState;
use tallybook_core::utils::time_utils::today_in;

/// Starts the sweep loop. The first tick fires immediately.
pub fn start_sweep_scheduler(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Sweep scheduler started ({}s interval, timezone {})",
            state.sweep_interval.as_secs(),
            state.timezone
        );

        let mut sweep_interval = interval(state.sweep_interval);
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            sweep_interval.tick().await;
            run_scheduled_sweep(&state).await;
        }
    })
}

/// Runs a single sweep for today's date in the configured timezone.
async fn run_scheduled_sweep(state: &AppState) {
    let today = today_in(state.timezone);

    match state.engine.process_due(today).await {
        Ok(report) if report.has_failures() => {
            warn!(
                "Sweep for {} created {} transaction(s), {} rule(s) failed",
                today,
                report.created.len(),
                report.failures.len()
            );
            for failure in &report.failures {
                warn!("  rule {}: {}", failure.rule_id, failure.message);
            }
        }
        Ok(report) => {
            info!(
                "Sweep for {} created {} transaction(s), {} already processed",
                today,
                report.created.len(),
                report.already_processed
            );
        }
        Err(e) => error!("Sweep for {} failed: {}", today, e),
    }
}
