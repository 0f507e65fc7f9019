//! Recurrence module - rule models, firing schedule, and the sweep engine.

mod recurrence_model;
pub mod recurrence_schedule;
mod recurrence_service;
mod recurrence_traits;


pub use recurrence_model::{
    Frequency, NewRecurrenceRule, RecurrenceRule, SweepFailure, SweepOptions, SweepReport,
    Terminator, TransactionType, UpcomingFiring,
};
pub use recurrence_schedule::next_firing_date;
pub use recurrence_service::RecurrenceEngine;
pub use recurrence_traits::{RecurrenceEngineTrait, RecurrenceRepositoryTrait};
