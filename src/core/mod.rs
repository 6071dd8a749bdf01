//! Domain model: schedules, their status machine, callbacks and recurrence.

pub mod callback;
pub mod cron;
pub mod schedule;
pub mod status;
pub mod types;
pub mod violation;
