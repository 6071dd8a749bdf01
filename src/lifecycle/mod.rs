//! Lifecycle control for recurring schedules.
//!
//! [`LifecycleController`] exposes pause, resume and partial update. Each
//! operation composes the checks in [`validation`] and ends in at most one
//! conditional write.

mod controller;
mod error;
mod patch;
pub mod validation;

pub use controller::{LifecycleController, Outcome};
pub use error::{ErrorKind, LifecycleError};
pub use patch::SchedulePatch;
pub use validation::{Check, ValidationPipeline};
