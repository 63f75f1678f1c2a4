//! Wellness records and goal progress.
//!
//! `WellnessService` validates user input, writes it through the
//! persistence collaborator, and derives progress views. Nothing here keeps
//! shared mutable state; concurrent writers race last-write-wins at the store.

pub mod error;
pub mod service;

pub use error::WellnessError;
pub use service::{compute_progress, GoalRequest, ReminderRequest, WellnessService};
