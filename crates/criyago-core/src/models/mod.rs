//! Data models for wellness tracking.
//!
//! - `WellnessRecord`, `ActivityType`, `NewActivity`, `QuickLog`: logged measurements
//! - `Goal`, `GoalFrequency`, `GoalProgress`, `GoalStatus`: targets and derived progress
//! - `CurrentUser`, `UserProfile`: the signed-in identity and its stored profile
//! - `Reminder`, `ReminderType`, `ReminderFrequency`: recurring nudges
//! - `WellnessScore`: per-day summary row

pub mod activity;
pub mod goal;
pub mod reminder;
pub mod score;
pub mod user;

pub use activity::{ActivityType, NewActivity, ParseActivityTypeError, QuickLog, WellnessRecord};
pub use goal::{Goal, GoalFrequency, GoalProgress, GoalStatus};
pub use reminder::{Reminder, ReminderFrequency, ReminderType};
pub use score::WellnessScore;
pub use user::{CurrentUser, UserProfile};
