use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily wellness summary, one row per user and day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessScore {
    pub user_id: String,
    pub date: NaiveDate,
    /// Mean goal completion for the day, 0-100
    pub score: u32,
    pub activities_completed: u32,
    pub goals_met: u32,
}
