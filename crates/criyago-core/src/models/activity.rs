//! Logged wellness activity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Kinds of activity a user can log. Each kind has a fixed unit so that
/// same-type records always aggregate consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    #[serde(alias = "steps")]
    Walking,
    Cycling,
    Exercise,
    Water,
    Sleep,
    Nutrition,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown activity type: {0}")]
pub struct ParseActivityTypeError(pub String);

impl ActivityType {
    pub const ALL: [ActivityType; 6] = [
        ActivityType::Walking,
        ActivityType::Cycling,
        ActivityType::Exercise,
        ActivityType::Water,
        ActivityType::Sleep,
        ActivityType::Nutrition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Walking => "walking",
            ActivityType::Cycling => "cycling",
            ActivityType::Exercise => "exercise",
            ActivityType::Water => "water",
            ActivityType::Sleep => "sleep",
            ActivityType::Nutrition => "nutrition",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Walking => "Walking",
            ActivityType::Cycling => "Cycling",
            ActivityType::Exercise => "Exercise/Running",
            ActivityType::Water => "Water Intake",
            ActivityType::Sleep => "Sleep",
            ActivityType::Nutrition => "Nutrition",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ActivityType::Walking => "steps",
            ActivityType::Cycling | ActivityType::Exercise => "minutes",
            ActivityType::Water => "glasses",
            ActivityType::Sleep => "hours",
            ActivityType::Nutrition => "meals",
        }
    }

    /// Suggested goal target when the user picks this type without a value
    pub fn default_target(&self) -> f64 {
        match self {
            ActivityType::Walking => 10_000.0,
            ActivityType::Cycling => 30.0,
            ActivityType::Exercise => 60.0,
            ActivityType::Water => 8.0,
            ActivityType::Sleep => 8.0,
            ActivityType::Nutrition => 3.0,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = ParseActivityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walking" | "steps" => Ok(ActivityType::Walking),
            "cycling" => Ok(ActivityType::Cycling),
            "exercise" => Ok(ActivityType::Exercise),
            "water" => Ok(ActivityType::Water),
            "sleep" => Ok(ActivityType::Sleep),
            "nutrition" => Ok(ActivityType::Nutrition),
            _ => Err(ParseActivityTypeError(s.to_string())),
        }
    }
}

/// One logged measurement. Records are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct WellnessRecord {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub value: f64,
    pub unit: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Calendar day the activity counts towards
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated activity input, as submitted from a form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewActivity {
    pub activity_type: String,
    pub value: Option<f64>,
    pub duration: Option<u32>,
    pub notes: Option<String>,
    /// Defaults to today when absent
    pub date: Option<NaiveDate>,
}

impl NewActivity {
    pub fn new(activity_type: impl Into<String>, value: f64) -> Self {
        Self {
            activity_type: activity_type.into(),
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration = Some(minutes);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Count the activity towards the calendar day of a timestamp
    pub fn at<Tz: chrono::TimeZone>(self, timestamp: DateTime<Tz>) -> Self {
        self.on(timestamp.date_naive())
    }
}

/// One-tap shortcuts offered next to the full logging form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickLog {
    Water,
    Steps,
    Exercise,
}

impl QuickLog {
    pub const ALL: [QuickLog; 3] = [QuickLog::Water, QuickLog::Steps, QuickLog::Exercise];

    pub fn activity_type(&self) -> ActivityType {
        match self {
            QuickLog::Water => ActivityType::Water,
            QuickLog::Steps => ActivityType::Walking,
            QuickLog::Exercise => ActivityType::Exercise,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            QuickLog::Water => 1.0,
            QuickLog::Steps => 1000.0,
            QuickLog::Exercise => 15.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickLog::Water => "+1 Glass Water",
            QuickLog::Steps => "+1K Steps",
            QuickLog::Exercise => "+15min Exercise",
        }
    }

    pub fn to_activity(&self) -> NewActivity {
        NewActivity::new(self.activity_type().as_str(), self.value())
    }
}

impl FromStr for QuickLog {
    type Err = ParseActivityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "water" => Ok(QuickLog::Water),
            "steps" | "walking" => Ok(QuickLog::Steps),
            "exercise" => Ok(QuickLog::Exercise),
            _ => Err(ParseActivityTypeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_activity_type() {
        assert_eq!("Water".parse::<ActivityType>(), Ok(ActivityType::Water));
        assert_eq!("steps".parse::<ActivityType>(), Ok(ActivityType::Walking));
        assert!("yoga".parse::<ActivityType>().is_err());
    }

    #[test]
    fn test_units_are_fixed_per_type() {
        assert_eq!(ActivityType::Walking.unit(), "steps");
        assert_eq!(ActivityType::Water.unit(), "glasses");
        assert_eq!(ActivityType::Sleep.unit(), "hours");
    }

    #[test]
    fn test_record_serializes_type_field() {
        let record = WellnessRecord {
            id: Uuid::nil(),
            user_id: "u1".to_string(),
            activity_type: ActivityType::Water,
            value: 1.0,
            unit: "glasses".to_string(),
            duration: None,
            notes: None,
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "water");
        assert_eq!(json["date"], "2026-10-19");
    }

    #[test]
    fn test_new_activity_at_timestamp_uses_its_day() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 23, 59, 59).unwrap();
        let activity = NewActivity::new("sleep", 7.5).at(ts);
        assert_eq!(activity.date, NaiveDate::from_ymd_opt(2026, 10, 19));
    }

    #[test]
    fn test_quick_log_shortcuts() {
        let steps: QuickLog = "steps".parse().unwrap();
        assert_eq!(steps.activity_type(), ActivityType::Walking);
        assert_eq!(steps.value(), 1000.0);
        assert_eq!(QuickLog::Water.to_activity().value, Some(1.0));
    }
}
