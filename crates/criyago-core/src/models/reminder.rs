//! Recurring nudges: walking breaks, check-ups, screen-time limits.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    WalkingBreak,
    HealthCheckup,
    SocialMediaLimit,
    Custom,
}

impl ReminderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderType::WalkingBreak => "walking_break",
            ReminderType::HealthCheckup => "health_checkup",
            ReminderType::SocialMediaLimit => "social_media_limit",
            ReminderType::Custom => "custom",
        }
    }
}

impl fmt::Display for ReminderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "walking_break" => Ok(ReminderType::WalkingBreak),
            "health_checkup" => Ok(ReminderType::HealthCheckup),
            "social_media_limit" => Ok(ReminderType::SocialMediaLimit),
            "custom" => Ok(ReminderType::Custom),
            other => Err(format!("Unknown reminder type: {}", other)),
        }
    }
}

/// How often a reminder repeats. `Custom` leaves the schedule to the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ReminderFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl FromStr for ReminderFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(ReminderFrequency::Daily),
            "weekly" => Ok(ReminderFrequency::Weekly),
            "monthly" => Ok(ReminderFrequency::Monthly),
            "custom" => Ok(ReminderFrequency::Custom),
            other => Err(format!("Unknown reminder frequency: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub reminder_type: ReminderType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Local time of day the reminder fires
    pub time: NaiveTime,
    #[serde(default)]
    pub frequency: ReminderFrequency,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(user_id: &str, reminder_type: ReminderType, title: &str, time: NaiveTime) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            reminder_type,
            title: title.to_string(),
            description: None,
            time,
            frequency: ReminderFrequency::Daily,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_wire_format() {
        let time = NaiveTime::from_hms_opt(15, 0, 0).unwrap();
        let reminder = Reminder::new("u1", ReminderType::WalkingBreak, "Stretch", time);
        let json = serde_json::to_value(&reminder).unwrap();
        assert_eq!(json["type"], "walking_break");
        assert_eq!(json["frequency"], "daily");
        assert_eq!(json["time"], "15:00:00");
        assert_eq!(json["is_active"], true);
    }

    #[test]
    fn test_parse_reminder_enums() {
        assert_eq!("health-checkup".parse::<ReminderType>(), Ok(ReminderType::HealthCheckup));
        assert_eq!("Weekly".parse::<ReminderFrequency>(), Ok(ReminderFrequency::Weekly));
        assert!("hourly".parse::<ReminderFrequency>().is_err());
    }
}
