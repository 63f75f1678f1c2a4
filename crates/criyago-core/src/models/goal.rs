//! Goals and their derived progress.
//!
//! A goal never stores how far along it is. Progress is recomputed from the
//! user's records every time it is displayed.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActivityType, WellnessRecord};

/// Progress percentage at or above which a goal is considered on track.
const ON_TRACK_PERCENT: f64 = 75.0;

/// Progress percentage at or above which a goal is considered in progress.
const IN_PROGRESS_PERCENT: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum GoalFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl GoalFrequency {
    /// Inclusive range of days whose records count towards a goal viewed on `on`.
    /// Weeks run Monday through Sunday.
    pub fn window(&self, on: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            GoalFrequency::Daily => (on, on),
            GoalFrequency::Weekly => {
                let offset = u64::from(on.weekday().num_days_from_monday());
                let start = on.checked_sub_days(Days::new(offset)).unwrap_or(on);
                let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
                (start, end)
            }
            GoalFrequency::Monthly => {
                let start = on.with_day(1).unwrap_or(on);
                let end = start
                    .checked_add_months(Months::new(1))
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(NaiveDate::MAX);
                (start, end)
            }
        }
    }
}

impl std::str::FromStr for GoalFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(GoalFrequency::Daily),
            "weekly" => Ok(GoalFrequency::Weekly),
            "monthly" => Ok(GoalFrequency::Monthly),
            other => Err(format!("Unknown goal frequency: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum GoalStatus {
    Completed,
    OnTrack,
    InProgress,
    Behind,
}

impl GoalStatus {
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 100.0 {
            GoalStatus::Completed
        } else if percent >= ON_TRACK_PERCENT {
            GoalStatus::OnTrack
        } else if percent >= IN_PROGRESS_PERCENT {
            GoalStatus::InProgress
        } else {
            GoalStatus::Behind
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Completed => "completed",
            GoalStatus::OnTrack => "on-track",
            GoalStatus::InProgress => "in-progress",
            GoalStatus::Behind => "behind",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Goal {
    pub id: Uuid,
    pub user_id: String,
    #[serde(alias = "type")]
    pub activity_type: ActivityType,
    pub target_value: f64,
    pub unit: String,
    #[serde(default)]
    pub frequency: GoalFrequency,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(user_id: &str, activity_type: ActivityType, target_value: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            activity_type,
            target_value,
            unit: activity_type.unit().to_string(),
            frequency: GoalFrequency::Daily,
            deadline: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a record counts towards this goal when viewed on `on`
    pub fn counts(&self, record: &WellnessRecord, on: NaiveDate) -> bool {
        let (start, end) = self.frequency.window(on);
        record.user_id == self.user_id
            && record.activity_type == self.activity_type
            && record.date >= start
            && record.date <= end
    }

    /// Derive progress from the given records as of day `on`.
    pub fn progress(&self, records: &[WellnessRecord], on: NaiveDate) -> GoalProgress {
        let current_value: f64 = records
            .iter()
            .filter(|record| self.counts(record, on))
            .map(|record| record.value)
            .sum();

        let percent = if self.target_value > 0.0 {
            (current_value / self.target_value * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        GoalProgress {
            goal: self.clone(),
            current_value,
            percent,
            status: GoalStatus::from_percent(percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct GoalProgress {
    pub goal: Goal,
    pub current_value: f64,
    /// Always within 0..=100
    pub percent: f64,
    pub status: GoalStatus,
}

impl GoalProgress {
    /// Amount still needed to reach the target
    pub fn remaining(&self) -> f64 {
        (self.goal.target_value - self.current_value).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(user: &str, kind: ActivityType, value: f64, date: NaiveDate) -> WellnessRecord {
        WellnessRecord {
            id: Uuid::new_v4(),
            user_id: user.to_string(),
            activity_type: kind,
            value,
            unit: kind.unit().to_string(),
            duration: None,
            notes: None,
            date,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_three_glasses_of_eight() {
        let today = day(2026, 10, 19);
        let goal = Goal::new("u1", ActivityType::Water, 8.0);
        let records: Vec<_> = (0..3)
            .map(|_| record("u1", ActivityType::Water, 1.0, today))
            .collect();

        let progress = goal.progress(&records, today);
        assert_eq!(progress.current_value, 3.0);
        assert_eq!(progress.percent, 37.5);
        assert_eq!(progress.status, GoalStatus::Behind);
        assert_eq!(progress.remaining(), 5.0);
    }

    #[test]
    fn test_percent_clamped_when_target_exceeded() {
        let today = day(2026, 10, 19);
        let goal = Goal::new("u1", ActivityType::Walking, 10_000.0);
        let records = vec![record("u1", ActivityType::Walking, 25_000.0, today)];

        let progress = goal.progress(&records, today);
        assert_eq!(progress.current_value, 25_000.0);
        assert_eq!(progress.percent, 100.0);
        assert_eq!(progress.status, GoalStatus::Completed);
        assert_eq!(progress.remaining(), 0.0);
    }

    #[test]
    fn test_daily_goal_ignores_other_days_users_and_types() {
        let today = day(2026, 10, 19);
        let goal = Goal::new("u1", ActivityType::Exercise, 60.0);
        let records = vec![
            record("u1", ActivityType::Exercise, 30.0, today),
            record("u1", ActivityType::Exercise, 30.0, day(2026, 10, 18)),
            record("u2", ActivityType::Exercise, 30.0, today),
            record("u1", ActivityType::Cycling, 30.0, today),
        ];

        let progress = goal.progress(&records, today);
        assert_eq!(progress.current_value, 30.0);
        assert_eq!(progress.status, GoalStatus::InProgress);
    }

    #[test]
    fn test_weekly_window_runs_monday_to_sunday() {
        // 2026-10-19 is a Monday
        let (start, end) = GoalFrequency::Weekly.window(day(2026, 10, 22));
        assert_eq!(start, day(2026, 10, 19));
        assert_eq!(end, day(2026, 10, 25));

        let mut goal = Goal::new("u1", ActivityType::Cycling, 120.0);
        goal.frequency = GoalFrequency::Weekly;
        let records = vec![
            record("u1", ActivityType::Cycling, 30.0, day(2026, 10, 19)),
            record("u1", ActivityType::Cycling, 60.0, day(2026, 10, 25)),
            record("u1", ActivityType::Cycling, 60.0, day(2026, 10, 26)),
        ];
        let progress = goal.progress(&records, day(2026, 10, 22));
        assert_eq!(progress.current_value, 90.0);
        assert_eq!(progress.status, GoalStatus::OnTrack);
    }

    #[test]
    fn test_monthly_window_covers_calendar_month() {
        let (start, end) = GoalFrequency::Monthly.window(day(2028, 2, 10));
        assert_eq!(start, day(2028, 2, 1));
        assert_eq!(end, day(2028, 2, 29));
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(GoalStatus::from_percent(100.0), GoalStatus::Completed);
        assert_eq!(GoalStatus::from_percent(75.0), GoalStatus::OnTrack);
        assert_eq!(GoalStatus::from_percent(50.0), GoalStatus::InProgress);
        assert_eq!(GoalStatus::from_percent(49.9), GoalStatus::Behind);
        assert_eq!(
            serde_json::to_value(GoalStatus::OnTrack).unwrap(),
            serde_json::json!("on-track")
        );
    }

    #[test]
    fn test_goal_accepts_legacy_type_field() {
        let json = serde_json::json!({
            "id": Uuid::nil(),
            "user_id": "u1",
            "type": "steps",
            "target_value": 10000.0,
            "unit": "steps",
            "created_at": "2026-10-19T00:00:00Z",
            "updated_at": "2026-10-19T00:00:00Z"
        });
        let goal: Goal = serde_json::from_value(json).unwrap();
        assert_eq!(goal.activity_type, ActivityType::Walking);
        assert_eq!(goal.frequency, GoalFrequency::Daily);
        assert_eq!(goal.deadline, None);
    }
}
