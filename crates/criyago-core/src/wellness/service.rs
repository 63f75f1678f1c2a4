use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    ActivityType, Goal, GoalFrequency, GoalProgress, GoalStatus, NewActivity, QuickLog, Reminder,
    ReminderFrequency, ReminderType, WellnessRecord, WellnessScore,
};
use crate::store::{self, Filter, Store, Table};

use super::WellnessError;

type Result<T> = std::result::Result<T, WellnessError>;

/// Derive a goal's progress from records as of day `on`.
pub fn compute_progress(goal: &Goal, records: &[WellnessRecord], on: NaiveDate) -> GoalProgress {
    goal.progress(records, on)
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Goal creation or edit as submitted from the goal form.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalRequest {
    pub activity_type: String,
    pub target_value: f64,
    pub deadline: Option<NaiveDate>,
    /// Left unchanged on update when absent
    pub frequency: Option<GoalFrequency>,
}

impl GoalRequest {
    pub fn new(activity_type: impl Into<String>, target_value: f64) -> Self {
        Self {
            activity_type: activity_type.into(),
            target_value,
            deadline: None,
            frequency: None,
        }
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_frequency(mut self, frequency: GoalFrequency) -> Self {
        self.frequency = Some(frequency);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRequest {
    pub reminder_type: ReminderType,
    pub title: String,
    pub description: Option<String>,
    pub time: NaiveTime,
    pub frequency: ReminderFrequency,
}

impl ReminderRequest {
    pub fn new(reminder_type: ReminderType, title: impl Into<String>, time: NaiveTime) -> Self {
        Self {
            reminder_type,
            title: title.into(),
            description: None,
            time,
            frequency: ReminderFrequency::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_frequency(mut self, frequency: ReminderFrequency) -> Self {
        self.frequency = frequency;
        self
    }
}

/// Clone is cheap - the store handle is shared.
#[derive(Clone)]
pub struct WellnessService {
    store: Arc<dyn Store>,
    clock: fn() -> NaiveDate,
}

impl WellnessService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            clock: local_today,
        }
    }

    /// Replace the source of "today", used for default dates and deadline checks
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    fn parse_type(raw: &str) -> Result<ActivityType> {
        raw.parse::<ActivityType>()
            .map_err(|e| WellnessError::Validation(e.to_string()))
    }

    // ===== Activities =====

    /// Check an activity submission and build the record it would create.
    pub fn validate_activity(&self, user_id: &str, input: NewActivity) -> Result<WellnessRecord> {
        let activity_type = Self::parse_type(&input.activity_type)?;
        let value = input
            .value
            .ok_or_else(|| WellnessError::Validation("value is required".to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(WellnessError::Validation(format!(
                "value must be a non-negative number, got {}",
                value
            )));
        }

        let notes = input
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(WellnessRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            activity_type,
            value,
            unit: activity_type.unit().to_string(),
            duration: input.duration,
            notes,
            date: input.date.unwrap_or_else(|| self.today()),
            created_at: Utc::now(),
        })
    }

    pub async fn log_activity(&self, user_id: &str, input: NewActivity) -> Result<WellnessRecord> {
        let record = self.validate_activity(user_id, input)?;
        let stored = store::insert_as(self.store.as_ref(), Table::Activities, &record).await?;
        info!(
            user_id = user_id,
            activity = %stored.activity_type,
            value = stored.value,
            date = %stored.date,
            "Activity logged"
        );
        Ok(stored)
    }

    pub async fn quick_log(&self, user_id: &str, shortcut: QuickLog) -> Result<WellnessRecord> {
        self.log_activity(user_id, shortcut.to_activity()).await
    }

    /// Records for a user, newest first, optionally limited to one day
    pub async fn activities(&self, user_id: &str, date: Option<NaiveDate>) -> Result<Vec<WellnessRecord>> {
        let mut filter = Filter::new().eq("user_id", user_id);
        if let Some(date) = date {
            filter = filter.eq("date", date.to_string());
        }
        let filter = filter.order_by("created_at", false);
        Ok(store::select_as(self.store.as_ref(), Table::Activities, &filter).await?)
    }

    /// One day's records, newest first
    pub async fn activities_on(&self, user_id: &str, date: NaiveDate) -> Result<Vec<WellnessRecord>> {
        self.activities(user_id, Some(date)).await
    }

    // ===== Goals =====

    pub async fn goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        let filter = Filter::new().eq("user_id", user_id);
        Ok(store::select_as(self.store.as_ref(), Table::Goals, &filter).await?)
    }

    /// Create the user's goal for a type, or update its target and deadline
    /// if one already exists. Progress is never written.
    pub async fn upsert_goal(&self, user_id: &str, request: GoalRequest) -> Result<Goal> {
        let activity_type = Self::parse_type(&request.activity_type)?;
        if !request.target_value.is_finite() || request.target_value <= 0.0 {
            return Err(WellnessError::Validation(format!(
                "target must be greater than zero, got {}",
                request.target_value
            )));
        }
        if let Some(deadline) = request.deadline {
            let today = self.today();
            if deadline < today {
                return Err(WellnessError::Validation(format!(
                    "deadline {} is before today ({})",
                    deadline, today
                )));
            }
        }

        let filter = Filter::new()
            .eq("user_id", user_id)
            .eq("activity_type", activity_type.as_str());
        let existing: Vec<Goal> = store::select_as(self.store.as_ref(), Table::Goals, &filter).await?;

        let goal = match existing.into_iter().next() {
            Some(mut goal) => {
                debug!(goal_id = %goal.id, "Updating existing goal");
                goal.target_value = request.target_value;
                goal.deadline = request.deadline;
                if let Some(frequency) = request.frequency {
                    goal.frequency = frequency;
                }
                goal.updated_at = Utc::now();
                goal
            }
            None => {
                let mut goal = Goal::new(user_id, activity_type, request.target_value);
                goal.deadline = request.deadline;
                goal.frequency = request.frequency.unwrap_or_default();
                goal
            }
        };

        let stored = store::upsert_as(self.store.as_ref(), Table::Goals, &goal).await?;
        info!(
            user_id = user_id,
            activity = %stored.activity_type,
            target = stored.target_value,
            "Goal saved"
        );
        Ok(stored)
    }

    pub async fn goals_with_progress(&self, user_id: &str, on: NaiveDate) -> Result<Vec<GoalProgress>> {
        let goals = self.goals(user_id).await?;
        if goals.is_empty() {
            return Ok(Vec::new());
        }
        let records = self.activities(user_id, None).await?;
        Ok(goals
            .iter()
            .map(|goal| compute_progress(goal, &records, on))
            .collect())
    }

    // ===== Reminders =====

    pub async fn create_reminder(&self, user_id: &str, request: ReminderRequest) -> Result<Reminder> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(WellnessError::Validation("reminder title is required".to_string()));
        }

        let mut reminder = Reminder::new(user_id, request.reminder_type, title, request.time);
        reminder.description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        reminder.frequency = request.frequency;

        let stored = store::insert_as(self.store.as_ref(), Table::Reminders, &reminder).await?;
        info!(user_id = user_id, kind = %stored.reminder_type, time = %stored.time, "Reminder created");
        Ok(stored)
    }

    /// Active reminders in firing order through the day
    pub async fn active_reminders(&self, user_id: &str) -> Result<Vec<Reminder>> {
        let filter = Filter::new()
            .eq("user_id", user_id)
            .eq("is_active", true)
            .order_by("time", true);
        Ok(store::select_as(self.store.as_ref(), Table::Reminders, &filter).await?)
    }

    /// Switch a reminder off; it stays stored but no longer lists as active
    pub async fn deactivate_reminder(&self, user_id: &str, reminder_id: Uuid) -> Result<Reminder> {
        let filter = Filter::new()
            .eq("user_id", user_id)
            .eq("id", reminder_id.to_string());
        let found: Vec<Reminder> = store::select_as(self.store.as_ref(), Table::Reminders, &filter).await?;
        let mut reminder = found
            .into_iter()
            .next()
            .ok_or_else(|| WellnessError::Store(store::StoreError::NotFound(format!("reminder {}", reminder_id))))?;

        reminder.is_active = false;
        reminder.updated_at = Utc::now();
        let stored = store::upsert_as(self.store.as_ref(), Table::Reminders, &reminder).await?;
        debug!(reminder_id = %reminder_id, "Reminder deactivated");
        Ok(stored)
    }

    // ===== Daily summary =====

    pub async fn daily_summary(&self, user_id: &str, on: NaiveDate) -> Result<WellnessScore> {
        let progress = self.goals_with_progress(user_id, on).await?;
        let todays = self.activities_on(user_id, on).await?;

        let goals_met = progress
            .iter()
            .filter(|p| p.goal.frequency == GoalFrequency::Daily && p.status == GoalStatus::Completed)
            .count();
        let score = if progress.is_empty() {
            0
        } else {
            let mean = progress.iter().map(|p| p.percent).sum::<f64>() / progress.len() as f64;
            mean.round() as u32
        };

        Ok(WellnessScore {
            user_id: user_id.to_string(),
            date: on,
            score,
            activities_completed: todays.len() as u32,
            goals_met: goals_met as u32,
        })
    }

    /// Compute the day's summary and store it, replacing any earlier one
    pub async fn record_daily_score(&self, user_id: &str, on: NaiveDate) -> Result<WellnessScore> {
        let summary = self.daily_summary(user_id, on).await?;
        let stored = store::upsert_as(self.store.as_ref(), Table::WellnessScores, &summary).await?;
        debug!(user_id = user_id, date = %on, score = stored.score, "Wellness score recorded");
        Ok(stored)
    }
}
