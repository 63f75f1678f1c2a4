//! Command-line surface of the `criyago` binary.

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use criyago_core::cache::runtime::BACKGROUND_SYNC_TAG;
use criyago_core::models::{GoalFrequency, QuickLog, ReminderFrequency, ReminderType};

#[derive(Debug, Parser)]
#[command(name = "criyago", version)]
#[command(about = "Offline cache host and wellness tracker for Criyago")]
pub struct Cli {
    /// App origin that cache paths resolve against (overrides config)
    #[arg(long, global = true)]
    pub origin: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch the offline manifest and activate this cache version
    Install,

    /// Route a GET request through the cache
    Fetch {
        /// Path or absolute URL
        path: String,
        /// Treat the request as a page navigation
        #[arg(long)]
        navigate: bool,
    },

    /// List cache partitions
    CacheStatus,

    /// Deliver a push message
    Push {
        /// Message text; the default body is used when empty
        message: Vec<String>,
    },

    /// Deliver a notification click
    Click {
        /// Action id (explore, close)
        action: Option<String>,
    },

    /// Deliver a background sync signal
    Sync {
        #[arg(default_value = BACKGROUND_SYNC_TAG)]
        tag: String,
    },

    /// Record a provider sign-in
    SignIn {
        email: String,
        /// Display name
        #[arg(required = true)]
        name: Vec<String>,
        /// Provider access token
        #[arg(long)]
        token: Option<String>,
    },

    /// Forget the signed-in session
    SignOut {
        /// Also remove the stored API key for the configured store
        #[arg(long)]
        forget_key: bool,
    },

    /// Show the signed-in user and store mode
    Whoami,

    /// Manage the persistence API key
    #[command(subcommand)]
    Key(KeyCommands),

    /// Log an activity
    Log {
        /// walking, cycling, exercise, water, sleep, nutrition
        activity_type: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
        /// Duration in minutes
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
        /// Day the activity counts towards (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// One-tap shortcut: water, steps, or exercise
    Quick { shortcut: QuickLog },

    /// List one day's activities
    Activities {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show activity types, units, and quick-log shortcuts
    Types,

    /// Create or update the goal for an activity type
    Goal {
        activity_type: String,
        /// Target value; the type's default target when omitted
        #[arg(allow_negative_numbers = true)]
        target: Option<f64>,
        #[arg(long)]
        deadline: Option<NaiveDate>,
        /// daily, weekly, or monthly
        #[arg(long)]
        frequency: Option<GoalFrequency>,
    },

    /// Show goal progress
    Progress {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Compute and store the day's wellness score
    Summary {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Manage reminders
    #[command(subcommand)]
    Remind(RemindCommands),
}

#[derive(Debug, Subcommand)]
pub enum KeyCommands {
    /// Store the API key in the OS keychain
    Set { key: String },
    /// Remove the stored API key
    Clear,
    /// Report whether a key is stored
    Status,
}

#[derive(Debug, Subcommand)]
pub enum RemindCommands {
    /// Create a reminder
    Add {
        /// walking_break, health_checkup, social_media_limit, custom
        kind: ReminderType,
        /// Time of day (HH:MM)
        #[arg(value_parser = parse_time)]
        time: NaiveTime,
        #[arg(required = true)]
        title: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "daily")]
        frequency: ReminderFrequency,
    },
    /// List active reminders
    List,
    /// Switch a reminder off
    Off { id: Uuid },
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| format!("expected HH:MM, got {}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("criyago").chain(args.iter().copied()))
    }

    #[test]
    fn test_command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_with_flags() {
        let cli = parse(&["log", "water", "2", "--notes", "after run", "--date", "2026-10-19"]).unwrap();
        match cli.command {
            Commands::Log {
                activity_type,
                value,
                notes,
                date,
                duration,
            } => {
                assert_eq!(activity_type, "water");
                assert_eq!(value, 2.0);
                assert_eq!(notes.as_deref(), Some("after run"));
                assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 19));
                assert_eq!(duration, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_misspelled_or_unknown_flags_are_rejected() {
        assert!(parse(&["log", "water", "2", "--note", "after run"]).is_err());
        assert!(parse(&["log", "water", "--verbose", "2"]).is_err());
        assert!(parse(&["log", "water"]).is_err());
    }

    #[test]
    fn test_bad_date_is_rejected() {
        assert!(parse(&["progress", "--date", "19/10/2026"]).is_err());
    }

    #[test]
    fn test_typed_arguments() {
        let cli = parse(&["quick", "steps"]).unwrap();
        assert!(matches!(cli.command, Commands::Quick { shortcut: QuickLog::Steps }));
        assert!(parse(&["quick", "yoga"]).is_err());

        let cli = parse(&["goal", "water", "--frequency", "weekly"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Goal {
                target: None,
                frequency: Some(GoalFrequency::Weekly),
                ..
            }
        ));

        let cli = parse(&["sync"]).unwrap();
        assert!(matches!(cli.command, Commands::Sync { ref tag } if tag == BACKGROUND_SYNC_TAG));
    }

    #[test]
    fn test_remind_add() {
        let cli = parse(&["remind", "add", "walking_break", "15:30", "Stretch", "legs"]).unwrap();
        match cli.command {
            Commands::Remind(RemindCommands::Add {
                kind,
                time,
                title,
                frequency,
                ..
            }) => {
                assert_eq!(kind, ReminderType::WalkingBreak);
                assert_eq!(time, NaiveTime::from_hms_opt(15, 30, 0).unwrap());
                assert_eq!(title.join(" "), "Stretch legs");
                assert_eq!(frequency, ReminderFrequency::Daily);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(parse(&["remind", "add", "custom", "25:00", "Late"]).is_err());
    }
}
