//! criyago - command-line host for the offline cache and wellness tracker.
//!
//! Acts as the runtime around `CacheManager` (lifecycle events, intercepted
//! requests, push/sync signals) and as a small front end for logging
//! activities, goals, and reminders.

mod cli;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use criyago_core::auth::{ensure_profile, CredentialStore, Identity, Session};
use criyago_core::cache::{CacheManager, DiskStorage, HttpFetcher, Request, RuntimeAction, Signal};
use criyago_core::config::Config;
use criyago_core::models::{ActivityType, CurrentUser, NewActivity, QuickLog};
use criyago_core::store::{MemoryStore, RestStore, Store};
use criyago_core::utils::{format_date, format_value, progress_bar, truncate_string};
use criyago_core::wellness::{GoalRequest, ReminderRequest, WellnessService};

use cli::{Cli, Commands, KeyCommands, RemindCommands};

/// Progress bar width in characters
const BAR_WIDTH: usize = 20;

/// Initialize the tracing subscriber for logging.
/// Console output honours RUST_LOG (default "warn"); a daily log file in the
/// cache directory keeps info-level history.
fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let console = fmt::layer().with_writer(io::stderr).with_filter(filter);

    if std::fs::create_dir_all(log_dir).is_err() {
        tracing_subscriber::registry().with(console).init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(log_dir, "criyago.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(console)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new("info")),
        )
        .init();
    Some(guard)
}

fn print_actions(actions: &[RuntimeAction]) -> Result<()> {
    for action in actions {
        println!("{}", serde_json::to_string(action)?);
    }
    Ok(())
}

struct App {
    config: Config,
    session: Session,
}

impl App {
    fn load(origin: Option<String>) -> Result<Self> {
        let mut config = Config::load()?;
        config.apply_env();
        if let Some(origin) = origin {
            config.origin = origin;
        }
        let mut session = Session::new(config.cache_dir()?);
        session.load()?;
        Ok(Self { config, session })
    }

    fn cache_manager(&self) -> Result<CacheManager> {
        let storage = DiskStorage::new(self.config.cache_dir()?.join("partitions"))?;
        let fetcher = HttpFetcher::new()?;
        Ok(CacheManager::new(
            self.config.cache_options()?,
            Arc::new(storage),
            Arc::new(fetcher),
        ))
    }

    /// Hosted store when configured with a key, else the local snapshot
    fn store(&self) -> Result<Arc<dyn Store>> {
        if let Some(url) = self.config.store_url.as_deref() {
            match self.config.store_api_key() {
                Some(key) => {
                    let rest = RestStore::new(url, &key)?;
                    let rest = match self.session.token() {
                        Some(token) if !token.is_empty() => rest.with_token(token.to_string()),
                        _ => rest,
                    };
                    debug!(url = url, "Using hosted store");
                    return Ok(Arc::new(rest));
                }
                None => {
                    warn!(url = url, "No API key for hosted store, using local store");
                }
            }
        }
        let path = self.config.cache_dir()?.join("store.json");
        Ok(Arc::new(MemoryStore::open(path)?))
    }

    fn wellness(&self) -> Result<WellnessService> {
        Ok(WellnessService::new(self.store()?))
    }

    fn signed_in_user(&self) -> Result<&CurrentUser> {
        self.session
            .current_user()
            .ok_or_else(|| anyhow::anyhow!("Not signed in. Run `criyago sign-in <email> <name>` first"))
    }

    fn store_url(&self) -> Result<&str> {
        self.config
            .store_url
            .as_deref()
            .context("No store URL configured")
    }
}

// ===== Cache commands =====

async fn cmd_install(app: &App) -> Result<()> {
    let manager = app.cache_manager()?;
    let installed = manager.install(&app.config.cache.manifest).await?;
    println!("Installed {} ({} entries)", installed.partition, installed.cached);
    print_actions(&installed.actions)?;

    let activated = manager.activate().await?;
    for name in &activated.deleted {
        println!("Deleted {}", name);
    }
    print_actions(&activated.actions)
}

async fn cmd_fetch(app: &App, path: &str, navigate: bool) -> Result<()> {
    let manager = app.cache_manager()?;
    let url = manager.resolve(path)?;
    let request = if navigate {
        Request::navigate(url)
    } else {
        Request::get(url)
    };

    let outcome = manager.handle(&request).await?;
    match outcome.response() {
        Some(response) => {
            println!(
                "{} {} ({} bytes) from {}",
                response.status,
                response.url,
                response.body.len(),
                outcome.source()
            );
            let text = response.body_text();
            if !text.trim().is_empty() {
                println!("{}", truncate_string(text.trim(), 200));
            }
        }
        None => println!("Passed through: {}", request.url),
    }
    manager.settle().await;
    Ok(())
}

fn cmd_cache_status(app: &App) -> Result<()> {
    let manager = app.cache_manager()?;
    let partitions = manager.partitions()?;
    if partitions.is_empty() {
        println!("No cache partitions. Run `criyago install`.");
    }
    for p in partitions {
        println!(
            "{:<32} {:<12} {:>4} entries  {}",
            p.name,
            format!("{:?}", p.age),
            p.entries,
            p.last_updated.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn cmd_signal(app: &App, signal: Signal) -> Result<()> {
    let manager = app.cache_manager()?;
    print_actions(&manager.notify(signal))
}

// ===== Account commands =====

async fn cmd_sign_in(app: &mut App, email: String, name: Vec<String>, token: Option<String>) -> Result<()> {
    let user = CurrentUser {
        id: email.clone(),
        email: email.clone(),
        name: name.join(" "),
        avatar_url: None,
    };
    app.session.sign_in(token.unwrap_or_default(), user.clone())?;

    let profile = ensure_profile(app.store()?.as_ref(), &user).await?;
    app.config.last_email = Some(email);
    app.config.save()?;

    info!(email = %profile.email, "Signed in");
    println!("Welcome, {}!", user.first_name());
    Ok(())
}

fn cmd_sign_out(app: &mut App, forget_key: bool) -> Result<()> {
    app.session.clear()?;
    if forget_key {
        let url = app.store_url()?;
        CredentialStore::delete(url)?;
        println!("API key removed for {}", url);
    }
    println!("Signed out");
    Ok(())
}

fn cmd_whoami(app: &App) -> Result<()> {
    match (app.session.current_user(), app.session.data.as_ref()) {
        (Some(user), Some(data)) => {
            let renewal = if data.needs_refresh() { ", sign in again soon" } else { "" };
            println!(
                "{} <{}> via {} (expires in {} min{})",
                user.name,
                user.email,
                data.provider,
                data.minutes_until_expiry(),
                renewal
            );
        }
        _ => println!("Not signed in"),
    }
    match app.config.store_url.as_deref() {
        Some(url) if app.config.store_api_key().is_some() => println!("Store: {}", url),
        Some(url) => println!("Store: {} (no API key, using local store)", url),
        None => println!("Store: local"),
    }
    Ok(())
}

fn cmd_key(app: &App, command: KeyCommands) -> Result<()> {
    let url = app.store_url()?;
    match command {
        KeyCommands::Set { key } => {
            CredentialStore::store(url, &key)?;
            println!("API key saved for {}", url);
        }
        KeyCommands::Clear => {
            CredentialStore::delete(url)?;
            println!("API key removed for {}", url);
        }
        KeyCommands::Status => {
            if CredentialStore::has_api_key(url) {
                println!("API key stored for {}", url);
            } else {
                println!("No API key stored for {}", url);
            }
        }
    }
    Ok(())
}

// ===== Wellness commands =====

async fn cmd_log(app: &App, activity: NewActivity) -> Result<()> {
    let user = app.signed_in_user()?;
    let record = app.wellness()?.log_activity(&user.id, activity).await?;
    println!(
        "Logged {} of {} for {}",
        format_value(record.value, &record.unit),
        record.activity_type.label(),
        format_date(record.date)
    );
    Ok(())
}

async fn cmd_quick(app: &App, shortcut: QuickLog) -> Result<()> {
    let user = app.signed_in_user()?;
    let record = app.wellness()?.quick_log(&user.id, shortcut).await?;
    println!("{}: {}", shortcut.label(), format_value(record.value, &record.unit));
    Ok(())
}

async fn cmd_activities(app: &App, date: Option<NaiveDate>) -> Result<()> {
    let user = app.signed_in_user()?;
    let service = app.wellness()?;
    let date = date.unwrap_or_else(|| service.today());
    let records = service.activities_on(&user.id, date).await?;
    if records.is_empty() {
        println!("No activities on {}", format_date(date));
    }
    for r in records {
        let duration = r.duration.map(|d| format!(" over {} min", d)).unwrap_or_default();
        let notes = r
            .notes
            .as_deref()
            .map(|n| format!("  \"{}\"", truncate_string(n, 40)))
            .unwrap_or_default();
        println!(
            "{} {:<16} {}{}{}",
            r.created_at.format("%H:%M"),
            r.activity_type.label(),
            format_value(r.value, &r.unit),
            duration,
            notes
        );
    }
    Ok(())
}

fn cmd_types() {
    for kind in ActivityType::ALL {
        println!(
            "{:<10} {:<16} {:<8} default goal {}",
            kind.as_str(),
            kind.label(),
            kind.unit(),
            format_value(kind.default_target(), kind.unit())
        );
    }
    println!();
    for shortcut in QuickLog::ALL {
        println!("quick {:<9} {}", shortcut.activity_type(), shortcut.label());
    }
}

async fn cmd_goal(app: &App, request: GoalRequest) -> Result<()> {
    let user = app.signed_in_user()?;
    let goal = app.wellness()?.upsert_goal(&user.id, request).await?;
    println!(
        "Goal: {} {}",
        format_value(goal.target_value, &goal.unit),
        goal.activity_type.label()
    );
    Ok(())
}

async fn cmd_progress(app: &App, date: Option<NaiveDate>) -> Result<()> {
    let user = app.signed_in_user()?;
    let service = app.wellness()?;
    let date = date.unwrap_or_else(|| service.today());
    let progress = service.goals_with_progress(&user.id, date).await?;
    if progress.is_empty() {
        println!("No goals yet. Try `criyago goal water 8`.");
    }
    for p in progress {
        println!(
            "{:<16} {} {:>5.1}%  {} / {}  {}",
            p.goal.activity_type.label(),
            progress_bar(p.percent, BAR_WIDTH),
            p.percent,
            format_value(p.current_value, ""),
            format_value(p.goal.target_value, &p.goal.unit),
            p.status.as_str()
        );
    }
    Ok(())
}

async fn cmd_summary(app: &App, date: Option<NaiveDate>) -> Result<()> {
    let user = app.signed_in_user()?;
    let service = app.wellness()?;
    let date = date.unwrap_or_else(|| service.today());
    let score = service.record_daily_score(&user.id, date).await?;
    println!(
        "{} - score {}, {} activities, {} goals met",
        format_date(score.date),
        score.score,
        score.activities_completed,
        score.goals_met
    );
    Ok(())
}

async fn cmd_remind(app: &App, command: RemindCommands) -> Result<()> {
    let user = app.signed_in_user()?;
    let service = app.wellness()?;
    match command {
        RemindCommands::Add {
            kind,
            time,
            title,
            description,
            frequency,
        } => {
            let mut request = ReminderRequest::new(kind, title.join(" "), time).with_frequency(frequency);
            if let Some(description) = description {
                request = request.with_description(description);
            }
            let reminder = service.create_reminder(&user.id, request).await?;
            println!("Reminder {} set for {}", reminder.id, reminder.time.format("%H:%M"));
        }
        RemindCommands::List => {
            let reminders = service.active_reminders(&user.id).await?;
            if reminders.is_empty() {
                println!("No active reminders");
            }
            for r in reminders {
                println!(
                    "{} {:<18} {:<8} {}  {}",
                    r.time.format("%H:%M"),
                    r.reminder_type,
                    format!("{:?}", r.frequency).to_lowercase(),
                    r.title,
                    r.id
                );
            }
        }
        RemindCommands::Off { id } => {
            let reminder = service.deactivate_reminder(&user.id, id).await?;
            println!("Reminder \"{}\" switched off", reminder.title);
        }
    }
    Ok(())
}

fn goal_request(
    activity_type: String,
    target: Option<f64>,
    deadline: Option<NaiveDate>,
    frequency: Option<criyago_core::models::GoalFrequency>,
) -> Result<GoalRequest> {
    let target = match target {
        Some(target) => target,
        None => activity_type.parse::<ActivityType>()?.default_target(),
    };
    let mut request = GoalRequest::new(activity_type, target);
    if let Some(deadline) = deadline {
        request = request.with_deadline(deadline);
    }
    if let Some(frequency) = frequency {
        request = request.with_frequency(frequency);
    }
    Ok(request)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut app = App::load(cli.origin)?;
    let _guard = init_tracing(&app.config.cache_dir()?.join("logs"));
    debug!(origin = %app.config.origin, "criyago starting");

    match cli.command {
        Commands::Install => cmd_install(&app).await,
        Commands::Fetch { path, navigate } => cmd_fetch(&app, &path, navigate).await,
        Commands::CacheStatus => cmd_cache_status(&app),
        Commands::Push { message } => {
            let payload = (!message.is_empty()).then(|| message.join(" "));
            cmd_signal(&app, Signal::Push { payload })
        }
        Commands::Click { action } => cmd_signal(&app, Signal::NotificationClick { action }),
        Commands::Sync { tag } => cmd_signal(&app, Signal::Sync { tag }),
        Commands::SignIn { email, name, token } => cmd_sign_in(&mut app, email, name, token).await,
        Commands::SignOut { forget_key } => cmd_sign_out(&mut app, forget_key),
        Commands::Whoami => cmd_whoami(&app),
        Commands::Key(command) => cmd_key(&app, command),
        Commands::Log {
            activity_type,
            value,
            duration,
            notes,
            date,
        } => {
            let mut activity = NewActivity::new(activity_type, value);
            if let Some(minutes) = duration {
                activity = activity.with_duration(minutes);
            }
            if let Some(notes) = notes {
                activity = activity.with_notes(notes);
            }
            if let Some(date) = date {
                activity = activity.on(date);
            }
            cmd_log(&app, activity).await
        }
        Commands::Quick { shortcut } => cmd_quick(&app, shortcut).await,
        Commands::Activities { date } => cmd_activities(&app, date).await,
        Commands::Types => {
            cmd_types();
            Ok(())
        }
        Commands::Goal {
            activity_type,
            target,
            deadline,
            frequency,
        } => cmd_goal(&app, goal_request(activity_type, target, deadline, frequency)?).await,
        Commands::Progress { date } => cmd_progress(&app, date).await,
        Commands::Summary { date } => cmd_summary(&app, date).await,
        Commands::Remind(command) => cmd_remind(&app, command).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use criyago_core::models::GoalFrequency;

    #[test]
    fn test_goal_request_uses_default_target() {
        let request = goal_request("water".to_string(), None, None, Some(GoalFrequency::Weekly)).unwrap();
        assert_eq!(request.target_value, 8.0);
        assert_eq!(request.frequency, Some(GoalFrequency::Weekly));

        let explicit = goal_request("walking".to_string(), Some(5000.0), None, None).unwrap();
        assert_eq!(explicit.target_value, 5000.0);

        assert!(goal_request("yoga".to_string(), None, None, None).is_err());
    }
}
