//! # tasky
//!
//! Scheduler binary. Wires settings, the `SQLite` store, the Telegram
//! notifier and the scheduling engine together.
//!
//! - `tasky run` (default): start the per-minute engine until Ctrl-C
//! - `tasky migrate`: apply database migrations and exit
//! - `tasky tick [--at <RFC 3339>]`: run a single engine tick and print its report
//! - `tasky recur`: create the next task of every overdue recurring series

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tasky_core::time::resolve_timezone;
use tasky_core::traits::ScheduleStore;
use tasky_cron::{HousekeepingSchedule, SchedulingEngine, WallClock};
use tasky_notify::{NotifyError, TelegramNotifier};
use tasky_recurrence::{ProcessReport, RecurringTaskInstantiator};
use tasky_settings::TaskySettings;
use tasky_store::repositories::TaskRepository;
use tasky_store::{ConnectionConfig, SqliteStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// tasky notification scheduler.
#[derive(Parser, Debug)]
#[command(name = "tasky", version, about = "tasky notification scheduler")]
struct Cli {
    /// Settings file (default: `~/.tasky/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// `SQLite` database path (overrides settings).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the scheduling engine until interrupted.
    Run,
    /// Apply pending database migrations and exit.
    Migrate,
    /// Run one engine tick and print the report as JSON.
    Tick {
        /// Tick instant (default: now).
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Skip housekeeping jobs (backups and deletions).
        #[arg(long)]
        no_housekeeping: bool,
    },
    /// Create the next task of every overdue recurring series.
    Recur,
}

fn load_settings(path: Option<&Path>) -> (TaskySettings, Option<tasky_settings::SettingsError>) {
    let loaded = match path {
        Some(path) => tasky_settings::load_settings_from_path(path),
        None => tasky_settings::load_settings(),
    };
    match loaded {
        Ok(settings) => (settings, None),
        Err(err) => (TaskySettings::default(), Some(err)),
    }
}

fn open_store(settings: &TaskySettings, db_path: Option<PathBuf>) -> Result<Arc<SqliteStore>> {
    let path = db_path.unwrap_or_else(|| settings.database.resolved_path());
    let config = ConnectionConfig {
        pool_size: settings.database.pool_size,
        busy_timeout_ms: settings.database.busy_timeout_ms,
    };
    let store = SqliteStore::open(&path, &config).with_context(|| format!("failed to open database {}", path.display()))?;
    Ok(Arc::new(store))
}

fn housekeeping_schedule(settings: &TaskySettings) -> Result<HousekeepingSchedule> {
    let s = &settings.scheduler;
    HousekeepingSchedule::from_slots(&s.backup_at, &s.retention_at, &s.archive_at)
        .context("invalid housekeeping slot in scheduler settings")
}

/// Notifier for the engine, or `None` when no bot token is configured.
fn build_notifier(settings: &TaskySettings) -> Result<Option<Arc<TelegramNotifier>>> {
    match TelegramNotifier::new(&settings.telegram) {
        Ok(notifier) => Ok(Some(Arc::new(notifier))),
        Err(NotifyError::MissingToken) => Ok(None),
        Err(err) => Err(err).context("failed to build telegram notifier"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

async fn run(settings: &TaskySettings, store: Arc<SqliteStore>) -> Result<()> {
    if !settings.scheduler.enabled {
        warn!("scheduler disabled in settings, engine not started");
        return Ok(());
    }
    let Some(notifier) = build_notifier(settings)? else {
        warn!("no telegram bot token configured, engine not started");
        return Ok(());
    };

    let mut engine = SchedulingEngine::new(store, notifier).with_housekeeping(housekeeping_schedule(settings)?);
    let clock = WallClock::new(Duration::from_secs(settings.scheduler.tick_seconds));
    let cancel = CancellationToken::new();

    let engine_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { engine.run(clock, cancel).await }
    });

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutting down");
    cancel.cancel();
    engine_task.await.context("engine task failed")?;
    Ok(())
}

async fn tick(settings: &TaskySettings, store: Arc<SqliteStore>, at: Option<DateTime<Utc>>, housekeeping: bool) -> Result<()> {
    let Some(notifier) = build_notifier(settings)? else {
        bail!("no telegram bot token configured");
    };
    let schedule = if housekeeping {
        housekeeping_schedule(settings)?
    } else {
        HousekeepingSchedule::disabled()
    };
    let mut engine = SchedulingEngine::new(store, notifier).with_housekeeping(schedule);
    let report = engine.tick(at.unwrap_or_else(Utc::now)).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn recur(store: Arc<SqliteStore>) -> Result<()> {
    let now = Utc::now();
    let mut total = ProcessReport::default();

    for settings in store.query_user_schedule_settings().await? {
        let user = settings.user_id;
        let tasks = store.run(move |conn| TaskRepository::list_for_user(conn, user)).await?;
        let instantiator =
            RecurringTaskInstantiator::new(store.clone()).with_timezone(resolve_timezone(&settings.timezone));
        let report = instantiator.process_all(&tasks, now).await;
        total.eligible += report.eligible;
        total.generated += report.generated;
        total.terminated += report.terminated;
        total.failed += report.failed;
    }

    info!(
        eligible = total.eligible,
        generated = total.generated,
        terminated = total.terminated,
        failed = total.failed,
        "recurring series processed"
    );
    let summary = serde_json::json!({
        "eligible": total.eligible,
        "generated": total.generated,
        "terminated": total.terminated,
        "failed": total.failed,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (settings, load_error) = load_settings(cli.settings.as_deref());
    tasky_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);
    if let Some(err) = load_error {
        warn!(error = %err, "failed to load settings, using defaults");
    }

    let store = open_store(&settings, cli.db_path)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&settings, store).await,
        Command::Migrate => {
            info!("database is up to date");
            Ok(())
        }
        Command::Tick { at, no_housekeeping } => tick(&settings, store, at, !no_housekeeping).await,
        Command::Recur => recur(store).await,
    }
}
