//! Command-line front end for Questify core.
//!
//! # Responsibility
//! - Expose every progression use-case as one subcommand.
//! - Print results as JSON and map error kinds to stable exit codes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::error;
use questify_core::db::open_db;
use questify_core::{
    init_logging, load_config, EngineConfig, ErrorKind, NewAdHocTask, ProgressService, RepoError,
    ServiceError, SqliteTaskPoolRepository, SqliteUserRepository, SystemClock, TaskPoolService,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "questify", version, about = "Daily quests, XP and levels")]
struct Cli {
    /// SQLite database file; created on first use.
    #[arg(long, env = "QUESTIFY_DB", default_value = "questify.db")]
    db: PathBuf,

    /// JSON engine configuration; defaults apply when omitted.
    #[arg(long, env = "QUESTIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when omitted.
    #[arg(long, env = "QUESTIFY_LOG_DIR")]
    log_dir: Option<String>,

    #[arg(long, default_value_t = questify_core::default_log_level().to_string())]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the core version.
    Version,
    /// Replace the task pool with the built-in quests.
    SeedPool,
    /// List the task pool.
    Pool,
    /// Add one quest to the task pool.
    AddPoolEntry {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        xp_reward: Option<u32>,
    },
    /// Remove one quest from the task pool.
    RemovePoolEntry { id: Uuid },
    CreateUser { username: String, password: String },
    /// Show one user's progress.
    User { username: String },
    /// Check a user's password.
    VerifyPassword { username: String, password: String },
    /// Today's quests, rotated when stale.
    Today { username: String },
    /// Draw a new quest set regardless of the current one.
    Refresh { username: String },
    CompleteDaily { username: String, index: usize },
    /// Add XP to a user.
    Award {
        username: String,
        #[arg(allow_negative_numbers = true)]
        xp: i64,
    },
    AddTask {
        username: String,
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Due date in epoch milliseconds.
        #[arg(long)]
        due_at: Option<i64>,
    },
    CompleteTask { username: String, task_id: Uuid },
    DeleteTask { username: String, task_id: Uuid },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        if let Err(err) = init_logging(&cli.log_level, log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(exit_status_for(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config `{}`", path.display()))?,
        None => EngineConfig::default(),
    };
    let conn = open_db(&cli.db)
        .map_err(|err| ServiceError::Unavailable(RepoError::from(err)))
        .with_context(|| format!("opening `{}`", cli.db.display()))?;
    let pool = TaskPoolService::new(
        SqliteTaskPoolRepository::try_new(&conn).map_err(ServiceError::from)?,
    );
    let mut progress = ProgressService::new(
        SqliteUserRepository::try_new(&conn).map_err(ServiceError::from)?,
        SqliteTaskPoolRepository::try_new(&conn).map_err(ServiceError::from)?,
        SystemClock,
        StdRng::from_entropy(),
        config,
    )?;

    match cli.command {
        Command::Version => print_json(&questify_core::core_version()),
        Command::SeedPool => print_json(&pool.seed_default_pool()?),
        Command::Pool => print_json(&pool.list_task_pool()?),
        Command::AddPoolEntry {
            title,
            description,
            xp_reward,
        } => print_json(&pool.add_pool_entry(&title, description.as_deref(), xp_reward)?),
        Command::RemovePoolEntry { id } => print_json(&pool.remove_pool_entry(id)?),
        Command::CreateUser { username, password } => {
            print_json(&progress.create_user(&username, &password)?)
        }
        Command::User { username } => print_json(&progress.get_user(&username)?),
        Command::VerifyPassword { username, password } => {
            print_json(&progress.verify_password(&username, &password)?)
        }
        Command::Today { username } => {
            print_json(&progress.get_or_rotate_daily_tasks(&username)?)
        }
        Command::Refresh { username } => {
            print_json(&progress.force_refresh_daily_tasks(&username)?)
        }
        Command::CompleteDaily { username, index } => {
            print_json(&progress.complete_daily_task(&username, index)?)
        }
        Command::Award { username, xp } => print_json(&progress.award_progress(&username, xp)?),
        Command::AddTask {
            username,
            title,
            description,
            due_at,
        } => {
            let task = NewAdHocTask {
                title,
                description,
                due_at,
            };
            print_json(&progress.add_ad_hoc_task(&username, task)?)
        }
        Command::CompleteTask { username, task_id } => {
            print_json(&progress.complete_ad_hoc_task(&username, task_id)?)
        }
        Command::DeleteTask { username, task_id } => {
            print_json(&progress.delete_ad_hoc_task(&username, task_id)?)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Exit codes follow sysexits(3) where one fits.
fn exit_status_for(err: &anyhow::Error) -> u8 {
    let Some(service_error) = err.downcast_ref::<ServiceError>() else {
        return 1;
    };
    match service_error.kind() {
        ErrorKind::InvalidArgument => 64,
        ErrorKind::NotFound => 66,
        ErrorKind::AlreadyExists => 73,
        ErrorKind::Unavailable => 69,
        ErrorKind::Conflict => 75,
    }
}

#[cfg(test)]
mod tests {
    use super::{exit_status_for, run, Cli, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn award_accepts_negative_values_for_core_validation() {
        let cli = Cli::try_parse_from(["questify", "award", "alice", "-5"]).unwrap();
        assert!(matches!(cli.command, Command::Award { xp: -5, .. }));
    }

    #[test]
    fn complete_daily_parses_index() {
        let cli =
            Cli::try_parse_from(["questify", "--db", "/tmp/q.db", "complete-daily", "bob", "2"])
                .unwrap();
        assert!(matches!(cli.command, Command::CompleteDaily { index: 2, .. }));
    }

    #[test]
    fn unopenable_database_exits_as_unavailable() {
        let missing_dir =
            std::env::temp_dir().join(format!("questify-missing-{}", std::process::id()));
        let db = missing_dir.join("nested").join("questify.db");
        let cli = Cli::try_parse_from(["questify", "--db", db.to_str().unwrap(), "pool"]).unwrap();

        let err = run(cli).unwrap_err();
        assert_eq!(exit_status_for(&err), 69);
    }

    #[test]
    fn errors_outside_the_core_exit_with_generic_failure() {
        let err = anyhow::anyhow!("unexpected");
        assert_eq!(exit_status_for(&err), 1);
    }
}
