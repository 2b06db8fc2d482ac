use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use tsam_sessions::clock::SystemClock;
use tsam_sessions::config;
use tsam_sessions::db;
use tsam_sessions::service;

#[derive(Debug, Parser)]
#[command(author, version, about = "Generate and maintain batch session plans")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate (or regenerate) the session plan of a batch
    Plan {
        #[arg(long)]
        batch_id: i64,
        /// First date to schedule from (defaults to the batch start date)
        #[arg(long)]
        from: Option<NaiveDate>,
    },
    /// Manage batch holidays
    Holiday {
        #[command(subcommand)]
        action: HolidayAction,
    },
    /// Mark a session as taught
    CompleteSession {
        #[arg(long)]
        session_id: i64,
    },
    /// Soft-delete a batch
    DeleteBatch {
        #[arg(long)]
        batch_id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum HolidayAction {
    Add {
        #[arg(long)]
        batch_id: i64,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        description: Option<String>,
    },
    Remove {
        #[arg(long)]
        batch_id: i64,
        #[arg(long)]
        date: NaiveDate,
    },
    List {
        #[arg(long)]
        batch_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tsam_sessions::init_tracing();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.app.database_url()).await?;
    db::run_migrations(&pool).await?;

    match args.command {
        Command::Plan { batch_id, from } => {
            let store = db::SqliteStore::new(pool.clone());
            let plan = service::generate_session_plan(
                &store,
                &SystemClock,
                &cfg.allocator_options(),
                batch_id,
                from,
            )
            .await?;
            match plan.estimated_end_date() {
                Some(end) => println!(
                    "batch {}: {} sessions, {} minutes, ends {}",
                    batch_id,
                    plan.sessions.len(),
                    plan.total_minutes(),
                    end
                ),
                None => println!("batch {}: nothing left to schedule", batch_id),
            }
        }
        Command::Holiday { action } => match action {
            HolidayAction::Add {
                batch_id,
                date,
                description,
            } => {
                db::add_holiday(&pool, batch_id, date, description.as_deref()).await?;
                info!(batch_id, %date, "holiday added");
            }
            HolidayAction::Remove { batch_id, date } => {
                db::remove_holiday(&pool, batch_id, date).await?;
                info!(batch_id, %date, "holiday removed");
            }
            HolidayAction::List { batch_id } => {
                for holiday in db::fetch_holidays(&pool, batch_id).await? {
                    println!(
                        "{}\t{}",
                        holiday.date,
                        holiday.description.unwrap_or_default()
                    );
                }
            }
        },
        Command::CompleteSession { session_id } => {
            let done = db::complete_session(&pool, session_id).await?;
            println!(
                "session {} completed (module complete: {}, batch complete: {})",
                done.session_id, done.module_completed, done.batch_completed
            );
        }
        Command::DeleteBatch { batch_id } => {
            db::soft_delete_batch(&pool, batch_id).await?;
            info!(batch_id, "batch deleted");
        }
    }

    Ok(())
}
