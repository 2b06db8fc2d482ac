use anyhow::Result;
use clap::Parser;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;

use tsam_sessions::config;
use tsam_sessions::db;

#[derive(Debug, Parser)]
#[command(author, version, about = "Print the stored session plan of a batch")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[arg(long)]
    batch_id: i64,

    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tsam_sessions::init_tracing();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let pool = db::init_pool(&cfg.app.database_url()).await?;
    db::run_migrations(&pool).await?;

    let batch = db::fetch_batch(&pool, args.batch_id).await?;
    let sessions = db::fetch_sessions(&pool, args.batch_id).await?;

    if args.json {
        let out = json!({
            "batch": batch,
            "sessions": sessions,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let modules: HashMap<i64, String> = db::fetch_batch_modules(&pool, args.batch_id)
        .await?
        .into_iter()
        .map(|m| (m.id, m.name))
        .collect();
    let faculty: HashMap<i64, String> = db::fetch_faculty(&pool)
        .await?
        .into_iter()
        .map(|f| (f.id, f.name))
        .collect();

    println!(
        "{} ({}) status={} start={} est_end={}",
        batch.name,
        batch.code,
        batch.status.as_str(),
        batch.start_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        batch
            .estimated_end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into()),
    );
    for session in &sessions {
        let mark = if session.is_completed { "x" } else { " " };
        println!(
            "[{}] #{} {} {} ({})",
            mark,
            session.id,
            session.date.format("%a %Y-%m-%d"),
            modules.get(&session.batch_module_id).map(String::as_str).unwrap_or("?"),
            faculty.get(&session.faculty_id).map(String::as_str).unwrap_or("?"),
        );
        for topic in &session.topics {
            println!(
                "      {}. {} {} min{}",
                topic.order,
                topic.content,
                topic.total_time,
                if topic.is_completed { "" } else { " (continues)" }
            );
        }
    }
    Ok(())
}
