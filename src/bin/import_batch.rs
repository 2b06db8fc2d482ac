use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use tsam_sessions::config;
use tsam_sessions::db;
use tsam_sessions::fixture;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Import a batch (curriculum, faculty, timings, holidays) from a YAML fixture"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Batch fixture to import
    #[arg(long, required_unless_present = "example")]
    file: Option<PathBuf>,

    /// Print a sample fixture and exit
    #[arg(long)]
    example: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tsam_sessions::init_tracing();

    let args = Args::parse();
    if args.example {
        print!("{}", fixture::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;
    let pool = db::init_pool(&cfg.app.database_url()).await?;
    db::run_migrations(&pool).await?;

    let file = args.file.context("--file is required")?;
    let fx = fixture::load(&file)?;
    let batch_id = db::import_batch(&pool, &fx).await?;
    info!(batch_id, code = %fx.batch.code, "import finished");
    println!("{}", batch_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_flag_needs_no_file() {
        let args = Args::try_parse_from(["import_batch", "--example"]).unwrap();
        assert!(args.example);
        assert!(args.file.is_none());
    }

    #[test]
    fn file_required_without_example() {
        assert!(Args::try_parse_from(["import_batch"]).is_err());
        let args = Args::try_parse_from(["import_batch", "--file", "batch.yaml"]).unwrap();
        assert_eq!(args.file, Some(PathBuf::from("batch.yaml")));
    }
}
