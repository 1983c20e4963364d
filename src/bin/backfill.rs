//! Regenerate silver layer data from the bronze layer.
//!
//! Reads raw readings for the last `--days` days and rewrites every enriched
//! record (dew point, comfort, pressure trends, daily stats).
//!
//! ```text
//! backfill --days 7             # backfill last 7 days
//! backfill --days 1 --dry-run   # preview without writing
//! ```
//!
//! Exit code is 0 when every reading was processed without error, 1 otherwise
//! (including an out-of-range `--days`).

use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use dotenvy::dotenv;

use weatherflow::backfill::{backfill, range_for_days, validate_days, BackfillStats};
use weatherflow::Config;

#[derive(Parser, Debug)]
#[command(name = "backfill")]
#[command(about = "Backfill silver layer data from bronze layer")]
struct Args {
    /// Number of days to backfill (1-30)
    #[arg(long, allow_negative_numbers = true)]
    days: i64,

    /// Preview without writing to the store
    #[arg(long)]
    dry_run: bool,
}

// ---

fn main() -> ExitCode {
    // ---
    let args = Args::parse();
    dotenv().ok();
    weatherflow::init_tracing("info");

    // Validate before touching the store
    let days = match validate_days(args.days) {
        Ok(days) => days,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(days, args.dry_run) {
        Ok(stats) if stats.is_clean() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("Backfill failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run(days: i64, dry_run: bool) -> Result<BackfillStats> {
    // ---
    let cfg = weatherflow::load_from_env()?;
    cfg.log_config();

    let store = weatherflow::open_store(&cfg);
    let (start, end) = range_for_days(days, Utc::now());

    let stats = backfill(&store, start, end, dry_run).await?;
    print_summary(&cfg, &stats, dry_run);
    Ok(stats)
}

fn print_summary(cfg: &Config, stats: &BackfillStats, dry_run: bool) {
    // ---
    tracing::info!("Summary:");
    tracing::info!("  Total readings    : {}", stats.total);
    tracing::info!("  Processed         : {}", stats.processed);
    tracing::info!("  Written to silver : {}", stats.written);
    tracing::info!("  Errors            : {}", stats.errors);

    if dry_run {
        tracing::info!("Dry run complete, run without --dry-run to write");
    } else if stats.is_clean() {
        tracing::info!(
            "Silver layer updated: {}/{}/",
            cfg.data_dir.display(),
            cfg.silver_prefix
        );
    } else {
        tracing::warn!("Backfill finished with {} error(s)", stats.errors);
    }
}
