//! xw-quota - Show the daily posting quota
//!
//! Reports how many posts are left in the current 24 hour epoch and when the
//! epoch resets.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use libxwrite::rate_limiter::{format_remaining, now_millis};
use libxwrite::{Config, FileStateStore, QuotaStatus, RateLimiter, XWriteError};
use serde::Serialize;
use tracing::debug;

#[derive(Parser)]
#[command(name = "xw-quota")]
#[command(about = "Show how many posts are left today", long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct QuotaReport {
    can_post: bool,
    remaining: u32,
    limit: u32,
    /// RFC 3339
    reset_at: String,
    reset_in: String,
}

impl QuotaReport {
    fn new(status: &QuotaStatus, now: i64) -> Self {
        let reset_at = status
            .reset_at_utc()
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_default();

        Self {
            can_post: status.can_post,
            remaining: status.remaining,
            limit: status.limit,
            reset_at,
            reset_in: format_remaining(status.reset_at, now),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    libxwrite::logging::init_default(cli.verbose);

    if let Err(e) = run(cli.format) {
        debug!("Command failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<XWriteError>()
            .map_or(1, XWriteError::exit_code);
        std::process::exit(code);
    }
}

fn run(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let state = FileStateStore::open(config.state_path())?;
    let limiter = RateLimiter::new(config.quota.daily_limit);

    let now = now_millis();
    let status = limiter.check_quota(&state, now)?;
    let report = QuotaReport::new(&status, now);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Posts remaining today: {}/{}", report.remaining, report.limit);
            if report.can_post {
                println!("Quota resets in {} ({})", report.reset_in, report.reset_at);
            } else {
                println!(
                    "Daily limit reached. Try again in {} ({})",
                    report.reset_in, report.reset_at
                );
            }
        }
    }

    Ok(())
}
