//! CLI module for proxyharvest
//!
//! 収集器の起動と単発の検査コマンドを提供する。

pub mod check;
pub mod run;
pub mod sources;

use clap::{Parser, Subcommand};

/// Proxy harvester - collects public proxies and keeps the live ones
#[derive(Parser, Debug)]
#[command(name = "proxyharvest")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    PROXYHARVEST_CONCURRENCY              Max probes in flight (default: 200)
    PROXYHARVEST_PROBE_TIMEOUT_SECS       Per-probe timeout (default: 8)
    PROXYHARVEST_DISCOVERY_INTERVAL_SECS  Sleep between discovery passes (default: 600)
    PROXYHARVEST_PRUNE_INTERVAL_SECS      Sleep between prune passes (default: 7200)
    PROXYHARVEST_MAX_LATENCY_MS           Latency ceiling for both cycles (default: 500)
    PROXYHARVEST_ADMISSION_LATENCY_MS     Latency ceiling for admission
    PROXYHARVEST_PRUNE_LATENCY_MS         Latency ceiling for retention
    PROXYHARVEST_PROBE_URL                Probe target (default: https://httpbin.org/ip)
    PROXYHARVEST_SOURCE_TIMEOUT_SECS      Feed request timeout (default: 12)
    PROXYHARVEST_USER_AGENT               User-Agent for feeds and probes
    PROXYHARVEST_TELEGRAM_TOKEN           Telegram bot token (log-only if unset)
    PROXYHARVEST_TELEGRAM_CHAT_ID         Telegram chat id (required with token)
    PROXYHARVEST_LOG_LEVEL                Log level (default: info)
    PROXYHARVEST_LOG_DIR                  Directory for daily log files
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run discovery and pruning until interrupted
    Run(run::RunArgs),
    /// Probe the given endpoints once and print the results
    Check(check::CheckArgs),
    /// Fetch every source once and print the counts
    Sources(sources::SourcesArgs),
}
