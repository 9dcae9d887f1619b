//! sources サブコマンド
//!
//! 全取得元から1回だけ取得し、取得元ごとの件数を表示する。

use crate::config::HarvestConfig;
use crate::sources::{default_sources, fetch_all, FeedClient, FetchOutcome, SourceStatus};
use crate::HarvestError;
use clap::Args;

/// sources サブコマンドの引数
#[derive(Args, Debug, Clone, Default)]
pub struct SourcesArgs {
    /// Also print every unique endpoint
    #[arg(long, default_value_t = false)]
    pub print: bool,
}

/// 取得結果を表形式に整形
pub fn format_outcome(outcome: &FetchOutcome) -> String {
    let mut lines = vec!["SOURCE\tSTATUS\tCOUNT".to_string()];
    for report in &outcome.reports {
        let line = match &report.status {
            SourceStatus::Fetched(count) => format!("{}\tok\t{}", report.name, count),
            SourceStatus::Failed(reason) => format!("{}\tfailed\t{}", report.name, reason),
        };
        lines.push(line);
    }
    lines.push(format!("TOTAL (unique)\t\t{}", outcome.endpoints.len()));
    lines.join("\n")
}

/// Execute the sources command
pub async fn execute(args: &SourcesArgs) -> Result<(), HarvestError> {
    let config = HarvestConfig::from_env();
    config.validate()?;
    let sources = default_sources(FeedClient::new(&config)?);

    let outcome = fetch_all(&sources).await;
    println!("{}", format_outcome(&outcome));

    if args.print {
        let mut endpoints: Vec<_> = outcome.endpoints.iter().collect();
        endpoints.sort();
        for endpoint in endpoints {
            println!("{}", endpoint);
        }
    }
    Ok(())
}
