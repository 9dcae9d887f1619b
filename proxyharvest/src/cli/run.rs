//! run サブコマンド
//!
//! 発見サイクルと剪定サイクルを起動し、Ctrl-Cまで動かし続ける。

use crate::config::{HarvestConfig, TelegramConfig};
use crate::harvester::Harvester;
use crate::notifier::{build_notifier, notify_best_effort, STARTED_MESSAGE, STOPPED_MESSAGE};
use crate::shutdown::ShutdownController;
use crate::HarvestError;
use clap::Args;
use std::time::Duration;
use tracing::{error, info};

/// 停止要求後にサイクルの終了を待つ時間
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// run サブコマンドの引数
///
/// 指定した値は環境変数の設定より優先される。
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Max probes in flight
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Per-probe timeout in seconds
    #[arg(long)]
    pub probe_timeout_secs: Option<u64>,

    /// Sleep between discovery passes in seconds
    #[arg(long)]
    pub discovery_interval_secs: Option<u64>,

    /// Sleep between prune passes in seconds
    #[arg(long)]
    pub prune_interval_secs: Option<u64>,

    /// Latency ceiling for both admission and pruning
    #[arg(long)]
    pub max_latency_ms: Option<u64>,

    /// Probe target URL
    #[arg(long)]
    pub probe_url: Option<String>,
}

impl RunArgs {
    /// 引数で設定を上書き
    pub fn apply_to(&self, config: &mut HarvestConfig) {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(secs) = self.probe_timeout_secs {
            config.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.discovery_interval_secs {
            config.discovery_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.prune_interval_secs {
            config.prune_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = self.max_latency_ms {
            config.admission_latency = Duration::from_millis(ms);
            config.prune_latency = Duration::from_millis(ms);
        }
        if let Some(url) = &self.probe_url {
            config.probe_url = url.clone();
        }
    }
}

/// Execute the run command
pub async fn execute(args: &RunArgs) -> Result<(), HarvestError> {
    let mut config = HarvestConfig::from_env();
    args.apply_to(&mut config);

    let notifier = build_notifier(TelegramConfig::from_env()?)?;
    let harvester = Harvester::from_config(config, notifier.clone())?;
    let registry = harvester.registry().clone();

    notify_best_effort(notifier.as_ref(), STARTED_MESSAGE).await;

    let shutdown = ShutdownController::default();
    let handles = harvester.start(shutdown.clone());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
    info!("Shutdown requested");
    shutdown.request_shutdown();
    handles.join(SHUTDOWN_GRACE).await;

    notify_best_effort(notifier.as_ref(), STOPPED_MESSAGE).await;
    let live = registry.len().await;
    info!(live, "Proxy collector stopped");
    Ok(())
}
