//! check サブコマンド
//!
//! 指定したエンドポイントを1回だけ検査して結果を表示する。

use crate::config::HarvestConfig;
use crate::executor::BoundedExecutor;
use crate::probe::{HttpProber, Prober};
use crate::types::{Endpoint, ProbeMode, ProbeResult};
use crate::HarvestError;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// check サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Endpoints to probe
    #[arg(required = true, value_name = "HOST:PORT")]
    pub endpoints: Vec<String>,

    /// Fail endpoints slower than this (no ceiling if omitted)
    #[arg(long)]
    pub max_latency_ms: Option<u64>,

    /// Max probes in flight
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Per-probe timeout in seconds
    #[arg(long)]
    pub probe_timeout_secs: Option<u64>,
}

impl CheckArgs {
    /// 判定モード
    pub fn mode(&self) -> ProbeMode {
        match self.max_latency_ms {
            Some(ms) => ProbeMode::LatencyCapped(Duration::from_millis(ms)),
            None => ProbeMode::Reachable,
        }
    }
}

/// 引数を解釈し、解釈できないものは警告して除外する
pub fn parse_endpoints(raw: &[String]) -> Vec<Endpoint> {
    let mut endpoints: Vec<Endpoint> = raw
        .iter()
        .filter_map(|r| match Endpoint::parse(r) {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                warn!(input = %r, error = %e, "Skipping invalid endpoint");
                None
            }
        })
        .collect();
    endpoints.sort();
    endpoints.dedup();
    endpoints
}

/// 全エンドポイントを検査し、エンドポイント順に返す
pub async fn probe_endpoints(
    endpoints: Vec<Endpoint>,
    prober: Arc<dyn Prober>,
    executor: &BoundedExecutor,
    mode: ProbeMode,
) -> Vec<ProbeResult> {
    let mut results = executor.spawn(endpoints, prober, mode).collect().await;
    results.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
    results
}

/// 結果1件を表示用に整形
pub fn format_result(result: &ProbeResult) -> String {
    let latency = result
        .latency_ms()
        .map(|ms| format!("{}ms", ms))
        .unwrap_or_else(|| "-".to_string());
    if result.passed() {
        format!("{}\tLIVE\t{}", result.endpoint, latency)
    } else {
        let reason = result
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "failed".to_string());
        format!("{}\tDEAD\t{}\t{}", result.endpoint, latency, reason)
    }
}

/// Execute the check command
///
/// 合格したエンドポイント数を返す。
pub async fn execute(args: &CheckArgs) -> Result<usize, HarvestError> {
    let mut config = HarvestConfig::from_env();
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(secs) = args.probe_timeout_secs {
        config.probe_timeout = Duration::from_secs(secs);
    }
    config.validate()?;

    let endpoints = parse_endpoints(&args.endpoints);
    if endpoints.is_empty() {
        return Err(HarvestError::Config(
            "no valid endpoints given (expected host:port)".to_string(),
        ));
    }

    let prober = Arc::new(HttpProber::from_config(&config)?);
    let executor = BoundedExecutor::new(config.concurrency);
    let results = probe_endpoints(endpoints, prober, &executor, args.mode()).await;

    let mut passed = 0;
    for result in &results {
        if result.passed() {
            passed += 1;
        }
        println!("{}", format_result(result));
    }
    println!("{}/{} live", passed, results.len());
    Ok(passed)
}
