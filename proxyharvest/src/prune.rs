//! 剪定サイクル
//!
//! レジストリ全件をより厳しいレイテンシ上限で再検査し、
//! 合格したものだけでレジストリを一括置換する。
//!
//! スナップショットは検査開始時点のもの。検査中に発見サイクルが追加した
//! エンドポイントは置換時に失われる（次回以降の発見では再検査されない）。

use crate::executor::BoundedExecutor;
use crate::probe::Prober;
use crate::registry::LiveRegistry;
use crate::shutdown::ShutdownController;
use crate::types::ProbeMode;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// デフォルトの待機間隔（秒）
const DEFAULT_INTERVAL_SECS: u64 = 7200;

/// デフォルトの剪定レイテンシ上限（ミリ秒）
const DEFAULT_PRUNE_LATENCY_MS: u64 = 500;

/// 1回の剪定パスの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneReport {
    /// レジストリが空だったため検査しなかった
    Skipped,
    /// 再検査して入れ替えた
    Swapped {
        /// 再検査した件数（スナップショットの件数）
        checked: usize,
        /// 合格して残った件数
        retained: usize,
        /// 置換で除外された件数
        evicted: usize,
    },
}

/// 剪定サイクル
pub struct PruneCycle {
    executor: BoundedExecutor,
    prober: Arc<dyn Prober>,
    registry: LiveRegistry,
    prune_latency: Duration,
    interval: Duration,
}

impl PruneCycle {
    /// 新しい剪定サイクルを作成
    pub fn new(executor: BoundedExecutor, prober: Arc<dyn Prober>, registry: LiveRegistry) -> Self {
        Self {
            executor,
            prober,
            registry,
            prune_latency: Duration::from_millis(DEFAULT_PRUNE_LATENCY_MS),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }

    /// 剪定レイテンシ上限を設定
    pub fn with_prune_latency(mut self, max: Duration) -> Self {
        self.prune_latency = max;
        self
    }

    /// 待機間隔を設定
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 1回の剪定パスを実行
    pub async fn run_once(&self) -> PruneReport {
        let snapshot = self.registry.snapshot().await;
        if snapshot.is_empty() {
            debug!("Live registry empty, skipping prune");
            return PruneReport::Skipped;
        }

        let checked = snapshot.len();
        info!(checked, "Re-checking live proxies");

        let mode = ProbeMode::LatencyCapped(self.prune_latency);
        let survivors = self
            .executor
            .spawn(snapshot, Arc::clone(&self.prober), mode)
            .collect_passed()
            .await;
        let retained = survivors.len();

        let summary = self.registry.replace_all(survivors).await;
        let report = PruneReport::Swapped {
            checked,
            retained,
            evicted: summary.evicted(),
        };

        info!(
            checked,
            retained,
            evicted = summary.evicted(),
            "Prune cycle completed"
        );
        report
    }

    /// シャットダウンまで剪定パスを繰り返す
    ///
    /// 初回は待機から始める（起動直後のレジストリは空のため）。
    pub async fn run(self, shutdown: ShutdownController) {
        info!(
            interval_secs = self.interval.as_secs(),
            prune_latency_ms = self.prune_latency.as_millis() as u64,
            "Prune cycle started"
        );

        while shutdown.sleep(self.interval).await {
            tokio::select! {
                _ = self.run_once() => {}
                _ = shutdown.wait() => break,
            }
        }

        info!("Prune cycle stopped");
    }

    /// バックグラウンドで開始
    pub fn start(self, shutdown: ShutdownController) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
