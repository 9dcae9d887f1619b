//! 発見サイクル
//!
//! 取得 → 差分 → 検査 → 待機 を繰り返す。
//!
//! 1. 全取得元から候補を取得（取得元ごとに失敗を隔離）
//! 2. これまでに見た候補（SeenAll）を除外し、新規分をSeenAllへ追加
//!    （検査に失敗しても次回以降は再検査しない）
//! 3. 新規分をレイテンシ上限付きで検査し、合格したものをレジストリへ登録・通知
//! 4. 一定時間待機

use crate::executor::BoundedExecutor;
use crate::notifier::{live_proxy_message, Notifier};
use crate::probe::Prober;
use crate::registry::{Admission, LiveRegistry};
use crate::shutdown::ShutdownController;
use crate::sources::{fetch_all, FetchOutcome, SourceProvider};
use crate::types::{Endpoint, ProbeMode};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// デフォルトの待機間隔（秒）
const DEFAULT_INTERVAL_SECS: u64 = 600;

/// デフォルトの登録レイテンシ上限（ミリ秒）
const DEFAULT_ADMISSION_LATENCY_MS: u64 = 500;

/// 検査・登録の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionStats {
    /// 検査した件数
    pub probed: usize,
    /// 新規登録した件数
    pub admitted: usize,
    /// 既に登録済みだった件数
    pub already_live: usize,
    /// 不合格の件数
    pub rejected: usize,
}

/// 1回の発見パスの結果
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    /// パス番号（1始まり）
    pub cycle: u64,
    /// 開始時刻
    pub started_at: DateTime<Utc>,
    /// 取得した候補数（和集合）
    pub fetched: usize,
    /// 新規候補数
    pub novel: usize,
    /// 検査・登録の集計
    pub stats: AdmissionStats,
    /// 失敗した取得元
    pub failed_sources: Vec<String>,
}

/// 発見サイクル
pub struct DiscoveryCycle {
    sources: Vec<Arc<dyn SourceProvider>>,
    executor: BoundedExecutor,
    prober: Arc<dyn Prober>,
    registry: LiveRegistry,
    notifier: Arc<dyn Notifier>,
    admission_latency: Duration,
    interval: Duration,
    /// これまでに見た全候補（単調増加）
    seen_all: HashSet<Endpoint>,
    cycle: u64,
}

impl DiscoveryCycle {
    /// 新しい発見サイクルを作成
    pub fn new(
        sources: Vec<Arc<dyn SourceProvider>>,
        executor: BoundedExecutor,
        prober: Arc<dyn Prober>,
        registry: LiveRegistry,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            sources,
            executor,
            prober,
            registry,
            notifier,
            admission_latency: Duration::from_millis(DEFAULT_ADMISSION_LATENCY_MS),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            seen_all: HashSet::new(),
            cycle: 0,
        }
    }

    /// 登録レイテンシ上限を設定
    pub fn with_admission_latency(mut self, max: Duration) -> Self {
        self.admission_latency = max;
        self
    }

    /// 待機間隔を設定
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// これまでに見た全候補
    pub fn seen_all(&self) -> &HashSet<Endpoint> {
        &self.seen_all
    }

    /// 全取得元から候補を取得
    pub async fn fetch(&self) -> FetchOutcome {
        fetch_all(&self.sources).await
    }

    /// SeenAllに無い候補を返し、SeenAllへ追加する
    ///
    /// 戻り値は昇順。
    pub fn diff(&mut self, fetched: HashSet<Endpoint>) -> Vec<Endpoint> {
        let mut novel: Vec<Endpoint> = fetched
            .into_iter()
            .filter(|e| !self.seen_all.contains(e))
            .collect();
        novel.sort();
        self.seen_all.extend(novel.iter().cloned());
        novel
    }

    /// 候補を検査し、合格したものを登録する
    ///
    /// 結果は完了順に処理する。登録済みのエンドポイントは通知しない。
    pub async fn probe_and_admit(&self, candidates: Vec<Endpoint>) -> AdmissionStats {
        let mode = ProbeMode::LatencyCapped(self.admission_latency);
        let mut results = self
            .executor
            .spawn(candidates, Arc::clone(&self.prober), mode);
        let mut stats = AdmissionStats::default();

        while let Some(result) = results.next().await {
            stats.probed += 1;
            if !result.passed() {
                stats.rejected += 1;
                debug!(
                    endpoint = %result.endpoint,
                    error = ?result.error,
                    "Candidate rejected"
                );
                continue;
            }

            let message = live_proxy_message(result.endpoint.as_str(), result.latency_ms());
            match self
                .registry
                .admit(result.endpoint, self.notifier.as_ref(), &message)
                .await
            {
                Admission::Admitted => stats.admitted += 1,
                Admission::AlreadyLive => stats.already_live += 1,
            }
        }

        stats
    }

    /// 1回の発見パスを実行
    pub async fn run_once(&mut self) -> DiscoveryReport {
        self.cycle += 1;
        let started_at = Utc::now();
        info!(
            cycle = self.cycle,
            started_at = %started_at.to_rfc3339(),
            "Discovery cycle"
        );

        let outcome = self.fetch().await;
        let fetched = outcome.endpoints.len();
        let failed_sources: Vec<String> = outcome
            .failed_sources()
            .into_iter()
            .map(str::to_string)
            .collect();
        info!(unique = fetched, "Total fetched");

        let novel = self.diff(outcome.endpoints);
        info!(
            novel = novel.len(),
            seen_all = self.seen_all.len(),
            "New proxies to test this cycle"
        );

        let novel_count = novel.len();
        let stats = if novel.is_empty() {
            info!("No new proxies found this cycle");
            AdmissionStats::default()
        } else {
            self.probe_and_admit(novel).await
        };

        let live = self.registry.len().await;
        info!(
            cycle = self.cycle,
            probed = stats.probed,
            admitted = stats.admitted,
            rejected = stats.rejected,
            live,
            "Discovery cycle completed"
        );

        DiscoveryReport {
            cycle: self.cycle,
            started_at,
            fetched,
            novel: novel_count,
            stats,
            failed_sources,
        }
    }

    /// シャットダウンまで発見パスを繰り返す
    pub async fn run(mut self, shutdown: ShutdownController) {
        info!(
            interval_secs = self.interval.as_secs(),
            admission_latency_ms = self.admission_latency.as_millis() as u64,
            sources = self.sources.len(),
            "Discovery cycle started"
        );

        loop {
            tokio::select! {
                _ = self.run_once() => {}
                _ = shutdown.wait() => break,
            }
            if !shutdown.sleep(self.interval).await {
                break;
            }
        }

        info!("Discovery cycle stopped");
    }

    /// バックグラウンドで開始
    pub fn start(self, shutdown: ShutdownController) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
