//! 両サイクルの組み立てと起動
//!
//! 発見サイクルと剪定サイクルは独立したタスクとして動き、
//! レジストリとプローブ実行器（同時実行数の上限）だけを共有する。

use crate::config::HarvestConfig;
use crate::discovery::DiscoveryCycle;
use crate::executor::BoundedExecutor;
use crate::notifier::Notifier;
use crate::probe::{HttpProber, Prober};
use crate::prune::PruneCycle;
use crate::registry::LiveRegistry;
use crate::shutdown::ShutdownController;
use crate::sources::{default_sources, FeedClient, SourceProvider};
use crate::HarvestError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// プロキシ収集器
pub struct Harvester {
    config: HarvestConfig,
    sources: Vec<Arc<dyn SourceProvider>>,
    executor: BoundedExecutor,
    prober: Arc<dyn Prober>,
    registry: LiveRegistry,
    notifier: Arc<dyn Notifier>,
}

impl Harvester {
    /// 部品を指定して作成
    pub fn new(
        config: HarvestConfig,
        sources: Vec<Arc<dyn SourceProvider>>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let executor = BoundedExecutor::new(config.concurrency);
        Self {
            config,
            sources,
            executor,
            prober,
            registry: LiveRegistry::new(),
            notifier,
        }
    }

    /// 設定から既定の取得元とHTTPプローブで作成
    pub fn from_config(
        config: HarvestConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, HarvestError> {
        config.validate()?;
        let prober = HttpProber::from_config(&config)?;
        let sources = default_sources(FeedClient::new(&config)?);
        Ok(Self::new(config, sources, Arc::new(prober), notifier))
    }

    /// 設定
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// 共有レジストリ
    pub fn registry(&self) -> &LiveRegistry {
        &self.registry
    }

    /// 共有プローブ実行器
    pub fn executor(&self) -> &BoundedExecutor {
        &self.executor
    }

    /// 通知先
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    /// 発見サイクルを作成
    pub fn discovery_cycle(&self) -> DiscoveryCycle {
        DiscoveryCycle::new(
            self.sources.clone(),
            self.executor.clone(),
            Arc::clone(&self.prober),
            self.registry.clone(),
            Arc::clone(&self.notifier),
        )
        .with_admission_latency(self.config.admission_latency)
        .with_interval(self.config.discovery_interval)
    }

    /// 剪定サイクルを作成
    pub fn prune_cycle(&self) -> PruneCycle {
        PruneCycle::new(
            self.executor.clone(),
            Arc::clone(&self.prober),
            self.registry.clone(),
        )
        .with_prune_latency(self.config.prune_latency)
        .with_interval(self.config.prune_interval)
    }

    /// 両サイクルをバックグラウンドで開始
    pub fn start(&self, shutdown: ShutdownController) -> HarvestHandles {
        info!(
            concurrency = self.executor.limit(),
            sources = self.sources.len(),
            "Starting harvest cycles"
        );
        HarvestHandles {
            discovery: self.discovery_cycle().start(shutdown.clone()),
            prune: self.prune_cycle().start(shutdown),
        }
    }
}

/// 起動したサイクルのタスク
#[derive(Debug)]
pub struct HarvestHandles {
    discovery: JoinHandle<()>,
    prune: JoinHandle<()>,
}

impl HarvestHandles {
    /// 両サイクルの終了を待つ
    ///
    /// `grace`以内に終わらないタスクは中断する。
    pub async fn join(self, grace: Duration) {
        let discovery_abort = self.discovery.abort_handle();
        let prune_abort = self.prune.abort_handle();

        let joined = tokio::time::timeout(grace, async {
            let (discovery, prune) = tokio::join!(self.discovery, self.prune);
            for (name, result) in [("discovery", discovery), ("prune", prune)] {
                if let Err(e) = result {
                    if !e.is_cancelled() {
                        warn!(cycle = name, error = %e, "Cycle task failed");
                    }
                }
            }
        })
        .await;

        if joined.is_err() {
            warn!(grace_secs = grace.as_secs(), "Cycles did not stop in time, aborting");
            discovery_abort.abort();
            prune_abort.abort();
        }
    }
}
