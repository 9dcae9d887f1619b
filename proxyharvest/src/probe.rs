//! プロキシプローブ
//!
//! 候補エンドポイントをフォワードプロキシとして経由し、検証用URLへ
//! 1回だけGETリクエストを送る。リトライはしない。
//!
//! - タイムアウト内にステータス200〜399を受信すれば成功
//! - レイテンシはリクエスト開始からレスポンスヘッダ受信まで
//! - ネットワークエラー・タイムアウト・それ以外のステータスは失敗

use crate::config::HarvestConfig;
use crate::error::{HarvestError, ProbeError};
use crate::types::{Endpoint, ProbeResult};
use async_trait::async_trait;
use reqwest::{redirect, Client, Proxy};
use std::time::{Duration, Instant};
use tracing::trace;

/// 成功とみなすステータスの範囲（下限を含み上限を含まない）
const SUCCESS_STATUS: std::ops::Range<u16> = 200..400;

/// 単一エンドポイントの疎通検査
///
/// 実装は共有状態を変更してはならない。
#[async_trait]
pub trait Prober: Send + Sync {
    /// エンドポイントを1回検査する
    async fn probe(&self, endpoint: &Endpoint) -> ProbeResult;
}

/// HTTPフォワードプロキシ経由のプローブ
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// 検証用URL
    target: String,
    /// 1回の試行のタイムアウト
    timeout: Duration,
    /// User-Agent
    user_agent: String,
}

impl HttpProber {
    /// 新しいプローブを作成
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// 設定から作成
    pub fn from_config(config: &HarvestConfig) -> Result<Self, HarvestError> {
        reqwest::Url::parse(&config.probe_url).map_err(|e| {
            HarvestError::Config(format!("invalid probe URL '{}': {}", config.probe_url, e))
        })?;
        Ok(Self::new(config.probe_url.clone(), config.probe_timeout)
            .with_user_agent(&config.user_agent))
    }

    /// User-Agentを設定
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// 検証用URL
    pub fn target(&self) -> &str {
        &self.target
    }

    /// タイムアウト
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// エンドポイント経由で通信するクライアントを作成
    ///
    /// reqwestのプロキシ設定はクライアント単位のため、プローブごとに作る。
    fn client_for(&self, endpoint: &Endpoint) -> Result<Client, ProbeError> {
        let proxy = Proxy::all(endpoint.proxy_url())
            .map_err(|e| ProbeError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        Client::builder()
            .proxy(proxy)
            .user_agent(self.user_agent.as_str())
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .connect_timeout(self.timeout)
            .build()
            .map_err(|e| ProbeError::Request(e.to_string()))
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &Endpoint) -> ProbeResult {
        let client = match self.client_for(endpoint) {
            Ok(client) => client,
            Err(e) => return ProbeResult::failed(endpoint.clone(), e),
        };

        let start = Instant::now();
        let response = tokio::time::timeout(self.timeout, client.get(&self.target).send()).await;
        let latency = start.elapsed();

        let result = match response {
            Err(_) => ProbeResult::failed(endpoint.clone(), ProbeError::Timeout),
            Ok(Err(e)) => ProbeResult::failed(endpoint.clone(), ProbeError::from_reqwest(&e)),
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                if SUCCESS_STATUS.contains(&status) {
                    ProbeResult::succeeded(endpoint.clone(), latency)
                } else {
                    ProbeResult::failed(endpoint.clone(), ProbeError::Status(status))
                }
            }
        };

        trace!(
            endpoint = %endpoint,
            success = result.success,
            latency_ms = ?result.latency_ms(),
            "Probe finished"
        );
        result
    }
}
