//! プロキシ取得元（フィード）
//!
//! 各取得元は`host:port`の集合を返す。取得元は互いに独立しており、
//! 1つが失敗（またはpanic）しても他の取得元の結果には影響しない。
//!
//! - GeoNode: JSON API
//! - ProxyScrape / TheSpeedX: 1行1件のテキスト
//! - free-proxy-list.net: HTMLからIPv4:portを抽出

mod geonode;
mod html;
mod plain_text;

pub use geonode::{parse_geonode, GeoNodeSource};
pub use html::{scan_ip_ports, HtmlScrapeSource};
pub use plain_text::{parse_plain_list, PlainListSource};

use crate::config::HarvestConfig;
use crate::error::{HarvestError, SourceError};
use crate::types::Endpoint;
use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

const GEONODE_API: &str =
    "https://proxylist.geonode.com/api/proxy-list?limit=100&sort_by=lastChecked&sort_type=desc";
const PROXYSCRAPE_API: &str = "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http&timeout=10000&country=all&ssl=all&anonymity=all";
const FREE_PROXY_LIST_URL: &str = "https://free-proxy-list.net/";
const SPEEDX_HTTP: &str = "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt";
const SPEEDX_HTTPS: &str =
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/https.txt";
const SPEEDX_SOCKS5: &str =
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks5.txt";

/// プロキシ取得元
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// ログに出す取得元名
    fn name(&self) -> &str;

    /// 候補を取得
    async fn fetch(&self) -> Result<HashSet<Endpoint>, SourceError>;
}

/// 取得元ごとの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// 取得成功（件数）
    Fetched(usize),
    /// 取得失敗（理由）
    Failed(String),
}

/// 取得元ごとのレポート
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    /// 取得元名
    pub name: String,
    /// 結果
    pub status: SourceStatus,
}

/// 全取得元の取得結果
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// 全取得元の和集合
    pub endpoints: HashSet<Endpoint>,
    /// 取得元ごとのレポート（取得元の順序どおり）
    pub reports: Vec<SourceReport>,
}

impl FetchOutcome {
    /// 失敗した取得元名
    pub fn failed_sources(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, SourceStatus::Failed(_)))
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// 1つの取得元を呼び出し、エラーとpanicを空の結果に変換する
async fn fetch_isolated(source: &dyn SourceProvider) -> (HashSet<Endpoint>, SourceReport) {
    let name = source.name().to_string();
    let outcome = AssertUnwindSafe(source.fetch()).catch_unwind().await;

    let (endpoints, status) = match outcome {
        Ok(Ok(endpoints)) => {
            let count = endpoints.len();
            info!(source = %name, count, "Fetched proxies");
            (endpoints, SourceStatus::Fetched(count))
        }
        Ok(Err(e)) => {
            warn!(source = %name, error = %e, "Source failed");
            (HashSet::new(), SourceStatus::Failed(e.to_string()))
        }
        Err(_) => {
            warn!(source = %name, "Source panicked");
            (HashSet::new(), SourceStatus::Failed("panicked".to_string()))
        }
    };

    (endpoints, SourceReport { name, status })
}

/// 全取得元を並行に呼び出し、結果の和集合を返す
pub async fn fetch_all(sources: &[Arc<dyn SourceProvider>]) -> FetchOutcome {
    let results = join_all(sources.iter().map(|s| fetch_isolated(s.as_ref()))).await;

    let mut outcome = FetchOutcome::default();
    for (endpoints, report) in results {
        outcome.endpoints.extend(endpoints);
        outcome.reports.push(report);
    }
    debug!(
        unique = outcome.endpoints.len(),
        sources = outcome.reports.len(),
        "Fetched from all sources"
    );
    outcome
}

/// 取得元共通のHTTPクライアント
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    /// 設定から作成（User-Agentとタイムアウトを適用）
    pub fn new(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.source_timeout)
            .build()?;
        Ok(Self { client })
    }

    /// 本文をテキストで取得（200以外は失敗）
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self.client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(SourceError::Status(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// 既定の取得元一覧
pub fn default_sources(client: FeedClient) -> Vec<Arc<dyn SourceProvider>> {
    vec![
        Arc::new(GeoNodeSource::new(client.clone(), GEONODE_API)),
        Arc::new(PlainListSource::new(
            "ProxyScrape",
            client.clone(),
            PROXYSCRAPE_API,
        )),
        Arc::new(HtmlScrapeSource::new(
            "FreeProxyList",
            client.clone(),
            FREE_PROXY_LIST_URL,
        )),
        Arc::new(PlainListSource::new("SpeedX HTTP", client.clone(), SPEEDX_HTTP)),
        Arc::new(PlainListSource::new("SpeedX HTTPS", client.clone(), SPEEDX_HTTPS)),
        Arc::new(PlainListSource::new("SpeedX SOCKS5", client, SPEEDX_SOCKS5)),
    ]
}
