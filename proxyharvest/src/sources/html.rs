//! HTMLページからのIPv4:port抽出（free-proxy-list.net）

use super::{FeedClient, SourceProvider};
use crate::error::SourceError;
use crate::types::Endpoint;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static IP_PORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}:\d{2,5}\b").expect("IP:port pattern is valid")
});

/// 本文中の`a.b.c.d:port`をすべて抽出
pub fn scan_ip_ports(body: &str) -> HashSet<Endpoint> {
    IP_PORT_RE
        .find_iter(body)
        .filter_map(|m| Endpoint::parse(m.as_str()).ok())
        .collect()
}

/// HTMLスクレイピング取得元
#[derive(Debug, Clone)]
pub struct HtmlScrapeSource {
    name: String,
    client: FeedClient,
    url: String,
}

impl HtmlScrapeSource {
    /// 新しい取得元を作成
    pub fn new(name: impl Into<String>, client: FeedClient, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SourceProvider for HtmlScrapeSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<HashSet<Endpoint>, SourceError> {
        let body = self.client.get_text(&self.url).await?;
        Ok(scan_ip_ports(&body))
    }
}
