//! 1行1件のテキストリスト（ProxyScrape / TheSpeedX）

use super::{FeedClient, SourceProvider};
use crate::error::SourceError;
use crate::types::Endpoint;
use async_trait::async_trait;
use std::collections::HashSet;

/// `host:port`を1行ずつ読み取る
///
/// 空行と`:`を含まない行は読み飛ばす。
pub fn parse_plain_list(body: &str) -> HashSet<Endpoint> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains(':'))
        .filter_map(|line| Endpoint::parse(line).ok())
        .collect()
}

/// テキストリスト取得元
#[derive(Debug, Clone)]
pub struct PlainListSource {
    name: String,
    client: FeedClient,
    url: String,
}

impl PlainListSource {
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
impl SourceProvider for PlainListSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<HashSet<Endpoint>, SourceError> {
        let body = self.client.get_text(&self.url).await?;
        Ok(parse_plain_list(&body))
    }
}
