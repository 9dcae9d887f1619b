//! GeoNode JSON API
//!
//! `{"data": [{"ip": "1.2.3.4", "port": "8080"}, ...]}` 形式。
//! `port`は文字列と数値の両方があり得る。

use super::{FeedClient, SourceProvider};
use crate::error::SourceError;
use crate::types::Endpoint;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

/// GeoNodeの応答からエンドポイントを抽出
///
/// `ip`が無い場合は`address`を使う。不正な要素は読み飛ばす。
pub fn parse_geonode(body: &str) -> Result<HashSet<Endpoint>, SourceError> {
    let json: Value =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let Some(items) = json.get("data").and_then(Value::as_array) else {
        return Ok(HashSet::new());
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            let host = item
                .get("ip")
                .or_else(|| item.get("address"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())?;
            let port = match item.get("port")? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Endpoint::parse(&format!("{}:{}", host, port)).ok()
        })
        .collect())
}

/// GeoNode取得元
#[derive(Debug, Clone)]
pub struct GeoNodeSource {
    client: FeedClient,
    url: String,
}

impl GeoNodeSource {
    /// 新しい取得元を作成
    pub fn new(client: FeedClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SourceProvider for GeoNodeSource {
    fn name(&self) -> &str {
        "GeoNode"
    }

    async fn fetch(&self) -> Result<HashSet<Endpoint>, SourceError> {
        let body = self.client.get_text(&self.url).await?;
        parse_geonode(&body)
    }
}
