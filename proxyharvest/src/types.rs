//! 共通型定義
//!
//! プロキシ識別子（`host:port`）とプローブ結果

use crate::error::{CommonError, ProbeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// プロキシエンドポイント（`host:port`形式）
///
/// 同一性は文字列の完全一致で判定する。表記揺れの正規化は行わない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    /// 文字列からエンドポイントを作成
    ///
    /// 前後の空白は取り除く。空文字列や`:`を含まない文字列はエラー。
    pub fn parse(raw: &str) -> Result<Self, CommonError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CommonError::Validation("empty endpoint".to_string()));
        }
        match trimmed.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && !port.is_empty() => {
                Ok(Self(trimmed.to_string()))
            }
            _ => Err(CommonError::Validation(format!(
                "endpoint must be host:port, got '{}'",
                trimmed
            ))),
        }
    }

    /// `host:port`文字列を参照
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// フォワードプロキシとして使うURL（`http://host:port`）
    pub fn proxy_url(&self) -> String {
        format!("http://{}", self.0)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Endpoint {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Endpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// プローブの判定モード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    /// 応答が成功範囲であれば合格
    Reachable,
    /// 成功に加えてレイテンシが上限以下であることを要求する（strict）
    LatencyCapped(Duration),
}

impl ProbeMode {
    /// レイテンシ上限（設定されている場合）
    pub fn ceiling(&self) -> Option<Duration> {
        match self {
            Self::Reachable => None,
            Self::LatencyCapped(max) => Some(*max),
        }
    }
}

/// 1回のプローブ結果
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    /// 対象エンドポイント
    pub endpoint: Endpoint,
    /// 成功範囲のステータスをタイムアウト内に受信したか
    pub success: bool,
    /// リクエスト開始からレスポンスヘッダ受信までの時間（失敗時はNone）
    pub latency: Option<Duration>,
    /// レイテンシ上限内か（上限を適用した場合のみSome）
    pub within_ceiling: Option<bool>,
    /// 失敗理由
    pub error: Option<ProbeError>,
}

impl ProbeResult {
    /// 成功結果を作成
    pub fn succeeded(endpoint: Endpoint, latency: Duration) -> Self {
        Self {
            endpoint,
            success: true,
            latency: Some(latency),
            within_ceiling: None,
            error: None,
        }
    }

    /// 失敗結果を作成
    pub fn failed(endpoint: Endpoint, error: ProbeError) -> Self {
        Self {
            endpoint,
            success: false,
            latency: None,
            within_ceiling: None,
            error: Some(error),
        }
    }

    /// 判定モードを適用する
    ///
    /// 上限を超えた成功は`success = false`に降格し、`ProbeError::TooSlow`を記録する。
    pub fn apply_mode(mut self, mode: ProbeMode) -> Self {
        let Some(max) = mode.ceiling() else {
            return self;
        };
        if !self.success {
            return self;
        }
        let latency = self.latency.unwrap_or(Duration::MAX);
        let within = latency <= max;
        self.within_ceiling = Some(within);
        if !within {
            self.success = false;
            self.error = Some(ProbeError::TooSlow {
                latency_ms: latency.as_millis() as u64,
                max_ms: max.as_millis() as u64,
            });
        }
        self
    }

    /// 登録・保持の条件を満たすか
    pub fn passed(&self) -> bool {
        self.success && self.within_ceiling != Some(false)
    }

    /// レイテンシ（ミリ秒）
    pub fn latency_ms(&self) -> Option<u64> {
        self.latency.map(|l| l.as_millis() as u64)
    }
}
