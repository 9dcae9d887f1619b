//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! プローブ・取得元・通知の失敗はそれぞれのサイクル内で吸収され、
//! プロセスを停止させるのは起動時の`HarvestError`のみ。

use thiserror::Error;

/// Common layer error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// 1回のプローブの失敗理由
///
/// サイクル側には`ProbeResult::error`としてのみ現れ、伝播はしない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// タイムアウト
    #[error("probe timed out")]
    Timeout,

    /// 接続失敗（拒否・リセット・名前解決失敗など）
    #[error("connection failed: {0}")]
    Connect(String),

    /// 成功範囲外のステータス
    #[error("unexpected status: HTTP {0}")]
    Status(u16),

    /// その他のリクエストエラー
    #[error("request failed: {0}")]
    Request(String),

    /// プロキシURLとして解釈できないエンドポイント
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// レイテンシ上限超過
    #[error("latency {latency_ms}ms exceeds {max_ms}ms")]
    TooSlow {
        /// 計測レイテンシ（ミリ秒）
        latency_ms: u64,
        /// 上限（ミリ秒）
        max_ms: u64,
    },

    /// プローブ処理中のpanic
    #[error("probe task panicked: {0}")]
    Panicked(String),
}

impl ProbeError {
    /// reqwestのエラーを分類する
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// 取得元（フィード）のエラー
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTPエラー
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// 200以外のステータス
    #[error("unexpected status: HTTP {0}")]
    Status(u16),

    /// 応答形式の不正
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// 通知エラー
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTPエラー
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// 通知先がエラーを返した
    #[error("notification rejected: HTTP {status}: {body}")]
    Rejected {
        /// ステータスコード
        status: u16,
        /// 応答本文
        body: String,
    },
}

/// 起動時の致命的エラー
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Common layer error
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// 通知用クレデンシャルの不備
    #[error("Notifier credential error: {0}")]
    Credential(String),

    /// HTTPクライアントの構築失敗
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Logging setup error
    #[error("Logging error: {0}")]
    Logging(String),
}
