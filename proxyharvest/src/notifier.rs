//! 通知チャネル
//!
//! 新規に登録されたプロキシごとに1件のメッセージを送る。
//! 送信はベストエフォートで、失敗はログに残すだけでリトライしない。

use crate::config::TelegramConfig;
use crate::error::{HarvestError, NotifyError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Telegram Bot APIのベースURL
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// 通知リクエストのタイムアウト
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// 起動時メッセージ
pub const STARTED_MESSAGE: &str = "Proxy Collector started";

/// 停止時メッセージ
pub const STOPPED_MESSAGE: &str = "Proxy Collector stopped.";

/// 新規登録の通知メッセージ
pub fn live_proxy_message(endpoint: &str, latency_ms: Option<u64>) -> String {
    match latency_ms {
        Some(ms) => format!("LIVE Proxy: {} ({}ms)", endpoint, ms),
        None => format!("LIVE Proxy: {}", endpoint),
    }
}

/// 通知先
#[async_trait]
pub trait Notifier: Send + Sync {
    /// メッセージを1件送信
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// 通知を送信し、失敗はログに残して握りつぶす
pub async fn notify_best_effort(notifier: &dyn Notifier, message: &str) {
    if let Err(e) = notifier.notify(message).await {
        warn!(error = %e, "Failed to send notification");
    }
}

/// ログ出力のみの通知先（クレデンシャル未設定時）
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        info!(message = %message, "Notification");
        Ok(())
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Telegram Bot APIへの通知
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: i64,
}

impl TelegramNotifier {
    /// 新しい通知先を作成
    pub fn new(config: TelegramConfig) -> Result<Self, HarvestError> {
        let client = Client::builder().timeout(NOTIFY_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            token: config.token,
            chat_id: config.chat_id,
        })
    }

    /// APIのベースURLを差し替える（テスト用）
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.send_message_url())
            .json(&SendMessage {
                chat_id: self.chat_id,
                text: message,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// 設定に応じた通知先を作成
///
/// Telegramのクレデンシャルが無い場合はログ出力のみ。
pub fn build_notifier(telegram: Option<TelegramConfig>) -> Result<Arc<dyn Notifier>, HarvestError> {
    match telegram {
        Some(config) => {
            info!(chat_id = config.chat_id, "Using Telegram notifier");
            Ok(Arc::new(TelegramNotifier::new(config)?))
        }
        None => {
            warn!("PROXYHARVEST_TELEGRAM_TOKEN not set, notifications go to the log only");
            Ok(Arc::new(LogNotifier))
        }
    }
}
