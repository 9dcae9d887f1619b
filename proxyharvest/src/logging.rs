//! ロギング初期化
//!
//! `PROXYHARVEST_LOG_LEVEL`（未設定時は`RUST_LOG`、さらに未設定なら`info`）で
//! フィルタを決定する。`PROXYHARVEST_LOG_DIR`が設定されていれば、
//! 標準エラー出力に加えて日次ローテーションのファイルにも書き出す。

use crate::config::get_env_with_fallback;
use crate::error::HarvestError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// デフォルトのログレベル
const DEFAULT_LOG_LEVEL: &str = "info";

/// ログファイル名のプレフィックス
const LOG_FILE_PREFIX: &str = "proxyharvest.log";

/// 環境変数からフィルタを構築
fn build_filter() -> Result<EnvFilter, HarvestError> {
    let directive = get_env_with_fallback("PROXYHARVEST_LOG_LEVEL", "RUST_LOG")
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    EnvFilter::try_new(&directive)
        .map_err(|e| HarvestError::Logging(format!("invalid log filter '{}': {}", directive, e)))
}

/// ロギングを初期化
///
/// ファイル出力が有効な場合は`WorkerGuard`を返す。プロセス終了まで保持すること
/// （dropするとバッファがフラッシュされなくなる）。
pub fn init() -> Result<Option<WorkerGuard>, HarvestError> {
    let filter = build_filter()?;
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    match std::env::var("PROXYHARVEST_LOG_DIR")
        .ok()
        .filter(|d| !d.trim().is_empty())
    {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();

            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init()
                .map_err(|e| HarvestError::Logging(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()
                .map_err(|e| HarvestError::Logging(e.to_string()))?;
            Ok(None)
        }
    }
}
