//! Proxy harvester
//!
//! 公開プロキシを継続的に収集・検証し、稼働中のプロキシ集合を維持する

#![warn(missing_docs)]

/// 共通型定義（Endpoint / ProbeResult）
pub mod types;

/// エラー型定義
pub mod error;

/// 設定管理（環境変数ヘルパー）
pub mod config;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 単一プロキシの疎通・レイテンシ検査
pub mod probe;

/// 同時実行数を制限したプローブ実行器
pub mod executor;

/// 稼働中プロキシのレジストリ
pub mod registry;

/// プロキシ取得元（フィード）
pub mod sources;

/// 通知チャネル
pub mod notifier;

/// 発見サイクル（取得 → 差分 → 検査 → 登録）
pub mod discovery;

/// 剪定サイクル（再検査 → 入れ替え）
pub mod prune;

/// 両サイクルの組み立てと起動
pub mod harvester;

/// Shutdown controller
pub mod shutdown;

/// CLIインターフェース
pub mod cli;

pub use error::{HarvestError, ProbeError};
pub use types::{Endpoint, ProbeResult};
