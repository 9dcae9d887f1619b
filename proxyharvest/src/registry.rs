//! 稼働中プロキシのレジストリ
//!
//! 発見サイクルと剪定サイクルの唯一の共有状態。
//! 全ての読み書きは単一の`Mutex`で直列化される。
//!
//! - 発見サイクル: `admit`で1件ずつ追加（追加と通知は同一クリティカルセクション）
//! - 剪定サイクル: `replace_all`で一括置換

use crate::notifier::{notify_best_effort, Notifier};
use crate::types::Endpoint;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// 登録結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// 新規に追加された（通知済み）
    Admitted,
    /// 既に登録済み（通知しない）
    AlreadyLive,
}

/// 一括置換の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// 置換前の件数
    pub before: usize,
    /// 置換後の件数
    pub after: usize,
}

impl ReplaceSummary {
    /// 除外された件数（置換前に存在しなかったエントリは数えない）
    pub fn evicted(&self) -> usize {
        self.before.saturating_sub(self.after)
    }
}

/// 稼働中プロキシのレジストリ
///
/// クローンは同じ集合を共有する。
#[derive(Debug, Clone, Default)]
pub struct LiveRegistry {
    /// 稼働中エンドポイント（スナップショットの順序を安定させるためBTreeSet）
    live: Arc<Mutex<BTreeSet<Endpoint>>>,
}

impl LiveRegistry {
    /// 空のレジストリを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// エンドポイントを追加
    ///
    /// 新規追加ならtrue。
    pub async fn add(&self, endpoint: Endpoint) -> bool {
        self.live.lock().await.insert(endpoint)
    }

    /// 登録済みか確認
    pub async fn contains(&self, endpoint: &Endpoint) -> bool {
        self.live.lock().await.contains(endpoint)
    }

    /// 現在の内容のコピーを取得（昇順）
    pub async fn snapshot(&self) -> Vec<Endpoint> {
        self.live.lock().await.iter().cloned().collect()
    }

    /// 件数
    pub async fn len(&self) -> usize {
        self.live.lock().await.len()
    }

    /// 空か確認
    pub async fn is_empty(&self) -> bool {
        self.live.lock().await.is_empty()
    }

    /// 内容を一括置換
    ///
    /// 他の操作からは置換前か置換後のどちらかの状態しか観測されない。
    pub async fn replace_all(&self, endpoints: HashSet<Endpoint>) -> ReplaceSummary {
        let mut live = self.live.lock().await;
        let before = live.len();
        *live = endpoints.into_iter().collect();
        let summary = ReplaceSummary {
            before,
            after: live.len(),
        };
        debug!(before = summary.before, after = summary.after, "Live registry replaced");
        summary
    }

    /// 未登録なら追加して通知
    ///
    /// 確認・追加・通知を同一ロック内で行うため、`replace_all`が途中に割り込んで
    /// 登録が失われたり二重に通知されたりすることはない。
    /// 追加は通知の前に確定するので、通知が中断されても登録は残る。
    pub async fn admit(
        &self,
        endpoint: Endpoint,
        notifier: &dyn Notifier,
        message: &str,
    ) -> Admission {
        let mut live = self.live.lock().await;
        if live.contains(&endpoint) {
            debug!(endpoint = %endpoint, "Endpoint already live, skipping notification");
            return Admission::AlreadyLive;
        }
        live.insert(endpoint.clone());
        info!(endpoint = %endpoint, live = live.len(), "Admitted live proxy");
        notify_best_effort(notifier, message).await;
        Admission::Admitted
    }
}
