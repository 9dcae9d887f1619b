//! Integration Test: 発見サイクル
//!
//! 取得 → 差分 → 検査 → 登録 の一連の流れを検証する。

use proxyharvest::discovery::{AdmissionStats, DiscoveryCycle};
use proxyharvest::executor::BoundedExecutor;
use proxyharvest::notifier::Notifier;
use proxyharvest::probe::Prober;
use proxyharvest::registry::LiveRegistry;
use proxyharvest::shutdown::ShutdownController;
use proxyharvest::sources::SourceProvider;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::support::ep;
use crate::support::fakes::{
    FailingNotifier, FailingSource, PanickingSource, RecordingNotifier, ScriptedProber,
    StaticSource,
};

fn discovery(
    sources: Vec<Arc<dyn SourceProvider>>,
    prober: Arc<ScriptedProber>,
    registry: LiveRegistry,
    notifier: Arc<dyn Notifier>,
) -> DiscoveryCycle {
    let prober: Arc<dyn Prober> = prober;
    DiscoveryCycle::new(
        sources,
        BoundedExecutor::new(8),
        prober,
        registry,
        notifier,
    )
    .with_admission_latency(Duration::from_millis(500))
}

/// 2つの取得元の和集合がそのまま新規候補になる
#[tokio::test]
async fn test_two_providers_union_is_novel_set() {
    let prober = Arc::new(
        ScriptedProber::new()
            .live("1.2.3.4:8080", 120)
            .live("5.6.7.8:3128", 80),
    );
    let mut cycle = discovery(
        vec![
            Arc::new(StaticSource::new("One", &["1.2.3.4:8080"])),
            Arc::new(StaticSource::new("Two", &["1.2.3.4:8080", "5.6.7.8:3128"])),
        ],
        prober.clone(),
        LiveRegistry::new(),
        Arc::new(RecordingNotifier::default()),
    );

    let outcome = cycle.fetch().await;
    let novel = cycle.diff(outcome.endpoints);

    assert_eq!(novel, vec![ep("1.2.3.4:8080"), ep("5.6.7.8:3128")]);
    let expected: HashSet<_> = [ep("1.2.3.4:8080"), ep("5.6.7.8:3128")].into_iter().collect();
    assert_eq!(cycle.seen_all(), &expected);
}

/// 合格した候補は登録され、1件につき1回通知される
#[tokio::test]
async fn test_run_once_admits_and_notifies() {
    let prober = Arc::new(
        ScriptedProber::new()
            .live("1.2.3.4:8080", 120)
            .refused("5.6.7.8:3128"),
    );
    let registry = LiveRegistry::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut cycle = discovery(
        vec![Arc::new(StaticSource::new(
            "One",
            &["1.2.3.4:8080", "5.6.7.8:3128"],
        ))],
        prober.clone(),
        registry.clone(),
        notifier.clone(),
    );

    let report = cycle.run_once().await;

    assert_eq!(report.cycle, 1);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.novel, 2);
    assert_eq!(
        report.stats,
        AdmissionStats {
            probed: 2,
            admitted: 1,
            already_live: 0,
            rejected: 1
        }
    );
    assert_eq!(registry.snapshot().await, vec![ep("1.2.3.4:8080")]);
    assert_eq!(
        notifier.messages(),
        vec!["LIVE Proxy: 1.2.3.4:8080 (120ms)".to_string()]
    );
}

/// タイムアウトした候補は登録されない
#[tokio::test(start_paused = true)]
async fn test_timed_out_candidate_is_never_admitted() {
    let prober = Arc::new(ScriptedProber::new().timeout("9.9.9.9:80", Duration::from_secs(8)));
    let registry = LiveRegistry::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut cycle = discovery(
        vec![Arc::new(StaticSource::new("One", &["9.9.9.9:80"]))],
        prober.clone(),
        registry.clone(),
        notifier.clone(),
    );

    let report = cycle.run_once().await;

    assert_eq!(report.stats.rejected, 1);
    assert!(registry.is_empty().await);
    assert!(notifier.messages().is_empty());
}

/// レイテンシ上限を超えた成功は登録されない
#[tokio::test]
async fn test_slow_candidate_is_rejected() {
    let prober = Arc::new(
        ScriptedProber::new()
            .live("1.1.1.1:80", 499)
            .live("2.2.2.2:80", 500)
            .live("3.3.3.3:80", 501),
    );
    let registry = LiveRegistry::new();
    let mut cycle = discovery(
        vec![Arc::new(StaticSource::new(
            "One",
            &["1.1.1.1:80", "2.2.2.2:80", "3.3.3.3:80"],
        ))],
        prober,
        registry.clone(),
        Arc::new(RecordingNotifier::default()),
    );

    let report = cycle.run_once().await;

    assert_eq!(report.stats.admitted, 2);
    assert_eq!(
        registry.snapshot().await,
        vec![ep("1.1.1.1:80"), ep("2.2.2.2:80")]
    );
}

/// 一度見た候補は、失敗していても次回以降は検査しない
#[tokio::test]
async fn test_seen_candidates_are_not_reprobed() {
    let source = Arc::new(StaticSource::new("One", &["1.2.3.4:8080", "5.6.7.8:3128"]));
    let prober = Arc::new(ScriptedProber::new().live("1.2.3.4:8080", 100));
    let mut cycle = discovery(
        vec![source.clone()],
        prober.clone(),
        LiveRegistry::new(),
        Arc::new(RecordingNotifier::default()),
    );

    cycle.run_once().await;
    source.set(&["1.2.3.4:8080", "5.6.7.8:3128", "9.9.9.9:80"]);
    let second = cycle.run_once().await;

    assert_eq!(second.cycle, 2);
    assert_eq!(second.novel, 1);
    assert_eq!(prober.calls_for("1.2.3.4:8080"), 1);
    assert_eq!(prober.calls_for("5.6.7.8:3128"), 1);
    assert_eq!(prober.calls_for("9.9.9.9:80"), 1);
}

/// SeenAllは取得元が縮んでも減らない
#[tokio::test]
async fn test_seen_all_is_monotonic() {
    let source = Arc::new(StaticSource::new("One", &["1.1.1.1:80", "2.2.2.2:80"]));
    let mut cycle = discovery(
        vec![source.clone()],
        Arc::new(ScriptedProber::new()),
        LiveRegistry::new(),
        Arc::new(RecordingNotifier::default()),
    );

    let mut previous = 0;
    for next in [
        vec!["3.3.3.3:80"],
        vec![],
        vec!["1.1.1.1:80", "4.4.4.4:80"],
    ] {
        cycle.run_once().await;
        assert!(cycle.seen_all().len() >= previous);
        previous = cycle.seen_all().len();
        source.set(&next);
    }
    cycle.run_once().await;

    assert_eq!(cycle.seen_all().len(), 4);
}

/// 失敗・panicする取得元があっても他の取得元の候補は全て残る
#[tokio::test]
async fn test_failing_provider_does_not_reduce_others() {
    let prober = Arc::new(ScriptedProber::new());
    let mut cycle = discovery(
        vec![
            Arc::new(FailingSource),
            Arc::new(StaticSource::new("Healthy", &["1.1.1.1:80", "2.2.2.2:80"])),
            Arc::new(PanickingSource),
        ],
        prober.clone(),
        LiveRegistry::new(),
        Arc::new(RecordingNotifier::default()),
    );

    let report = cycle.run_once().await;

    assert_eq!(report.fetched, 2);
    assert_eq!(report.novel, 2);
    assert_eq!(report.failed_sources, vec!["Failing", "Panicking"]);
    assert_eq!(prober.calls().len(), 2);
}

/// 既に登録済みのエンドポイントは再通知しない
#[tokio::test]
async fn test_already_live_endpoint_is_not_renotified() {
    let registry = LiveRegistry::new();
    registry.add(ep("1.2.3.4:8080")).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let cycle = discovery(
        Vec::new(),
        Arc::new(ScriptedProber::new().live("1.2.3.4:8080", 90)),
        registry.clone(),
        notifier.clone(),
    );

    let stats = cycle.probe_and_admit(vec![ep("1.2.3.4:8080")]).await;

    assert_eq!(stats.already_live, 1);
    assert_eq!(stats.admitted, 0);
    assert!(notifier.messages().is_empty());
    assert_eq!(registry.len().await, 1);
}

/// 通知に失敗しても登録は残り、リトライもしない
#[tokio::test]
async fn test_notification_failure_keeps_admission() {
    let registry = LiveRegistry::new();
    let notifier = Arc::new(FailingNotifier::default());
    let mut cycle = discovery(
        vec![Arc::new(StaticSource::new("One", &["1.2.3.4:8080"]))],
        Arc::new(ScriptedProber::new().live("1.2.3.4:8080", 90)),
        registry.clone(),
        notifier.clone(),
    );

    let report = cycle.run_once().await;

    assert_eq!(report.stats.admitted, 1);
    assert!(registry.contains(&ep("1.2.3.4:8080")).await);
    assert_eq!(notifier.attempts(), 1);
}

/// 停止要求までサイクルを繰り返す
#[tokio::test(start_paused = true)]
async fn test_run_repeats_until_shutdown() {
    let source = Arc::new(StaticSource::new("One", &["1.2.3.4:8080"]));
    let shutdown = ShutdownController::default();
    let handle = discovery(
        vec![source.clone()],
        Arc::new(ScriptedProber::new()),
        LiveRegistry::new(),
        Arc::new(RecordingNotifier::default()),
    )
    .with_interval(Duration::from_secs(60))
    .start(shutdown.clone());

    tokio::time::sleep(Duration::from_secs(150)).await;
    shutdown.request_shutdown();
    handle.await.unwrap();

    assert!(source.calls() >= 2);
    let calls_at_stop = source.calls();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(source.calls(), calls_at_stop);
}
