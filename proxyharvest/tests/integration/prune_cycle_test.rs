//! Integration Test: 剪定サイクル
//!
//! 再検査 → 一括置換 と、発見サイクルとの共存を検証する。

use proxyharvest::config::HarvestConfig;
use proxyharvest::executor::BoundedExecutor;
use proxyharvest::harvester::Harvester;
use proxyharvest::probe::Prober;
use proxyharvest::prune::{PruneCycle, PruneReport};
use proxyharvest::registry::LiveRegistry;
use proxyharvest::sources::SourceProvider;
use std::sync::Arc;
use std::time::Duration;

use crate::support::ep;
use crate::support::fakes::{RecordingNotifier, ScriptedProber, StaticSource};

fn prune(prober: Arc<ScriptedProber>, registry: LiveRegistry) -> PruneCycle {
    let prober: Arc<dyn Prober> = prober;
    PruneCycle::new(BoundedExecutor::new(8), prober, registry)
        .with_prune_latency(Duration::from_millis(500))
}

async fn registry_with(entries: &[&str]) -> LiveRegistry {
    let registry = LiveRegistry::new();
    for entry in entries {
        registry.add(ep(entry)).await;
    }
    registry
}

/// {A,B,C}のうちA,Cだけが合格すれば、完了順に関係なく{A,C}になる
#[tokio::test(start_paused = true)]
async fn test_prune_keeps_only_passing_entries() {
    let slow = Duration::from_secs(3);
    let fast = Duration::from_millis(10);

    for (a_delay, c_delay) in [(slow, fast), (fast, slow)] {
        let registry = registry_with(&["a.example:1", "b.example:1", "c.example:1"]).await;
        let prober = Arc::new(
            ScriptedProber::new()
                .live("a.example:1", 100)
                .delayed("a.example:1", a_delay)
                .refused("b.example:1")
                .live("c.example:1", 100)
                .delayed("c.example:1", c_delay),
        );

        let report = prune(prober, registry.clone()).run_once().await;

        assert_eq!(
            report,
            PruneReport::Swapped {
                checked: 3,
                retained: 2,
                evicted: 1
            },
            "a_delay={:?} c_delay={:?}",
            a_delay,
            c_delay
        );
        assert_eq!(
            registry.snapshot().await,
            vec![ep("a.example:1"), ep("c.example:1")]
        );
    }
}

/// 空のレジストリでは検査しない
#[tokio::test]
async fn test_empty_registry_skips_probing() {
    let prober = Arc::new(ScriptedProber::new());
    let report = prune(prober.clone(), LiveRegistry::new()).run_once().await;

    assert_eq!(report, PruneReport::Skipped);
    assert!(prober.calls().is_empty());
}

/// 剪定後のレジストリは検査前スナップショットの部分集合
#[tokio::test]
async fn test_prune_result_is_subset_of_snapshot() {
    let registry = registry_with(&["1.1.1.1:80", "2.2.2.2:80", "3.3.3.3:80", "4.4.4.4:80"]).await;
    let before = registry.snapshot().await;
    let prober = Arc::new(
        ScriptedProber::new()
            .live("2.2.2.2:80", 200)
            .live("4.4.4.4:80", 900),
    );

    prune(prober.clone(), registry.clone()).run_once().await;

    let after = registry.snapshot().await;
    assert!(after.iter().all(|e| before.contains(e)));
    assert_eq!(after, vec![ep("2.2.2.2:80")]);
    assert_eq!(prober.calls().len(), 4);
}

/// 剪定の上限が登録の上限より厳しければ、登録済みでも除外される
#[tokio::test]
async fn test_stricter_prune_ceiling_evicts_admitted_entry() {
    let source: Arc<dyn SourceProvider> = Arc::new(StaticSource::new("One", &["1.2.3.4:8080"]));
    let prober = Arc::new(ScriptedProber::new().live("1.2.3.4:8080", 400));
    let config = HarvestConfig {
        admission_latency: Duration::from_millis(800),
        prune_latency: Duration::from_millis(200),
        ..HarvestConfig::default()
    };
    let harvester = Harvester::new(
        config,
        vec![source],
        prober,
        Arc::new(RecordingNotifier::default()),
    );

    let report = harvester.discovery_cycle().run_once().await;
    assert_eq!(report.stats.admitted, 1);

    let report = harvester.prune_cycle().run_once().await;
    assert_eq!(
        report,
        PruneReport::Swapped {
            checked: 1,
            retained: 0,
            evicted: 1
        }
    );
    assert!(harvester.registry().is_empty().await);
}

/// 剪定中に追加されたエントリは置換で失われる（スナップショットに含まれないため）
#[tokio::test(start_paused = true)]
async fn test_entry_added_during_pass_is_dropped_on_swap() {
    let registry = registry_with(&["1.1.1.1:80"]).await;
    let prober = Arc::new(
        ScriptedProber::new()
            .live("1.1.1.1:80", 100)
            .delayed("1.1.1.1:80", Duration::from_secs(5)),
    );
    let cycle = prune(prober, registry.clone());

    let late = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        registry.add(ep("7.7.7.7:80")).await;
    };
    let (report, ()) = tokio::join!(cycle.run_once(), late);

    assert_eq!(
        report,
        PruneReport::Swapped {
            checked: 1,
            retained: 1,
            evicted: 1
        }
    );
    assert_eq!(registry.snapshot().await, vec![ep("1.1.1.1:80")]);
}

/// 両サイクルを同時に動かしても同時実行数の上限は共有される
#[tokio::test(start_paused = true)]
async fn test_cycles_share_concurrency_ceiling() {
    let fresh: Vec<String> = (0..20).map(|i| format!("10.0.0.{}:80", i)).collect();
    let fresh_refs: Vec<&str> = fresh.iter().map(String::as_str).collect();
    let source: Arc<dyn SourceProvider> = Arc::new(StaticSource::new("One", &fresh_refs));

    let mut prober = ScriptedProber::new();
    for endpoint in &fresh {
        prober = prober
            .live(endpoint, 100)
            .delayed(endpoint, Duration::from_millis(50));
    }
    for i in 0..20 {
        let endpoint = format!("10.1.0.{}:80", i);
        prober = prober
            .live(&endpoint, 100)
            .delayed(&endpoint, Duration::from_millis(50));
    }
    let prober = Arc::new(prober);

    let config = HarvestConfig {
        concurrency: 3,
        ..HarvestConfig::default()
    };
    let harvester = Harvester::new(
        config,
        vec![source],
        prober.clone(),
        Arc::new(RecordingNotifier::default()),
    );
    for i in 0..20 {
        harvester
            .registry()
            .add(ep(&format!("10.1.0.{}:80", i)))
            .await;
    }

    let mut discovery = harvester.discovery_cycle();
    let prune = harvester.prune_cycle();
    let (discovery_report, prune_report) = tokio::join!(discovery.run_once(), prune.run_once());

    assert!(prober.peak_in_flight() <= 3);
    assert_eq!(prober.calls().len(), 40);
    assert_eq!(discovery_report.stats.probed, 20);
    assert!(matches!(prune_report, PruneReport::Swapped { checked: 20, .. }));
}
