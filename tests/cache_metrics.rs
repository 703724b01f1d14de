mod common;

use std::collections::HashSet;

use itembank::application::bank::ReconcileMode;
use itembank::application::repos::ApiError;
use itembank::cache::{CacheConfig, CacheEntry, ItemCacheStore, ItemFilter};
use itembank::domain::types::Scope;
use metrics_util::debugging::DebuggingRecorder;

use common::{bank_with, seeded};

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // Window miss, fetch latency, then hit
    let backend = seeded(4);
    let mut bank = bank_with(&backend, ReconcileMode::Manual);
    let view = bank.load().await.expect("load");
    bank.load().await.expect("cached load");

    // Optimistic apply and a successful mutation queueing reconciliation
    bank.toggle_select(view.items[0].id);
    bank.delete_selected().await.expect("delete");

    // Rollback on transport failure
    backend.fail_next_mutation(ApiError::network("connection reset"));
    bank.toggle_select(view.items[1].id);
    bank.delete_selected().await.expect_err("injected failure");

    // Reconcile latency plus a failed refetch
    backend.fail_next_list(ApiError::network("connection reset"));
    assert_eq!(bank.reconcile().await, 1);

    // LRU eviction and a discarded fetch response
    let store = ItemCacheStore::new(&CacheConfig {
        entry_limit: 1,
        ..Default::default()
    });
    let filter = ItemFilter::active(Scope::Personal);
    let first = filter.window(30, 0);
    let second = filter.window(30, 30);
    store.set(first.clone(), CacheEntry::new(Vec::new(), 0, 30, 0));
    store.set(second.clone(), CacheEntry::new(Vec::new(), 0, 30, 30));
    assert!(store.get(&first).is_none());

    let ticket = store.begin_fetch(&second);
    assert!(store.cancel(&second));
    assert!(
        store
            .commit_fetch(&ticket, CacheEntry::new(Vec::new(), 5, 30, 30))
            .is_none()
    );

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "itembank_window_hit_total",
        "itembank_window_miss_total",
        "itembank_fetch_ms",
        "itembank_optimistic_apply_total",
        "itembank_rollback_total",
        "itembank_reconcile_ms",
        "itembank_reconcile_failed_total",
        "itembank_cache_evict_total",
        "itembank_cache_fetch_discarded_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
