//! Reconciliation spawned on the runtime after each acknowledged mutation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use itembank::application::bank::{ItemBank, ReconcileMode};
use itembank::cache::{Freshness, QueryKey};
use uuid::Uuid;

use common::{bank_with, seeded};

/// Cache both views and return the active page ids with the active and
/// trash keys.
async fn prime(bank: &mut ItemBank) -> (Vec<Uuid>, QueryKey, QueryKey) {
    bank.set_show_deleted(true);
    bank.load().await.expect("trash");
    bank.set_show_deleted(false);
    let view = bank.load().await.expect("active");
    let routed = bank.route();
    let ids = view.items.iter().map(|item| item.id).collect();
    (ids, routed.current, routed.paired)
}

#[tokio::test(start_paused = true)]
async fn background_reconcile_replaces_optimistic_windows() {
    let backend = seeded(5);
    let mut bank = bank_with(&backend, ReconcileMode::Background);
    let (ids, active, trash) = prime(&mut bank).await;
    let store = Arc::clone(bank.store());
    let calls_before = backend.list_calls();

    bank.toggle_select(ids[0]);
    bank.delete_selected().await.expect("delete");
    assert_eq!(store.get(&active).expect("active").total, 4);
    assert!(store.get(&trash).expect("trash").contains(&ids[0]));

    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(backend.list_calls(), calls_before + 2);
    assert_eq!(bank.pending_reconcile(), 0);
    assert_eq!(store.freshness(&active), Freshness::Fresh);
    assert_eq!(store.freshness(&trash), Freshness::Fresh);

    let trash_entry = store.get(&trash).expect("trash");
    assert_eq!(trash_entry.total, 1);
    assert_eq!(trash_entry.items.first(), backend.get(ids[0]).as_ref());
    assert!(!store.get(&active).expect("active").contains(&ids[0]));
}

#[tokio::test(start_paused = true)]
async fn earlier_reconcile_cannot_overwrite_a_mutation_in_flight() {
    let backend = seeded(5);
    let mut bank = bank_with(&backend, ReconcileMode::Background);
    let (ids, active, trash) = prime(&mut bank).await;
    let store = Arc::clone(bank.store());
    backend.set_mutation_delay(Duration::from_millis(100));

    bank.toggle_select(ids[0]);
    bank.delete_selected().await.expect("first delete");
    let calls_before = backend.list_calls();

    // The first delete's reconcile task runs while the second request waits.
    bank.toggle_select(ids[1]);
    let observer = {
        let store = Arc::clone(&store);
        let active = active.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            store.get(&active).expect("active")
        }
    };
    let (second, in_flight) = tokio::join!(bank.delete_selected(), observer);
    second.expect("second delete");

    assert!(backend.list_calls() > calls_before);
    assert!(!in_flight.contains(&ids[0]));
    assert!(!in_flight.contains(&ids[1]));
    assert_eq!(in_flight.total, 3);

    tokio::time::sleep(Duration::from_millis(1)).await;

    let settled = store.get(&active).expect("active");
    assert_eq!(settled.total, 3);
    assert!(!settled.contains(&ids[0]));
    assert!(!settled.contains(&ids[1]));
    assert_eq!(store.freshness(&active), Freshness::Fresh);
    assert_eq!(store.get(&trash).expect("trash").total, 2);
    assert!(!store.is_mutation_pending(&active));
}
