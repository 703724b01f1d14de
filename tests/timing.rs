//! Behaviour that depends on the tokio clock: undo expiry, search debounce
//! and cancelled in-flight fetches.

mod common;

use std::sync::Arc;
use std::time::Duration;

use itembank::application::bank::ReconcileMode;
use itembank::application::command::OptimisticCommand;
use itembank::application::error::ErrorKind;
use itembank::application::fetcher::WindowFetcher;
use itembank::cache::{CacheConfig, ItemCacheStore, ItemFilter};
use itembank::domain::items::ItemIds;
use itembank::domain::types::Scope;

use common::{bank_with, seeded};

#[tokio::test(start_paused = true)]
async fn undo_expires_after_its_window() {
    let backend = seeded(3);
    let mut bank = bank_with(&backend, ReconcileMode::Manual);
    let view = bank.load().await.expect("load");
    bank.toggle_select(view.items[0].id);
    bank.delete_selected().await.expect("delete");

    let pending = bank.pending_undo().expect("undo token");
    assert!(pending.remaining() <= Duration::from_millis(5_000));
    assert_eq!(pending.ids(), &[view.items[0].id]);

    tokio::time::advance(Duration::from_millis(4_999)).await;
    assert!(bank.pending_undo().is_some());
    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(bank.pending_undo().is_none());

    let err = bank.undo_last_delete().await.expect_err("expired");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(backend.mutation_calls(), 1);

    let err = bank.undo_last_delete().await.expect_err("token consumed");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test(start_paused = true)]
async fn only_settled_search_changes_the_query() {
    let backend = seeded(24);
    let mut bank = bank_with(&backend, ReconcileMode::Manual);
    assert_eq!(bank.load().await.expect("load").total, 24);

    bank.set_search_input("Q");
    bank.set_search_input("Question");
    bank.set_search_input("Question 1");
    assert_eq!(bank.search_input(), "Question 1");

    let view = bank.load().await.expect("before settle");
    assert_eq!(view.total, 24);
    assert!(!view.has_active_filters);
    assert_eq!(backend.list_calls(), 1);

    tokio::time::sleep(Duration::from_millis(301)).await;

    let view = bank.load().await.expect("after settle");
    // "Question 1" and "Question 10" through "Question 19".
    assert_eq!(view.total, 11);
    assert!(view.has_active_filters);
    assert_eq!(backend.list_calls(), 2);

    bank.clear_filters();
    assert!(!bank.has_active_filters());
    assert_eq!(bank.search_input(), "");
    assert_eq!(bank.load().await.expect("cleared").total, 24);
}

#[tokio::test(start_paused = true)]
async fn settle_search_applies_immediately() {
    let backend = seeded(24);
    let mut bank = bank_with(&backend, ReconcileMode::Manual);
    bank.load().await.expect("load");
    bank.next_page();

    bank.set_search_input("photosynthesis");
    bank.settle_search();

    assert_eq!(bank.filters().search, "photosynthesis");
    assert_eq!(bank.page_state().current_page(), 0);
    assert_eq!(bank.load().await.expect("search").total, 6);
}

#[tokio::test(start_paused = true)]
async fn cancelled_fetch_cannot_clobber_optimistic_write() {
    let backend = seeded(3);
    let store = Arc::new(ItemCacheStore::new(&CacheConfig::default()));
    let fetcher = WindowFetcher::new(backend.clone(), Arc::clone(&store));
    let key = ItemFilter::active(Scope::Personal).window(30, 0);

    let primed = fetcher.fetch(&key).await.expect("prime");
    let victim = primed.items[0].id;

    backend.set_list_delay(Duration::from_millis(100));
    let slow = {
        let fetcher = fetcher.clone();
        let key = key.clone();
        tokio::spawn(async move { fetcher.fetch(&key).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(store.is_fetching_key(&key));

    let mut command = OptimisticCommand::delete(
        ItemIds::new([victim]).expect("ids"),
        key.clone(),
        key.sibling_head(),
    )
    .expect("command");
    command.apply(&store);
    assert!(!store.is_fetching_key(&key));

    let returned = slow.await.expect("join").expect("fetch");
    assert!(!returned.contains(&victim));

    let cached = store.get(&key).expect("cached");
    assert!(!cached.contains(&victim));
    assert_eq!(cached.total, 2);
    assert!(backend.get(victim).is_some_and(|item| !item.is_deleted()));
}
