#![allow(dead_code)]

use std::sync::Arc;

use itembank::application::bank::{BankConfig, ItemBank, ReconcileMode};
use itembank::domain::types::Scope;
use itembank::infra::memory::{InMemoryItemsApi, sample_items};

pub fn seeded(count: u32) -> Arc<InMemoryItemsApi> {
    Arc::new(InMemoryItemsApi::with_items(sample_items(
        Scope::Personal,
        count,
    )))
}

pub fn bank_with(backend: &Arc<InMemoryItemsApi>, reconcile: ReconcileMode) -> ItemBank {
    let config = BankConfig {
        reconcile,
        ..BankConfig::default()
    };
    ItemBank::new(backend.clone(), Scope::Personal, config)
}
