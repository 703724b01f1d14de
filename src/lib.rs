//! Client-side cache for a paginated, multi-tenant item bank.
//!
//! [`application::bank::ItemBank`] is the surface a host UI drives: windowed
//! page reads, ordered selection, and optimistic delete/restore/purge with
//! rollback, undo and background reconciliation.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
