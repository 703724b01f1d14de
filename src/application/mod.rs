//! Application services: the item bank facade and the pieces it composes.

pub mod bank;
pub mod command;
pub mod debounce;
pub mod error;
pub mod fetcher;
pub mod mutations;
pub mod notice;
pub mod pagination;
pub mod repos;
pub mod selection;
pub mod shortcuts;
pub mod undo;
pub mod view;
