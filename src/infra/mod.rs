//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod http_api;
pub mod memory;
pub mod telemetry;
