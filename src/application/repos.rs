//! Port trait describing the item bank backend.

use async_trait::async_trait;
use itembank_api_types::ListItemsRequest;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::ItemRecord;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("permission denied: {message}")]
    Permission { message: String },
    #[error("items not found: {message}")]
    NotFound { message: String },
    #[error("request rejected: {message}")]
    Validation { message: String },
    #[error("transport failure: {message}")]
    Network { message: String },
    #[error("malformed response: {message}")]
    Decode { message: String },
}

impl ApiError {
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// One server page: a slice of items plus the filter's full count.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPage {
    pub items: Vec<ItemRecord>,
    pub total: u64,
}

/// Server acknowledgement of a soft delete or restore.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub count: u64,
    pub items: Vec<ItemRecord>,
}

/// Listing and mutation endpoints consumed by the cache.
///
/// Mutations must reject ids that do not satisfy their precondition with
/// [`ApiError::NotFound`] instead of succeeding silently.
#[async_trait]
pub trait ItemsApi: Send + Sync {
    async fn list_items(&self, request: &ListItemsRequest) -> Result<ItemPage, ApiError>;

    async fn delete_many(&self, ids: &[Uuid]) -> Result<MutationOutcome, ApiError>;

    async fn restore(&self, ids: &[Uuid]) -> Result<MutationOutcome, ApiError>;

    async fn permanent_delete(&self, ids: &[Uuid]) -> Result<u64, ApiError>;
}
