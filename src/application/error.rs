use std::error::Error as StdError;

use thiserror::Error;

use crate::{application::repos::ApiError, domain::error::DomainError, infra::error::InfraError};

/// Source chain of an error, flattened for logging.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn from_message(source: &'static str, message: impl Into<String>) -> Self {
        Self {
            source,
            messages: vec![message.into()],
        }
    }
}

/// Four-way classification the host UI reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks a role in the scope. Surfaced; never retried.
    Permission,
    /// Target ids no longer match server state. Surfaced and reconciled.
    NotFound,
    /// Transport failure. Optimistic writes are rolled back.
    Network,
    /// Rejected before any optimistic effect or network call.
    Validation,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("items no longer match server state: {0}")]
    NotFound(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Permission(_) => ErrorKind::Permission,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Domain(_) | AppError::Validation(_) => ErrorKind::Validation,
            AppError::Infra(_) | AppError::Network(_) => ErrorKind::Network,
        }
    }

    /// Short headline shown to the user ahead of the error description.
    pub fn headline(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Permission => "You do not have permission to change these items",
            ErrorKind::NotFound => "Some items were already changed elsewhere",
            ErrorKind::Network => "Could not reach the item bank",
            ErrorKind::Validation => "Request could not be processed",
        }
    }

    /// Text of the error notice: headline plus the error's own description.
    pub fn notice_message(&self) -> String {
        format!("{}: {}", self.headline(), self)
    }
}

impl From<ApiError> for AppError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Permission { message } => AppError::Permission(message),
            ApiError::NotFound { message } => AppError::NotFound(message),
            ApiError::Validation { message } => AppError::Validation(message),
            ApiError::Network { message } => AppError::Network(message),
            ApiError::Decode { message } => {
                AppError::Network(format!("malformed response: {message}"))
            }
        }
    }
}
