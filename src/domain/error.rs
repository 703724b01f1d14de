use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("no item ids were supplied")]
    EmptyIdList,
    #[error("page size must be greater than zero")]
    ZeroPageSize,
    #[error("prefetch multiplier must be greater than zero")]
    ZeroMultiplier,
    #[error("item filter rejected: {message}")]
    InvalidFilter { message: String },
}

impl DomainError {
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }
}
