use models::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("product {0} not found")]
    ProductNotFound(String),
    #[error("duplicate product code: {0}")]
    DuplicateKey(String),
    #[error("insufficient stock for {codigo}; current stock: {current}")]
    InsufficientStock { codigo: String, current: u64 },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ServiceError {
    pub fn not_found(entity: impl std::fmt::Display) -> Self { Self::NotFound(format!("{entity} not found")) }

    /// Stable identifier for logs and client-facing error mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) | ServiceError::Model(_) => "invalid_input",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::ProductNotFound(_) => "product_not_found",
            ServiceError::DuplicateKey(_) => "duplicate_key",
            ServiceError::InsufficientStock { .. } => "insufficient_stock",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Storage(_) => "storage",
            ServiceError::Upstream(_) => "upstream",
        }
    }

    /// Errors whose detail must stay server-side.
    pub fn is_internal(&self) -> bool {
        matches!(self, ServiceError::Storage(_) | ServiceError::Upstream(_))
    }
}
