use async_trait::async_trait;
use models::Product;

use crate::errors::ServiceError;

/// Result of a conditional quantity write.
#[derive(Clone, Debug, PartialEq)]
pub enum SwapOutcome {
    Applied(Product),
    /// Stored quantity no longer matched the expected one; nothing was written.
    Stale { current: u64 },
}

/// Product persistence capability. The inventory processor only sees this
/// trait, so a local table and the remote products API are interchangeable.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a new product; `DuplicateKey` if `codigo` is taken.
    async fn create(&self, product: Product) -> Result<Product, ServiceError>;
    async fn get(&self, codigo: &str) -> Result<Option<Product>, ServiceError>;
    async fn list(&self) -> Result<Vec<Product>, ServiceError>;
    /// Unconditional overwrite of the stored quantity; `NotFound` if absent.
    async fn set_quantity(&self, codigo: &str, cantidad: u64) -> Result<Product, ServiceError>;
    /// Write `new` only while the stored quantity equals `expected`.
    async fn compare_and_swap_quantity(&self, codigo: &str, expected: u64, new: u64) -> Result<SwapOutcome, ServiceError>;
}
