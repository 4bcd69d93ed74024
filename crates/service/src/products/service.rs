use std::sync::Arc;

use models::{validation, NewProduct, Product, QuantityUpdate};
use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::products::repository::{ProductRepository, SwapOutcome};

/// Application service for the product catalog.
pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self { Self { repo } }

    #[instrument(skip(self, input), fields(codigo = ?input.codigo))]
    pub async fn create(&self, input: NewProduct) -> Result<Product, ServiceError> {
        let product = input.validate()?;
        let created = self.repo.create(product).await?;
        info!(codigo = %created.codigo, cantidad = created.cantidad, "product_created");
        Ok(created)
    }

    pub async fn get(&self, codigo: &str) -> Result<Product, ServiceError> {
        validation::validate_codigo(codigo)?;
        self.repo
            .get(codigo)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {codigo}")))
    }

    pub async fn list(&self) -> Result<Vec<Product>, ServiceError> {
        self.repo.list().await
    }

    /// Overwrite the stored quantity. With `cantidad_esperada` the write is
    /// conditional and a mismatch yields `Conflict` without touching the record.
    #[instrument(skip(self, input))]
    pub async fn update_quantity(&self, codigo: &str, input: QuantityUpdate) -> Result<Product, ServiceError> {
        validation::validate_codigo(codigo)?;
        let (cantidad, expected) = input.validate()?;
        let updated = match expected {
            None => self.repo.set_quantity(codigo, cantidad).await,
            Some(expected) => match self.repo.compare_and_swap_quantity(codigo, expected, cantidad).await {
                Ok(SwapOutcome::Applied(p)) => Ok(p),
                Ok(SwapOutcome::Stale { current }) => Err(ServiceError::Conflict(format!(
                    "quantity of {codigo} is {current}, expected {expected}"
                ))),
                Err(e) => Err(e),
            },
        }
        .map_err(|e| match e {
            ServiceError::ProductNotFound(c) => ServiceError::not_found(format!("product {c}")),
            other => other,
        })?;
        info!(codigo = %updated.codigo, cantidad = updated.cantidad, conditional = expected.is_some(), "quantity_updated");
        Ok(updated)
    }
}
