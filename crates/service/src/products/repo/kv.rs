use std::sync::Arc;

use async_trait::async_trait;
use models::Product;
use tracing::debug;

use crate::errors::ServiceError;
use crate::products::repository::{ProductRepository, SwapOutcome};
use crate::storage::json_map_store::JsonMapStore;

/// Product table on top of [`JsonMapStore`], keyed by `codigo`.
#[derive(Clone)]
pub struct KvProductRepository {
    store: Arc<JsonMapStore<String, Product>>,
}

impl KvProductRepository {
    pub async fn open<P: Into<std::path::PathBuf>>(path: P) -> Result<Self, ServiceError> {
        Ok(Self { store: JsonMapStore::new(path).await? })
    }

    pub fn in_memory() -> Self {
        Self { store: JsonMapStore::in_memory() }
    }
}

#[async_trait]
impl ProductRepository for KvProductRepository {
    async fn create(&self, product: Product) -> Result<Product, ServiceError> {
        let codigo = product.codigo.clone();
        self.store
            .update_map(move |map| {
                if map.contains_key(&codigo) {
                    return Err(ServiceError::DuplicateKey(codigo));
                }
                map.insert(codigo, product.clone());
                Ok(product)
            })
            .await
    }

    async fn get(&self, codigo: &str) -> Result<Option<Product>, ServiceError> {
        Ok(self.store.get(&codigo.to_string()).await)
    }

    async fn list(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.values().await)
    }

    async fn set_quantity(&self, codigo: &str, cantidad: u64) -> Result<Product, ServiceError> {
        self.store
            .update_map(|map| {
                let p = map.get_mut(codigo).ok_or_else(|| ServiceError::ProductNotFound(codigo.to_string()))?;
                p.cantidad = cantidad;
                Ok(p.clone())
            })
            .await
    }

    async fn compare_and_swap_quantity(&self, codigo: &str, expected: u64, new: u64) -> Result<SwapOutcome, ServiceError> {
        self.store
            .update_map(|map| {
                let p = map.get_mut(codigo).ok_or_else(|| ServiceError::ProductNotFound(codigo.to_string()))?;
                if p.cantidad != expected {
                    debug!(%codigo, expected, current = p.cantidad, "stale quantity");
                    return Ok(SwapOutcome::Stale { current: p.cantidad });
                }
                p.cantidad = new;
                Ok(SwapOutcome::Applied(p.clone()))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product(codigo: &str, cantidad: u64) -> Product {
        Product {
            codigo: codigo.into(),
            nombre: "Tornillo".into(),
            descripcion: String::new(),
            cantidad,
            precio_unitario: Decimal::new(150, 2),
            categoria: "ferreteria".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_create_keeps_original() -> Result<(), anyhow::Error> {
        let repo = KvProductRepository::in_memory();
        repo.create(product("A1", 10)).await?;
        let err = repo.create(product("A1", 99)).await.expect_err("duplicate");
        assert!(matches!(err, ServiceError::DuplicateKey(ref c) if c == "A1"));
        assert_eq!(repo.get("A1").await?.map(|p| p.cantidad), Some(10));
        Ok(())
    }

    #[tokio::test]
    async fn compare_and_swap() -> Result<(), anyhow::Error> {
        let repo = KvProductRepository::in_memory();
        repo.create(product("A1", 10)).await?;

        let stale = repo.compare_and_swap_quantity("A1", 9, 1).await?;
        assert_eq!(stale, SwapOutcome::Stale { current: 10 });

        match repo.compare_and_swap_quantity("A1", 10, 3).await? {
            SwapOutcome::Applied(p) => assert_eq!(p.cantidad, 3),
            other => panic!("unexpected {other:?}"),
        }

        let missing = repo.compare_and_swap_quantity("B2", 0, 1).await;
        assert!(matches!(missing, Err(ServiceError::ProductNotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn file_backed_table_survives_reopen() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("products_{}.json", uuid::Uuid::new_v4()));
        let repo = KvProductRepository::open(&tmp).await?;
        repo.create(product("A1", 10)).await?;
        repo.set_quantity("A1", 4).await?;

        let reopened = KvProductRepository::open(&tmp).await?;
        assert_eq!(reopened.get("A1").await?.map(|p| p.cantidad), Some(4));
        assert_eq!(reopened.list().await?.len(), 1);
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
