use std::sync::Arc;
use std::time::Duration;

use configs::AppConfig;
use service::inventory::{InventoryService, KvNoteRepository, NoteRepository};
use service::products::repo::{HttpProductRepository, KvProductRepository};
use service::products::{ProductRepository, ProductService};
use tracing::info;

/// Shared handler state. Built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub products: Arc<ProductService>,
    pub inventory: Arc<InventoryService>,
}

impl AppState {
    /// Wire services over the given repositories. `stock` is what the
    /// inventory processor adjusts; it may differ from the catalog table.
    pub fn new(
        catalog: Arc<dyn ProductRepository>,
        stock: Arc<dyn ProductRepository>,
        notes: Arc<dyn NoteRepository>,
        max_update_retries: u32,
    ) -> Self {
        Self {
            products: Arc::new(ProductService::new(catalog)),
            inventory: Arc::new(InventoryService::new(stock, notes, max_update_retries)),
        }
    }

    /// Non-persistent state with the catalog also serving as the stock source.
    pub fn in_memory(max_update_retries: u32) -> Self {
        let products: Arc<dyn ProductRepository> = Arc::new(KvProductRepository::in_memory());
        let notes: Arc<dyn NoteRepository> = Arc::new(KvNoteRepository::in_memory());
        Self::new(Arc::clone(&products), products, notes, max_update_retries)
    }

    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let (catalog, notes): (Arc<dyn ProductRepository>, Arc<dyn NoteRepository>) = if cfg.storage.in_memory {
            info!("storage: in-memory tables");
            (Arc::new(KvProductRepository::in_memory()), Arc::new(KvNoteRepository::in_memory()))
        } else {
            service::runtime::ensure_data_dir(&cfg.storage.data_dir).await?;
            let products_path = cfg.storage.products_path();
            let inventory_path = cfg.storage.inventory_path();
            info!(products = %products_path.display(), inventory = %inventory_path.display(), "storage: json tables");
            (
                Arc::new(KvProductRepository::open(products_path).await?),
                Arc::new(KvNoteRepository::open(inventory_path).await?),
            )
        };

        let stock: Arc<dyn ProductRepository> = match cfg.products.remote() {
            Some(url) => {
                info!(%url, "inventory uses remote products api");
                Arc::new(HttpProductRepository::new(url, Duration::from_millis(cfg.products.timeout_ms))?)
            }
            None => Arc::clone(&catalog),
        };

        Ok(Self::new(catalog, stock, notes, cfg.inventory.max_update_retries))
    }
}
