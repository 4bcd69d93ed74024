use std::sync::Arc;

use models::{InventoryNote, NoteInput, NoteType, QuantityChange, ValidNote};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::inventory::repository::NoteRepository;
use crate::products::repository::{ProductRepository, SwapOutcome};

/// Progress of a single note. A failure at any stage ends processing and
/// is reported together with the stage it happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteStage {
    Received,
    Validated,
    StockChecked,
    Applied,
    Persisted,
}

/// Stored note plus the stock movement it caused.
#[derive(Clone, Debug, Serialize)]
pub struct NoteReceipt {
    pub nota: InventoryNote,
    pub product: QuantityChange,
}

/// Applies entrada/salida notes to product stock.
///
/// Stock is changed with a compare-and-swap on the quantity that was read,
/// retried up to `max_update_retries` times when another writer got there first.
pub struct InventoryService {
    products: Arc<dyn ProductRepository>,
    notes: Arc<dyn NoteRepository>,
    max_update_retries: u32,
}

impl InventoryService {
    pub fn new(products: Arc<dyn ProductRepository>, notes: Arc<dyn NoteRepository>, max_update_retries: u32) -> Self {
        Self { products, notes, max_update_retries }
    }

    #[instrument(skip(self, input), fields(tipo = %tipo, codigo = ?input.codigo))]
    pub async fn process_note(&self, input: &NoteInput, tipo: NoteType) -> Result<NoteReceipt, ServiceError> {
        let mut stage = NoteStage::Received;
        let result = self.run(input, tipo, &mut stage).await;
        match &result {
            Ok(receipt) => info!(
                note_id = %receipt.nota.id,
                previous = receipt.product.previous_quantity,
                new = receipt.product.new_quantity,
                "note_persisted"
            ),
            Err(e) if e.is_internal() => error!(stage = ?stage, kind = e.kind(), error = %e, "note_failed"),
            Err(e) => warn!(stage = ?stage, kind = e.kind(), error = %e, "note_rejected"),
        }
        result
    }

    async fn run(&self, input: &NoteInput, tipo: NoteType, stage: &mut NoteStage) -> Result<NoteReceipt, ServiceError> {
        let valid = input.validate()?;
        advance(stage, NoteStage::Validated);

        let change = self.apply_stock(&valid, tipo, stage).await?;
        advance(stage, NoteStage::Applied);

        let note = InventoryNote::new(valid, tipo);
        let nota = match self.notes.insert(note).await {
            Ok(n) => n,
            Err(e) => {
                self.revert_stock(&change).await;
                return Err(e);
            }
        };
        advance(stage, NoteStage::Persisted);

        Ok(NoteReceipt { nota, product: change })
    }

    async fn apply_stock(&self, valid: &ValidNote, tipo: NoteType, stage: &mut NoteStage) -> Result<QuantityChange, ServiceError> {
        let codigo = valid.codigo.as_str();
        let mut current = self
            .products
            .get(codigo)
            .await?
            .ok_or_else(|| ServiceError::ProductNotFound(codigo.to_string()))?
            .cantidad;

        let mut conflicts = 0u32;
        loop {
            let new = match tipo.apply(current, valid.cantidad) {
                Some(n) => n,
                None if tipo == NoteType::Salida => {
                    return Err(ServiceError::InsufficientStock { codigo: codigo.to_string(), current })
                }
                None => return Err(ServiceError::InvalidInput(format!("stock of {codigo} would overflow"))),
            };
            advance(stage, NoteStage::StockChecked);

            match self.products.compare_and_swap_quantity(codigo, current, new).await? {
                SwapOutcome::Applied(_) => {
                    return Ok(QuantityChange { codigo: codigo.to_string(), previous_quantity: current, new_quantity: new })
                }
                SwapOutcome::Stale { current: latest } => {
                    conflicts += 1;
                    warn!(%codigo, expected = current, latest, attempt = conflicts, "stock_update_conflict");
                    if conflicts > self.max_update_retries {
                        return Err(ServiceError::Conflict(format!(
                            "stock of {codigo} changed concurrently; gave up after {conflicts} attempts"
                        )));
                    }
                    current = latest;
                }
            }
        }
    }

    /// Best-effort undo of an applied stock change whose note could not be stored.
    async fn revert_stock(&self, change: &QuantityChange) {
        let outcome = self
            .products
            .compare_and_swap_quantity(&change.codigo, change.new_quantity, change.previous_quantity)
            .await;
        match outcome {
            Ok(SwapOutcome::Applied(_)) => warn!(codigo = %change.codigo, restored = change.previous_quantity, "stock_reverted"),
            Ok(SwapOutcome::Stale { current }) => error!(
                codigo = %change.codigo, current, applied = change.new_quantity,
                "stock_revert_skipped: quantity moved on"
            ),
            Err(e) => error!(codigo = %change.codigo, error = %e, "stock_revert_failed"),
        }
    }

    pub async fn get_note(&self, id: Uuid) -> Result<InventoryNote, ServiceError> {
        self.notes
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("note {id}")))
    }

    pub async fn list_notes(&self, codigo: Option<&str>) -> Result<Vec<InventoryNote>, ServiceError> {
        self.notes.list(codigo).await
    }
}

fn advance(stage: &mut NoteStage, next: NoteStage) {
    debug!(from = ?*stage, to = ?next, "note_stage");
    *stage = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::repository::KvNoteRepository;
    use crate::products::repo::KvProductRepository;
    use async_trait::async_trait;
    use models::Product;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn product(codigo: &str, cantidad: u64) -> Product {
        Product {
            codigo: codigo.into(),
            nombre: "Cable".into(),
            descripcion: String::new(),
            cantidad,
            precio_unitario: Decimal::new(300, 2),
            categoria: "electricidad".into(),
        }
    }

    fn note(codigo: &str, cantidad: u64) -> NoteInput {
        serde_json::from_value(json!({ "fecha": "2024-06-01", "codigo": codigo, "cantidad": cantidad }))
            .expect("payload")
    }

    async fn setup(initial: u64, retries: u32) -> Result<(Arc<KvProductRepository>, Arc<KvNoteRepository>, InventoryService), ServiceError> {
        let products = Arc::new(KvProductRepository::in_memory());
        products.create(product("A1", initial)).await?;
        let notes = Arc::new(KvNoteRepository::in_memory());
        let svc = InventoryService::new(products.clone(), notes.clone(), retries);
        Ok((products, notes, svc))
    }

    async fn stock(repo: &KvProductRepository) -> u64 {
        repo.get("A1").await.ok().flatten().map(|p| p.cantidad).unwrap_or_default()
    }

    #[tokio::test]
    async fn entrada_adds_stock() -> Result<(), anyhow::Error> {
        let (products, notes, svc) = setup(10, 3).await?;
        let r = svc.process_note(&note("A1", 5), NoteType::Entrada).await?;
        assert_eq!(r.product, QuantityChange { codigo: "A1".into(), previous_quantity: 10, new_quantity: 15 });
        assert_eq!(r.nota.tipo, NoteType::Entrada);
        assert_eq!(stock(&products).await, 15);
        assert_eq!(notes.list(None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn salida_then_insufficient_stock() -> Result<(), anyhow::Error> {
        let (products, notes, svc) = setup(10, 3).await?;
        let r = svc.process_note(&note("A1", 7), NoteType::Salida).await?;
        assert_eq!(r.product.new_quantity, 3);
        assert_eq!(stock(&products).await, 3);

        let err = svc.process_note(&note("A1", 5), NoteType::Salida).await.expect_err("insufficient");
        match err {
            ServiceError::InsufficientStock { codigo, current } => {
                assert_eq!(codigo, "A1");
                assert_eq!(current, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(stock(&products).await, 3);
        assert_eq!(notes.list(None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn salida_to_exactly_zero() -> Result<(), anyhow::Error> {
        let (products, _, svc) = setup(4, 3).await?;
        svc.process_note(&note("A1", 4), NoteType::Salida).await?;
        assert_eq!(stock(&products).await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_product_and_bad_input() -> Result<(), anyhow::Error> {
        let (_, notes, svc) = setup(10, 3).await?;
        let err = svc.process_note(&note("ZZ", 1), NoteType::Entrada).await.expect_err("missing");
        assert!(matches!(err, ServiceError::ProductNotFound(_)));

        let bad: NoteInput = serde_json::from_value(json!({ "fecha": "2024-06-01", "codigo": "A1", "cantidad": 0 }))?;
        let err = svc.process_note(&bad, NoteType::Entrada).await.expect_err("invalid");
        assert!(matches!(err, ServiceError::Model(_)));
        assert!(notes.list(None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn entrada_overflow_is_invalid() -> Result<(), anyhow::Error> {
        let (products, _, svc) = setup(u64::MAX - 1, 3).await?;
        let err = svc.process_note(&note("A1", 5), NoteType::Entrada).await.expect_err("overflow");
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(stock(&products).await, u64::MAX - 1);
        Ok(())
    }

    /// Product table whose conditional writes always lose the race.
    struct AlwaysStale(KvProductRepository);

    #[async_trait]
    impl ProductRepository for AlwaysStale {
        async fn create(&self, p: Product) -> Result<Product, ServiceError> { self.0.create(p).await }
        async fn get(&self, c: &str) -> Result<Option<Product>, ServiceError> { self.0.get(c).await }
        async fn list(&self) -> Result<Vec<Product>, ServiceError> { self.0.list().await }
        async fn set_quantity(&self, c: &str, q: u64) -> Result<Product, ServiceError> { self.0.set_quantity(c, q).await }
        async fn compare_and_swap_quantity(&self, _: &str, expected: u64, _: u64) -> Result<SwapOutcome, ServiceError> {
            Ok(SwapOutcome::Stale { current: expected + 1 })
        }
    }

    #[tokio::test]
    async fn retries_exhaust_into_conflict() -> Result<(), anyhow::Error> {
        let inner = KvProductRepository::in_memory();
        inner.create(product("A1", 10)).await?;
        let notes = Arc::new(KvNoteRepository::in_memory());
        let svc = InventoryService::new(Arc::new(AlwaysStale(inner)), notes.clone(), 2);
        let err = svc.process_note(&note("A1", 1), NoteType::Entrada).await.expect_err("conflict");
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(notes.list(None).await?.is_empty());
        Ok(())
    }

    /// Note log that refuses every write.
    struct BrokenNotes;

    #[async_trait]
    impl NoteRepository for BrokenNotes {
        async fn insert(&self, _: InventoryNote) -> Result<InventoryNote, ServiceError> {
            Err(ServiceError::Storage("disk full".into()))
        }
        async fn get(&self, _: Uuid) -> Result<Option<InventoryNote>, ServiceError> { Ok(None) }
        async fn list(&self, _: Option<&str>) -> Result<Vec<InventoryNote>, ServiceError> { Ok(vec![]) }
    }

    #[tokio::test]
    async fn failed_note_write_reverts_stock() -> Result<(), anyhow::Error> {
        let products = Arc::new(KvProductRepository::in_memory());
        products.create(product("A1", 10)).await?;
        let svc = InventoryService::new(products.clone(), Arc::new(BrokenNotes), 3);
        let err = svc.process_note(&note("A1", 4), NoteType::Salida).await.expect_err("storage");
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(stock(&products).await, 10);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_salidas_never_go_negative() -> Result<(), anyhow::Error> {
        let initial = 50u64;
        let (products, notes, svc) = setup(initial, 100).await?;
        let svc = Arc::new(svc);

        let amounts: Vec<u64> = (0..40).map(|i| 1 + (i % 5)).collect();
        assert!(amounts.iter().sum::<u64>() > initial);

        let mut handles = Vec::new();
        for amount in amounts {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                (amount, svc.process_note(&note("A1", amount), NoteType::Salida).await)
            }));
        }

        let mut applied = 0u64;
        let mut succeeded = 0usize;
        for h in handles {
            let (amount, res) = h.await?;
            match res {
                Ok(_) => {
                    applied += amount;
                    succeeded += 1;
                }
                Err(ServiceError::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert!(applied <= initial);
        assert_eq!(stock(&products).await, initial - applied);
        assert_eq!(notes.list(Some("A1")).await?.len(), succeeded);
        Ok(())
    }

    #[tokio::test]
    async fn notes_can_be_read_back() -> Result<(), anyhow::Error> {
        let (_, _, svc) = setup(10, 3).await?;
        let r = svc.process_note(&note("A1", 2), NoteType::Entrada).await?;
        assert_eq!(svc.get_note(r.nota.id).await?, r.nota);
        let missing = Uuid::new_v4();
        match svc.get_note(missing).await {
            Err(ServiceError::NotFound(msg)) => assert_eq!(msg, format!("note {missing} not found")),
            other => panic!("expected not found, got {other:?}"),
        }
        assert_eq!(svc.list_notes(Some("A1")).await?.len(), 1);
        assert!(svc.list_notes(Some("B2")).await?.is_empty());
        Ok(())
    }
}
