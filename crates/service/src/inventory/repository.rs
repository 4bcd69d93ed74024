use std::sync::Arc;

use async_trait::async_trait;
use models::InventoryNote;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::storage::json_map_store::JsonMapStore;

/// Append-only note log.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Store a new note; ids are never overwritten.
    async fn insert(&self, note: InventoryNote) -> Result<InventoryNote, ServiceError>;
    async fn get(&self, id: Uuid) -> Result<Option<InventoryNote>, ServiceError>;
    /// Notes newest first, optionally restricted to one product.
    async fn list(&self, codigo: Option<&str>) -> Result<Vec<InventoryNote>, ServiceError>;
}

#[derive(Clone)]
pub struct KvNoteRepository {
    store: Arc<JsonMapStore<Uuid, InventoryNote>>,
}

impl KvNoteRepository {
    pub async fn open<P: Into<std::path::PathBuf>>(path: P) -> Result<Self, ServiceError> {
        Ok(Self { store: JsonMapStore::new(path).await? })
    }

    pub fn in_memory() -> Self {
        Self { store: JsonMapStore::in_memory() }
    }
}

#[async_trait]
impl NoteRepository for KvNoteRepository {
    async fn insert(&self, note: InventoryNote) -> Result<InventoryNote, ServiceError> {
        self.store
            .update_map(move |map| {
                if map.contains_key(&note.id) {
                    return Err(ServiceError::Conflict(format!("note {} already exists", note.id)));
                }
                map.insert(note.id, note.clone());
                Ok(note)
            })
            .await
    }

    async fn get(&self, id: Uuid) -> Result<Option<InventoryNote>, ServiceError> {
        Ok(self.store.get(&id).await)
    }

    async fn list(&self, codigo: Option<&str>) -> Result<Vec<InventoryNote>, ServiceError> {
        let mut notes: Vec<InventoryNote> = self
            .store
            .values()
            .await
            .into_iter()
            .filter(|n| codigo.map_or(true, |c| n.codigo == c))
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(notes)
    }
}
