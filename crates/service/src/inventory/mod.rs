//! Inventory notes: the append-only movement log and the processor that
//! applies each note to product stock.

pub mod repository;
pub mod processor;

pub use processor::{InventoryService, NoteReceipt, NoteStage};
pub use repository::{KvNoteRepository, NoteRepository};
