//! Domain records for the product catalog and inventory notes.
//!
//! Request payloads arrive as loose `*Input` structs and are turned into the
//! typed records only through the checks in [`validation`].

pub mod errors;
pub mod validation;
pub mod product;
pub mod note;

pub use errors::ModelError;
pub use note::{InventoryNote, NoteInput, NoteType, ValidNote};
pub use product::{NewProduct, Product, QuantityChange, QuantityUpdate};
