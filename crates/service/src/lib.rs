//! Service layer: business rules for the product catalog and inventory notes.
//! - Separates business logic from storage and transport.
//! - Reuses validation and record definitions from the `models` crate.
//! - Storage sits behind repository traits so local and remote backends are interchangeable.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod products;
pub mod inventory;
