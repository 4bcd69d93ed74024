//! Product catalog: repository abstraction, its implementations and the
//! application service used by the HTTP layer.

pub mod repository;
pub mod repo;
pub mod service;

pub use repository::{ProductRepository, SwapOutcome};
pub use service::ProductService;
