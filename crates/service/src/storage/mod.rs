//! Storage abstractions for service layer
//!
//! Key-value tables kept in memory and optionally mirrored to a JSON file.

pub mod json_map_store;
