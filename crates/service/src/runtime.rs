//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep binary crates importing
//! `service::runtime` without depending directly on `common`.

/// Ensure the data directory used by file-backed tables exists.
pub async fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    common::env::ensure_data_dir(data_dir).await
}
