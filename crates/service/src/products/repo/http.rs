use std::time::Duration;

use async_trait::async_trait;
use models::{Product, QuantityUpdate};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::products::repository::{ProductRepository, SwapOutcome};

/// Response envelope produced by the products API.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// Products API client used when stock lives in another process.
///
/// `base_url` points at the products collection, e.g. `http://host:8080/products`.
#[derive(Clone)]
pub struct HttpProductRepository {
    client: reqwest::Client,
    base: Url,
}

impl HttpProductRepository {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base = Url::parse(base_url).map_err(|e| ServiceError::InvalidInput(format!("products url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ServiceError::InvalidInput(format!("products url cannot be a base: {base_url}")));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;
        Ok(Self { client, base })
    }

    fn item_url(&self, codigo: &str) -> Result<Url, ServiceError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::Upstream("products url cannot be a base".into()))?
            .pop_if_empty()
            .push(codigo);
        Ok(url)
    }

    async fn patch_quantity(&self, codigo: &str, body: &QuantityUpdate) -> Result<reqwest::Response, ServiceError> {
        let url = self.item_url(codigo)?;
        debug!(%url, "patch product quantity");
        self.client.patch(url).json(body).send().await.map_err(upstream)
    }
}

fn upstream(e: reqwest::Error) -> ServiceError {
    ServiceError::Upstream(e.to_string())
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ServiceError> {
    let envelope: Envelope<T> = resp.json().await.map_err(upstream)?;
    envelope
        .data
        .ok_or_else(|| ServiceError::Upstream("response without data".into()))
}

/// Error text from a failed call, falling back to the status line.
async fn error_message(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.json::<Envelope<serde_json::Value>>().await {
        Ok(Envelope { error: Some(msg), .. }) => msg,
        _ => status.to_string(),
    }
}

async fn unexpected(resp: reqwest::Response) -> ServiceError {
    let status = resp.status();
    let msg = error_message(resp).await;
    warn!(%status, error = %msg, "products api returned an unexpected status");
    ServiceError::Upstream(format!("{status}: {msg}"))
}

#[async_trait]
impl ProductRepository for HttpProductRepository {
    async fn create(&self, product: Product) -> Result<Product, ServiceError> {
        let resp = self.client.post(self.base.clone()).json(&product).send().await.map_err(upstream)?;
        match resp.status() {
            s if s.is_success() => decode(resp).await,
            StatusCode::CONFLICT => Err(ServiceError::DuplicateKey(product.codigo)),
            StatusCode::BAD_REQUEST => Err(ServiceError::InvalidInput(error_message(resp).await)),
            _ => Err(unexpected(resp).await),
        }
    }

    async fn get(&self, codigo: &str) -> Result<Option<Product>, ServiceError> {
        let url = self.item_url(codigo)?;
        let resp = self.client.get(url).send().await.map_err(upstream)?;
        match resp.status() {
            s if s.is_success() => decode(resp).await.map(Some),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(unexpected(resp).await),
        }
    }

    async fn list(&self) -> Result<Vec<Product>, ServiceError> {
        let resp = self.client.get(self.base.clone()).send().await.map_err(upstream)?;
        if !resp.status().is_success() {
            return Err(unexpected(resp).await);
        }
        decode(resp).await
    }

    async fn set_quantity(&self, codigo: &str, cantidad: u64) -> Result<Product, ServiceError> {
        let resp = self.patch_quantity(codigo, &QuantityUpdate::unconditional(cantidad)).await?;
        match resp.status() {
            s if s.is_success() => decode(resp).await,
            StatusCode::NOT_FOUND => Err(ServiceError::ProductNotFound(codigo.to_string())),
            StatusCode::BAD_REQUEST => Err(ServiceError::InvalidInput(error_message(resp).await)),
            _ => Err(unexpected(resp).await),
        }
    }

    async fn compare_and_swap_quantity(&self, codigo: &str, expected: u64, new: u64) -> Result<SwapOutcome, ServiceError> {
        let resp = self.patch_quantity(codigo, &QuantityUpdate::conditional(expected, new)).await?;
        match resp.status() {
            s if s.is_success() => decode(resp).await.map(SwapOutcome::Applied),
            StatusCode::CONFLICT => {
                let current = self
                    .get(codigo)
                    .await?
                    .ok_or_else(|| ServiceError::ProductNotFound(codigo.to_string()))?;
                Ok(SwapOutcome::Stale { current: current.cantidad })
            }
            StatusCode::NOT_FOUND => Err(ServiceError::ProductNotFound(codigo.to_string())),
            StatusCode::BAD_REQUEST => Err(ServiceError::InvalidInput(error_message(resp).await)),
            _ => Err(unexpected(resp).await),
        }
    }
}
