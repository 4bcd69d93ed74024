use axum::{
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::response;
use crate::state::AppState;

pub mod inventory;
pub mod products;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn not_found() -> Response {
    response::failure(StatusCode::NOT_FOUND, "route not found")
}

/// Which route groups to mount.
#[derive(Clone, Copy, Debug)]
pub struct RouteSet {
    pub products: bool,
    pub inventory: bool,
}

impl Default for RouteSet {
    fn default() -> Self { Self { products: true, inventory: true } }
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list_products).post(products::create_product))
        .route(
            "/products/:codigo",
            get(products::get_product)
                .put(products::update_quantity)
                .patch(products::update_quantity),
        )
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(inventory::list_notes))
        .route("/inventory/entrada", post(inventory::create_entrada))
        .route("/inventory/salida", post(inventory::create_salida))
        .route("/inventory/:id", get(inventory::get_note))
}

/// Build the full application router
pub fn build_router(state: AppState, routes: RouteSet, cors: CorsLayer) -> Router {
    let mut router = Router::new().route("/health", get(health));
    if routes.products {
        router = router.merge(product_routes());
    }
    if routes.inventory {
        router = router.merge(inventory_routes());
    }

    router
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
