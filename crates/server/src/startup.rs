use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::routes::{self, RouteSet};
use crate::state::AppState;

/// Any origin, method and header; responses carry `Access-Control-Allow-Origin: *`.
pub fn build_cors() -> CorsLayer {
    CorsLayer::permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Build state and router from configuration.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let state = AppState::from_config(cfg).await?;
    let routes = RouteSet { products: cfg.server.enable_products, inventory: cfg.server.enable_inventory };
    Ok(routes::build_router(state, routes, build_cors()))
}

/// Resolves on Ctrl+C. If the handler cannot be installed the server runs until killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(event = "shutdown_signal", "received Ctrl+C, draining in-flight requests"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

/// Serve `app` until `shutdown` resolves, then wait for in-flight requests to finish.
pub async fn serve_until<F>(listener: tokio::net::TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("server drained");
    Ok(())
}

/// Public entry: build the app and run the HTTP server until Ctrl+C
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let addr = bind_addr(&cfg)?;
    info!(
        %addr,
        products = cfg.server.enable_products,
        inventory = cfg.server.enable_inventory,
        remote_products = cfg.products.remote().unwrap_or("-"),
        "starting inventory server"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_until(listener, app, shutdown_signal()).await
}
