use crate::config::AppConfig;
use anyhow::{anyhow, Result};
use axum::{routing::get_service, Router};
use std::net::SocketAddr;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

/// Routes for previewing a generated document: `/` is the map itself, other
/// paths resolve against the document's directory.
pub fn preview_router(document: &Path) -> Router {
    let dir = document
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    Router::new()
        .route("/", get_service(ServeFile::new(document)))
        .fallback_service(ServeDir::new(dir))
        .layer(CorsLayer::permissive())
}

pub async fn start_server(config: &AppConfig) -> Result<()> {
    let document = &config.output.document;
    if !document.exists() {
        return Err(anyhow!(
            "Map document {:?} does not exist; run `generate` first",
            document
        ));
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    println!("Previewing {:?} on http://{}", document, addr);
    info!("Starting preview server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, preview_router(document)).await?;
    Ok(())
}
