use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod error;
mod logging;
mod routes;
mod services;

use services::cache::WorkbookStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::new()?;

    // Build our application state
    let state = Arc::new(AppState::new(config));

    // Build our application with a route
    let app = Router::new()
        .merge(routes::routes())
        .merge(routes::sheets::routes())
        .with_state(state);

    // Run it
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub store: Arc<WorkbookStore>,
}

impl AppState {
    fn new(config: config::Config) -> Self {
        let store = Arc::new(WorkbookStore::new(Duration::from_secs(
            config.cache_ttl_secs,
        )));
        Self { config, store }
    }
}
