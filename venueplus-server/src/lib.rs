mod context;
mod errors;
mod public;
mod ws;

use std::{
    io,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::Router;
use log::{info, warn};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use venueplus_collab::{env_in_range, Collab};

pub use context::*;
pub use errors::*;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_in_range("VENUEPLUS_SERVER_PORT", DEFAULT_PORT, 1..=u16::MAX),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Serves the websocket gateway and the public lists until Ctrl-C
pub async fn run_server(collab: Arc<Collab>, config: ServerConfig) -> io::Result<()> {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, config.port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let context = ServerContext {
        collab: collab.clone(),
    };

    let router = Router::new()
        .merge(ws::router())
        .merge(public::router())
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(stop_signal(collab))
        .await
}

async fn stop_signal(collab: Arc<Collab>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", err);
        return std::future::pending().await;
    }

    info!("Stopping...");
    collab.hub().close_all("server stopping").await;
}
