use std::{env, error::Error, net::SocketAddr, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use tokio::net::TcpListener;

use crate::{client::HttpClient, handlers, handlers::AppState, middleware::TraceLayer};

/// The downstream target of the networked variant, same process by default.
const DEFAULT_DOWNSTREAM: &str = "http://127.0.0.1:8080/test";

const DEFAULT_OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration, read from the environment:
/// - `LISTEN_ADDR`: bind address (default `127.0.0.1:8080`)
/// - `DOWNSTREAM_URL`: target of `echo`'s outbound call; set empty to run the
///   standalone pass-through variant (default: this server's own `/test`)
/// - `OUTBOUND_TIMEOUT_MS`: cutoff for the outbound call (default 10000)
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub downstream: Option<String>,
    pub outbound_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            downstream: Some(DEFAULT_DOWNSTREAM.to_string()),
            outbound_timeout: DEFAULT_OUTBOUND_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let listen = env::var("LISTEN_ADDR")
            .ok()
            .and_then(|a| a.parse().ok())
            .unwrap_or(defaults.listen);
        let downstream = match env::var("DOWNSTREAM_URL") {
            Ok(url) if url.is_empty() => None,
            Ok(url) => Some(url),
            Err(_) => defaults.downstream,
        };
        let outbound_timeout = env::var("OUTBOUND_TIMEOUT_MS")
            .ok()
            .and_then(|ms| ms.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.outbound_timeout);
        Self {
            listen,
            downstream,
            outbound_timeout,
        }
    }
}

/// Builds the demo router. The trace layer sits last so it runs first and
/// every handler executes inside a request span.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/hello", get(handlers::hello))
        .route("/test", get(handlers::ping))
        .route("/ping", get(handlers::ping))
        .layer(TraceLayer)
        .with_state(state)
}

/// Serves the router until SIGINT/SIGTERM.
pub async fn run(config: ServerConfig) -> Result<(), Box<dyn Error>> {
    let client = HttpClient::new(config.outbound_timeout)?;
    let state = Arc::new(AppState::new(client, config.downstream.clone()));

    let listener = TcpListener::bind(config.listen).await?;
    tracing::info!(addr = %config.listen, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
