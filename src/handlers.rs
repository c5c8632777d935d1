//! The demo endpoints.
//!
//! `hello` opens `helloSpan` and delegates to [`echo`], which opens
//! `echoSpan` and, in the networked variant, calls the downstream `/test`
//! endpoint before composing the response. Both spans annotate themselves
//! with an event and end on every exit path.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::{global, metrics::Counter, KeyValue};
use thiserror::Error;

use crate::{client::HttpClient, scope};

/// Application state shared across handlers.
pub struct AppState {
    client: HttpClient,
    /// Target of `echo`'s outbound call. `None` selects the standalone
    /// variant where `echo` passes its message through.
    downstream: Option<String>,
    requests: Counter<u64>,
}

impl AppState {
    pub fn new(client: HttpClient, downstream: Option<String>) -> Self {
        let requests = global::meter("hello-trace")
            .u64_counter("hello.requests")
            .with_description("Requests handled by the hello flow")
            .init();
        Self {
            client,
            downstream,
            requests,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("downstream request failed: {0}")]
    Downstream(#[from] reqwest::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (StatusCode::BAD_GATEWAY, self.to_string()).into_response()
    }
}

/// `GET /hello`: the instrumented flow, `helloSpan` wrapping [`echo`].
pub async fn hello(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    state.requests.add(1, &[KeyValue::new("route", "/hello")]);
    scope::in_span("helloSpan", async {
        tracing::info!("this is in hello span");
        echo(&state, "Hello World").await
    })
    .await
}

/// The inner operation, always inside `echoSpan`. With a downstream
/// configured it composes the reply from the downstream body, otherwise the
/// message passes through unchanged.
pub async fn echo(state: &AppState, message: &str) -> Result<String, AppError> {
    scope::in_span("echoSpan", async {
        tracing::info!("this is in echo span");
        match &state.downstream {
            Some(url) => {
                let reply = state.client.get_text(url).await?;
                Ok(format!("Hello, World! Response from /test: {reply}"))
            }
            None => Ok(message.to_string()),
        }
    })
    .await
}

/// `GET /test` and `GET /ping`: the downstream target, no manual spans.
pub async fn ping() -> &'static str {
    "Test"
}

/// `GET /`.
pub async fn index() -> &'static str {
    "Hello, World!"
}
