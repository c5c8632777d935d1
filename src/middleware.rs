use std::task::{Context, Poll};

use http::Request;
use tower::Service;
use tower_layer::Layer;
use tracing::instrument::Instrumented;

use crate::propagation;

/// Installs a request span around every route handler, parented to the
/// inbound trace context if the caller sent one.
///
/// Register it globally and in the last position, to be the first to run.
/// Handler-created spans (like `helloSpan`) then land under one request span
/// per inbound call.
///
/// ```ignore
/// let app = Router::new()
///     .route("/hello", get(hello))
///     .layer(TraceLayer);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceLayer;

impl<S> Layer<S> for TraceLayer {
    type Service = TraceService<S>;

    fn layer(&self, service: S) -> Self::Service {
        TraceService { service }
    }
}

/// The service produced by [`TraceLayer`].
#[derive(Clone, Debug)]
pub struct TraceService<S> {
    service: S,
}

impl<S, Body> Service<Request<Body>> for TraceService<S>
where
    S: Service<Request<Body>>,
{
    type Error = S::Error;
    type Future = Instrumented<S::Future>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let span = propagation::request_span(&request);

        tracing::Instrument::instrument(self.service.call(request), span)
    }
}
