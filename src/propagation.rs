use http::{HeaderMap, HeaderName, Request};
use opentelemetry::{
    global,
    propagation::{Extractor, Injector},
};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Injects the current [`opentelemetry::Context`] into a set of outbound
/// request headers to allow propagation downstream.
///
/// Works on a bare [`HeaderMap`] so both `http` and `reqwest` requests can
/// use it.
pub fn inject_context(headers: &mut HeaderMap) {
    let context = Span::current().context();

    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&context, &mut HeaderInjector { headers })
    });
}

/// Constructs a [`opentelemetry::Context`] from an inbound request's headers
/// and returns a request span parented to it.
#[track_caller]
pub fn request_span<T>(request: &Request<T>) -> Span {
    let context = global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor {
            headers: request.headers(),
        })
    });

    let span = tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    );
    span.set_parent(context);

    span
}

// "traceparent" => https://www.w3.org/TR/trace-context/#trace-context-http-headers-format

/// Injector used via opentelemetry propagator to write the propagation
/// headers (e.g. a "traceparent" value
/// "{version}-{trace_id}-{span_id}-{trace_flags}") into the header map.
/// Listeners can then re-hydrate the context to add additional spans to the
/// same trace.
struct HeaderInjector<'a> {
    headers: &'a mut HeaderMap,
}

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let Ok(key) = key.parse::<HeaderName>() else {
            tracing::debug!(%key, "failed to parse header name");
            return;
        };
        let Ok(value) = value.parse() else {
            tracing::debug!(%value, "failed to parse header value");
            return;
        };
        self.headers.insert(key, value);
    }
}

struct HeaderExtractor<'a> {
    headers: &'a HeaderMap,
}

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|h| h.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|k| k.as_str()).collect()
    }
}
