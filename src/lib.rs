//! # hello-trace
//! A small demo service showing how to instrument web endpoints with manually
//! created spans, exported over OTLP.
//!
//! ## Setup
//! Telemetry (traces, logs and metrics) is set up using [`setup::setup`].
//! This should be the first call of the server binary; [`setup::teardown`]
//! flushes the exporters on the way out.
//!
//! ## The nested-span pattern
//! [`scope::in_span`] runs a unit of work inside a named span and guarantees
//! the span ends exactly once on every exit path. Spans started while another
//! span is active are parented to it through the task-scoped span context, so
//! the `helloSpan` -> `echoSpan` nesting in [`handlers`] falls out of the
//! call structure with no global mutable state.
//!
//! ## Http Trace Propagation
//! [`propagation`] injects and extracts trace context into/from http headers.
//! [`middleware::TraceLayer`] handles the extraction side for every inbound
//! request; [`client::HttpClient`] handles the injection side for the
//! outbound call, correlating traces across both hops.

pub mod client;
pub mod handlers;
pub mod middleware;
pub mod propagation;
pub mod scope;
pub mod server;
pub mod setup;
