//! Span-scoped execution of units of work.
//!
//! One operation, one span: the span is opened when the work starts, is the
//! current span for exactly as long as the work runs, and is closed exactly
//! once on every exit path (return, error, drop). Spans opened by the work
//! itself become children of it through the task-scoped span context.

use std::future::Future;

use tracing::{Instrument, Span};

/// Builds a span carrying `name` as its reported name.
///
/// `tracing` span names must be static, so the dynamic name travels in the
/// `otel.name` field, which `tracing-opentelemetry` uses to rename the
/// exported span.
fn named_span(name: &str) -> Span {
    tracing::info_span!("operation", otel.name = name)
}

/// Runs `work` inside a span named `name`.
///
/// The span ends when the future completes or is dropped, whichever comes
/// first, and errors pass through untouched.
pub async fn in_span<F>(name: &str, work: F) -> F::Output
where
    F: Future,
{
    work.instrument(named_span(name)).await
}

/// Synchronous counterpart of [`in_span`]. The span ends even if `work`
/// panics.
pub fn in_scope<T>(name: &str, work: impl FnOnce() -> T) -> T {
    let span = named_span(name);
    span.in_scope(work)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use tracing_core::{field::Visit, span, Field, Subscriber};
    use tracing_subscriber::{
        layer::{Context, SubscriberExt},
        registry::LookupSpan,
        Layer, Registry,
    };

    use super::*;

    /// One observed span: id, reported name, contextual parent id.
    pub(crate) struct OpenedSpan {
        pub id: span::Id,
        pub name: String,
        pub parent: Option<span::Id>,
    }

    #[derive(Default)]
    pub(crate) struct SpanLog {
        pub opened: Vec<OpenedSpan>,
        pub closed: Vec<span::Id>,
    }

    impl SpanLog {
        pub fn find(&self, name: &str) -> Option<&OpenedSpan> {
            self.opened.iter().find(|s| s.name == name)
        }
    }

    /// A layer recording span open/close and contextual parentage, standing
    /// in for the otel exporter in tests.
    #[derive(Clone, Default)]
    pub(crate) struct Recorder {
        pub log: Arc<Mutex<SpanLog>>,
    }

    impl Recorder {
        pub fn subscriber(&self) -> impl Subscriber + Send + Sync {
            Registry::default().with(self.clone())
        }
    }

    struct NameVisitor(Option<String>);

    impl Visit for NameVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "otel.name" {
                self.0 = Some(value.to_string());
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "otel.name" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S> Layer<S> for Recorder
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
            let mut visitor = NameVisitor(None);
            attrs.record(&mut visitor);
            self.log.lock().unwrap().opened.push(OpenedSpan {
                id: id.clone(),
                name: visitor.0.unwrap_or_else(|| attrs.metadata().name().to_string()),
                parent: ctx.current_span().id().cloned(),
            });
        }

        fn on_close(&self, id: span::Id, _ctx: Context<'_, S>) {
            self.log.lock().unwrap().closed.push(id);
        }
    }

    #[tokio::test]
    async fn span_opens_and_closes_once_on_success() {
        let recorder = Recorder::default();
        let _guard = tracing::subscriber::set_default(recorder.subscriber());

        let out = in_span("workSpan", async { 7 }).await;

        assert_eq!(out, 7);
        let log = recorder.log.lock().unwrap();
        assert_eq!(log.opened.len(), 1);
        assert_eq!(log.opened[0].name, "workSpan");
        assert_eq!(log.closed, vec![log.opened[0].id.clone()]);
    }

    #[tokio::test]
    async fn span_closes_when_work_fails() {
        let recorder = Recorder::default();
        let _guard = tracing::subscriber::set_default(recorder.subscriber());

        let out: Result<(), &str> = in_span("failingSpan", async { Err("boom") }).await;

        assert!(out.is_err());
        let log = recorder.log.lock().unwrap();
        assert_eq!(log.opened.len(), 1);
        assert_eq!(log.closed.len(), 1);
    }

    #[tokio::test]
    async fn span_closes_when_work_is_dropped_midway() {
        let recorder = Recorder::default();
        let _guard = tracing::subscriber::set_default(recorder.subscriber());

        // the work never completes, the timeout drops it mid-flight
        let work = in_span("abandonedSpan", std::future::pending::<()>());
        let out = tokio::time::timeout(std::time::Duration::from_millis(10), work).await;
        assert!(out.is_err());

        let log = recorder.log.lock().unwrap();
        assert_eq!(log.opened.len(), 1);
        assert_eq!(log.closed.len(), 1);
    }

    #[test]
    fn scope_closes_span_on_panic() {
        let recorder = Recorder::default();
        let _guard = tracing::subscriber::set_default(recorder.subscriber());

        let result = std::panic::catch_unwind(|| in_scope("panicSpan", || panic!("boom")));

        assert!(result.is_err());
        let log = recorder.log.lock().unwrap();
        assert_eq!(log.opened.len(), 1);
        assert_eq!(log.closed.len(), 1);
    }

    #[tokio::test]
    async fn inner_spans_are_children_of_the_outer_span() {
        let recorder = Recorder::default();
        let _guard = tracing::subscriber::set_default(recorder.subscriber());

        in_span("outerSpan", async {
            in_span("innerSpan", async {}).await;
        })
        .await;

        let log = recorder.log.lock().unwrap();
        let outer = log.find("outerSpan").unwrap();
        let inner = log.find("innerSpan").unwrap();
        assert_eq!(inner.parent, Some(outer.id.clone()));
        assert_eq!(outer.parent, None);
        assert_eq!(log.closed.len(), 2);
    }
}
