//! Lightweight span model used by the tracing decorator and transports.
//!
//! Spans are reported to a [`Tracer`] when they close. A [`SpanGuard`] closes
//! its span exactly once: explicitly through [`SpanGuard::finish`], or on drop
//! when the owning future is cancelled or unwinds.
//!
//! Ids and the W3C `traceparent` carrier format come from `opentelemetry`,
//! so callers that already trace can hand their context to either transport.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{IdGenerator, RandomIdGenerator};

/// Identifies a span and its place in a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_id: Option<SpanId>,
}

impl TraceContext {
    /// Starts a new trace.
    #[must_use]
    pub fn root() -> Self {
        let ids = RandomIdGenerator::default();
        Self {
            trace_id: ids.new_trace_id(),
            span_id: ids.new_span_id(),
            parent_id: None,
        }
    }

    /// A child span in the same trace.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: RandomIdGenerator::default().new_span_id(),
            parent_id: Some(self.span_id),
        }
    }

    /// The caller's span, read from `traceparent`/`tracestate` entries.
    ///
    /// `None` when the carrier holds no valid context.
    pub fn extract(carrier: &dyn Extractor) -> Option<Self> {
        let cx = TraceContextPropagator::new().extract(carrier);
        let span = cx.span();
        let remote = span.span_context();
        remote.is_valid().then(|| Self {
            trace_id: remote.trace_id(),
            span_id: remote.span_id(),
            parent_id: None,
        })
    }

    /// Writes this span as `traceparent` into `carrier`.
    pub fn inject(&self, carrier: &mut dyn Injector) {
        let remote = SpanContext::new(
            self.trace_id,
            self.span_id,
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        );
        let cx = opentelemetry::Context::new().with_remote_span_context(remote);
        TraceContextPropagator::new().inject_context(&cx, carrier);
    }
}

/// A closed span, handed to [`Tracer::on_finish`].
#[derive(Debug, Clone)]
pub struct FinishedSpan {
    pub name: String,
    pub context: TraceContext,
    pub elapsed: Duration,
    pub error: Option<String>,
}

/// Span sink.
pub trait Tracer: Send + Sync + fmt::Debug {
    fn on_start(&self, _name: &str, _context: &TraceContext) {}

    fn on_finish(&self, span: FinishedSpan);
}

/// Emits finished spans as `tracing` events on the `guestlist::trace` target.
#[derive(Debug, Clone)]
pub struct LogTracer {
    service: String,
}

impl LogTracer {
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Tracer for LogTracer {
    fn on_finish(&self, span: FinishedSpan) {
        #[allow(clippy::cast_possible_truncation)]
        let elapsed_us = span.elapsed.as_micros() as u64;
        tracing::debug!(
            target: "guestlist::trace",
            service = %self.service,
            span = %span.name,
            trace_id = %span.context.trace_id,
            span_id = %span.context.span_id,
            parent_id = ?span.context.parent_id,
            elapsed_us,
            error = span.error.as_deref(),
            "span finished"
        );
    }
}

/// Open span. Reports to its tracer once, whichever way it is closed.
pub struct SpanGuard {
    tracer: Arc<dyn Tracer>,
    name: String,
    context: TraceContext,
    start: Instant,
    error: Option<String>,
    closed: bool,
}

impl SpanGuard {
    /// Opens a span as a child of `parent`, or as a new root.
    #[must_use]
    pub fn open(tracer: Arc<dyn Tracer>, name: impl Into<String>, parent: Option<&TraceContext>) -> Self {
        let name = name.into();
        let context = parent.map_or_else(TraceContext::root, TraceContext::child);
        tracer.on_start(&name, &context);
        Self {
            tracer,
            name,
            context,
            start: Instant::now(),
            error: None,
            closed: false,
        }
    }

    #[must_use]
    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    /// Closes the span, tagging it with `error` when present.
    pub fn finish(mut self, error: Option<String>) {
        self.error = error;
        self.close();
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.tracer.on_finish(FinishedSpan {
            name: std::mem::take(&mut self.name),
            context: self.context.clone(),
            elapsed: self.start.elapsed(),
            error: self.error.take(),
        });
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SpanGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanGuard")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    /// Tracer that keeps every span it is told about.
    #[derive(Debug, Default)]
    pub struct RecordingTracer {
        pub started: Mutex<Vec<(String, TraceContext)>>,
        pub finished: Mutex<Vec<FinishedSpan>>,
    }

    impl Tracer for RecordingTracer {
        fn on_start(&self, name: &str, context: &TraceContext) {
            self.started.lock().push((name.to_string(), context.clone()));
        }

        fn on_finish(&self, span: FinishedSpan) {
            self.finished.lock().push(span);
        }
    }
}
