//! Observability collaborators shared by the decorator chain and transports.
//!
//! - [`logging`]: subscriber initialisation
//! - [`metrics`]: request samples, sinks, Prometheus exporter
//! - [`tracer`]: span contexts and the exactly-once span guard
//! - [`reporter`]: error report sinks

pub mod logging;
pub mod metrics;
pub mod reporter;
pub mod tracer;

pub use logging::{init_logging, LogFormat};
pub use metrics::{MetricsSink, PrometheusSink, QueuedMetrics, RequestSample};
pub use reporter::{ErrorReport, ErrorReporter, LogReporter, WebhookReporter};
pub use tracer::{FinishedSpan, LogTracer, SpanGuard, TraceContext, Tracer};
