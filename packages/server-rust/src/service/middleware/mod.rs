//! Decorators wrapped around every service method.
//!
//! - [`metrics`]: request samples
//! - [`logging`]: access log line
//! - [`trace`]: child span per call
//! - [`reporting`]: error reports
//! - [`pipeline`]: composes the chain

pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod reporting;
pub mod trace;

pub use logging::LoggingLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_operation_pipeline, Collaborators};
pub use reporting::ReportingLayer;
pub use trace::TracingLayer;
