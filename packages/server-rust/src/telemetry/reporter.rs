//! Error report sinks used by the error-reporting decorator.

use std::collections::BTreeMap;
use std::fmt;

use guestlist_core::ErrorKind;
use serde::Serialize;

/// A failed call, as forwarded to an error tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub message: String,
    pub kind: ErrorKind,
    pub tags: BTreeMap<&'static str, String>,
    /// Request fields opted in through `Describe::report_fields`.
    pub request: BTreeMap<&'static str, String>,
}

pub trait ErrorReporter: Send + Sync + fmt::Debug {
    fn report(&self, report: ErrorReport);
}

/// Writes reports to the log on the `guestlist::report` target.
#[derive(Debug, Clone, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, report: ErrorReport) {
        tracing::error!(
            target: "guestlist::report",
            kind = %report.kind,
            tags = ?report.tags,
            request = ?report.request,
            "{}",
            report.message
        );
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    environment: &'a str,
    #[serde(flatten)]
    report: &'a ErrorReport,
}

/// Posts reports as JSON to a webhook, fire-and-forget.
#[derive(Debug, Clone)]
pub struct WebhookReporter {
    client: reqwest::Client,
    dsn: String,
    environment: String,
}

impl WebhookReporter {
    #[must_use]
    pub fn new(dsn: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            dsn: dsn.into(),
            environment: environment.into(),
        }
    }

    fn payload(&self, report: &ErrorReport) -> serde_json::Value {
        serde_json::to_value(WebhookPayload {
            environment: &self.environment,
            report,
        })
        .unwrap_or(serde_json::Value::Null)
    }
}

impl ErrorReporter for WebhookReporter {
    fn report(&self, report: ErrorReport) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(message = %report.message, "no runtime, error report dropped");
            return;
        };
        let body = self.payload(&report);
        let request = self.client.post(&self.dsn).json(&body);
        handle.spawn(async move {
            match request.send().await {
                Ok(resp) if !resp.status().is_success() => {
                    tracing::warn!(status = %resp.status(), "error report rejected");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "error report delivery failed"),
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    pub struct RecordingReporter {
        pub reports: Mutex<Vec<ErrorReport>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, report: ErrorReport) {
            self.reports.lock().push(report);
        }
    }
}
