//! The uniform call shape flowing through the decorator chain.
//!
//! Transports turn typed requests into an [`Operation`], the pipeline turns
//! it into an [`OperationResponse`] or [`OperationError`], and the endpoint
//! layer casts the response back to the typed shape.

use std::net::SocketAddr;

use guestlist_core::{
    Describe, ErrorKind, Field, LivenessRequest, LivenessResponse, ReadinessRequest,
    ReadinessResponse, SearchUserRequest, SearchUserResponse, UpdateUserRequest,
    UpdateUserResponse, ValidationError, VersionRequest, VersionResponse,
};
use tokio::time::Instant;

use crate::telemetry::TraceContext;

/// Service names used for routing and metric labels.
pub mod service_names {
    pub const USER: &str = "user";
    pub const HEALTH: &str = "health";
}

/// Which adapter accepted the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    Rpc,
}

impl TransportKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Rpc => "rpc",
        }
    }
}

/// Per-call metadata, created by the transport and dropped when the call
/// returns.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub call_id: u64,
    pub transport: TransportKind,
    pub remote_addr: Option<SocketAddr>,
    /// HTTP verb, or the RPC method name.
    pub method: String,
    /// Request URL. HTTP only.
    pub url: Option<String>,
    pub protocol: String,
    pub trace: Option<TraceContext>,
    pub deadline: Option<Instant>,
}

impl RequestContext {
    #[must_use]
    pub fn new(call_id: u64, transport: TransportKind) -> Self {
        Self {
            call_id,
            transport,
            remote_addr: None,
            method: String::new(),
            url: None,
            protocol: String::new(),
            trace: None,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_remote_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.remote_addr = addr;
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: Option<TraceContext>) -> Self {
        self.trace = trace;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Fails once the deadline, if any, has passed.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Internal`] with "deadline exceeded".
    pub fn ensure_live(&self) -> Result<(), OperationError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(OperationError::Internal("deadline exceeded".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// One call to a service method.
#[derive(Debug, Clone)]
pub enum Operation {
    SearchUser {
        ctx: RequestContext,
        request: SearchUserRequest,
    },
    UpdateUser {
        ctx: RequestContext,
        request: UpdateUserRequest,
    },
    Liveness {
        ctx: RequestContext,
        request: LivenessRequest,
    },
    Readiness {
        ctx: RequestContext,
        request: ReadinessRequest,
    },
    Version {
        ctx: RequestContext,
        request: VersionRequest,
    },
}

impl Operation {
    #[must_use]
    pub fn ctx(&self) -> &RequestContext {
        match self {
            Self::SearchUser { ctx, .. }
            | Self::UpdateUser { ctx, .. }
            | Self::Liveness { ctx, .. }
            | Self::Readiness { ctx, .. }
            | Self::Version { ctx, .. } => ctx,
        }
    }

    pub fn ctx_mut(&mut self) -> &mut RequestContext {
        match self {
            Self::SearchUser { ctx, .. }
            | Self::UpdateUser { ctx, .. }
            | Self::Liveness { ctx, .. }
            | Self::Readiness { ctx, .. }
            | Self::Version { ctx, .. } => ctx,
        }
    }

    #[must_use]
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::SearchUser { .. } => "SearchUser",
            Self::UpdateUser { .. } => "UpdateUser",
            Self::Liveness { .. } => "Liveness",
            Self::Readiness { .. } => "Readiness",
            Self::Version { .. } => "Version",
        }
    }

    #[must_use]
    pub const fn service_name(&self) -> &'static str {
        match self {
            Self::SearchUser { .. } | Self::UpdateUser { .. } => service_names::USER,
            Self::Liveness { .. } | Self::Readiness { .. } | Self::Version { .. } => {
                service_names::HEALTH
            }
        }
    }

    #[must_use]
    pub fn log_fields(&self) -> Vec<Field> {
        match self {
            Self::SearchUser { request, .. } => request.log_fields(),
            Self::UpdateUser { request, .. } => request.log_fields(),
            Self::Liveness { request, .. } => request.log_fields(),
            Self::Readiness { request, .. } => request.log_fields(),
            Self::Version { request, .. } => request.log_fields(),
        }
    }

    #[must_use]
    pub fn report_fields(&self) -> Vec<Field> {
        match self {
            Self::SearchUser { request, .. } => request.report_fields(),
            Self::UpdateUser { request, .. } => request.report_fields(),
            Self::Liveness { request, .. } => request.report_fields(),
            Self::Readiness { request, .. } => request.report_fields(),
            Self::Version { request, .. } => request.report_fields(),
        }
    }
}

/// Successful result of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResponse {
    SearchUser(SearchUserResponse),
    UpdateUser(UpdateUserResponse),
    Liveness(LivenessResponse),
    Readiness(ReadinessResponse),
    Version(VersionResponse),
}

impl OperationResponse {
    #[must_use]
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::SearchUser(_) => "SearchUser",
            Self::UpdateUser(_) => "UpdateUser",
            Self::Liveness(_) => "Liveness",
            Self::Readiness(_) => "Readiness",
            Self::Version(_) => "Version",
        }
    }

    #[must_use]
    pub fn log_fields(&self) -> Vec<Field> {
        match self {
            Self::SearchUser(resp) => resp.log_fields(),
            Self::UpdateUser(resp) => resp.log_fields(),
            Self::Liveness(resp) => resp.log_fields(),
            Self::Readiness(resp) => resp.log_fields(),
            Self::Version(resp) => resp.log_fields(),
        }
    }
}

/// Errors returned through the pipeline.
///
/// The first seven variants are domain errors. The rest are wiring failures
/// and always classify as [`ErrorKind::Internal`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("connection unavailable: {0}")]
    ConnectionUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("unknown service: {name}")]
    UnknownService { name: String },
    #[error("wrong service for operation {method}")]
    WrongService { method: &'static str },
    #[error("response mismatch: expected {expected}, got {got}")]
    ResponseMismatch {
        expected: &'static str,
        got: &'static str,
    },
}

impl OperationError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::ConnectionUnavailable(_) => ErrorKind::ConnectionUnavailable,
            Self::Internal(_)
            | Self::UnknownService { .. }
            | Self::WrongService { .. }
            | Self::ResponseMismatch { .. } => ErrorKind::Internal,
        }
    }
}

impl From<ValidationError> for OperationError {
    fn from(e: ValidationError) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::new(1, TransportKind::Http)
    }

    #[test]
    fn routing_names_follow_variant() {
        let op = Operation::UpdateUser {
            ctx: ctx(),
            request: UpdateUserRequest::default(),
        };
        assert_eq!(op.method_name(), "UpdateUser");
        assert_eq!(op.service_name(), service_names::USER);

        let op = Operation::Version {
            ctx: ctx(),
            request: VersionRequest {},
        };
        assert_eq!(op.service_name(), service_names::HEALTH);
    }

    #[test]
    fn wiring_errors_are_internal() {
        assert_eq!(
            OperationError::UnknownService { name: "x".into() }.kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            OperationError::ResponseMismatch {
                expected: "Version",
                got: "Liveness"
            }
            .kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            OperationError::NotFound("user 1".into()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn validation_error_becomes_invalid_request() {
        let err: OperationError = ValidationError::new("id", "id must be positive").into();
        assert_eq!(
            err,
            OperationError::InvalidRequest("id: id must be positive".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadline_is_internal() {
        let ctx = ctx().with_deadline(Some(Instant::now() + Duration::from_millis(10)));
        assert!(ctx.ensure_live().is_ok());

        tokio::time::advance(Duration::from_millis(20)).await;
        let err = ctx.ensure_live().unwrap_err();
        assert_eq!(err, OperationError::Internal("deadline exceeded".to_string()));
    }
}
