//! Typed entry points into the operation pipeline.
//!
//! [`Endpoint`] converts a typed request into an [`Operation`] and casts the
//! pipeline's [`OperationResponse`] back. [`Dispatcher`] owns the composed
//! pipeline and is shared by both transports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use guestlist_core::{
    LivenessRequest, LivenessResponse, ReadinessRequest, ReadinessResponse, SearchUserRequest,
    SearchUserResponse, UpdateUserRequest, UpdateUserResponse, Validate, VersionRequest,
    VersionResponse,
};
use parking_lot::Mutex;
use tower::util::BoxCloneService;
use tower::ServiceExt;

use super::operation::{Operation, OperationError, OperationResponse, RequestContext};

/// The composed pipeline, type-erased.
pub type BoxOperationService = BoxCloneService<Operation, OperationResponse, OperationError>;

/// A typed request accepted by the pipeline.
pub trait Endpoint: Validate + Send + 'static {
    type Response: Send + 'static;

    /// Method name, matching `Operation::method_name()`.
    const METHOD: &'static str;

    fn into_operation(self, ctx: RequestContext) -> Operation;

    /// # Errors
    ///
    /// [`OperationError::ResponseMismatch`] when the pipeline answered with
    /// another method's response.
    fn from_response(resp: OperationResponse) -> Result<Self::Response, OperationError>;
}

macro_rules! endpoint {
    ($request:ty => $response:ty, $variant:ident) => {
        impl Endpoint for $request {
            type Response = $response;
            const METHOD: &'static str = stringify!($variant);

            fn into_operation(self, ctx: RequestContext) -> Operation {
                Operation::$variant { ctx, request: self }
            }

            fn from_response(resp: OperationResponse) -> Result<$response, OperationError> {
                match resp {
                    OperationResponse::$variant(inner) => Ok(inner),
                    other => Err(OperationError::ResponseMismatch {
                        expected: Self::METHOD,
                        got: other.method_name(),
                    }),
                }
            }
        }
    };
}

endpoint!(SearchUserRequest => SearchUserResponse, SearchUser);
endpoint!(UpdateUserRequest => UpdateUserResponse, UpdateUser);
endpoint!(LivenessRequest => LivenessResponse, Liveness);
endpoint!(ReadinessRequest => ReadinessResponse, Readiness);
endpoint!(VersionRequest => VersionResponse, Version);

/// Shared handle to the pipeline. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<Mutex<BoxOperationService>>,
    call_ids: Arc<AtomicU64>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(service: BoxOperationService) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            call_ids: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Next call id. Ids start at 1 and are unique per dispatcher.
    #[must_use]
    pub fn next_call_id(&self) -> u64 {
        self.call_ids.fetch_add(1, Ordering::Relaxed)
    }

    /// Runs one operation through the pipeline.
    ///
    /// # Errors
    ///
    /// Whatever the pipeline returns.
    pub async fn dispatch(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        let svc = self.service.lock().clone();
        svc.oneshot(op).await
    }

    /// Dispatches a typed request without validating it.
    ///
    /// # Errors
    ///
    /// Pipeline errors, or `ResponseMismatch` on a miswired pipeline.
    pub async fn call<E: Endpoint>(
        &self,
        ctx: RequestContext,
        request: E,
    ) -> Result<E::Response, OperationError> {
        let resp = self.dispatch(request.into_operation(ctx)).await?;
        E::from_response(resp).inspect_err(|e| {
            tracing::error!(method = E::METHOD, error = %e, "pipeline returned the wrong response");
        })
    }

    /// Validates, then dispatches. A request that fails validation never
    /// reaches the pipeline.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` on validation failure, otherwise as [`Self::call`].
    pub async fn serve<E: Endpoint>(
        &self,
        ctx: RequestContext,
        request: E,
    ) -> Result<E::Response, OperationError> {
        if let Err(e) = request.validate() {
            tracing::warn!(
                target: "guestlist::access",
                method = E::METHOD,
                call_id = ctx.call_id,
                transport = ctx.transport.as_str(),
                error = %e,
                "request rejected"
            );
            return Err(e.into());
        }
        self.call(ctx, request).await
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("next_call_id", &self.call_ids.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
