//! Operation routing: dispatches `Operation` to domain services by service name.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::util::BoxCloneService;
use tower::{Service, ServiceExt};

use super::operation::{Operation, OperationError, OperationResponse};

type DomainService = BoxCloneService<Operation, OperationResponse, OperationError>;

/// Routes `Operation` values to the domain service registered under
/// `Operation::service_name()`.
///
/// Unregistered names fail with `OperationError::UnknownService`.
#[derive(Clone, Default)]
pub struct OperationRouter {
    services: HashMap<&'static str, DomainService>,
}

impl OperationRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a domain service, replacing any previous one under `name`.
    pub fn register<S>(&mut self, name: &'static str, service: S)
    where
        S: Service<Operation, Response = OperationResponse, Error = OperationError>
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        self.services.insert(name, BoxCloneService::new(service));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }
}

impl Service<Operation> for OperationRouter {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness is checked per call on the selected service.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let service_name = op.service_name();
        match self.services.get(service_name) {
            Some(svc) => Box::pin(svc.clone().oneshot(op)),
            None => Box::pin(async move {
                Err(OperationError::UnknownService {
                    name: service_name.to_string(),
                })
            }),
        }
    }
}
