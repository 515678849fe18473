//! Operation routing and execution.
//!
//! 1. **Endpoints** (`endpoint`): typed request -> `Operation`, and back
//! 2. **Middleware** (`middleware`): metrics, logging, tracing, error reporting
//! 3. **Routing** (`router`): dispatch to domain services by service name
//! 4. **Domain services** (`domain`): guest directory and health probes
//! 5. **Classification** (`classify`): `OperationError` -> status code

pub mod classify;
pub mod domain;
pub mod endpoint;
pub mod middleware;
pub mod operation;
pub mod router;

pub use classify::{classify, classify_result, status_for_kind, CANCELLED};
pub use endpoint::{BoxOperationService, Dispatcher, Endpoint};
pub use middleware::{build_operation_pipeline, Collaborators};
pub use operation::{
    service_names, Operation, OperationError, OperationResponse, RequestContext, TransportKind,
};
pub use router::OperationRouter;
