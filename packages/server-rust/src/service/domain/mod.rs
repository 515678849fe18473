//! Core domain services.
//!
//! Each service implements `tower::Service<Operation>` for the operations
//! routed to its service name and rejects the rest with
//! `OperationError::WrongService`.

pub mod health;
pub mod user;

pub use health::{BuildInfo, HealthService};
pub use user::UserService;
