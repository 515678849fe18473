//! Guest storage behind the [`UserStore`] trait.
//!
//! - [`memory`]: `DashMap`-backed store, optionally seeded from JSON
//! - [`postgres`]: `sqlx` store over the `users` table (feature `postgres`)

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use guestlist_core::UserRecord;

use crate::service::OperationError;

pub use memory::MemoryUserStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresUserStore;

/// Storage failures, mapped once into [`OperationError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("storage connection unavailable: {0}")]
    Connection(String),
    #[error("user {id} not found")]
    NotFound { id: u64 },
    #[error("storage error: {0}")]
    Backend(String),
}

impl From<StoreError> for OperationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Connection(_) => Self::ConnectionUnavailable(e.to_string()),
            StoreError::NotFound { .. } => Self::NotFound(e.to_string()),
            StoreError::Backend(_) => Self::Internal(e.to_string()),
        }
    }
}

/// Persistence for guest records.
///
/// Used as `Arc<dyn UserStore>`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Records whose surname contains `surname`, ignoring case, in ascending
    /// id order.
    async fn find_by_surname(&self, surname: &str) -> Result<Vec<UserRecord>, StoreError>;

    async fn find_by_id(&self, id: u64) -> Result<UserRecord, StoreError>;

    /// Overwrites the full row. Fails with `NotFound` if `record.id` is absent.
    async fn update_user(&self, record: &UserRecord) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Creates the schema if needed.
    async fn initialize(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use guestlist_core::ErrorKind;

    use super::*;

    #[test]
    fn store_errors_map_to_kinds() {
        let conn: OperationError = StoreError::Connection("refused".into()).into();
        assert_eq!(conn.kind(), ErrorKind::ConnectionUnavailable);

        let missing: OperationError = StoreError::NotFound { id: 4 }.into();
        assert_eq!(missing, OperationError::NotFound("user 4 not found".to_string()));

        let other: OperationError = StoreError::Backend("syntax".into()).into();
        assert_eq!(other.kind(), ErrorKind::Internal);
    }
}
