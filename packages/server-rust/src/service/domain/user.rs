//! Guest directory: search by surname and check-in updates.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use guestlist_core::{
    SearchUserRequest, SearchUserResponse, UpdateUserRequest, UpdateUserResponse,
};
use tower::Service;

use crate::service::operation::{Operation, OperationError, OperationResponse, RequestContext};
use crate::storage::UserStore;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Case-insensitive substring search. An empty surname returns no
    /// records without touching storage.
    ///
    /// # Errors
    ///
    /// Storage failures, or an expired deadline.
    pub async fn search_user(
        &self,
        ctx: &RequestContext,
        request: SearchUserRequest,
    ) -> Result<SearchUserResponse, OperationError> {
        if request.surname.is_empty() {
            return Ok(SearchUserResponse::found(Vec::new()));
        }
        ctx.ensure_live()?;
        let data = self.store.find_by_surname(&request.surname).await?;
        Ok(SearchUserResponse::found(data))
    }

    /// Overwrites `covid_pass` and `checkin` of an existing guest.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a non-positive id or missing data, `NotFound` for an unknown
    /// id, otherwise storage failures.
    pub async fn update_user(
        &self,
        ctx: &RequestContext,
        request: UpdateUserRequest,
    ) -> Result<UpdateUserResponse, OperationError> {
        let Some(id) = request.record_id() else {
            return Err(OperationError::InvalidRequest("id must be positive".to_string()));
        };
        let Some(data) = request.data else {
            return Err(OperationError::InvalidRequest("data is required".to_string()));
        };
        ctx.ensure_live()?;

        let mut record = self.store.find_by_id(id).await?;
        record.covid_pass = data.covid_pass;
        record.checkin = data.checkin;
        self.store.update_user(&record).await?;

        Ok(UpdateUserResponse::ok())
    }
}

impl Service<Operation> for UserService {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let svc = self.clone();
        Box::pin(async move {
            match op {
                Operation::SearchUser { ctx, request } => svc
                    .search_user(&ctx, request)
                    .await
                    .map(OperationResponse::SearchUser),
                Operation::UpdateUser { ctx, request } => svc
                    .update_user(&ctx, request)
                    .await
                    .map(OperationResponse::UpdateUser),
                other => Err(OperationError::WrongService {
                    method: other.method_name(),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use guestlist_core::{ErrorKind, UpdateData, UserRecord, VersionRequest};
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::TransportKind;
    use crate::storage::{MemoryUserStore, StoreError};

    fn ctx() -> RequestContext {
        RequestContext::new(1, TransportKind::Http)
    }

    fn guest(id: u64, surname: &str) -> UserRecord {
        UserRecord {
            id,
            status: "confirmed".to_string(),
            company: "Acme".to_string(),
            surname: surname.to_string(),
            name: "Pat".to_string(),
            guest: "vip".to_string(),
            covid_pass: String::new(),
            rank: String::new(),
            contact_phone: "+100".to_string(),
            contact_mail: "pat@example.com".to_string(),
            checkin: false,
        }
    }

    fn seeded() -> Arc<MemoryUserStore> {
        Arc::new(MemoryUserStore::with_records([
            guest(1, "Smith"),
            guest(2, "Smithson"),
            guest(3, "Jones"),
        ]))
    }

    /// Counts every storage call and delegates to a memory store.
    struct CountingStore {
        inner: MemoryUserStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UserStore for CountingStore {
        async fn find_by_surname(&self, surname: &str) -> Result<Vec<UserRecord>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_surname(surname).await
        }

        async fn find_by_id(&self, id: u64) -> Result<UserRecord, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_id(id).await
        }

        async fn update_user(&self, record: &UserRecord) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.update_user(record).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn search(surname: &str) -> SearchUserRequest {
        SearchUserRequest {
            surname: surname.to_string(),
        }
    }

    fn update(id: i64, covid_pass: &str, checkin: bool) -> UpdateUserRequest {
        UpdateUserRequest {
            id,
            data: Some(UpdateData {
                covid_pass: covid_pass.to_string(),
                checkin,
            }),
        }
    }

    #[tokio::test]
    async fn search_matches_prefix_family_in_id_order() {
        let svc = UserService::new(seeded());
        let resp = svc.search_user(&ctx(), search("smith")).await.unwrap();

        assert!(resp.status.status);
        assert_eq!(resp.status.message, "OK");
        let surnames: Vec<&str> = resp.data.iter().map(|r| r.surname.as_str()).collect();
        assert_eq!(surnames, vec!["Smith", "Smithson"]);
    }

    #[tokio::test]
    async fn search_ignores_case() {
        let svc = UserService::new(seeded());
        let resp = svc.search_user(&ctx(), search("JONES")).await.unwrap();
        assert_eq!(resp.data.len(), 1);
        assert_eq!(resp.data[0].id, 3);
    }

    #[tokio::test]
    async fn empty_surname_skips_storage() {
        let store = Arc::new(CountingStore {
            inner: MemoryUserStore::with_records([guest(1, "Smith")]),
            calls: AtomicUsize::new(0),
        });
        let svc = UserService::new(store.clone());

        let resp = svc.search_user(&ctx(), search("")).await.unwrap();
        assert!(resp.status.status);
        assert!(resp.data.is_empty());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_changes_only_pass_and_checkin() {
        let store = seeded();
        let svc = UserService::new(store.clone());
        let before = store.find_by_id(2).await.unwrap();

        let resp = svc.update_user(&ctx(), update(2, "PASS-9", true)).await.unwrap();
        assert!(resp.status.status);

        let after = store.find_by_id(2).await.unwrap();
        assert_eq!(after.covid_pass, "PASS-9");
        assert!(after.checkin);
        assert_eq!(
            UserRecord {
                covid_pass: before.covid_pass.clone(),
                checkin: before.checkin,
                ..after
            },
            before
        );
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found_and_changes_nothing() {
        let store = seeded();
        let svc = UserService::new(store.clone());
        let snapshot = store.find_by_surname("").await.unwrap();

        let err = svc.update_user(&ctx(), update(99, "X", true)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.find_by_surname("").await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn update_zero_id_is_invalid_request() {
        let svc = UserService::new(seeded());
        let err = svc.update_user(&ctx(), update(0, "X", true)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn update_negative_id_is_invalid_request() {
        let svc = UserService::new(seeded());
        let err = svc.update_user(&ctx(), update(-5, "X", true)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn connection_failure_is_connection_unavailable() {
        let store = seeded();
        store.set_available(false);
        let svc = UserService::new(store);

        let err = svc.search_user(&ctx(), search("smith")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionUnavailable);
    }

    #[tokio::test]
    async fn health_operations_are_rejected() {
        let svc = UserService::new(seeded());
        let op = Operation::Version {
            ctx: ctx(),
            request: VersionRequest {},
        };
        let err = svc.oneshot(op).await.unwrap_err();
        assert_eq!(err, OperationError::WrongService { method: "Version" });
    }
}
