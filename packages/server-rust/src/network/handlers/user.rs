//! `GET /user/search` and `PUT /user`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use guestlist_core::{SearchUserRequest, SearchUserResponse, UpdateUserRequest, UpdateUserResponse};

use super::{serve, AppState, HttpError, HttpInfo};
use crate::service::OperationError;

/// Query decode failures are `InvalidArgument`.
pub async fn search_user_handler(
    State(state): State<AppState>,
    info: HttpInfo,
    query: Result<Query<SearchUserRequest>, QueryRejection>,
) -> Result<Json<SearchUserResponse>, HttpError> {
    let Query(request) =
        query.map_err(|e| OperationError::InvalidArgument(e.body_text()))?;
    serve(&state, info, request).await
}

/// Body decode failures are `BadRequest`.
pub async fn update_user_handler(
    State(state): State<AppState>,
    info: HttpInfo,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UpdateUserResponse>, HttpError> {
    let Json(request) = body.map_err(|e| OperationError::BadRequest(e.body_text()))?;
    serve(&state, info, request).await
}
