//! Error classification: maps pipeline outcomes to transport status codes.
//!
//! Every decorator and both transports consult this table, so an error is
//! labelled the same way in logs, metrics, reports and responses.

use guestlist_core::ErrorKind;
use http::StatusCode;

use super::operation::{OperationError, OperationResponse};

/// Label for a call dropped before it produced a result, e.g. by a
/// transport timeout or a client disconnect. Never sent on the wire.
pub const CANCELLED: u16 = 499;

/// Status code for one error kind.
#[must_use]
pub const fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument | ErrorKind::AlreadyExists | ErrorKind::BadRequest => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidRequest => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ConnectionUnavailable | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `None` is success.
#[must_use]
pub fn classify(error: Option<&OperationError>) -> StatusCode {
    error.map_or(StatusCode::OK, |e| status_for_kind(e.kind()))
}

#[must_use]
pub fn classify_result(result: &Result<OperationResponse, OperationError>) -> StatusCode {
    classify(result.as_ref().err())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_ok() {
        assert_eq!(classify(None), StatusCode::OK);
    }

    #[test]
    fn classification_table() {
        let cases = [
            (OperationError::InvalidArgument("x".into()), 400),
            (OperationError::AlreadyExists("x".into()), 400),
            (OperationError::BadRequest("x".into()), 400),
            (OperationError::NotFound("x".into()), 404),
            (OperationError::InvalidRequest("x".into()), 422),
            (OperationError::ConnectionUnavailable("x".into()), 500),
            (OperationError::Internal("x".into()), 500),
            (OperationError::UnknownService { name: "x".into() }, 500),
            (OperationError::WrongService { method: "Version" }, 500),
            (
                OperationError::ResponseMismatch {
                    expected: "SearchUser",
                    got: "Version",
                },
                500,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(classify(Some(&err)).as_u16(), code, "{err}");
        }
    }

    #[test]
    fn result_form_matches_option_form() {
        let err: Result<OperationResponse, OperationError> =
            Err(OperationError::NotFound("user 3".into()));
        assert_eq!(classify_result(&err), StatusCode::NOT_FOUND);
    }
}
