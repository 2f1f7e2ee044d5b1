//! HTTP mapping for [`charpool::Error`].
//!
//! Validation failures are the caller's fault (4xx); store faults are ours and
//! map to `503 Service Unavailable` so clients know to retry later.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use charpool::Error;
use serde::Serialize;

use crate::server::telemetry::increment_errors;

/// An error returned from a route handler.
#[derive(Debug)]
pub enum ApiError {
    /// The allocation subsystem refused or failed the request.
    Charpool(Error),
    /// The request body was missing, malformed, or had the wrong shape.
    InvalidBody(JsonRejection),
    /// The blocking store task panicked or was cancelled.
    TaskFailed(String),
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Charpool(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection)
    }
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Charpool(Error::InvalidIdentityCode { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_identity_code")
            }
            Self::Charpool(Error::UnknownParticipant { .. }) => {
                (StatusCode::NOT_FOUND, "unknown_participant")
            }
            Self::Charpool(Error::PoolExhausted { .. }) => (StatusCode::CONFLICT, "pool_exhausted"),
            Self::Charpool(Error::InvalidAlphabet { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invalid_alphabet")
            }
            Self::Charpool(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            Self::InvalidBody(rejection) => (rejection.status(), "invalid_body"),
            Self::TaskFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "task_failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status();
        increment_errors(kind);

        let message = match self {
            Self::Charpool(err) => err.to_string(),
            Self::InvalidBody(rejection) => rejection.body_text(),
            Self::TaskFailed(context) => format!("internal error: {context}"),
        };

        if status.is_server_error() {
            tracing::error!(%status, kind, "{message}");
        } else {
            tracing::debug!(%status, kind, "{message}");
        }

        let body = ErrorBody {
            ok: false,
            error: message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_statuses() {
        let cases = [
            (
                Error::InvalidIdentityCode {
                    len: 3,
                    expected: 5,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Error::UnknownParticipant {
                    code: "00001".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (Error::PoolExhausted { pool_size: 3 }, StatusCode::CONFLICT),
            (
                Error::store_unavailable("disk full"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (Error::LockPoisoned, StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }
}
