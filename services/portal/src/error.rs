use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cqrs_es::AggregateError;
use order_domain::Error;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    Domain(Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Domain(err)
    }
}

impl From<AggregateError<Error>> for ApiError {
    fn from(err: AggregateError<Error>) -> Self {
        match err {
            AggregateError::UserError(e) => Self::Domain(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Domain(Error::Validation(e)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "warning": e.to_string() }))
            }
            ApiError::Domain(e @ Error::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, json!({ "error": e.to_string() }))
            }
            ApiError::Domain(e @ (Error::InvalidStateTransition { .. } | Error::Uniqueness { .. })) => {
                (StatusCode::CONFLICT, json!({ "error": e.to_string() }))
            }
            ApiError::Domain(
                e @ (Error::PaymentNotConfirmed | Error::UnsupportedPrescription { .. }),
            ) => (StatusCode::BAD_REQUEST, json!({ "error": e.to_string() })),
            ApiError::Domain(e @ Error::ReceiptUnavailable) => {
                (StatusCode::GONE, json!({ "error": e.to_string() }))
            }
            ApiError::Domain(e @ Error::Rendering { .. }) => {
                tracing::error!("Receipt rendering failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
