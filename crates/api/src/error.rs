use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dedupe_core::error::CoreError;
use serde::Serialize;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Error type returned by every handler.
///
/// Domain failures arrive as [`CoreError`]; repositories that do not run in a
/// domain transaction surface raw [`sqlx::Error`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// JSON body of every error response.
///
/// `retryable` appears only on rolled-back transactions.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

impl ErrorBody {
    fn new(code: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            retryable: false,
        }
    }

    fn internal() -> Self {
        Self::new("INTERNAL_ERROR", INTERNAL_MESSAGE)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Core(err) => from_core(err),
            AppError::Database(err) => from_sqlx(err),
        };
        (status, axum::Json(body)).into_response()
    }
}

fn from_core(err: &CoreError) -> (StatusCode, ErrorBody) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            ErrorBody::new(
                "NOT_FOUND",
                format!("{entity} with id {id} not found; the record may have been deleted"),
            ),
        ),
        CoreError::AlreadyResolved { .. } => (
            StatusCode::CONFLICT,
            ErrorBody::new("ALREADY_RESOLVED", err.to_string()),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new("VALIDATION_FAILED", msg)),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new("CONFLICT", msg)),
        CoreError::TransactionFailed(msg) => {
            tracing::error!(error = %msg, "Transaction rolled back");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    retryable: true,
                    ..ErrorBody::new(
                        "TRANSACTION_FAILED",
                        "The operation was rolled back; it is safe to retry",
                    )
                },
            )
        }
        // Scans recover from this themselves; reaching here means a caller
        // asked the validator directly.
        CoreError::ValidatorUnavailable(msg) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorBody::new("VALIDATOR_UNAVAILABLE", msg),
        ),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorBody::new("UNAUTHORIZED", msg)),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorBody::new("FORBIDDEN", msg)),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
        }
    }
}

/// Map a sqlx error to a response.
///
/// Missing rows are 404, unique violations on `uq_*` constraints are 409,
/// foreign key violations are 400. Anything else is logged and hidden
/// behind a 500.
fn from_sqlx(err: &sqlx::Error) -> (StatusCode, ErrorBody) {
    if let sqlx::Error::RowNotFound = err {
        return (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", "Resource not found"));
    }

    if let sqlx::Error::Database(db_err) = err {
        let constraint = db_err.constraint().unwrap_or("unknown");
        match db_err.code().as_deref() {
            Some("23505") if constraint.starts_with("uq_") => {
                return (
                    StatusCode::CONFLICT,
                    ErrorBody::new(
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    ),
                );
            }
            Some("23503") => {
                return (
                    StatusCode::BAD_REQUEST,
                    ErrorBody::new(
                        "VALIDATION_FAILED",
                        format!("Referenced record does not exist ({constraint})"),
                    ),
                );
            }
            _ => {}
        }
    }

    tracing::error!(error = %err, "Database error");
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal())
}
