//! `AppError` to HTTP response mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use dedupe_api::error::AppError;
use dedupe_core::error::CoreError;
use http_body_util::BodyExt;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn not_found_mentions_possible_deletion() {
    let (status, json) = error_to_response(AppError::Core(CoreError::NotFound {
        entity: "contact",
        id: 42,
    }))
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(
        json["error"],
        "contact with id 42 not found; the record may have been deleted"
    );
}

#[tokio::test]
async fn already_resolved_is_409() {
    let (status, json) = error_to_response(AppError::Core(CoreError::AlreadyResolved {
        set_id: 3,
        status: "merged".into(),
    }))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "ALREADY_RESOLVED");
    assert!(json.get("retryable").is_none());
}

#[tokio::test]
async fn transaction_failure_is_retryable_503() {
    let (status, json) = error_to_response(AppError::Core(CoreError::TransactionFailed(
        "connection reset".into(),
    )))
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "TRANSACTION_FAILED");
    assert_eq!(json["retryable"], true);
    assert!(!json["error"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn validation_is_400() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Validation("bad field".into()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_FAILED");
    assert_eq!(json["error"], "bad field");
}

#[tokio::test]
async fn undo_conflict_is_409() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Conflict("master changed".into()))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn auth_errors_map_to_401_and_403() {
    let (status, _) =
        error_to_response(AppError::Core(CoreError::Unauthorized("no token".into()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) =
        error_to_response(AppError::Core(CoreError::Forbidden("viewer".into()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn internal_errors_are_sanitized() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Internal("secret detail".into()))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn row_not_found_is_404() {
    let (status, _) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
