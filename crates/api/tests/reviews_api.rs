//! HTTP-level tests for review mutations and rating recomputation.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, post_json, put_json, viewer_token};
use dedupe_db::models::contact::CreateContact;
use dedupe_db::models::organization::CreateOrganization;
use dedupe_db::repositories::{ContactRepo, OrganizationRepo};
use sqlx::PgPool;

async fn contact_in_org(pool: &PgPool) -> (i64, i64) {
    let org = OrganizationRepo::create(
        pool,
        &CreateOrganization {
            name: "Umbrella".to_string(),
            ..CreateOrganization::default()
        },
    )
    .await
    .unwrap();
    let contact = ContactRepo::create(
        pool,
        &CreateContact {
            organization_id: Some(org.id),
            first_name: "Noa".to_string(),
            ..CreateContact::default()
        },
    )
    .await
    .unwrap();
    (contact.id, org.id)
}

async fn create_review(pool: &PgPool, contact_id: i64, rating: i64) -> axum::response::Response {
    post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/reviews",
        &viewer_token(),
        serde_json::json!({"contact_id": contact_id, "rating": rating, "comment": "ok"}),
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_review_lifecycle_recomputes_ratings(pool: PgPool) {
    let (contact_id, org_id) = contact_in_org(&pool).await;

    let response = create_review(&pool, contact_id, 4).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let review = body_json(response).await["data"].clone();
    assert_eq!(review["author_id"], 8);
    let review_id = review["id"].as_i64().unwrap();
    create_review(&pool, contact_id, 2).await;

    let contact = ContactRepo::find_by_id(&pool, contact_id).await.unwrap().unwrap();
    assert_eq!(contact.average_rating, Some(3.0));
    assert_eq!(contact.review_count, 2);
    let org = OrganizationRepo::find_by_id(&pool, org_id).await.unwrap().unwrap();
    assert_eq!(org.average_rating, Some(3.0));
    assert_eq!(org.review_count, 2);

    let response = put_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/reviews/{review_id}"),
        &viewer_token(),
        serde_json::json!({"rating": 5}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let contact = ContactRepo::find_by_id(&pool, contact_id).await.unwrap().unwrap();
    assert_eq!(contact.average_rating, Some(3.5));

    let response = delete(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/reviews/{review_id}"),
        &viewer_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let org = OrganizationRepo::find_by_id(&pool, org_id).await.unwrap().unwrap();
    assert_eq!(org.average_rating, Some(2.0));
    assert_eq!(org.review_count, 1);

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/contacts/{contact_id}/reviews"),
        &viewer_token(),
    )
    .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = delete(
        common::build_test_app(pool),
        &format!("/api/v1/reviews/{review_id}"),
        &viewer_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_out_of_range_rating_is_rejected(pool: PgPool) {
    let (contact_id, _) = contact_in_org(&pool).await;
    let response = create_review(&pool, contact_id, 6).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_FAILED");

    let contact = ContactRepo::find_by_id(&pool, contact_id).await.unwrap().unwrap();
    assert_eq!(contact.review_count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_review_of_missing_contact_is_not_found(pool: PgPool) {
    let response = create_review(&pool, 999_999, 3).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_missing_review_is_not_found(pool: PgPool) {
    let response = put_json(
        common::build_test_app(pool),
        "/api/v1/reviews/999999",
        &viewer_token(),
        serde_json::json!({"comment": "late"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
