//! Integration tests for review mutations and derived rating recomputation.

use dedupe_db::models::contact::CreateContact;
use dedupe_db::models::organization::CreateOrganization;
use dedupe_db::models::review::{CreateReview, UpdateReview};
use dedupe_db::repositories::{ContactRepo, OrganizationRepo, ReviewRepo};
use sqlx::PgPool;

async fn setup(pool: &PgPool) -> (i64, i64, i64) {
    let org = OrganizationRepo::create(
        pool,
        &CreateOrganization {
            name: "Acme".to_string(),
            ..CreateOrganization::default()
        },
    )
    .await
    .unwrap()
    .id;
    let mut ids = Vec::new();
    for first in ["Dana", "Yossi"] {
        let c = ContactRepo::create(
            pool,
            &CreateContact {
                organization_id: Some(org),
                first_name: first.to_string(),
                ..CreateContact::default()
            },
        )
        .await
        .unwrap();
        ids.push(c.id);
    }
    (org, ids[0], ids[1])
}

fn new_review(contact_id: i64, rating: i16) -> CreateReview {
    CreateReview {
        contact_id,
        project_id: None,
        rating,
        comment: Some("Solid work".to_string()),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_recomputes_contact_and_organization(pool: PgPool) {
    let (org, dana, yossi) = setup(&pool).await;

    ReviewRepo::create(&pool, &new_review(dana, 4), Some(1)).await.unwrap();
    ReviewRepo::create(&pool, &new_review(dana, 2), Some(1)).await.unwrap();
    ReviewRepo::create(&pool, &new_review(yossi, 5), None).await.unwrap();

    let dana_row = ContactRepo::find_by_id(&pool, dana).await.unwrap().unwrap();
    assert_eq!(dana_row.average_rating, Some(3.0));
    assert_eq!(dana_row.review_count, 2);

    // Weighted by review count: (3*2 + 5*1) / 3
    let org_row = OrganizationRepo::find_by_id(&pool, org).await.unwrap().unwrap();
    assert_eq!(org_row.review_count, 3);
    let avg = org_row.average_rating.unwrap();
    assert!((avg - 11.0 / 3.0).abs() < 1e-9);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_recomputes(pool: PgPool) {
    let (org, dana, _) = setup(&pool).await;
    let review = ReviewRepo::create(&pool, &new_review(dana, 1), None).await.unwrap();

    let updated = ReviewRepo::update(
        &pool,
        review.id,
        &UpdateReview {
            rating: Some(5),
            comment: None,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.rating, 5);
    assert_eq!(updated.comment.as_deref(), Some("Solid work"));

    let dana_row = ContactRepo::find_by_id(&pool, dana).await.unwrap().unwrap();
    assert_eq!(dana_row.average_rating, Some(5.0));
    let org_row = OrganizationRepo::find_by_id(&pool, org).await.unwrap().unwrap();
    assert_eq!(org_row.average_rating, Some(5.0));

    let missing = ReviewRepo::update(&pool, 9999, &UpdateReview::default()).await.unwrap();
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_last_review_clears_rating(pool: PgPool) {
    let (org, dana, _) = setup(&pool).await;
    let review = ReviewRepo::create(&pool, &new_review(dana, 4), None).await.unwrap();

    assert!(ReviewRepo::delete(&pool, review.id).await.unwrap());
    assert!(!ReviewRepo::delete(&pool, review.id).await.unwrap());

    let dana_row = ContactRepo::find_by_id(&pool, dana).await.unwrap().unwrap();
    assert!(dana_row.average_rating.is_none());
    assert_eq!(dana_row.review_count, 0);
    let org_row = OrganizationRepo::find_by_id(&pool, org).await.unwrap().unwrap();
    assert!(org_row.average_rating.is_none());
    assert_eq!(org_row.review_count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_out_of_range_rating_is_rejected_by_the_store(pool: PgPool) {
    let (_, dana, _) = setup(&pool).await;
    let result = ReviewRepo::create(&pool, &new_review(dana, 6), None).await;
    assert!(result.is_err());

    let dana_row = ContactRepo::find_by_id(&pool, dana).await.unwrap().unwrap();
    assert_eq!(dana_row.review_count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_creates_keep_counts_consistent(pool: PgPool) {
    let (org, dana, yossi) = setup(&pool).await;

    let mut handles = Vec::new();
    for i in 0..8i16 {
        let pool = pool.clone();
        let contact_id = if i % 2 == 0 { dana } else { yossi };
        handles.push(tokio::spawn(async move {
            ReviewRepo::create(&pool, &new_review(contact_id, i % 5 + 1), None).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for contact_id in [dana, yossi] {
        let stored = ReviewRepo::list_by_contact(&pool, contact_id).await.unwrap();
        let row = ContactRepo::find_by_id(&pool, contact_id).await.unwrap().unwrap();
        assert_eq!(row.review_count as usize, stored.len());
        assert_eq!(stored.len(), 4);
        let mean = stored.iter().map(|r| f64::from(r.rating)).sum::<f64>() / 4.0;
        assert!((row.average_rating.unwrap() - mean).abs() < 1e-9);
    }

    let org_row = OrganizationRepo::find_by_id(&pool, org).await.unwrap().unwrap();
    assert_eq!(org_row.review_count, 8);
}
