//! Integration tests for the duplicate set ledger and the Postgres scan store.

use assert_matches::assert_matches;
use dedupe_core::candidates::MatchType;
use dedupe_core::config::DedupConfig;
use dedupe_core::duplicate_set::{DuplicateSetStatus, NewDuplicateSet};
use dedupe_core::entity::EntityType;
use dedupe_core::error::CoreError;
use dedupe_core::scan::ScanOrchestrator;
use dedupe_db::models::contact::CreateContact;
use dedupe_db::models::duplicate_set::DuplicateSetFilter;
use dedupe_db::models::organization::CreateOrganization;
use dedupe_db::repositories::{ContactRepo, DuplicateSetRepo, OrganizationRepo};
use dedupe_db::scan_store::PgScanStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_set(a: i64, b: i64) -> NewDuplicateSet {
    NewDuplicateSet {
        entity_type: EntityType::Organization,
        primary_id: a,
        secondary_id: b,
        match_type: MatchType::NameSimilarity,
        score: 91,
        reason: "Name similarity 91%".to_string(),
    }
}

async fn org(pool: &PgPool, name: &str) -> i64 {
    OrganizationRepo::create(
        pool,
        &CreateOrganization {
            name: name.to_string(),
            ..CreateOrganization::default()
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_orders_pair_and_find_open_set_is_unordered(pool: PgPool) {
    let set = DuplicateSetRepo::create(&pool, &new_set(9, 4))
        .await
        .unwrap()
        .expect("first insert creates a set");
    assert_eq!(set.primary_id, 4);
    assert_eq!(set.secondary_id, 9);
    assert_eq!(set.status, "pending");
    assert_eq!(set.score, 91);
    assert!(!set.can_undo);

    let found = DuplicateSetRepo::find_open_set(&pool, EntityType::Organization, 9, 4)
        .await
        .unwrap();
    assert_eq!(found.map(|s| s.id), Some(set.id));

    let other_type = DuplicateSetRepo::find_open_set(&pool, EntityType::Contact, 4, 9)
        .await
        .unwrap();
    assert!(other_type.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_second_open_set_for_pair_is_ignored(pool: PgPool) {
    assert!(DuplicateSetRepo::create(&pool, &new_set(1, 2)).await.unwrap().is_some());
    assert!(DuplicateSetRepo::create(&pool, &new_set(2, 1)).await.unwrap().is_none());

    let all = DuplicateSetRepo::list(&pool, &DuplicateSetFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rejected_pair_can_be_flagged_again(pool: PgPool) {
    let set = DuplicateSetRepo::create(&pool, &new_set(1, 2))
        .await
        .unwrap()
        .unwrap();
    let rejected = DuplicateSetRepo::update_status(&pool, set.id, DuplicateSetStatus::Rejected, Some(3))
        .await
        .unwrap();
    assert_eq!(rejected.status, "rejected");
    assert_eq!(rejected.reviewed_by_id, Some(3));
    assert!(rejected.reviewed_at.is_some());

    assert!(DuplicateSetRepo::find_open_set(&pool, EntityType::Organization, 1, 2)
        .await
        .unwrap()
        .is_none());
    assert!(DuplicateSetRepo::create(&pool, &new_set(1, 2)).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_status_only_from_pending(pool: PgPool) {
    let set = DuplicateSetRepo::create(&pool, &new_set(1, 2))
        .await
        .unwrap()
        .unwrap();
    DuplicateSetRepo::update_status(&pool, set.id, DuplicateSetStatus::Skipped, None)
        .await
        .unwrap();

    let again = DuplicateSetRepo::update_status(&pool, set.id, DuplicateSetStatus::Rejected, None).await;
    assert_matches!(again, Err(CoreError::AlreadyResolved { status, .. }) if status == "skipped");

    let merged = DuplicateSetRepo::update_status(&pool, set.id, DuplicateSetStatus::Merged, None).await;
    assert_matches!(merged, Err(CoreError::Validation(_)));

    let missing = DuplicateSetRepo::update_status(&pool, 9999, DuplicateSetStatus::Rejected, None).await;
    assert_matches!(missing, Err(CoreError::NotFound { id: 9999, .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_filters_and_counts(pool: PgPool) {
    let a = DuplicateSetRepo::create(&pool, &new_set(1, 2)).await.unwrap().unwrap();
    DuplicateSetRepo::create(&pool, &new_set(3, 4)).await.unwrap().unwrap();
    DuplicateSetRepo::create(
        &pool,
        &NewDuplicateSet {
            entity_type: EntityType::Contact,
            ..new_set(1, 2)
        },
    )
    .await
    .unwrap()
    .unwrap();
    DuplicateSetRepo::update_status(&pool, a.id, DuplicateSetStatus::Rejected, None)
        .await
        .unwrap();

    let pending_orgs = DuplicateSetRepo::list(
        &pool,
        &DuplicateSetFilter {
            entity_type: Some("organization".into()),
            status: Some("pending".into()),
            ..DuplicateSetFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(pending_orgs.len(), 1);
    assert_eq!(pending_orgs[0].primary_id, 3);

    let page = DuplicateSetRepo::list(
        &pool,
        &DuplicateSetFilter {
            limit: Some(2),
            ..DuplicateSetFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(page.len(), 2);

    let counts = DuplicateSetRepo::counts_by_status(&pool).await.unwrap();
    let count = |entity: &str, status: &str| {
        counts
            .iter()
            .find(|c| c.entity_type == entity && c.status == status)
            .map(|c| c.count)
            .unwrap_or(0)
    };
    assert_eq!(count("organization", "pending"), 1);
    assert_eq!(count("organization", "rejected"), 1);
    assert_eq!(count("contact", "pending"), 1);
}

// ---------------------------------------------------------------------------
// Scan against the database
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_scan_persists_candidates_once(pool: PgPool) {
    let acme = org(&pool, "Acme Ltd").await;
    let acme2 = org(&pool, "acme").await;
    org(&pool, "Globex Corporation").await;

    for (first, phone) in [("Dana", "+972-50-1234567"), ("Yossi", "0501234567")] {
        ContactRepo::create(
            &pool,
            &CreateContact {
                first_name: first.to_string(),
                phone: Some(phone.to_string()),
                ..CreateContact::default()
            },
        )
        .await
        .unwrap();
    }

    let scanner = ScanOrchestrator::new(PgScanStore::new(pool.clone()), None, DedupConfig::default());
    let report = scanner.run(&EntityType::ALL, false).await;

    assert_eq!(report.total_saved, 2);
    let orgs = report.organizations.as_ref().unwrap();
    assert_eq!(orgs.scanned, 3);
    assert_eq!(orgs.saved, 1);
    assert_eq!(report.contacts.as_ref().unwrap().saved, 1);

    let set = DuplicateSetRepo::find_open_set(&pool, EntityType::Organization, acme, acme2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(set.match_type, "name_similarity");
    assert_eq!(set.score, 100);

    let contact_sets = DuplicateSetRepo::list(
        &pool,
        &DuplicateSetFilter {
            entity_type: Some("contact".into()),
            ..DuplicateSetFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(contact_sets[0].match_type, "exact_phone");

    let rescan = scanner.run(&EntityType::ALL, false).await;
    assert_eq!(rescan.total_saved, 0);
}
