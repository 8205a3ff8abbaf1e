//! PostgreSQL implementation of the scan orchestrator's store.

use std::collections::HashMap;

use async_trait::async_trait;
use dedupe_core::candidates::MatchProfile;
use dedupe_core::duplicate_set::NewDuplicateSet;
use dedupe_core::entity::EntityType;
use dedupe_core::error::CoreError;
use dedupe_core::record::RecordSnapshot;
use dedupe_core::scan::ScanStore;
use dedupe_core::types::DbId;
use sqlx::PgPool;

use crate::repositories::{ContactRepo, DuplicateSetRepo, OrganizationRepo};

/// [`ScanStore`] backed by the live tables and the `duplicate_sets` ledger.
#[derive(Clone)]
pub struct PgScanStore {
    pool: PgPool,
}

impl PgScanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(err: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("Database error: {err}"))
}

#[async_trait]
impl ScanStore for PgScanStore {
    async fn load_profiles(&self, entity_type: EntityType) -> Result<Vec<MatchProfile>, CoreError> {
        let profiles = match entity_type {
            EntityType::Organization => OrganizationRepo::list(&self.pool)
                .await
                .map_err(store_error)?
                .iter()
                .map(|o| o.match_profile())
                .collect(),
            EntityType::Contact => ContactRepo::list(&self.pool)
                .await
                .map_err(store_error)?
                .iter()
                .map(|c| c.match_profile())
                .collect(),
        };
        Ok(profiles)
    }

    async fn load_snapshots(
        &self,
        entity_type: EntityType,
    ) -> Result<HashMap<DbId, RecordSnapshot>, CoreError> {
        let snapshots = match entity_type {
            EntityType::Organization => OrganizationRepo::list(&self.pool)
                .await
                .map_err(store_error)?
                .iter()
                .map(|o| (o.id, RecordSnapshot::capture(entity_type, o.id, o)))
                .collect(),
            EntityType::Contact => ContactRepo::list(&self.pool)
                .await
                .map_err(store_error)?
                .iter()
                .map(|c| (c.id, RecordSnapshot::capture(entity_type, c.id, c)))
                .collect(),
        };
        Ok(snapshots)
    }

    async fn find_open_set(
        &self,
        entity_type: EntityType,
        a: DbId,
        b: DbId,
    ) -> Result<Option<DbId>, CoreError> {
        DuplicateSetRepo::find_open_set(&self.pool, entity_type, a, b)
            .await
            .map(|set| set.map(|s| s.id))
            .map_err(store_error)
    }

    async fn save_set(&self, set: &NewDuplicateSet) -> Result<Option<DbId>, CoreError> {
        DuplicateSetRepo::create(&self.pool, set)
            .await
            .map(|created| created.map(|s| s.id))
            .map_err(store_error)
    }
}
