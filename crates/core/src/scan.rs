//! Scan orchestration: generate, filter, validate and persist candidates.
//!
//! The orchestrator is generic over a [`ScanStore`] so it can run against
//! PostgreSQL in production and an in-memory store in tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::candidates::{find_candidates, DuplicateCandidate, MatchProfile};
use crate::config::DedupConfig;
use crate::duplicate_set::NewDuplicateSet;
use crate::entity::EntityType;
use crate::error::CoreError;
use crate::record::RecordSnapshot;
use crate::types::DbId;
use crate::validator::{
    decide, validate_with_timeout, ScoreDecision, SemanticValidator, ValidationRequest,
    ValidatorOutcome,
};

// ---------------------------------------------------------------------------
// Store capability
// ---------------------------------------------------------------------------

/// Persistence operations a scan needs.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Matching keys of every live record of `entity_type`.
    async fn load_profiles(&self, entity_type: EntityType) -> Result<Vec<MatchProfile>, CoreError>;

    /// Field snapshots of every live record of `entity_type`, keyed by id.
    async fn load_snapshots(
        &self,
        entity_type: EntityType,
    ) -> Result<HashMap<DbId, RecordSnapshot>, CoreError>;

    /// The id of a `pending` or `merged` set for the unordered pair, if any.
    async fn find_open_set(
        &self,
        entity_type: EntityType,
        a: DbId,
        b: DbId,
    ) -> Result<Option<DbId>, CoreError>;

    /// Insert a pending set. Returns `None` if an open set for the pair
    /// already exists.
    async fn save_set(&self, set: &NewDuplicateSet) -> Result<Option<DbId>, CoreError>;
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Per-entity-type counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanCounts {
    pub scanned: usize,
    pub candidates: usize,
    pub saved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub organizations: Option<ScanCounts>,
    pub contacts: Option<ScanCounts>,
    pub total_saved: usize,
    pub summary: String,
}

impl ScanReport {
    pub fn counts(&self, entity_type: EntityType) -> Option<&ScanCounts> {
        match entity_type {
            EntityType::Organization => self.organizations.as_ref(),
            EntityType::Contact => self.contacts.as_ref(),
        }
    }

    fn record(&mut self, entity_type: EntityType, counts: ScanCounts) {
        self.total_saved += counts.saved;
        match entity_type {
            EntityType::Organization => self.organizations = Some(counts),
            EntityType::Contact => self.contacts = Some(counts),
        }
    }

    fn summarize(&mut self) {
        let mut parts = Vec::new();
        for entity_type in EntityType::ALL {
            if let Some(c) = self.counts(entity_type) {
                let part = match &c.error {
                    Some(err) => format!(
                        "{entity_type}s: failed after {} new sets ({err})",
                        c.saved
                    ),
                    None => format!(
                        "{entity_type}s: {} scanned, {} candidates, {} new sets",
                        c.scanned, c.candidates, c.saved
                    ),
                };
                parts.push(part);
            }
        }
        self.summary = if parts.is_empty() {
            "Nothing scanned".to_string()
        } else {
            format!("Saved {} new duplicate sets. {}", self.total_saved, parts.join("; "))
        };
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct ScanOrchestrator<S> {
    store: S,
    validator: Option<Arc<dyn SemanticValidator>>,
    config: DedupConfig,
}

impl<S: ScanStore> ScanOrchestrator<S> {
    pub fn new(store: S, validator: Option<Arc<dyn SemanticValidator>>, config: DedupConfig) -> Self {
        Self {
            store,
            validator,
            config,
        }
    }

    /// Scan each requested entity type once.
    ///
    /// A failure on one type is recorded in its counts and does not stop the
    /// others. Semantic validation is skipped when no validator is configured.
    pub async fn run(&self, entity_types: &[EntityType], use_semantic_validation: bool) -> ScanReport {
        let mut report = ScanReport::default();
        let validator = if use_semantic_validation {
            if self.validator.is_none() {
                tracing::warn!("Semantic validation requested but no validator is configured");
            }
            self.validator.as_deref()
        } else {
            None
        };

        let mut seen = Vec::with_capacity(entity_types.len());
        for &entity_type in entity_types {
            if seen.contains(&entity_type) {
                continue;
            }
            seen.push(entity_type);

            let mut counts = ScanCounts::default();
            match self.scan_type(entity_type, validator, &mut counts).await {
                Ok(()) => {
                    tracing::info!(
                        entity_type = %entity_type,
                        scanned = counts.scanned,
                        candidates = counts.candidates,
                        saved = counts.saved,
                        "Duplicate scan finished"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        entity_type = %entity_type,
                        saved = counts.saved,
                        error = %e,
                        "Duplicate scan failed"
                    );
                    counts.error = Some(e.to_string());
                }
            }
            report.record(entity_type, counts);
        }

        report.summarize();
        report
    }

    async fn scan_type(
        &self,
        entity_type: EntityType,
        validator: Option<&dyn SemanticValidator>,
        counts: &mut ScanCounts,
    ) -> Result<(), CoreError> {
        let profiles = self.store.load_profiles(entity_type).await?;
        counts.scanned = profiles.len();

        let config = self.config.clone();
        let candidates =
            tokio::task::spawn_blocking(move || find_candidates(entity_type, &profiles, &config))
                .await
                .map_err(|e| CoreError::Internal(format!("Candidate generation panicked: {e}")))?;

        counts.candidates = candidates.len();

        let mut snapshots: Option<HashMap<DbId, RecordSnapshot>> = None;

        for candidate in &candidates {
            if self
                .store
                .find_open_set(entity_type, candidate.primary_id, candidate.secondary_id)
                .await?
                .is_some()
            {
                continue;
            }

            let outcome = match validator {
                Some(v) if !candidate.is_exact() => {
                    if snapshots.is_none() {
                        snapshots = Some(self.store.load_snapshots(entity_type).await?);
                    }
                    self.consult(v, candidate, snapshots.as_ref()).await
                }
                _ => ValidatorOutcome::NotConsulted,
            };

            match decide(candidate, &outcome, self.config.persist_threshold) {
                ScoreDecision::Persist { score, reason } => {
                    let new_set = NewDuplicateSet {
                        entity_type,
                        primary_id: candidate.primary_id,
                        secondary_id: candidate.secondary_id,
                        match_type: candidate.match_type,
                        score,
                        reason,
                    };
                    if self.store.save_set(&new_set).await?.is_some() {
                        counts.saved += 1;
                    }
                }
                ScoreDecision::Discard { reason } => {
                    tracing::debug!(
                        entity_type = %entity_type,
                        primary_id = candidate.primary_id,
                        secondary_id = candidate.secondary_id,
                        %reason,
                        "Candidate discarded"
                    );
                }
            }
        }

        Ok(())
    }

    async fn consult(
        &self,
        validator: &dyn SemanticValidator,
        candidate: &DuplicateCandidate,
        snapshots: Option<&HashMap<DbId, RecordSnapshot>>,
    ) -> ValidatorOutcome {
        let records = snapshots.and_then(|m| {
            Some((
                m.get(&candidate.primary_id)?.clone(),
                m.get(&candidate.secondary_id)?.clone(),
            ))
        });
        let Some((record_a, record_b)) = records else {
            return ValidatorOutcome::Unavailable("record snapshot missing".into());
        };

        let request = ValidationRequest {
            candidate: candidate.clone(),
            record_a,
            record_b,
        };
        match validate_with_timeout(validator, &request, self.config.validator_timeout).await {
            Ok(verdict) => ValidatorOutcome::Verdict(verdict),
            Err(e) => {
                tracing::warn!(
                    primary_id = candidate.primary_id,
                    secondary_id = candidate.secondary_id,
                    error = %e,
                    "Semantic validation failed, using algorithmic score"
                );
                ValidatorOutcome::Unavailable(e.to_string())
            }
        }
    }
}
