//! Candidate generation: find probable duplicate pairs in one entity population.
//!
//! Exact signals (business id, phone, email) are bucketed by key, so their
//! cost is linear in the population plus the pairs inside each bucket. Name
//! similarity is pairwise; with [`NameBlocking::AllPairs`] it is O(n²) and
//! is the scaling limit of a scan.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{DedupConfig, NameBlocking};
use crate::entity::EntityType;
use crate::error::CoreError;
use crate::normalize::{canonical_phone, email_key, normalize};
use crate::similarity::normalized_similarity;
use crate::types::DbId;

pub const MATCH_EXACT_BUSINESS_ID: &str = "exact_business_id";
pub const MATCH_EXACT_PHONE: &str = "exact_phone";
pub const MATCH_EXACT_EMAIL: &str = "exact_email";
pub const MATCH_NAME_SIMILARITY: &str = "name_similarity";

/// Score assigned to exact signals.
pub const EXACT_MATCH_SCORE: u8 = 100;

/// The signal that flagged a pair, in descending priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ExactBusinessId,
    ExactPhone,
    ExactEmail,
    NameSimilarity,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::ExactBusinessId => MATCH_EXACT_BUSINESS_ID,
            MatchType::ExactPhone => MATCH_EXACT_PHONE,
            MatchType::ExactEmail => MATCH_EXACT_EMAIL,
            MatchType::NameSimilarity => MATCH_NAME_SIMILARITY,
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            MATCH_EXACT_BUSINESS_ID => Ok(MatchType::ExactBusinessId),
            MATCH_EXACT_PHONE => Ok(MatchType::ExactPhone),
            MATCH_EXACT_EMAIL => Ok(MatchType::ExactEmail),
            MATCH_NAME_SIMILARITY => Ok(MatchType::NameSimilarity),
            other => Err(CoreError::Validation(format!("Invalid match type '{other}'"))),
        }
    }

    pub fn is_exact(self) -> bool {
        !matches!(self, MatchType::NameSimilarity)
    }
}

/// The matching keys of one live record.
#[derive(Debug, Clone, Default)]
pub struct MatchProfile {
    pub id: DbId,
    pub name: String,
    pub identifier: Option<String>,
    pub phones: Vec<String>,
    pub email: Option<String>,
}

/// An unpersisted probable duplicate pair. `primary_id < secondary_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCandidate {
    pub entity_type: EntityType,
    pub primary_id: DbId,
    pub secondary_id: DbId,
    pub match_type: MatchType,
    pub algorithm_score: u8,
}

impl DuplicateCandidate {
    pub fn is_exact(&self) -> bool {
        self.algorithm_score >= EXACT_MATCH_SCORE
    }
}

/// Find candidate pairs among `profiles`.
///
/// Each unordered pair is reported once, at its highest-priority signal.
/// The result is sorted by `(primary_id, secondary_id)`.
pub fn find_candidates(
    entity_type: EntityType,
    profiles: &[MatchProfile],
    config: &DedupConfig,
) -> Vec<DuplicateCandidate> {
    let mut best: HashMap<(DbId, DbId), (MatchType, u8)> = HashMap::new();

    let identifier_buckets = bucket(profiles, |p| {
        p.identifier
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| vec![s.to_string()])
            .unwrap_or_default()
    });
    record_bucket_pairs(&identifier_buckets, MatchType::ExactBusinessId, &mut best);

    let phone_buckets = bucket(profiles, |p| {
        let mut keys: Vec<String> = p
            .phones
            .iter()
            .map(|raw| canonical_phone(raw, &config.phone_country_code))
            .filter(|digits| digits.len() >= config.min_phone_digits)
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    });
    record_bucket_pairs(&phone_buckets, MatchType::ExactPhone, &mut best);

    let email_buckets = bucket(profiles, |p| {
        p.email
            .as_deref()
            .map(email_key)
            .filter(|e| !e.is_empty())
            .map(|e| vec![e])
            .unwrap_or_default()
    });
    record_bucket_pairs(&email_buckets, MatchType::ExactEmail, &mut best);

    for (pair, score) in name_similarity_pairs(profiles, config) {
        offer(&mut best, pair, MatchType::NameSimilarity, score);
    }

    let mut candidates: Vec<DuplicateCandidate> = best
        .into_iter()
        .map(|((primary_id, secondary_id), (match_type, algorithm_score))| DuplicateCandidate {
            entity_type,
            primary_id,
            secondary_id,
            match_type,
            algorithm_score,
        })
        .collect();
    candidates.sort_by_key(|c| (c.primary_id, c.secondary_id));
    candidates
}

/// Group record ids by every key `keys_of` yields for them.
fn bucket<F>(profiles: &[MatchProfile], keys_of: F) -> HashMap<String, Vec<DbId>>
where
    F: Fn(&MatchProfile) -> Vec<String>,
{
    let mut buckets: HashMap<String, Vec<DbId>> = HashMap::new();
    for profile in profiles {
        for key in keys_of(profile) {
            buckets.entry(key).or_default().push(profile.id);
        }
    }
    buckets
}

fn record_bucket_pairs(
    buckets: &HashMap<String, Vec<DbId>>,
    match_type: MatchType,
    best: &mut HashMap<(DbId, DbId), (MatchType, u8)>,
) {
    for ids in buckets.values().filter(|ids| ids.len() > 1) {
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                if a != b {
                    offer(best, ordered(a, b), match_type, EXACT_MATCH_SCORE);
                }
            }
        }
    }
}

/// Keep the higher-priority signal for a pair.
fn offer(
    best: &mut HashMap<(DbId, DbId), (MatchType, u8)>,
    pair: (DbId, DbId),
    match_type: MatchType,
    score: u8,
) {
    best.entry(pair)
        .and_modify(|existing| {
            if match_type < existing.0 {
                *existing = (match_type, score);
            }
        })
        .or_insert((match_type, score));
}

fn ordered(a: DbId, b: DbId) -> (DbId, DbId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

struct NormalizedName {
    id: DbId,
    name: String,
    len: usize,
}

/// Pairs whose normalized names reach the similarity threshold.
fn name_similarity_pairs(
    profiles: &[MatchProfile],
    config: &DedupConfig,
) -> Vec<((DbId, DbId), u8)> {
    let names: Vec<NormalizedName> = profiles
        .iter()
        .map(|p| {
            let name = normalize(&p.name);
            let len = name.chars().count();
            NormalizedName { id: p.id, name, len }
        })
        .filter(|n| n.len > 0)
        .collect();

    let pools: Vec<Vec<&NormalizedName>> = match config.name_blocking {
        NameBlocking::AllPairs => vec![names.iter().collect()],
        NameBlocking::FirstChar => {
            let mut by_char: HashMap<char, Vec<&NormalizedName>> = HashMap::new();
            for n in &names {
                if let Some(c) = n.name.chars().next() {
                    by_char.entry(c).or_default().push(n);
                }
            }
            by_char.into_values().collect()
        }
    };

    let threshold = config.name_similarity_threshold;
    let mut pairs = Vec::new();

    for pool in &pools {
        for (i, a) in pool.iter().enumerate() {
            for b in &pool[i + 1..] {
                if a.id == b.id || !length_allows(a.len, b.len, threshold) {
                    continue;
                }
                let score = normalized_similarity(&a.name, &b.name);
                if score >= threshold {
                    let rounded = (score * 100.0).round().clamp(0.0, 100.0) as u8;
                    pairs.push((ordered(a.id, b.id), rounded));
                }
            }
        }
    }
    pairs
}

/// Edit distance is at least the length difference, so
/// `similarity <= min_len / max_len`.
fn length_allows(a: usize, b: usize, threshold: f64) -> bool {
    let (min, max) = if a < b { (a, b) } else { (b, a) };
    max == 0 || (min as f64 / max as f64) >= threshold
}
