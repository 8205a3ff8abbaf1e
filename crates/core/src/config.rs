//! Tunable thresholds for duplicate detection.
//!
//! All values have defaults matching production behaviour and may be
//! overridden through environment variables.

use std::time::Duration;

use serde::Serialize;

use crate::error::CoreError;

/// Minimum final score (0-100) for a candidate to be persisted.
pub const DEFAULT_PERSIST_THRESHOLD: u8 = 70;
/// Minimum normalized-name similarity (0-1) for a name candidate.
pub const DEFAULT_NAME_SIMILARITY_THRESHOLD: f64 = 0.85;
/// Shorter digit strings are never treated as an exact phone match.
pub const DEFAULT_MIN_PHONE_DIGITS: usize = 9;
pub const DEFAULT_PHONE_COUNTRY_CODE: &str = "972";
pub const DEFAULT_VALIDATOR_TIMEOUT_SECS: u64 = 10;

pub const MIN_NAME_SIMILARITY_THRESHOLD: f64 = 0.50;
pub const MAX_NAME_SIMILARITY_THRESHOLD: f64 = 1.00;

/// How the candidate generator restricts pairwise name comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameBlocking {
    /// Compare every pair. O(n²); practical up to tens of thousands of records.
    AllPairs,
    /// Compare only names sharing the first normalized character. Misses
    /// typos in the first letter.
    FirstChar,
}

impl NameBlocking {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "all_pairs" => Ok(NameBlocking::AllPairs),
            "first_char" => Ok(NameBlocking::FirstChar),
            other => Err(CoreError::Validation(format!(
                "Invalid name blocking '{other}'. Must be one of: all_pairs, first_char"
            ))),
        }
    }
}

/// Duplicate detection configuration shared by the scan orchestrator and the
/// candidate generator.
#[derive(Debug, Clone, Serialize)]
pub struct DedupConfig {
    pub persist_threshold: u8,
    pub name_similarity_threshold: f64,
    pub min_phone_digits: usize,
    pub phone_country_code: String,
    pub name_blocking: NameBlocking,
    #[serde(skip)]
    pub validator_timeout: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            persist_threshold: DEFAULT_PERSIST_THRESHOLD,
            name_similarity_threshold: DEFAULT_NAME_SIMILARITY_THRESHOLD,
            min_phone_digits: DEFAULT_MIN_PHONE_DIGITS,
            phone_country_code: DEFAULT_PHONE_COUNTRY_CODE.to_string(),
            name_blocking: NameBlocking::AllPairs,
            validator_timeout: Duration::from_secs(DEFAULT_VALIDATOR_TIMEOUT_SECS),
        }
    }
}

impl DedupConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                             | Default     |
    /// |-------------------------------------|-------------|
    /// | `DEDUP_PERSIST_THRESHOLD`           | `70`        |
    /// | `DEDUP_NAME_SIMILARITY_THRESHOLD`   | `0.85`      |
    /// | `DEDUP_MIN_PHONE_DIGITS`            | `9`         |
    /// | `DEDUP_PHONE_COUNTRY_CODE`          | `972`       |
    /// | `DEDUP_NAME_BLOCKING`               | `all_pairs` |
    /// | `SEMANTIC_VALIDATOR_TIMEOUT_SECS`   | `10`        |
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();

        let config = Self {
            persist_threshold: env_parse("DEDUP_PERSIST_THRESHOLD", defaults.persist_threshold)?,
            name_similarity_threshold: env_parse(
                "DEDUP_NAME_SIMILARITY_THRESHOLD",
                defaults.name_similarity_threshold,
            )?,
            min_phone_digits: env_parse("DEDUP_MIN_PHONE_DIGITS", defaults.min_phone_digits)?,
            phone_country_code: std::env::var("DEDUP_PHONE_COUNTRY_CODE")
                .unwrap_or(defaults.phone_country_code),
            name_blocking: match std::env::var("DEDUP_NAME_BLOCKING") {
                Ok(value) => NameBlocking::parse(value.trim())?,
                Err(_) => defaults.name_blocking,
            },
            validator_timeout: Duration::from_secs(env_parse(
                "SEMANTIC_VALIDATOR_TIMEOUT_SECS",
                DEFAULT_VALIDATOR_TIMEOUT_SECS,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range thresholds.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.persist_threshold > 100 {
            return Err(CoreError::Validation(format!(
                "Persist threshold must be between 0 and 100, got {}",
                self.persist_threshold
            )));
        }
        if !(MIN_NAME_SIMILARITY_THRESHOLD..=MAX_NAME_SIMILARITY_THRESHOLD)
            .contains(&self.name_similarity_threshold)
        {
            return Err(CoreError::Validation(format!(
                "Name similarity threshold must be between {MIN_NAME_SIMILARITY_THRESHOLD} and {MAX_NAME_SIMILARITY_THRESHOLD}, got {}",
                self.name_similarity_threshold
            )));
        }
        if self.min_phone_digits == 0 {
            return Err(CoreError::Validation(
                "Minimum phone digits must be at least 1".into(),
            ));
        }
        if !self.phone_country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::Validation(format!(
                "Phone country code must contain only digits, got '{}'",
                self.phone_country_code
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, CoreError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{key} has an invalid value: '{raw}'"))),
        Err(_) => Ok(default),
    }
}
