//! Semantic validator capability and the scoring decision around it.
//!
//! The validator is an untrusted, advisory oracle. It can refine the score of
//! a name-similarity candidate or veto it, but it is never consulted for
//! exact signals and its absence never fails a scan.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::candidates::DuplicateCandidate;
use crate::error::CoreError;
use crate::record::RecordSnapshot;

/// Payload sent to the validator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub candidate: DuplicateCandidate,
    #[serde(serialize_with = "plain_record")]
    pub record_a: RecordSnapshot,
    #[serde(serialize_with = "plain_record")]
    pub record_b: RecordSnapshot,
}

/// Records go out as `{id, entityType, fields: {name: value}}`.
fn plain_record<S: serde::Serializer>(record: &RecordSnapshot, serializer: S) -> Result<S::Ok, S::Error> {
    record.to_json().serialize(serializer)
}

/// The validator's judgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticVerdict {
    pub is_duplicate: bool,
    pub score: u8,
    pub reason: String,
}

/// An external judge of whether two records describe the same entity.
#[async_trait]
pub trait SemanticValidator: Send + Sync {
    async fn validate(&self, request: &ValidationRequest) -> Result<SemanticVerdict, CoreError>;
}

/// Call `validator` with a deadline.
///
/// Timeouts and errors both surface as [`CoreError::ValidatorUnavailable`].
/// Scores above 100 are clamped.
pub async fn validate_with_timeout(
    validator: &dyn SemanticValidator,
    request: &ValidationRequest,
    timeout: Duration,
) -> Result<SemanticVerdict, CoreError> {
    match tokio::time::timeout(timeout, validator.validate(request)).await {
        Ok(Ok(mut verdict)) => {
            verdict.score = verdict.score.min(100);
            Ok(verdict)
        }
        Ok(Err(CoreError::ValidatorUnavailable(msg))) => Err(CoreError::ValidatorUnavailable(msg)),
        Ok(Err(other)) => Err(CoreError::ValidatorUnavailable(other.to_string())),
        Err(_) => Err(CoreError::ValidatorUnavailable(format!(
            "no response within {}s",
            timeout.as_secs_f64()
        ))),
    }
}

/// What the orchestrator does with a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreDecision {
    Persist { score: u8, reason: String },
    Discard { reason: String },
}

/// Outcome of consulting the validator for one candidate.
#[derive(Debug, Clone)]
pub enum ValidatorOutcome {
    /// Validation disabled, or the candidate is an exact signal.
    NotConsulted,
    Verdict(SemanticVerdict),
    Unavailable(String),
}

/// Decide the final score and whether to persist.
///
/// - Exact signals keep their algorithmic score of 100.
/// - A "not a duplicate" verdict below `threshold` discards the candidate.
/// - Any other verdict replaces score and reason.
/// - Without a verdict the algorithmic score stands.
///
/// Nothing below `threshold` is ever persisted.
pub fn decide(candidate: &DuplicateCandidate, outcome: &ValidatorOutcome, threshold: u8) -> ScoreDecision {
    let (score, reason) = match outcome {
        ValidatorOutcome::Verdict(v) if !candidate.is_exact() => {
            if !v.is_duplicate && v.score < threshold {
                return ScoreDecision::Discard {
                    reason: format!("Semantic validator rejected the pair: {}", v.reason),
                };
            }
            (v.score, v.reason.clone())
        }
        ValidatorOutcome::Unavailable(err) if !candidate.is_exact() => (
            candidate.algorithm_score,
            format!(
                "{} (semantic validation unavailable: {err})",
                algorithmic_reason(candidate)
            ),
        ),
        _ => (candidate.algorithm_score, algorithmic_reason(candidate)),
    };

    if score >= threshold {
        ScoreDecision::Persist { score, reason }
    } else {
        ScoreDecision::Discard {
            reason: format!("Score {score} is below the persistence threshold {threshold}"),
        }
    }
}

/// Human-readable reason for an algorithmic match.
pub fn algorithmic_reason(candidate: &DuplicateCandidate) -> String {
    use crate::candidates::MatchType;
    match candidate.match_type {
        MatchType::ExactBusinessId => "Identical business identifier".to_string(),
        MatchType::ExactPhone => "Identical phone number".to_string(),
        MatchType::ExactEmail => "Identical email address".to_string(),
        MatchType::NameSimilarity => {
            format!("Name similarity {}%", candidate.algorithm_score)
        }
    }
}
