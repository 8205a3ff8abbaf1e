//! HTTP client for the external semantic validator.
//!
//! [`HttpSemanticValidator`] posts `{candidate, recordA, recordB}` to the
//! configured URL and expects `{isDuplicate, score, reason}` back. Every
//! failure becomes [`CoreError::ValidatorUnavailable`]; the scan then falls
//! back to the algorithmic score.

use std::time::Duration;

use async_trait::async_trait;
use dedupe_core::error::CoreError;
use dedupe_core::validator::{SemanticValidator, SemanticVerdict, ValidationRequest};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ValidatorError {
    /// Network, DNS, timeout, or body decoding failure.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Validator returned HTTP {0}")]
    HttpStatus(u16),
}

impl From<ValidatorError> for CoreError {
    fn from(err: ValidatorError) -> Self {
        CoreError::ValidatorUnavailable(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// HttpSemanticValidator
// ---------------------------------------------------------------------------

pub struct HttpSemanticValidator {
    client: reqwest::Client,
    url: String,
}

impl HttpSemanticValidator {
    /// Build a client whose requests give up after `timeout`.
    ///
    /// The scan applies its own deadline as well; this one stops the
    /// connection from lingering after the scan has moved on.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn send(&self, request: &ValidationRequest) -> Result<SemanticVerdict, ValidatorError> {
        let response = self.client.post(&self.url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(ValidatorError::HttpStatus(response.status().as_u16()));
        }
        Ok(response.json::<SemanticVerdict>().await?)
    }
}

#[async_trait]
impl SemanticValidator for HttpSemanticValidator {
    async fn validate(&self, request: &ValidationRequest) -> Result<SemanticVerdict, CoreError> {
        Ok(self.send(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use dedupe_core::candidates::{DuplicateCandidate, MatchType};
    use dedupe_core::entity::EntityType;
    use dedupe_core::record::RecordSnapshot;

    use super::*;

    fn request() -> ValidationRequest {
        let record = |id| RecordSnapshot {
            entity_type: EntityType::Organization,
            id,
            fields: Default::default(),
        };
        ValidationRequest {
            candidate: DuplicateCandidate {
                entity_type: EntityType::Organization,
                primary_id: 1,
                secondary_id: 2,
                match_type: MatchType::NameSimilarity,
                algorithm_score: 88,
            },
            record_a: record(1),
            record_b: record(2),
        }
    }

    /// Serve `router` on an ephemeral port and return its URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/validate")
    }

    #[tokio::test]
    async fn parses_verdict_and_sends_camel_case_payload() {
        let router = Router::new().route(
            "/validate",
            post(|Json(body): Json<serde_json::Value>| async move {
                let seen_candidate = body["candidate"]["primaryId"] == 1
                    && body["recordA"]["id"] == 1
                    && body["recordB"]["id"] == 2;
                Json(serde_json::json!({
                    "isDuplicate": seen_candidate,
                    "score": 91,
                    "reason": "same registered address",
                }))
            }),
        );
        let url = serve(router).await;

        let validator = HttpSemanticValidator::new(url, Duration::from_secs(5)).unwrap();
        let verdict = validator.validate(&request()).await.unwrap();
        assert!(verdict.is_duplicate);
        assert_eq!(verdict.score, 91);
        assert_eq!(verdict.reason, "same registered address");
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let router = Router::new().route(
            "/validate",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let url = serve(router).await;

        let validator = HttpSemanticValidator::new(url, Duration::from_secs(5)).unwrap();
        let err = validator.validate(&request()).await.unwrap_err();
        assert_matches!(err, CoreError::ValidatorUnavailable(msg) if msg.contains("500"));
    }

    #[tokio::test]
    async fn malformed_body_is_unavailable() {
        let router = Router::new().route("/validate", post(|| async { "not json" }));
        let url = serve(router).await;

        let validator = HttpSemanticValidator::new(url, Duration::from_secs(5)).unwrap();
        assert_matches!(
            validator.validate(&request()).await,
            Err(CoreError::ValidatorUnavailable(_))
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let validator =
            HttpSemanticValidator::new(format!("http://{addr}/validate"), Duration::from_secs(2))
                .unwrap();
        assert_matches!(
            validator.validate(&request()).await,
            Err(CoreError::ValidatorUnavailable(_))
        );
    }
}
