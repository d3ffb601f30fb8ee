//! Grants indexer client
//!
//! One GraphQL POST per round, filtered server-side to approved
//! applications. Results come back in indexer order.

use crate::models::{Application, RoundRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_INDEXER_URL: &str = "https://grants-stack-indexer-v2.gitcoin.co";
const USER_AGENT: &str = concat!("grants-ai/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Indexer client errors
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("GraphQL error: {0}")]
    GraphQlError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Anything that can supply a round's approved applications
#[async_trait]
pub trait ApplicationSource: Send + Sync {
    async fn fetch_applications(&self, round: RoundRef) -> Result<Vec<Application>, IndexerError>;
}

#[derive(Debug, Serialize)]
struct GraphQlRequest {
    query: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ApplicationsData>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ApplicationsData {
    #[serde(default)]
    applications: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// Query selecting every approved application of one round
pub fn build_applications_query(round: RoundRef) -> String {
    format!(
        r#"
        query {{
          applications(filter: {{
            chainId: {{ equalTo: {chain_id} }}
            roundId: {{ equalTo: "{round_id}" }}
            status: {{ equalTo: APPROVED }}
          }}) {{
            id
            chainId
            roundId
            projectId
            metadata
            totalAmountDonatedInUsd
            totalDonationsCount
            round {{
              id
              chainId
              roundMetadata
              matchAmountInUsd
              applicationMetadata
            }}
          }}
        }}
        "#,
        chain_id = round.chain_id,
        round_id = round.round_id,
    )
}

/// HTTP client for the grants indexer GraphQL endpoint
pub struct IndexerClient {
    http_client: reqwest::Client,
    graphql_url: String,
}

impl IndexerClient {
    pub fn new(base_url: &str) -> Result<Self, IndexerError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| IndexerError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            graphql_url: format!("{}/graphql", base_url.trim_end_matches('/')),
        })
    }

    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }
}

#[async_trait]
impl ApplicationSource for IndexerClient {
    async fn fetch_applications(&self, round: RoundRef) -> Result<Vec<Application>, IndexerError> {
        tracing::info!(round = %round, "Fetching applications for round");

        let request = GraphQlRequest {
            query: build_applications_query(round),
        };

        let response = self
            .http_client
            .post(&self.graphql_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| IndexerError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(IndexerError::ApiError(status.as_u16(), error_text));
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| IndexerError::ParseError(e.to_string()))?;

        let applications = decode_applications(round, body)?;

        tracing::info!(
            round = %round,
            count = applications.len(),
            "Fetched applications from indexer"
        );

        Ok(applications)
    }
}

/// Turn a GraphQL body into applications
///
/// Errors without data fail the round. Individual records that do not
/// decode are skipped with a warning so one bad submission does not hide
/// the rest of the round.
fn decode_applications(
    round: RoundRef,
    body: GraphQlResponse,
) -> Result<Vec<Application>, IndexerError> {
    let data = match body.data {
        Some(data) => data,
        None => {
            let message = if body.errors.is_empty() {
                "response contained no data".to_string()
            } else {
                body.errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            return Err(IndexerError::GraphQlError(message));
        }
    };

    if !body.errors.is_empty() {
        tracing::warn!(
            round = %round,
            errors = body.errors.len(),
            "Indexer returned partial data with errors"
        );
    }

    let mut applications = Vec::with_capacity(data.applications.len());
    for raw in data.applications {
        let id = raw.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
        match serde_json::from_value::<Application>(raw) {
            Ok(app) => applications.push(app),
            Err(e) => {
                tracing::warn!(round = %round, application_id = %id, error = %e, "Skipping undecodable application");
            }
        }
    }

    Ok(applications)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::fixtures::application_json;
    use serde_json::json;

    fn body(value: Value) -> GraphQlResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = IndexerClient::new("https://indexer.example/");
        assert!(client.is_ok());
        assert_eq!(client.unwrap().graphql_url(), "https://indexer.example/graphql");
    }

    #[test]
    fn test_query_filters_round_and_status() {
        let query = build_applications_query(RoundRef::new(42161, 26));

        assert!(query.contains("chainId: { equalTo: 42161 }"));
        assert!(query.contains(r#"roundId: { equalTo: "26" }"#));
        assert!(query.contains("status: { equalTo: APPROVED }"));
        assert!(query.contains("applicationMetadata"));
    }

    #[test]
    fn test_request_body_shape() {
        let request = GraphQlRequest {
            query: "query { x }".to_string(),
        };
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"query": "query { x }"}));
    }

    #[test]
    fn test_decode_keeps_indexer_order() {
        let response = body(json!({
            "data": {"applications": [
                application_json(10, 9, "2", "Beta"),
                application_json(10, 9, "1", "Alpha"),
            ]}
        }));

        let apps = decode_applications(RoundRef::new(10, 9), response).unwrap();
        let ids: Vec<_> = apps.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn test_decode_skips_malformed_record() {
        let response = body(json!({
            "data": {"applications": [
                application_json(10, 9, "1", "Alpha"),
                {"id": "broken", "chainId": "not a number"},
            ]}
        }));

        let apps = decode_applications(RoundRef::new(10, 9), response).unwrap();
        assert_eq!(apps.len(), 1);
    }

    #[test]
    fn test_decode_errors_without_data_fail_round() {
        let response = body(json!({
            "data": null,
            "errors": [{"message": "rate limited"}, {"message": "try later"}]
        }));

        let result = decode_applications(RoundRef::new(10, 9), response);
        match result {
            Err(IndexerError::GraphQlError(message)) => {
                assert_eq!(message, "rate limited; try later");
            }
            other => panic!("expected GraphQlError, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_round() {
        let response = body(json!({"data": {"applications": []}}));
        let apps = decode_applications(RoundRef::new(10, 9), response).unwrap();
        assert!(apps.is_empty());
    }
}
