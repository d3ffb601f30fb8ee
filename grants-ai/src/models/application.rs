//! Indexer application and round records

use super::{null_as_default, number_or_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One approved application as returned by the indexer
///
/// Overwritten wholesale each refresh cycle; never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub chain_id: u64,
    /// GraphQL exposes round ids as strings
    pub round_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ApplicationMetadata,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_amount_donated_in_usd: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_donations_count: u64,
    pub round: Round,
}

impl Application {
    /// Composite key unique across chain, round and application id
    pub fn ref_id(&self) -> String {
        format!("{}:{}:{}", self.chain_id, self.round_id, self.id)
    }

    /// Cache key holding this application's classifier features
    pub fn features_key(&self) -> String {
        format!(
            "application:{}:{}:{}:features",
            self.chain_id, self.round_id, self.id
        )
    }

    pub fn project(&self) -> &Project {
        &self.metadata.application.project
    }

    pub fn title(&self) -> &str {
        &self.metadata.application.project.title
    }

    /// Question/answer pairs that were submitted in clear text
    pub fn plain_answers(&self) -> impl Iterator<Item = (&str, String)> {
        self.metadata
            .application
            .answers
            .iter()
            .filter_map(|answer| match answer {
                Answer::Plain { question, answer } => {
                    Some((question.as_str(), answer_text(answer)))
                }
                Answer::Encrypted { .. } => None,
            })
    }
}

/// Flatten an answer value into prompt text
///
/// Multiple-choice answers arrive as arrays of strings.
fn answer_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub application: ApplicationSubmission,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    #[serde(default, deserialize_with = "null_as_default")]
    pub answers: Vec<Answer>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project: Project,
}

/// A round-form answer, either readable or encrypted for the round operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Plain {
        #[serde(default, deserialize_with = "null_as_default")]
        question: String,
        answer: Value,
    },
    Encrypted {
        #[serde(default, deserialize_with = "null_as_default")]
        question: String,
        #[serde(rename = "encryptedAnswer")]
        encrypted_answer: Value,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logo_img: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub banner_img: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_github: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_github: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_twitter: String,
}

/// Round record embedded in every application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: String,
    pub chain_id: u64,
    #[serde(default, deserialize_with = "number_or_string")]
    pub match_amount_in_usd: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub round_metadata: RoundMetadata,
    /// Round form definition, passed through untouched
    #[serde(default)]
    pub application_metadata: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub eligibility: Eligibility,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requirements: Vec<EligibilityRequirement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRequirement {
    #[serde(default, deserialize_with = "null_as_default")]
    pub requirement: String,
}
