//! Data models for grants-ai
//!
//! Wire shapes follow the indexer's GraphQL payload (camelCase) and the
//! classifier's `save_features` arguments (snake_case).

pub mod application;
pub mod features;
pub mod rounds;

pub use application::{
    Answer, Application, ApplicationMetadata, ApplicationSubmission, Eligibility,
    EligibilityRequirement, Project, Round, RoundMetadata,
};
pub use features::{EnrichedApplication, Features, ProjectAge, TeamSize, UsersCount};
pub use rounds::{RoundRef, GITCOIN_GRANTS_ROUNDS};

use serde::{Deserialize, Deserializer};

/// Treat an explicit JSON `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept a number, a numeric string, or null for USD amounts
///
/// The indexer has reported amounts both ways across schema versions.
pub(crate) fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Option::<Amount>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(Amount::Number(n)) => Ok(n),
        Some(Amount::Text(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Amount::Text(s)) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}
