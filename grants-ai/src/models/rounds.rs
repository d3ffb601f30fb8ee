//! Funding round identifiers

use grants_common::config::RoundEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one funding round on one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundRef {
    pub chain_id: u64,
    pub round_id: u64,
}

impl RoundRef {
    pub const fn new(chain_id: u64, round_id: u64) -> Self {
        Self { chain_id, round_id }
    }

    /// Cache key holding this round's raw application list
    pub fn applications_key(&self) -> String {
        format!("applications:{}:{}", self.chain_id, self.round_id)
    }
}

impl fmt::Display for RoundRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.round_id)
    }
}

impl From<RoundEntry> for RoundRef {
    fn from(entry: RoundEntry) -> Self {
        Self::new(entry.chain_id, entry.round_id)
    }
}

/// Gitcoin Grants rounds tracked by default (Arbitrum One and Optimism)
pub const GITCOIN_GRANTS_ROUNDS: [RoundRef; 9] = [
    RoundRef::new(42161, 26),
    RoundRef::new(42161, 27),
    RoundRef::new(42161, 25),
    RoundRef::new(42161, 23),
    RoundRef::new(42161, 29),
    RoundRef::new(42161, 24),
    RoundRef::new(42161, 31),
    RoundRef::new(42161, 28),
    RoundRef::new(10, 9),
];
