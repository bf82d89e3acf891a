//! # Game Channel Configuration
//!
//! Configuration for the channel state service.

use serde::{Deserialize, Serialize};
use std::env;

use crate::domain::STATE_UPDATE_QUEUE_SIZE;

/// Default upper bound for an encoded state proof (1 MiB).
pub const DEFAULT_MAX_PROOF_BYTES: u64 = 1024 * 1024;

/// Game channel configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Game id that signatures are bound to.
    pub game_id: String,

    /// Capacity of the queue for updates of unknown reinitialisations.
    pub update_queue_capacity: usize,

    /// Maximum size of an encoded state proof received off-chain.
    pub max_proof_bytes: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            game_id: "game".to_string(),
            update_queue_capacity: STATE_UPDATE_QUEUE_SIZE,
            max_proof_bytes: DEFAULT_MAX_PROOF_BYTES,
        }
    }
}

impl ChannelConfig {
    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self {
            game_id: "add".to_string(),
            update_queue_capacity: 8,
            max_proof_bytes: 64 * 1024,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            game_id: lookup("QC_CHANNEL_GAME_ID").unwrap_or(defaults.game_id),

            update_queue_capacity: lookup("QC_CHANNEL_UPDATE_QUEUE_SIZE")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.update_queue_capacity),

            max_proof_bytes: lookup("QC_CHANNEL_MAX_PROOF_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_proof_bytes),
        }
    }
}
