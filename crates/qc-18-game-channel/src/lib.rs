//! # QC-18 Game Channels
//!
//! Rolling off-chain state reconciliation for turn-based game channels.
//!
//! **Subsystem ID:** 18
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Participants of a channel play mostly off-chain, exchanging signed
//! state proofs directly, and anchor progress on-chain for settlement and
//! disputes. This crate merges both streams into one best-known state per
//! channel:
//! - On-chain updates, already confirmed by consensus, select the current
//!   reinitialisation and can never be rejected quietly
//! - Off-chain updates from peers are verified and applied only if fresher
//! - Updates for reinitialisations not seen on-chain yet wait in a bounded
//!   queue and are replayed once the reinitialisation appears
//!
//! ## Security Features
//!
//! | Defense | Description |
//! |---------|-------------|
//! | Signature binding | Signatures cover game, channel, reinit and topic |
//! | Turn-based signing | Each move must be signed by the player who made it |
//! | Strict freshness | Only strictly higher turn counts replace the latest state |
//! | Bounded queue | At most 100 pending updates for unknown reinitialisations |
//! | Fail-fast invariants | Corrupt on-chain data aborts instead of being tracked |
//!
//! ## Module Structure
//!
//! ```text
//! qc-18-game-channel/
//! ├── domain/          # RollingState, StateUpdateQueue, value objects, errors
//! ├── algorithms/      # Signature messages, state proof verification
//! ├── ports/           # API trait (inbound) + board rules, signatures (outbound)
//! ├── application/     # ChannelStateService owning the lock
//! ├── adapters/        # JSON state export, bincode proof codec
//! └── config.rs        # ChannelConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{channel_state_json, decode_state_proof, encode_state_proof};
pub use algorithms::{
    channel_signature_message, check_versioned_proof, verify_participant_signatures,
    verify_state_proof, verify_state_transition,
};
pub use application::ChannelStateService;
pub use config::ChannelConfig;
pub use domain::{
    BoardMove, BoardState, ChannelId, ChannelMetadata, ChannelProtoVersion, InvariantViolation,
    Participant, ReinitEntry, ReinitId, RejectedUpdate, RollingState, SignedData, StateProof,
    StateTransition, StateUpdateQueue, STATE_UPDATE_QUEUE_SIZE,
};
pub use ports::{BoardRules, ChannelStateApi, ParsedBoardState, SignatureVerifier};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
