//! # Outbound Ports
//!
//! Capabilities the game channel consumes but does not implement: the
//! game's board rules and the blockchain's message-signature verification.

use std::fmt;
use std::sync::Arc;

use crate::domain::{BoardMove, BoardState, ChannelId, ChannelMetadata, ChannelProtoVersion, StateProof};

/// A board state parsed by the game's rules.
///
/// Holds the metadata of the epoch it belongs to. That must be the very
/// `Arc` owned by the epoch entry, never a copy.
pub trait ParsedBoardState: fmt::Debug + Send + Sync {
    /// Metadata of the channel epoch this state was parsed under.
    fn metadata(&self) -> &Arc<ChannelMetadata>;

    /// Number of turns played so far; the freshness metric.
    fn turn_count(&self) -> u32;

    /// Index of the participant to move next, `None` if nobody can move.
    fn whose_turn(&self) -> Option<usize>;

    /// Whether `other` encodes the same state as this one.
    fn equals(&self, other: &BoardState) -> bool;

    /// Apply a move made by the current player.
    ///
    /// Returns `None` if the move is invalid.
    fn apply_move(&self, board_move: &BoardMove) -> Option<BoardState>;

    /// Game-specific JSON representation for state export.
    fn to_json(&self) -> serde_json::Value;
}

/// Game rules - outbound port.
pub trait BoardRules: Send + Sync {
    /// Parse a concrete board state in the context of a channel epoch.
    ///
    /// Returns `None` if the state is invalid.
    fn parse_state(
        &self,
        channel_id: &ChannelId,
        meta: &Arc<ChannelMetadata>,
        state: &BoardState,
    ) -> Option<Box<dyn ParsedBoardState>>;

    /// Whether the rules understand channels of the given version.
    fn supports_version(&self, version: ChannelProtoVersion) -> bool {
        version == ChannelProtoVersion::Original
    }

    /// Whether `proof` is acceptable for a channel with metadata `meta`.
    fn check_version(&self, meta: &ChannelMetadata, _proof: &StateProof) -> bool {
        self.supports_version(meta.proto_version)
    }
}

/// Message signature verification - outbound port.
pub trait SignatureVerifier: Send + Sync {
    /// Recover the address that produced `signature` over `message`.
    ///
    /// Returns `None` if the signature is not valid for any address.
    fn recover_signer(&self, message: &str, signature: &[u8]) -> Option<String>;
}

impl<T: BoardRules + ?Sized> BoardRules for Arc<T> {
    fn parse_state(
        &self,
        channel_id: &ChannelId,
        meta: &Arc<ChannelMetadata>,
        state: &BoardState,
    ) -> Option<Box<dyn ParsedBoardState>> {
        (**self).parse_state(channel_id, meta, state)
    }

    fn supports_version(&self, version: ChannelProtoVersion) -> bool {
        (**self).supports_version(version)
    }

    fn check_version(&self, meta: &ChannelMetadata, proof: &StateProof) -> bool {
        (**self).check_version(meta, proof)
    }
}

impl<T: SignatureVerifier + ?Sized> SignatureVerifier for Arc<T> {
    fn recover_signer(&self, message: &str, signature: &[u8]) -> Option<String> {
        (**self).recover_signer(message, signature)
    }
}
