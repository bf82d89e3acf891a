//! # Inbound Ports
//!
//! API trait defining what a game channel exposes to the rest of the node:
//! the blockchain sync layer, the peer transport and state export.

use async_trait::async_trait;

use crate::domain::{BoardState, ChannelMetadata, RejectedUpdate, ReinitId, StateProof};

/// Game Channel API - inbound port.
///
/// Both update calls return `changed`, the only signal callers should use
/// to decide whether to rebroadcast or notify.
#[async_trait]
pub trait ChannelStateApi: Send + Sync {
    /// Feed a confirmed on-chain state of the channel.
    ///
    /// Aborts if the data violates a channel invariant.
    async fn on_chain_update(
        &self,
        meta: ChannelMetadata,
        reinit_state: BoardState,
        proof: StateProof,
    ) -> bool;

    /// Feed a state proof received off-chain from a peer.
    async fn off_chain_move(&self, reinit: ReinitId, proof: StateProof) -> bool;

    /// Feed a bincode-encoded state proof received off-chain.
    async fn off_chain_encoded_move(
        &self,
        reinit: ReinitId,
        encoded: &[u8],
    ) -> Result<bool, RejectedUpdate>;

    /// Owned JSON export of the current best-known state.
    fn snapshot(&self) -> serde_json::Value;

    /// Version counter, bumped on every change.
    fn current_version(&self) -> u64;

    /// Wait until the version differs from `known_version`.
    ///
    /// Returns immediately if it already does.
    async fn wait_for_change(&self, known_version: u64) -> u64;
}
