//! # Mock Implementations for Testing
//!
//! A tiny "addition" game and a hash-based signature scheme, enough to
//! drive the channel logic end to end without a real game or chain.
//!
//! ## Addition Game
//!
//! A state is `"<number> <count>"`. A move is a positive integer added to
//! the number; each move increments the count. Player `count % 2` is to
//! move until the number reaches 100, after which nobody can move.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::outbound::{BoardRules, ParsedBoardState, SignatureVerifier};
use crate::algorithms::{channel_signature_message, STATE_TOPIC};
use crate::domain::{
    BoardMove, BoardState, ChannelId, ChannelMetadata, ChannelProtoVersion, SignedData,
    StateProof, StateTransition,
};

/// Number at which the addition game ends.
pub const ADDITION_GAME_END: u32 = 100;

/// Rules of the addition game.
#[derive(Clone, Debug, Default)]
pub struct AdditionRules {
    /// Accept channels using the extended protocol version too.
    pub extended: bool,
}

impl AdditionRules {
    /// Rules that also accept extended-version channels.
    pub fn with_extended_support() -> Self {
        Self { extended: true }
    }
}

fn parse_numbers(state: &BoardState) -> Option<(u32, u32)> {
    let text = std::str::from_utf8(state.as_bytes()).ok()?;
    let mut parts = text.split_whitespace();
    let number = parts.next()?.parse().ok()?;
    let count = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((number, count))
}

impl BoardRules for AdditionRules {
    fn parse_state(
        &self,
        _channel_id: &ChannelId,
        meta: &Arc<ChannelMetadata>,
        state: &BoardState,
    ) -> Option<Box<dyn ParsedBoardState>> {
        let (number, count) = parse_numbers(state)?;
        Some(Box::new(AdditionState {
            meta: Arc::clone(meta),
            number,
            count,
        }))
    }

    fn supports_version(&self, version: ChannelProtoVersion) -> bool {
        match version {
            ChannelProtoVersion::Original => true,
            ChannelProtoVersion::Extended => self.extended,
        }
    }
}

/// Parsed addition-game state.
#[derive(Clone, Debug)]
pub struct AdditionState {
    meta: Arc<ChannelMetadata>,
    number: u32,
    count: u32,
}

impl ParsedBoardState for AdditionState {
    fn metadata(&self) -> &Arc<ChannelMetadata> {
        &self.meta
    }

    fn turn_count(&self) -> u32 {
        self.count
    }

    fn whose_turn(&self) -> Option<usize> {
        if self.number >= ADDITION_GAME_END {
            return None;
        }
        Some((self.count % 2) as usize)
    }

    fn equals(&self, other: &BoardState) -> bool {
        parse_numbers(other) == Some((self.number, self.count))
    }

    fn apply_move(&self, board_move: &BoardMove) -> Option<BoardState> {
        let text = std::str::from_utf8(board_move.as_bytes()).ok()?;
        let add: u32 = text.trim().parse().ok()?;
        if add == 0 {
            return None;
        }
        let number = self.number.checked_add(add)?;
        let count = self.count.checked_add(1)?;
        Some(BoardState::from(format!("{} {}", number, count)))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "number": self.number,
            "count": self.count,
        })
    }
}

fn digest_hex(message: &str) -> String {
    hex::encode(Sha256::digest(message.as_bytes()))
}

/// Signs messages as `"<address>:<hex sha256(message)>"`.
#[derive(Clone, Debug)]
pub struct MockSigner {
    address: String,
}

impl MockSigner {
    /// Signer for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Signature over `message`.
    pub fn sign(&self, message: &str) -> Vec<u8> {
        format!("{}:{}", self.address, digest_hex(message)).into_bytes()
    }
}

/// Verifies signatures produced by [`MockSigner`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MockSignatureVerifier;

impl SignatureVerifier for MockSignatureVerifier {
    fn recover_signer(&self, message: &str, signature: &[u8]) -> Option<String> {
        let text = std::str::from_utf8(signature).ok()?;
        let (address, digest) = text.rsplit_once(':')?;
        (digest == digest_hex(message)).then(|| address.to_string())
    }
}

/// Assembles state proofs signed with [`MockSigner`] for one epoch.
#[derive(Clone, Debug)]
pub struct ProofBuilder {
    game_id: String,
    channel_id: ChannelId,
    meta: Arc<ChannelMetadata>,
    proof: StateProof,
}

impl ProofBuilder {
    /// Empty proof for the epoch described by `meta`.
    pub fn new(game_id: impl Into<String>, channel_id: ChannelId, meta: Arc<ChannelMetadata>) -> Self {
        Self {
            game_id: game_id.into(),
            channel_id,
            meta,
            proof: StateProof::default(),
        }
    }

    /// `state` signed by each of `signers` (addresses).
    pub fn signed(&self, state: &str, signers: &[&str]) -> SignedData {
        let data = BoardState::from(state);
        let message = channel_signature_message(
            &self.game_id,
            &self.channel_id,
            &self.meta,
            STATE_TOPIC,
            data.as_bytes(),
        );
        let signatures = signers
            .iter()
            .map(|address| MockSigner::new(*address).sign(&message))
            .collect();
        SignedData { data, signatures }
    }

    /// Set the initial state.
    pub fn initial(mut self, state: &str, signers: &[&str]) -> Self {
        self.proof.initial_state = self.signed(state, signers);
        self
    }

    /// Append a move and the state it leads to.
    pub fn transition(mut self, board_move: &str, new_state: &str, signers: &[&str]) -> Self {
        let new_state = self.signed(new_state, signers);
        self.proof.transitions.push(StateTransition {
            board_move: BoardMove::from(board_move),
            new_state,
        });
        self
    }

    /// Finished proof.
    pub fn build(self) -> StateProof {
        self.proof
    }
}
