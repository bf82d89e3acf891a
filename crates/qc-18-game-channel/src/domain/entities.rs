//! # Domain Entities
//!
//! Per-epoch bookkeeping of a channel.

use std::sync::Arc;

use super::value_objects::{BoardState, ChannelMetadata, StateProof};
use crate::ports::ParsedBoardState;

/// Everything known about one reinitialisation of a channel.
///
/// The metadata and reinit state are fixed when the entry is created. The
/// proof and parsed state move forward as fresher updates arrive.
#[derive(Debug)]
pub struct ReinitEntry {
    /// Metadata of this epoch, shared with `latest_state`.
    meta: Arc<ChannelMetadata>,
    /// State the epoch started from on-chain.
    reinit_state: BoardState,
    /// Latest accepted proof.
    proof: StateProof,
    /// `proof` applied to `reinit_state`.
    latest_state: Box<dyn ParsedBoardState>,
    /// Highest turn count confirmed on-chain.
    on_chain_turn: u32,
}

impl ReinitEntry {
    /// Create an entry from its first, on-chain confirmed, state.
    pub fn new(
        meta: Arc<ChannelMetadata>,
        reinit_state: BoardState,
        proof: StateProof,
        latest_state: Box<dyn ParsedBoardState>,
    ) -> Self {
        let on_chain_turn = latest_state.turn_count();
        Self {
            meta,
            reinit_state,
            proof,
            latest_state,
            on_chain_turn,
        }
    }

    /// Metadata of the epoch, shared with its parsed states.
    pub fn metadata(&self) -> &Arc<ChannelMetadata> {
        &self.meta
    }

    /// State the epoch was reinitialised with on-chain.
    pub fn reinit_state(&self) -> &BoardState {
        &self.reinit_state
    }

    /// Proof of the latest tracked state.
    pub fn proof(&self) -> &StateProof {
        &self.proof
    }

    /// Latest tracked state, parsed.
    pub fn latest_state(&self) -> &dyn ParsedBoardState {
        self.latest_state.as_ref()
    }

    /// Highest turn count confirmed on-chain.
    pub fn on_chain_turn(&self) -> u32 {
        self.on_chain_turn
    }

    /// Turn count of the latest tracked state.
    pub fn turn_count(&self) -> u32 {
        self.latest_state.turn_count()
    }

    /// Replace the latest proof and its parsed state.
    pub(crate) fn replace_latest(&mut self, proof: StateProof, parsed: Box<dyn ParsedBoardState>) {
        self.proof = proof;
        self.latest_state = parsed;
    }

    /// Record an on-chain confirmation; never lowers the confirmed turn.
    pub(crate) fn confirm_turn(&mut self, turn_count: u32) {
        self.on_chain_turn = self.on_chain_turn.max(turn_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelId, Participant, ReinitId};
    use crate::ports::mocks::AdditionRules;
    use crate::ports::BoardRules;

    fn entry(state: &str) -> ReinitEntry {
        let meta = Arc::new(ChannelMetadata::new(
            vec![Participant::new("foo", "addr 0")],
            ReinitId::from("r"),
        ));
        let data = BoardState::from(state);
        let parsed = AdditionRules::default()
            .parse_state(&ChannelId([0u8; 32]), &meta, &data)
            .unwrap();
        ReinitEntry::new(meta, data.clone(), StateProof::trivial(data), parsed)
    }

    #[test]
    fn test_new_entry_confirms_initial_turn() {
        let e = entry("10 4");
        assert_eq!(e.on_chain_turn(), 4);
        assert_eq!(e.turn_count(), 4);
    }

    #[test]
    fn test_confirm_turn_never_decreases() {
        let mut e = entry("10 4");
        e.confirm_turn(2);
        assert_eq!(e.on_chain_turn(), 4);
        e.confirm_turn(7);
        assert_eq!(e.on_chain_turn(), 7);
    }
}
