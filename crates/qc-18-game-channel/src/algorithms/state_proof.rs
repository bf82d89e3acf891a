//! # State Proof Verification
//!
//! A state proof starts from some board state of an epoch and walks a
//! chain of signed transitions. It is valid if
//!
//! 1. every transition is a legal move by the player whose turn it was,
//!    signed by that player, and
//! 2. the starting point is trusted: either it is the epoch's on-chain
//!    reinitialisation state, or every participant signed at least one
//!    state along the proof.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::signatures::{verify_participant_signatures, STATE_TOPIC};
use crate::domain::{BoardState, ChannelId, ChannelMetadata, StateProof, StateTransition};
use crate::ports::{BoardRules, SignatureVerifier};

/// Check the versioned contract of `proof` under `meta`.
pub fn check_versioned_proof<R: BoardRules + ?Sized>(
    rules: &R,
    meta: &ChannelMetadata,
    proof: &StateProof,
) -> bool {
    rules.check_version(meta, proof)
}

/// Verify a single transition starting at `old_state`.
pub fn verify_state_transition<V, R>(
    verifier: &V,
    rules: &R,
    game_id: &str,
    channel_id: &ChannelId,
    meta: &Arc<ChannelMetadata>,
    old_state: &BoardState,
    transition: &StateTransition,
) -> bool
where
    V: SignatureVerifier + ?Sized,
    R: BoardRules + ?Sized,
{
    let Some(old_parsed) = rules.parse_state(channel_id, meta, old_state) else {
        warn!("[qc-18] Transition starts from an invalid state");
        return false;
    };

    let Some(turn) = old_parsed.whose_turn() else {
        warn!("[qc-18] Transition from a state where nobody is to move");
        return false;
    };

    let Some(new_state) = old_parsed.apply_move(&transition.board_move) else {
        warn!("[qc-18] Transition contains an invalid move");
        return false;
    };

    let Some(new_parsed) = rules.parse_state(channel_id, meta, &new_state) else {
        warn!("[qc-18] Applying a valid move produced an unparsable state");
        return false;
    };
    if !new_parsed.equals(&transition.new_state.data) {
        warn!("[qc-18] Claimed new state does not match the move's result");
        return false;
    }

    let signers = verify_participant_signatures(
        verifier,
        game_id,
        channel_id,
        meta,
        STATE_TOPIC,
        &transition.new_state,
    );
    if !signers.contains(&turn) {
        warn!(turn, "[qc-18] New state is not signed by the player who moved");
        return false;
    }

    true
}

/// Verify `proof` for the epoch described by `meta` and `reinit_state`.
///
/// Returns the board state the proof ends in if it is valid.
pub fn verify_state_proof<V, R>(
    verifier: &V,
    rules: &R,
    game_id: &str,
    channel_id: &ChannelId,
    meta: &Arc<ChannelMetadata>,
    reinit_state: &BoardState,
    proof: &StateProof,
) -> Option<BoardState>
where
    V: SignatureVerifier + ?Sized,
    R: BoardRules + ?Sized,
{
    let initial = &proof.initial_state;
    let Some(initial_parsed) = rules.parse_state(channel_id, meta, &initial.data) else {
        warn!("[qc-18] State proof has an invalid initial state");
        return None;
    };
    let anchored = initial_parsed.equals(reinit_state);

    let mut signers: BTreeSet<usize> =
        verify_participant_signatures(verifier, game_id, channel_id, meta, STATE_TOPIC, initial);

    let mut current = &initial.data;
    for transition in &proof.transitions {
        if !verify_state_transition(verifier, rules, game_id, channel_id, meta, current, transition) {
            return None;
        }
        signers.extend(verify_participant_signatures(
            verifier,
            game_id,
            channel_id,
            meta,
            STATE_TOPIC,
            &transition.new_state,
        ));
        current = &transition.new_state.data;
    }

    if !anchored {
        let missing = (0..meta.participants.len()).find(|i| !signers.contains(i));
        if let Some(index) = missing {
            warn!(
                participant = index,
                "[qc-18] State proof is neither anchored on-chain nor signed by all participants"
            );
            return None;
        }
    }

    debug!(
        transitions = proof.transitions.len(),
        anchored, "[qc-18] State proof verified"
    );
    Some(current.clone())
}
