//! # Rolling Channel State
//!
//! Reconciles the two update streams of a channel into a single best-known
//! state:
//!
//! | Stream | Entry point | Trust | Bad input |
//! |--------|-------------|-------|-----------|
//! | On-chain | [`RollingState::update_on_chain`] | passed consensus | fatal |
//! | Off-chain | [`RollingState::update_with_move`] | untrusted peer | dropped |
//!
//! One [`ReinitEntry`] is kept per reinitialisation ever seen; entries are
//! never removed, since a reorg can switch the channel back to an older
//! epoch. Only on-chain updates move the selected epoch, and the latest
//! on-chain call always wins.
//!
//! ## Freshness
//!
//! Within an epoch the latest state is replaced only by a state with a
//! strictly higher turn count. Separately, each entry tracks the highest
//! turn count confirmed on-chain, which never decreases.
//!
//! ## Concurrency
//!
//! Not synchronised. Callers serialise mutations, e.g. through
//! [`crate::application::ChannelStateService`].

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::entities::ReinitEntry;
use super::errors::{ensure, fatal, InvariantViolation, RejectedUpdate};
use super::invariants::{invariant_fresher, invariant_same_founding_data, invariant_shares_metadata};
use super::update_queue::{StateUpdateQueue, STATE_UPDATE_QUEUE_SIZE};
use super::value_objects::{BoardState, ChannelId, ChannelMetadata, ReinitId, StateProof};
use crate::algorithms::{check_versioned_proof, verify_state_proof};
use crate::ports::{BoardRules, ParsedBoardState, SignatureVerifier};

/// Best-known state of one channel across all its reinitialisations.
pub struct RollingState<R: BoardRules, V: SignatureVerifier> {
    rules: R,
    verifier: V,
    game_id: String,
    channel_id: ChannelId,
    /// Selected epoch; `None` until the first on-chain update.
    reinit_id: Option<ReinitId>,
    reinits: BTreeMap<ReinitId, ReinitEntry>,
    /// Off-chain proofs for epochs we have not seen on-chain yet.
    unknown_reinit_moves: StateUpdateQueue,
}

impl<R: BoardRules, V: SignatureVerifier> RollingState<R, V> {
    /// Create an uninitialised state for a channel.
    pub fn new(rules: R, verifier: V, game_id: impl Into<String>, channel_id: ChannelId) -> Self {
        Self::with_queue_capacity(rules, verifier, game_id, channel_id, STATE_UPDATE_QUEUE_SIZE)
    }

    /// Like [`RollingState::new`] with a custom update queue capacity.
    pub fn with_queue_capacity(
        rules: R,
        verifier: V,
        game_id: impl Into<String>,
        channel_id: ChannelId,
        queue_capacity: usize,
    ) -> Self {
        Self {
            rules,
            verifier,
            game_id: game_id.into(),
            channel_id,
            reinit_id: None,
            reinits: BTreeMap::new(),
            unknown_reinit_moves: StateUpdateQueue::new(queue_capacity),
        }
    }

    /// Game the channel belongs to.
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Channel whose state is tracked.
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Whether an on-chain update has been processed.
    pub fn is_initialized(&self) -> bool {
        self.reinit_id.is_some()
    }

    /// All epochs seen so far, in byte order of their ids.
    pub fn known_reinits(&self) -> impl Iterator<Item = &ReinitId> {
        self.reinits.keys()
    }

    /// Entry of any known epoch, selected or not.
    pub fn entry(&self, reinit: &ReinitId) -> Option<&ReinitEntry> {
        self.reinits.get(reinit)
    }

    /// Off-chain updates waiting for their epoch.
    pub fn queued_updates(&self) -> &StateUpdateQueue {
        &self.unknown_reinit_moves
    }

    /// Selected reinitialisation id.
    pub fn reinit_id(&self) -> &ReinitId {
        match &self.reinit_id {
            Some(reinit) => reinit,
            None => fatal(InvariantViolation::Uninitialised),
        }
    }

    /// Latest state of the selected epoch.
    pub fn latest_state(&self) -> &dyn ParsedBoardState {
        let entry = self.current_entry();
        ensure(invariant_shares_metadata(entry), || {
            InvariantViolation::MetadataNotShared {
                reinit: entry.metadata().reinit.to_hex(),
            }
        });
        entry.latest_state()
    }

    /// Proof of the latest state of the selected epoch.
    pub fn state_proof(&self) -> &StateProof {
        self.current_entry().proof()
    }

    /// Highest turn count confirmed on-chain for the selected epoch.
    pub fn on_chain_turn_count(&self) -> u32 {
        self.current_entry().on_chain_turn()
    }

    /// Metadata of the selected epoch.
    pub fn metadata(&self) -> &ChannelMetadata {
        self.current_entry().metadata()
    }

    fn current_entry(&self) -> &ReinitEntry {
        let reinit = self.reinit_id();
        match self.reinits.get(reinit) {
            Some(entry) => entry,
            None => fatal(InvariantViolation::MissingSelectedEntry {
                reinit: reinit.to_hex(),
            }),
        }
    }

    /// Process a state confirmed on-chain.
    ///
    /// Selects `meta.reinit` as the current epoch. Returns whether the
    /// selected epoch or its latest state changed. Data failing any check
    /// aborts, since it already passed consensus.
    pub fn update_on_chain(
        &mut self,
        meta: &ChannelMetadata,
        reinit_state: &BoardState,
        proof: &StateProof,
    ) -> bool {
        let reinit = meta.reinit.clone();

        if !check_versioned_proof(&self.rules, meta, proof) {
            fatal(InvariantViolation::InvalidOnChainVersion {
                reinit: reinit.to_hex(),
            });
        }

        // Parse against the entry's own metadata when it matches, so the
        // parsed state can be stored in that entry.
        let shared_meta = match self.reinits.get(&reinit) {
            Some(entry) if entry.metadata().as_ref() == meta => Arc::clone(entry.metadata()),
            _ => Arc::new(meta.clone()),
        };

        let Some(proven) = verify_state_proof(
            &self.verifier,
            &self.rules,
            &self.game_id,
            &self.channel_id,
            &shared_meta,
            reinit_state,
            proof,
        ) else {
            fatal(InvariantViolation::InvalidOnChainProof {
                reinit: reinit.to_hex(),
            });
        };

        let Some(parsed) = self.rules.parse_state(&self.channel_id, &shared_meta, &proven) else {
            fatal(InvariantViolation::UnparsableProvenState {
                reinit: reinit.to_hex(),
            });
        };
        let turn_count = parsed.turn_count();

        let reinit_changed = self.reinit_id.as_ref() != Some(&reinit);
        if reinit_changed {
            info!(
                channel = %self.channel_id,
                reinit = %reinit,
                "[qc-18] Switching to reinitialisation"
            );
        }
        self.reinit_id = Some(reinit.clone());

        match self.reinits.entry(reinit.clone()) {
            Entry::Vacant(slot) => {
                info!(
                    channel = %self.channel_id,
                    reinit = %reinit,
                    turn_count,
                    "[qc-18] Adding new reinitialisation from on-chain update"
                );
                slot.insert(ReinitEntry::new(
                    shared_meta,
                    reinit_state.clone(),
                    proof.clone(),
                    parsed,
                ));
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if let Err(violation) = invariant_same_founding_data(entry, meta, reinit_state) {
                    fatal(violation);
                }

                entry.confirm_turn(turn_count);

                let current = entry.turn_count();
                if invariant_fresher(current, turn_count).is_err() {
                    debug!(
                        channel = %self.channel_id,
                        reinit = %reinit,
                        current,
                        turn_count,
                        "[qc-18] On-chain state is not fresher than the known one"
                    );
                    return reinit_changed;
                }

                info!(
                    channel = %self.channel_id,
                    reinit = %reinit,
                    turn_count,
                    "[qc-18] Updated latest state from on-chain update"
                );
                entry.replace_latest(proof.clone(), parsed);
                return true;
            }
        }

        let queued = self.unknown_reinit_moves.extract_queue(&reinit);
        if !queued.is_empty() {
            info!(
                channel = %self.channel_id,
                reinit = %reinit,
                count = queued.len(),
                "[qc-18] Replaying queued off-chain updates"
            );
        }
        for update in queued {
            self.update_with_move(&reinit, update);
        }

        true
    }

    /// Process a state proof received off-chain.
    ///
    /// Returns whether the latest state of the *selected* epoch changed.
    /// Invalid, stale or not yet applicable updates are logged and dropped.
    pub fn update_with_move(&mut self, reinit: &ReinitId, proof: StateProof) -> bool {
        match self.try_update_with_move(reinit, proof) {
            Ok(changed) => changed,
            Err(RejectedUpdate::UnknownReinit { .. }) => {
                warn!(
                    channel = %self.channel_id,
                    reinit = %reinit,
                    "[qc-18] Queued off-chain update for unknown reinitialisation"
                );
                false
            }
            Err(RejectedUpdate::NotFresher { current, provided }) => {
                debug!(
                    channel = %self.channel_id,
                    reinit = %reinit,
                    current,
                    provided,
                    "[qc-18] Off-chain update is not fresher than the known state"
                );
                false
            }
            Err(err) => {
                warn!(
                    channel = %self.channel_id,
                    reinit = %reinit,
                    error = %err,
                    "[qc-18] Dropping off-chain update"
                );
                false
            }
        }
    }

    /// Like [`RollingState::update_with_move`], but reports why an update
    /// was not applied.
    ///
    /// `Ok(false)` means the update was applied to an epoch that is not
    /// currently selected.
    pub fn try_update_with_move(
        &mut self,
        reinit: &ReinitId,
        proof: StateProof,
    ) -> Result<bool, RejectedUpdate> {
        let Some(entry) = self.reinits.get_mut(reinit) else {
            self.unknown_reinit_moves.insert(reinit, proof);
            return Err(RejectedUpdate::UnknownReinit {
                reinit: reinit.to_hex(),
            });
        };

        if !check_versioned_proof(&self.rules, entry.metadata(), &proof) {
            return Err(RejectedUpdate::UnsupportedVersion);
        }

        let proven = verify_state_proof(
            &self.verifier,
            &self.rules,
            &self.game_id,
            &self.channel_id,
            entry.metadata(),
            entry.reinit_state(),
            &proof,
        )
        .ok_or(RejectedUpdate::InvalidProof)?;

        let Some(parsed) = self.rules.parse_state(&self.channel_id, entry.metadata(), &proven) else {
            fatal(InvariantViolation::UnparsableProvenState {
                reinit: reinit.to_hex(),
            });
        };

        let turn_count = parsed.turn_count();
        invariant_fresher(entry.turn_count(), turn_count)?;

        entry.replace_latest(proof, parsed);
        let selected = self.reinit_id.as_ref() == Some(reinit);
        info!(
            channel = %self.channel_id,
            reinit = %reinit,
            turn_count,
            selected,
            "[qc-18] Updated latest state from off-chain move"
        );

        Ok(selected)
    }
}
