//! # State Update Queue
//!
//! Buffers off-chain updates that reference a reinitialisation we do not
//! know yet. This happens when a peer sees an on-chain reinitialisation
//! before we do and already sends moves for it.
//!
//! ## Eviction (Anti-Memory DoS)
//!
//! The total number of buffered proofs across all reinitialisations is
//! capped. When an insert finds the queue full:
//!
//! 1. Drop every proof queued for a *different* reinitialisation.
//! 2. If still full, only the inserted reinitialisation is left; drop its
//!    oldest proof (FIFO).
//!
//! In practice the queue is needed only in rare edge cases, and one or two
//! entries in total are most likely enough.

use std::collections::{BTreeMap, VecDeque};

use tracing::warn;

use super::errors::{ensure, fatal, InvariantViolation};
use super::value_objects::{ReinitId, StateProof};

/// Default capacity of the queue.
pub const STATE_UPDATE_QUEUE_SIZE: usize = 100;

/// Number of "queue full" warnings logged per queue before going quiet.
const MAX_FULL_WARNINGS: u32 = 10;

/// Bounded FIFO buffer of state proofs keyed by reinitialisation.
#[derive(Clone, Debug)]
pub struct StateUpdateQueue {
    /// Pending proofs per reinitialisation, in arrival order.
    updates: BTreeMap<ReinitId, VecDeque<StateProof>>,
    /// Total number of proofs across all reinitialisations.
    size: usize,
    /// Maximum value of `size`.
    max_size: usize,
    /// "Queue full" warnings logged so far.
    full_warnings: u32,
}

impl StateUpdateQueue {
    /// Create an empty queue holding at most `max_size` proofs.
    ///
    /// A zero capacity is a configuration bug and aborts.
    pub fn new(max_size: usize) -> Self {
        ensure(max_size > 0, || InvariantViolation::ZeroQueueCapacity);
        Self {
            updates: BTreeMap::new(),
            size: 0,
            max_size,
            full_warnings: 0,
        }
    }

    /// Queue `update` for `reinit`, evicting older data if at capacity.
    pub fn insert(&mut self, reinit: &ReinitId, update: StateProof) {
        if self.size == self.max_size {
            if self.full_warnings < MAX_FULL_WARNINGS {
                self.full_warnings += 1;
                warn!(
                    capacity = self.max_size,
                    "[qc-18] StateUpdateQueue has reached maximum size, dropping some elements"
                );
            }
            self.evict_other_reinits(reinit);
        }

        if self.size == self.max_size {
            self.evict_oldest(reinit);
        }

        ensure(self.size < self.max_size, || {
            InvariantViolation::QueueAccounting(format!(
                "size {} not below capacity {} after eviction",
                self.size, self.max_size
            ))
        });
        self.size += 1;
        self.updates
            .entry(reinit.clone())
            .or_default()
            .push_back(update);
    }

    /// Remove and return all proofs queued for `reinit`, oldest first.
    pub fn extract_queue(&mut self, reinit: &ReinitId) -> VecDeque<StateProof> {
        let Some(queue) = self.updates.remove(reinit) else {
            return VecDeque::new();
        };

        ensure(self.size >= queue.len(), || {
            InvariantViolation::QueueAccounting(format!(
                "extracting {} proofs with total size {}",
                queue.len(),
                self.size
            ))
        });
        self.size -= queue.len();
        queue
    }

    /// Total number of buffered proofs.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether no proofs are buffered.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Maximum number of buffered proofs.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Number of proofs buffered for `reinit`.
    pub fn pending_for(&self, reinit: &ReinitId) -> usize {
        self.updates.get(reinit).map_or(0, VecDeque::len)
    }

    fn evict_other_reinits(&mut self, keep: &ReinitId) {
        let mut dropped = 0usize;
        self.updates.retain(|reinit, queue| {
            if reinit == keep {
                return true;
            }
            dropped += queue.len();
            false
        });

        ensure(self.size >= dropped, || {
            InvariantViolation::QueueAccounting(format!(
                "dropped {} proofs with total size {}",
                dropped, self.size
            ))
        });
        self.size -= dropped;
    }

    fn evict_oldest(&mut self, reinit: &ReinitId) {
        let size = self.size;
        let queue = self.updates.get_mut(reinit);
        let Some(queue) = queue.filter(|q| q.len() == size) else {
            fatal(InvariantViolation::QueueAccounting(format!(
                "full queue does not consist only of reinit {}",
                reinit
            )));
        };

        queue.pop_front();
        self.size -= 1;
    }
}

impl Default for StateUpdateQueue {
    fn default() -> Self {
        Self::new(STATE_UPDATE_QUEUE_SIZE)
    }
}
