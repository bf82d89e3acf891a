//! # Domain Errors
//!
//! Game channels distinguish two kinds of failure:
//!
//! | Tier | Type | Handling |
//! |------|------|----------|
//! | Recoverable | [`RejectedUpdate`] | logged, update dropped, state untouched |
//! | Fatal | [`InvariantViolation`] | logged, process aborts via [`fatal`] |
//!
//! Peer-supplied data is untrusted and may legitimately be garbage, so it
//! only ever produces a `RejectedUpdate`. Data that already passed chain
//! consensus, or internal bookkeeping, failing a check means the
//! surrounding system is corrupted and must not keep acting on it.

use thiserror::Error;

/// Error parsing a channel id from user input.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChannelIdError {
    /// Input is not hex.
    #[error("Channel id is not valid hex")]
    NotHex,

    /// Input decodes to the wrong number of bytes.
    #[error("Channel id has {0} bytes, expected 32")]
    WrongLength(usize),
}

/// Reason an off-chain update was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RejectedUpdate {
    /// Reinitialisation not known yet; the update was queued instead.
    #[error("Unknown reinitialisation {reinit}, update queued")]
    UnknownReinit {
        /// Hex of the reinitialisation id
        reinit: String,
    },

    /// Proof or metadata use a protocol version the rules do not accept.
    #[error("State proof does not match a supported protocol version")]
    UnsupportedVersion,

    /// Proof failed signature or transition verification.
    #[error("State proof verification failed")]
    InvalidProof,

    /// Proof is valid but not fresher than the known state.
    #[error("State is not fresher: known turn {current}, provided turn {provided}")]
    NotFresher {
        /// Turn count of the tracked latest state
        current: u32,
        /// Turn count of the provided state
        provided: u32,
    },

    /// Proof bytes could not be decoded.
    #[error("Undecodable state proof: {0}")]
    Undecodable(String),
}

/// Condition that must never occur while the channel state is sound.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// State was read before any on-chain update.
    #[error("RollingState has not been initialised yet")]
    Uninitialised,

    /// On-chain proof uses a protocol version the rules reject.
    #[error("On-chain state proof for reinit {reinit} has an unsupported version")]
    InvalidOnChainVersion {
        /// Hex of the reinitialisation id
        reinit: String,
    },

    /// On-chain proof failed verification.
    #[error("State proof provided on-chain is not valid (reinit {reinit})")]
    InvalidOnChainProof {
        /// Hex of the reinitialisation id
        reinit: String,
    },

    /// Known reinit reported with different metadata.
    #[error("Metadata for reinit {reinit} differs from the stored metadata")]
    MetadataMismatch {
        /// Hex of the reinitialisation id
        reinit: String,
    },

    /// Known reinit reported with a different reinit state.
    #[error("Reinit state for reinit {reinit} differs from the stored state")]
    ReinitStateMismatch {
        /// Hex of the reinitialisation id
        reinit: String,
    },

    /// Rules could not parse a state that verification accepted.
    #[error("Rules failed to parse a verified state for reinit {reinit}")]
    UnparsableProvenState {
        /// Hex of the reinitialisation id
        reinit: String,
    },

    /// Parsed state holds its own copy of the metadata.
    #[error("Parsed state of reinit {reinit} does not share the entry's metadata")]
    MetadataNotShared {
        /// Hex of the reinitialisation id
        reinit: String,
    },

    /// Selected reinit is missing from the entry map.
    #[error("Selected reinit {reinit} has no entry")]
    MissingSelectedEntry {
        /// Hex of the reinitialisation id
        reinit: String,
    },

    /// Queue created with zero capacity.
    #[error("State update queue capacity must be positive")]
    ZeroQueueCapacity,

    /// Queue size counter disagrees with its contents.
    #[error("Update queue bookkeeping is inconsistent: {0}")]
    QueueAccounting(String),
}

/// Abort on an invariant violation.
///
/// Logs the violation at error level before panicking.
#[track_caller]
pub fn fatal(violation: InvariantViolation) -> ! {
    tracing::error!(%violation, "[qc-18] Channel invariant violated, aborting");
    panic!("{}", violation)
}

/// Abort with `violation` unless `condition` holds.
#[track_caller]
pub fn ensure(condition: bool, violation: impl FnOnce() -> InvariantViolation) {
    if !condition {
        fatal(violation());
    }
}
