//! # Proof Wire Codec
//!
//! Bincode encoding of state proofs exchanged between peers. Decoding is
//! size-limited since the bytes come from untrusted peers.

use bincode::Options;

use crate::domain::{RejectedUpdate, StateProof};

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
}

/// Encode a state proof for sending to peers.
pub fn encode_state_proof(proof: &StateProof) -> Result<Vec<u8>, bincode::Error> {
    codec().serialize(proof)
}

/// Decode a state proof received from a peer, reading at most `max_bytes`.
///
/// Inputs longer than `max_bytes` are rejected before decoding starts.
pub fn decode_state_proof(bytes: &[u8], max_bytes: u64) -> Result<StateProof, RejectedUpdate> {
    if bytes.len() as u64 > max_bytes {
        return Err(RejectedUpdate::Undecodable(format!(
            "proof of {} bytes exceeds limit of {}",
            bytes.len(),
            max_bytes
        )));
    }
    codec()
        .with_limit(max_bytes)
        .deserialize_from(bytes)
        .map_err(|e| RejectedUpdate::Undecodable(e.to_string()))
}
