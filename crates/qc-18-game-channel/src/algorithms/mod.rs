//! # Algorithms Module
//!
//! Signature and state-proof verification for game channels.

pub mod signatures;
pub mod state_proof;

pub use signatures::{channel_signature_message, verify_participant_signatures, STATE_TOPIC};
pub use state_proof::{check_versioned_proof, verify_state_proof, verify_state_transition};
