//! # Adapters Module
//!
//! Translations between the channel domain and external formats.

pub mod json_export;
pub mod wire;

pub use json_export::{channel_state_json, metadata_json};
pub use wire::{decode_state_proof, encode_state_proof};
