//! # Domain Module
//!
//! Core domain types for Game Channels.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod rolling_state;
pub mod update_queue;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use rolling_state::*;
pub use update_queue::*;
pub use value_objects::*;
