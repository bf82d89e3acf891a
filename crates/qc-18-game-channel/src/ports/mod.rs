//! # Ports Module
//!
//! Hexagonal architecture ports (inbound API, outbound dependencies).

pub mod inbound;
pub mod mocks;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
