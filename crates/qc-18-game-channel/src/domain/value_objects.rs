//! # Domain Value Objects
//!
//! Immutable value types describing a game channel: identifiers, opaque
//! board payloads, participant metadata and the signed state proofs that
//! peers exchange.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::ChannelIdError;

/// Hash type alias (32-byte SHA-256)
pub type Hash = [u8; 32];

/// Globally unique identifier of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub Hash);

impl ChannelId {
    /// Parse a channel id from its 64-character hex form.
    pub fn from_hex(value: &str) -> Result<Self, ChannelIdError> {
        let bytes = hex::decode(value).map_err(|_| ChannelIdError::NotHex)?;
        let id: Hash = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ChannelIdError::WrongLength(b.len()))?;
        Ok(Self(id))
    }

    /// Hex representation as used in logs and exported state.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw id bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Identifier of one reinitialisation ("epoch") of a channel.
///
/// The bytes are opaque; they are only compared and used as a map key.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReinitId(pub Vec<u8>);

impl ReinitId {
    /// Wrap raw reinitialisation bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw id bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex representation, used for logging.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl From<&str> for ReinitId {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl fmt::Display for ReinitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Concrete encoded board state. Only the game's rules interpret it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardState(pub Vec<u8>);

impl BoardState {
    /// Encoded state bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for BoardState {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for BoardState {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

/// Concrete encoded move. Only the game's rules interpret it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardMove(pub Vec<u8>);

impl BoardMove {
    /// Encoded move bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for BoardMove {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

/// A player taking part in a channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Account name of the player.
    pub name: String,
    /// Address whose signatures count for this player.
    pub address: String,
}

impl Participant {
    /// Create a participant.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Channel protocol version recorded in the metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelProtoVersion {
    /// Baseline format every rule set accepts.
    #[default]
    Original,
    /// Later format; rule sets opt in explicitly.
    Extended,
}

impl ChannelProtoVersion {
    /// Lower-case name used in exported state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Extended => "extended",
        }
    }
}

/// Metadata of one channel epoch.
///
/// Immutable once an epoch entry owns it. Parsed states of that epoch
/// share the entry's instance behind an `Arc`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    /// Players in turn order.
    pub participants: Vec<Participant>,
    /// Reinitialisation this metadata belongs to.
    pub reinit: ReinitId,
    /// Protocol version of the channel.
    pub proto_version: ChannelProtoVersion,
}

impl ChannelMetadata {
    /// Metadata using the original protocol version.
    pub fn new(participants: Vec<Participant>, reinit: ReinitId) -> Self {
        Self {
            participants,
            reinit,
            proto_version: ChannelProtoVersion::Original,
        }
    }

    /// Same metadata with a different protocol version.
    pub fn with_proto_version(mut self, version: ChannelProtoVersion) -> Self {
        self.proto_version = version;
        self
    }

    /// Indices of all participants with the given address.
    pub fn participant_indices<'a>(&'a self, address: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.participants
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.address == address)
            .map(|(i, _)| i)
    }
}

/// Board state together with the signatures attached to it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedData {
    /// The signed board state.
    pub data: BoardState,
    /// Signatures over the channel message for `data`.
    pub signatures: Vec<Vec<u8>>,
}

impl SignedData {
    /// Board state without any signatures.
    pub fn unsigned(data: BoardState) -> Self {
        Self {
            data,
            signatures: Vec::new(),
        }
    }
}

/// One move and the signed state it leads to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Move made by the player whose turn it was.
    pub board_move: BoardMove,
    /// State after the move, signed at least by the mover.
    pub new_state: SignedData,
}

/// Self-contained evidence of a sequence of transitions since some
/// starting state of an epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProof {
    /// Starting state; anchored on-chain or signed by everyone.
    pub initial_state: SignedData,
    /// Moves applied in order from `initial_state`.
    pub transitions: Vec<StateTransition>,
}

impl StateProof {
    /// Proof without transitions or signatures, valid for an epoch's
    /// on-chain reinitialisation state itself.
    pub fn trivial(state: BoardState) -> Self {
        Self {
            initial_state: SignedData::unsigned(state),
            transitions: Vec::new(),
        }
    }

    /// The state this proof claims to end in.
    pub fn latest_state(&self) -> &BoardState {
        self.transitions
            .last()
            .map(|t| &t.new_state.data)
            .unwrap_or(&self.initial_state.data)
    }
}
