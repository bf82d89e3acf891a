//! # State Export
//!
//! JSON view of a channel's best-known state for RPC consumers. Read-only.

use serde_json::{json, Value};

use crate::domain::{ChannelMetadata, RollingState};
use crate::ports::{BoardRules, SignatureVerifier};

/// JSON form of channel metadata.
pub fn metadata_json(meta: &ChannelMetadata) -> Value {
    let participants: Vec<Value> = meta
        .participants
        .iter()
        .map(|p| json!({"name": p.name, "address": p.address}))
        .collect();

    json!({
        "participants": participants,
        "reinit": meta.reinit.to_hex(),
        "protoversion": meta.proto_version.as_str(),
    })
}

/// Export the current state of a channel.
///
/// An uninitialised channel exports only its id.
pub fn channel_state_json<R, V>(state: &RollingState<R, V>) -> Value
where
    R: BoardRules,
    V: SignatureVerifier,
{
    let id = state.channel_id().to_hex();
    if !state.is_initialized() {
        return json!({"id": id, "initialised": false});
    }

    let latest = state.latest_state();
    json!({
        "id": id,
        "reinit": state.reinit_id().to_hex(),
        "meta": metadata_json(state.metadata()),
        "state": {
            "data": latest.to_json(),
            "turncount": latest.turn_count(),
            "whoseturn": latest.whose_turn(),
        },
        "onchainturncount": state.on_chain_turn_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoardState, ChannelId, Participant, ReinitId, StateProof};
    use crate::ports::mocks::{AdditionRules, MockSignatureVerifier};

    fn meta() -> ChannelMetadata {
        ChannelMetadata::new(
            vec![Participant::new("foo", "addr 0"), Participant::new("bar", "addr 1")],
            ReinitId::from("e1"),
        )
    }

    #[test]
    fn test_uninitialised_export() {
        let state = RollingState::new(AdditionRules::default(), MockSignatureVerifier, "add", ChannelId([0x11; 32]));
        assert_eq!(
            channel_state_json(&state),
            json!({"id": "11".repeat(32), "initialised": false})
        );
    }

    #[test]
    fn test_initialised_export() {
        let mut state = RollingState::new(AdditionRules::default(), MockSignatureVerifier, "add", ChannelId([0x11; 32]));
        let reinit_state = BoardState::from("42 3");
        state.update_on_chain(&meta(), &reinit_state, &StateProof::trivial(reinit_state.clone()));

        let exported = channel_state_json(&state);
        assert_eq!(exported["reinit"], "6531");
        assert_eq!(exported["meta"]["participants"][1]["name"], "bar");
        assert_eq!(exported["meta"]["protoversion"], "original");
        assert_eq!(exported["state"]["data"], json!({"number": 42, "count": 3}));
        assert_eq!(exported["state"]["turncount"], 3);
        assert_eq!(exported["state"]["whoseturn"], 1);
        assert_eq!(exported["onchainturncount"], 3);
    }

    #[test]
    fn test_finished_game_has_no_turn() {
        let mut state = RollingState::new(AdditionRules::default(), MockSignatureVerifier, "add", ChannelId([0x11; 32]));
        let reinit_state = BoardState::from("100 9");
        state.update_on_chain(&meta(), &reinit_state, &StateProof::trivial(reinit_state.clone()));

        assert!(channel_state_json(&state)["state"]["whoseturn"].is_null());
    }
}
