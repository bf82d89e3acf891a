//! # Channel Signatures
//!
//! Signatures in a channel never cover raw board data directly. They cover
//! a digest binding the data to the game, the channel, the epoch and a
//! topic, so a signature can not be replayed in another context.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::{ChannelId, ChannelMetadata, SignedData};
use crate::ports::SignatureVerifier;

/// Topic used for signatures on board states.
pub const STATE_TOPIC: &str = "state";

/// Build the message that participants sign for `data` under `topic`.
///
/// The message is the hex SHA-256 of
/// `game_id \0 channel_hex \0 reinit_hex \0 topic \0 data`.
pub fn channel_signature_message(
    game_id: &str,
    channel_id: &ChannelId,
    meta: &ChannelMetadata,
    topic: &str,
    data: &[u8],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(game_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(channel_id.to_hex().as_bytes());
    hasher.update([0u8]);
    hasher.update(meta.reinit.to_hex().as_bytes());
    hasher.update([0u8]);
    hasher.update(topic.as_bytes());
    hasher.update([0u8]);
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Indices of the participants that validly signed `signed`.
pub fn verify_participant_signatures<V: SignatureVerifier + ?Sized>(
    verifier: &V,
    game_id: &str,
    channel_id: &ChannelId,
    meta: &ChannelMetadata,
    topic: &str,
    signed: &SignedData,
) -> BTreeSet<usize> {
    let message = channel_signature_message(game_id, channel_id, meta, topic, signed.data.as_bytes());

    let mut signers = BTreeSet::new();
    for signature in &signed.signatures {
        let Some(address) = verifier.recover_signer(&message, signature) else {
            debug!("[qc-18] Ignoring invalid signature on channel {}", channel_id);
            continue;
        };
        signers.extend(meta.participant_indices(&address));
    }

    signers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoardState, Participant, ReinitId};
    use crate::ports::mocks::{MockSignatureVerifier, MockSigner};

    fn meta() -> ChannelMetadata {
        ChannelMetadata::new(
            vec![Participant::new("foo", "addr 1"), Participant::new("bar", "addr 2")],
            ReinitId::from("reinit"),
        )
    }

    #[test]
    fn test_message_depends_on_every_input() {
        let id = ChannelId([1u8; 32]);
        let m = meta();
        let base = channel_signature_message("game", &id, &m, STATE_TOPIC, b"data");

        assert_ne!(base, channel_signature_message("other", &id, &m, STATE_TOPIC, b"data"));
        assert_ne!(base, channel_signature_message("game", &ChannelId([2u8; 32]), &m, STATE_TOPIC, b"data"));
        assert_ne!(base, channel_signature_message("game", &id, &m, "move", b"data"));
        assert_ne!(base, channel_signature_message("game", &id, &m, STATE_TOPIC, b"other"));

        let mut other_reinit = m.clone();
        other_reinit.reinit = ReinitId::from("other");
        assert_ne!(base, channel_signature_message("game", &id, &other_reinit, STATE_TOPIC, b"data"));
    }

    #[test]
    fn test_message_is_hex_sha256() {
        let msg = channel_signature_message("game", &ChannelId([0u8; 32]), &meta(), STATE_TOPIC, b"");
        assert_eq!(msg.len(), 64);
        assert!(msg.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_collects_valid_signers_only() {
        let id = ChannelId([1u8; 32]);
        let m = meta();
        let data = BoardState::from("10 0");
        let msg = channel_signature_message("game", &id, &m, STATE_TOPIC, data.as_bytes());

        let signed = SignedData {
            data,
            signatures: vec![
                MockSigner::new("addr 2").sign(&msg),
                MockSigner::new("addr 9").sign(&msg),
                b"garbage".to_vec(),
                MockSigner::new("addr 1").sign("some other message"),
            ],
        };

        let signers =
            verify_participant_signatures(&MockSignatureVerifier, "game", &id, &m, STATE_TOPIC, &signed);
        assert_eq!(signers.into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_shared_address_signs_every_seat() {
        let id = ChannelId([1u8; 32]);
        let m = ChannelMetadata::new(
            vec![
                Participant::new("foo", "addr 1"),
                Participant::new("bar", "addr 2"),
                Participant::new("foo again", "addr 1"),
            ],
            ReinitId::from("reinit"),
        );
        let data = BoardState::from("10 0");
        let msg = channel_signature_message("game", &id, &m, STATE_TOPIC, data.as_bytes());
        let signed = SignedData {
            data,
            signatures: vec![MockSigner::new("addr 1").sign(&msg)],
        };

        let signers =
            verify_participant_signatures(&MockSignatureVerifier, "game", &id, &m, STATE_TOPIC, &signed);
        assert_eq!(signers.into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }
}
