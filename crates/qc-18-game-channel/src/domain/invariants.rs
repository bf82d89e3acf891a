//! # Domain Invariants
//!
//! Rules that must always hold for the tracked channel state.

use std::sync::Arc;

use super::entities::ReinitEntry;
use super::errors::{InvariantViolation, RejectedUpdate};
use super::value_objects::{BoardState, ChannelMetadata};

/// Invariant: an epoch's parsed state references the entry's own metadata
/// instance, not a copy and not another epoch's.
pub fn invariant_shares_metadata(entry: &ReinitEntry) -> bool {
    Arc::ptr_eq(entry.latest_state().metadata(), entry.metadata())
}

/// Invariant: metadata and reinit state of an epoch never change once
/// the epoch is known.
pub fn invariant_same_founding_data(
    entry: &ReinitEntry,
    meta: &ChannelMetadata,
    reinit_state: &BoardState,
) -> Result<(), InvariantViolation> {
    if entry.metadata().as_ref() != meta {
        return Err(InvariantViolation::MetadataMismatch {
            reinit: meta.reinit.to_hex(),
        });
    }
    if entry.reinit_state() != reinit_state {
        return Err(InvariantViolation::ReinitStateMismatch {
            reinit: meta.reinit.to_hex(),
        });
    }
    Ok(())
}

/// Invariant: the tracked latest state only moves to strictly higher
/// turn counts. Ties count as stale.
pub fn invariant_fresher(current: u32, provided: u32) -> Result<(), RejectedUpdate> {
    if provided <= current {
        return Err(RejectedUpdate::NotFresher { current, provided });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelId, Participant, ReinitId, StateProof};
    use crate::ports::mocks::AdditionRules;
    use crate::ports::BoardRules;

    fn meta() -> ChannelMetadata {
        ChannelMetadata::new(vec![Participant::new("foo", "addr 0")], ReinitId::from("r"))
    }

    fn entry_with(parse_meta: &Arc<ChannelMetadata>, entry_meta: Arc<ChannelMetadata>) -> ReinitEntry {
        let data = BoardState::from("1 0");
        let parsed = AdditionRules::default()
            .parse_state(&ChannelId([0u8; 32]), parse_meta, &data)
            .unwrap();
        ReinitEntry::new(entry_meta, data.clone(), StateProof::trivial(data), parsed)
    }

    #[test]
    fn test_shared_metadata_holds_for_same_arc() {
        let m = Arc::new(meta());
        assert!(invariant_shares_metadata(&entry_with(&m, Arc::clone(&m))));
    }

    #[test]
    fn test_equal_copy_of_metadata_is_not_shared() {
        let m = Arc::new(meta());
        let copy = Arc::new(meta());
        assert!(!invariant_shares_metadata(&entry_with(&m, copy)));
    }

    #[test]
    fn test_founding_data_checks() {
        let m = Arc::new(meta());
        let entry = entry_with(&m, Arc::clone(&m));

        assert!(invariant_same_founding_data(&entry, &meta(), &BoardState::from("1 0")).is_ok());

        let other_meta = ChannelMetadata::new(vec![Participant::new("bar", "addr 1")], ReinitId::from("r"));
        assert!(matches!(
            invariant_same_founding_data(&entry, &other_meta, &BoardState::from("1 0")),
            Err(InvariantViolation::MetadataMismatch { .. })
        ));
        assert!(matches!(
            invariant_same_founding_data(&entry, &meta(), &BoardState::from("2 0")),
            Err(InvariantViolation::ReinitStateMismatch { .. })
        ));
    }

    #[test]
    fn test_freshness_is_strict() {
        assert!(invariant_fresher(3, 4).is_ok());
        assert_eq!(
            invariant_fresher(4, 4),
            Err(RejectedUpdate::NotFresher { current: 4, provided: 4 })
        );
        assert!(invariant_fresher(4, 2).is_err());
    }
}
