//! # Channel State Service
//!
//! Owns the rolling state of one channel behind a single lock and
//! publishes a version counter that changes whenever the best-known state
//! does.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;

use crate::adapters::{channel_state_json, decode_state_proof};
use crate::config::ChannelConfig;
use crate::domain::{BoardState, ChannelId, ChannelMetadata, RejectedUpdate, ReinitId, RollingState, StateProof};
use crate::ports::{BoardRules, ChannelStateApi, SignatureVerifier};

/// Channel State Service - serialises access to a [`RollingState`].
pub struct ChannelStateService<R: BoardRules, V: SignatureVerifier> {
    /// Configuration.
    config: ChannelConfig,
    /// Rolling state; writers hold the lock for a whole update.
    state: RwLock<RollingState<R, V>>,
    /// State version, bumped on every change.
    version: watch::Sender<u64>,
}

impl<R: BoardRules, V: SignatureVerifier> ChannelStateService<R, V> {
    /// Create a service for a fresh, uninitialised channel.
    pub fn new(config: ChannelConfig, rules: R, verifier: V, channel_id: ChannelId) -> Self {
        let state = RollingState::with_queue_capacity(
            rules,
            verifier,
            config.game_id.clone(),
            channel_id,
            config.update_queue_capacity,
        );
        let (version, _) = watch::channel(0);
        Self {
            config,
            state: RwLock::new(state),
            version,
        }
    }

    /// Configuration the service was created with.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Run `read` against the current state under the read lock.
    pub fn with_state<T>(&self, read: impl FnOnce(&RollingState<R, V>) -> T) -> T {
        read(&self.state.read())
    }

    /// Apply a mutation under the write lock, bumping the version if it
    /// reports a change.
    fn apply(&self, update: impl FnOnce(&mut RollingState<R, V>) -> bool) -> bool {
        let mut state = self.state.write();
        let changed = update(&mut state);
        if changed {
            self.version.send_modify(|v| *v += 1);
            debug!(
                channel = %state.channel_id(),
                version = *self.version.borrow(),
                "[qc-18] Channel state changed"
            );
        }
        changed
    }
}

#[async_trait]
impl<R, V> ChannelStateApi for ChannelStateService<R, V>
where
    R: BoardRules + 'static,
    V: SignatureVerifier + 'static,
{
    async fn on_chain_update(
        &self,
        meta: ChannelMetadata,
        reinit_state: BoardState,
        proof: StateProof,
    ) -> bool {
        self.apply(|state| state.update_on_chain(&meta, &reinit_state, &proof))
    }

    async fn off_chain_move(&self, reinit: ReinitId, proof: StateProof) -> bool {
        self.apply(|state| state.update_with_move(&reinit, proof))
    }

    async fn off_chain_encoded_move(
        &self,
        reinit: ReinitId,
        encoded: &[u8],
    ) -> Result<bool, RejectedUpdate> {
        let proof = decode_state_proof(encoded, self.config.max_proof_bytes)?;
        Ok(self.apply(|state| state.update_with_move(&reinit, proof)))
    }

    fn snapshot(&self) -> serde_json::Value {
        self.with_state(channel_state_json)
    }

    fn current_version(&self) -> u64 {
        *self.version.borrow()
    }

    async fn wait_for_change(&self, known_version: u64) -> u64 {
        let mut rx = self.version.subscribe();
        loop {
            let current = *rx.borrow_and_update();
            if current != known_version {
                return current;
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::encode_state_proof;
    use crate::domain::Participant;
    use crate::ports::mocks::{AdditionRules, MockSignatureVerifier, ProofBuilder};
    use std::sync::Arc;
    use std::time::Duration;

    type TestService = ChannelStateService<AdditionRules, MockSignatureVerifier>;

    fn meta() -> ChannelMetadata {
        ChannelMetadata::new(
            vec![Participant::new("foo", "addr 0"), Participant::new("bar", "addr 1")],
            ReinitId::from("e1"),
        )
    }

    fn create_test_service() -> TestService {
        ChannelStateService::new(
            ChannelConfig::for_testing(),
            AdditionRules::default(),
            MockSignatureVerifier,
            ChannelId([3u8; 32]),
        )
    }

    fn one_move() -> StateProof {
        ProofBuilder::new("add", ChannelId([3u8; 32]), Arc::new(meta()))
            .initial("10 0", &[])
            .transition("2", "12 1", &["addr 0"])
            .build()
    }

    async fn initialise(service: &TestService) {
        let state = BoardState::from("10 0");
        assert!(service.on_chain_update(meta(), state.clone(), StateProof::trivial(state)).await);
    }

    #[tokio::test]
    async fn test_version_bumps_on_change_only() {
        let service = create_test_service();
        assert_eq!(service.current_version(), 0);

        initialise(&service).await;
        assert_eq!(service.current_version(), 1);

        assert!(service.off_chain_move(ReinitId::from("e1"), one_move()).await);
        assert_eq!(service.current_version(), 2);

        assert!(!service.off_chain_move(ReinitId::from("e1"), one_move()).await);
        assert_eq!(service.current_version(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_latest_state() {
        let service = create_test_service();
        assert_eq!(service.snapshot()["initialised"], false);

        initialise(&service).await;
        service.off_chain_move(ReinitId::from("e1"), one_move()).await;

        let snapshot = service.snapshot();
        assert_eq!(snapshot["state"]["turncount"], 1);
        assert_eq!(snapshot["onchainturncount"], 0);
    }

    #[tokio::test]
    async fn test_encoded_move() {
        let service = create_test_service();
        initialise(&service).await;

        let bytes = encode_state_proof(&one_move()).unwrap();
        assert_eq!(service.off_chain_encoded_move(ReinitId::from("e1"), &bytes).await, Ok(true));
        assert!(matches!(
            service.off_chain_encoded_move(ReinitId::from("e1"), b"\xff\xff").await,
            Err(RejectedUpdate::Undecodable(_))
        ));
        assert_eq!(service.with_state(|s| s.latest_state().turn_count()), 1);
    }

    #[tokio::test]
    async fn test_oversized_encoded_move_is_rejected() {
        let config = ChannelConfig {
            max_proof_bytes: 16,
            ..ChannelConfig::for_testing()
        };
        let service = ChannelStateService::new(
            config,
            AdditionRules::default(),
            MockSignatureVerifier,
            ChannelId([3u8; 32]),
        );
        initialise(&service).await;

        let bytes = encode_state_proof(&one_move()).unwrap();
        assert!(bytes.len() > 16);
        assert!(matches!(
            service.off_chain_encoded_move(ReinitId::from("e1"), &bytes).await,
            Err(RejectedUpdate::Undecodable(_))
        ));
        assert_eq!(service.with_state(|s| s.latest_state().turn_count()), 0);
        assert_eq!(service.current_version(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_change_returns_immediately_when_stale() {
        let service = create_test_service();
        initialise(&service).await;
        assert_eq!(service.wait_for_change(0).await, 1);
    }

    #[tokio::test]
    async fn test_wait_for_change_wakes_on_update() {
        let service = Arc::new(create_test_service());
        initialise(&service).await;

        let waiter = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.wait_for_change(1).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        service.off_chain_move(ReinitId::from("e1"), one_move()).await;
        let version = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter timed out")
            .expect("waiter panicked");
        assert_eq!(version, 2);
    }
}
