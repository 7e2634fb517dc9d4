//! Connection broker.
//!
//! Owns the shared [`ConnectionState`]. The state lives in a watch channel
//! whose sender never leaves this module: every mutation reads the current
//! snapshot, produces the next one and publishes it under the channel lock,
//! so updates from concurrent tasks cannot interleave.

use crate::error::{CONNECTION_FAILED, Error, Result};
use crate::provider::Provider;
use penstake_core::ConnectionState;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

pub struct ConnectionBroker<P> {
    provider: Arc<P>,
    state: watch::Sender<ConnectionState>,
    /// Bumped whenever a connection is established or lost.
    epoch: AtomicU64,
}

impl<P: Provider> ConnectionBroker<P> {
    /// Create a broker in the disconnected, idle, error-free state.
    pub fn new(provider: Arc<P>) -> Self {
        let (state, _) = watch::channel(ConnectionState::initial());
        Self {
            provider,
            state,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Current snapshot.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Run the provider handshake.
    ///
    /// Failures are reported twice: recorded in the shared state and returned
    /// to the caller.
    pub async fn request_connection(&self) -> Result<()> {
        self.update(|s| {
            s.loading = true;
            s.error = None;
        });

        match self.provider.connect().await {
            Ok(()) => {
                self.update(|s| {
                    s.connected = true;
                    s.loading = false;
                    s.error = None;
                });
                // A fresh handshake invalidates clients resolved on the old one.
                self.epoch.fetch_add(1, Ordering::AcqRel);
                tracing::info!("Connected to wallet provider");
                Ok(())
            }
            Err(failure) => {
                let message = failure.message_or(CONNECTION_FAILED);
                tracing::warn!("Connection failed: {}", message);
                self.update(|s| {
                    s.connected = false;
                    s.loading = false;
                    s.error = Some(message);
                });
                Err(Error::Connection(failure))
            }
        }
    }

    /// Sync the connected flag with the provider without suspending.
    ///
    /// A recorded error survives while the provider stays disconnected.
    pub fn check_connection_status(&self) -> bool {
        let connected = self.provider.is_connected();
        self.update(|s| {
            s.connected = connected;
            if connected {
                s.error = None;
            }
        });
        connected
    }

    /// Record a failure raised while talking to an already-connected provider.
    pub(crate) fn record_failure(&self, message: String) {
        self.update(|s| {
            s.connected = false;
            s.loading = false;
            s.error = Some(message);
        });
    }

    /// Apply `f` to a copy of the current state and publish it if anything changed.
    fn update(&self, f: impl FnOnce(&mut ConnectionState)) {
        let mut flipped = false;
        self.state.send_if_modified(|state| {
            let mut next = state.clone();
            f(&mut next);
            if next == *state {
                return false;
            }
            flipped = next.connected != state.connected;
            *state = next;
            true
        });
        if flipped {
            self.epoch.fetch_add(1, Ordering::AcqRel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use penstake_core::Failure;

    fn broker(provider: MockProvider) -> ConnectionBroker<MockProvider> {
        ConnectionBroker::new(Arc::new(provider))
    }

    #[test]
    fn starts_disconnected() {
        let b = broker(MockProvider::new());
        assert_eq!(b.state(), ConnectionState::initial());
    }

    #[tokio::test]
    async fn connect_success() {
        let b = broker(MockProvider::new());
        b.request_connection().await.unwrap();
        assert_eq!(
            b.state(),
            ConnectionState {
                connected: true,
                loading: false,
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn connect_failure_is_recorded_and_returned() {
        let b = broker(MockProvider::new().fail_connect(Failure::message("user rejected")));
        let err = b.request_connection().await.unwrap_err();
        assert!(matches!(err, Error::Connection(Failure::Message(ref m)) if m == "user rejected"));
        assert_eq!(
            b.state(),
            ConnectionState {
                connected: false,
                loading: false,
                error: Some("user rejected".into()),
            }
        );
    }

    #[tokio::test]
    async fn opaque_connect_failure_uses_fallback() {
        let b = broker(MockProvider::new().fail_connect(Failure::Opaque));
        assert!(b.request_connection().await.is_err());
        assert_eq!(b.state().error.as_deref(), Some("Connection failed"));
    }

    #[tokio::test]
    async fn loading_is_visible_only_during_connect() {
        let provider = Arc::new(MockProvider::new());
        let b = ConnectionBroker::new(provider.clone());
        let mut rx = b.subscribe();
        provider.on_connect({
            let rx = rx.clone();
            move || assert!(rx.borrow().loading)
        });
        b.request_connection().await.unwrap();
        assert!(!rx.borrow_and_update().loading);
    }

    #[tokio::test]
    async fn status_check_preserves_error_while_disconnected() {
        let b = broker(MockProvider::new().fail_connect(Failure::message("locked")));
        let _ = b.request_connection().await;

        assert!(!b.check_connection_status());
        let first = b.state();
        assert!(!b.check_connection_status());
        assert_eq!(b.state(), first);
        assert_eq!(first.error.as_deref(), Some("locked"));
    }

    #[tokio::test]
    async fn status_check_clears_error_once_connected() {
        let provider = Arc::new(MockProvider::new().fail_connect(Failure::message("locked")));
        let b = ConnectionBroker::new(provider.clone());
        let _ = b.request_connection().await;

        provider.set_connected(true);
        assert!(b.check_connection_status());
        assert_eq!(b.state().error, None);
        assert!(b.state().connected);
    }

    #[tokio::test]
    async fn epoch_moves_on_connect_and_loss() {
        let b = broker(MockProvider::new());
        let start = b.epoch();
        b.request_connection().await.unwrap();
        let connected = b.epoch();
        assert!(connected > start);

        b.record_failure("gone".into());
        assert!(b.epoch() > connected);
    }
}
