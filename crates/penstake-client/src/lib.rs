//! Orchestration between a UI and a connection-gated wallet provider.
//!
//! - [`ConnectionBroker`] owns the shared connection state.
//! - [`ServiceClientCache`] resolves typed service clients behind it.
//! - [`StreamAggregator`] folds streamed list queries into maps.
//! - [`StakeWorkflow`] plans, authorizes and submits delegations.
//!
//! The provider itself (transport, encoding, reconnection) sits behind the
//! traits in [`provider`].

mod aggregate;
mod broker;
mod clients;
mod config;
mod error;
pub mod mock;
mod notify;
pub mod provider;
mod submit;
mod workflow;

pub use aggregate::{StreamAggregator, fold_latest};
pub use broker::ConnectionBroker;
pub use clients::{CachePolicy, ServiceClientCache};
pub use config::{ClientsConfig, Config, ConfigError, WorkflowConfig};
pub use error::{CONNECTION_FAILED, Error, Result};
pub use notify::{NotificationKind, Notifier, ProgressId, TracingNotifier};
pub use provider::{AssetStream, Provide, Provider, StakeClient, ViewClient};
pub use submit::{AuthorizeAndBroadcast, SubmissionPipeline};
pub use workflow::{Outcome, StakeWorkflow, SUCCESS_MESSAGE, WorkflowState, failure_notification};

use std::sync::Arc;

/// Broker, client cache, aggregator and workflow wired to one provider.
pub struct Session<P, N> {
    pub broker: Arc<ConnectionBroker<P>>,
    pub clients: Arc<ServiceClientCache<P>>,
    pub assets: StreamAggregator<P>,
    notifier: N,
    config: Config,
}

impl<P, N> Session<P, N>
where
    P: Provide<penstake_core::ViewService>,
    provider::ClientOf<P, penstake_core::ViewService>: ViewClient,
    N: Notifier + Clone,
{
    pub fn new(provider: Arc<P>, notifier: N, config: Config) -> Self {
        let broker = Arc::new(ConnectionBroker::new(provider));
        let clients = Arc::new(ServiceClientCache::with_policy(
            broker.clone(),
            config.clients.cache,
        ));
        let assets = StreamAggregator::new(clients.clone());
        Self {
            broker,
            clients,
            assets,
            notifier,
            config,
        }
    }

    /// A fresh staking workflow, e.g. one per validator widget.
    pub fn stake_workflow(&self) -> StakeWorkflow<P, N, AuthorizeAndBroadcast<N>> {
        StakeWorkflow::standard(self.clients.clone(), self.notifier.clone())
            .with_fee_tier(self.config.workflow.fee_tier)
    }
}
