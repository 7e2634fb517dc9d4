//! Typed client resolution behind the connection gate.

use crate::broker::ConnectionBroker;
use crate::error::{Error, Result, acquisition_message};
use crate::provider::{ClientOf, Provide, Provider};
use penstake_core::{Service, ServiceDescriptor};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Whether resolved clients are reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Ask the provider on every acquisition.
    #[default]
    PerCall,
    /// Reuse a client until the broker's connection epoch changes.
    PerConnection,
}

/// Resolved clients plus the epoch they were resolved in.
#[derive(Default)]
struct Memo {
    epoch: u64,
    clients: HashMap<ServiceDescriptor, Box<dyn Any + Send + Sync>>,
}

pub struct ServiceClientCache<P> {
    broker: Arc<ConnectionBroker<P>>,
    policy: CachePolicy,
    memo: Mutex<Memo>,
}

impl<P: Provider> ServiceClientCache<P> {
    pub fn new(broker: Arc<ConnectionBroker<P>>) -> Self {
        Self::with_policy(broker, CachePolicy::default())
    }

    pub fn with_policy(broker: Arc<ConnectionBroker<P>>, policy: CachePolicy) -> Self {
        Self {
            broker,
            policy,
            memo: Mutex::new(Memo::default()),
        }
    }

    pub fn broker(&self) -> &Arc<ConnectionBroker<P>> {
        &self.broker
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Resolve a client for `S`.
    ///
    /// On failure the broker is marked disconnected with a message naming the
    /// service, and the provider's failure is returned unchanged inside
    /// [`Error::ClientAcquisition`]. No reconnection is attempted.
    pub async fn acquire<S: Service>(&self) -> Result<ClientOf<P, S>>
    where
        P: Provide<S>,
    {
        let descriptor = S::DESCRIPTOR;

        if self.policy == CachePolicy::PerConnection {
            let epoch = self.broker.epoch();
            let mut memo = self.memo.lock().await;
            if memo.epoch != epoch {
                memo.clients.clear();
                memo.epoch = epoch;
            }
            if let Some(client) = memo
                .clients
                .get(&descriptor)
                .and_then(|c| c.downcast_ref::<ClientOf<P, S>>())
            {
                tracing::debug!("Reusing {} client", descriptor.short_name());
                return Ok(client.clone());
            }
            drop(memo);

            let client = self.resolve::<S>().await?;
            let mut memo = self.memo.lock().await;
            // Resolution may have raced a connection change; only keep current clients.
            if memo.epoch == self.broker.epoch() {
                memo.clients.insert(descriptor, Box::new(client.clone()));
            }
            return Ok(client);
        }

        self.resolve::<S>().await
    }

    async fn resolve<S: Service>(&self) -> Result<ClientOf<P, S>>
    where
        P: Provide<S>,
    {
        let descriptor = S::DESCRIPTOR;
        tracing::debug!("Resolving {} client", descriptor.short_name());

        match <P as Provide<S>>::service(self.broker.provider()).await {
            Ok(client) => Ok(client),
            Err(source) => {
                let message = acquisition_message(&descriptor, &source);
                tracing::warn!("Client acquisition failed for {}: {}", descriptor, message);
                self.broker.record_failure(message);
                Err(Error::ClientAcquisition { descriptor, source })
            }
        }
    }
}
