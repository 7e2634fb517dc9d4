//! Folding streamed list queries into maps.

use crate::clients::ServiceClientCache;
use crate::error::{Error, Result};
use crate::provider::{ClientOf, Provide, ViewClient};
use futures_util::{Stream, StreamExt};
use penstake_core::{AssetId, Failure, Metadata, ViewService};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Fold a stream into a map, the last value for a key winning.
///
/// `key` returns `None` for items that cannot be keyed; those are skipped.
/// The first stream error aborts the fold.
pub async fn fold_latest<S, T, K, V, F>(
    stream: S,
    mut key: F,
) -> std::result::Result<HashMap<K, V>, Failure>
where
    S: Stream<Item = std::result::Result<T, Failure>>,
    K: Eq + Hash,
    F: FnMut(T) -> Option<(K, V)>,
{
    let mut stream = std::pin::pin!(stream);
    let mut map = HashMap::new();
    while let Some(item) = stream.next().await {
        if let Some((k, v)) = key(item?) {
            map.insert(k, v);
        }
    }
    Ok(map)
}

/// Bulk list queries gated on the broker's connected flag.
pub struct StreamAggregator<P> {
    clients: Arc<ServiceClientCache<P>>,
}

impl<P> StreamAggregator<P>
where
    P: Provide<ViewService>,
    ClientOf<P, ViewService>: ViewClient,
{
    pub fn new(clients: Arc<ServiceClientCache<P>>) -> Self {
        Self { clients }
    }

    /// Whether a query would run right now.
    pub fn enabled(&self) -> bool {
        self.clients.broker().is_connected()
    }

    /// Every asset known to the wallet, keyed by id.
    ///
    /// Returns an empty map without touching the provider while disconnected.
    /// Acquisition failures propagate as [`Error::ClientAcquisition`].
    pub async fn assets(&self) -> Result<HashMap<AssetId, Metadata>> {
        if !self.enabled() {
            tracing::debug!("Skipping asset query while disconnected");
            return Ok(HashMap::new());
        }

        let view = self.clients.acquire::<ViewService>().await?;
        let stream = view
            .assets()
            .await
            .map_err(|source| Error::Query { rpc: "assets", source })?;

        let assets = fold_latest(stream, |response| {
            let record = response.into_record();
            if record.is_none() {
                tracing::warn!("Skipping asset response without metadata");
            }
            record.map(|r| (r.id, r.metadata))
        })
        .await
        .map_err(|source| Error::Query { rpc: "assets", source })?;

        tracing::debug!("Collected {} assets", assets.len());
        Ok(assets)
    }
}
