//! Contracts of the external wallet provider and the clients it hands out.
//!
//! The provider owns the transport; this crate only sequences calls against
//! it. Every method reports failures as [`Failure`], classified by the
//! implementation at the point the call is made.

use futures_util::stream::BoxStream;
use penstake_core::{
    AssetsResponse, Failure, Service, Transaction, TransactionId, TransactionPlan,
    TransactionPlannerRequest, TransactionPlannerResponse, ValidatorInfoRequest,
    ValidatorInfoResponse,
};
use std::future::Future;

pub type ProviderResult<T> = std::result::Result<T, Failure>;

/// Items of a wallet asset query, in arrival order.
pub type AssetStream = BoxStream<'static, ProviderResult<AssetsResponse>>;

/// A connection-gated wallet provider.
pub trait Provider: Send + Sync + 'static {
    /// Run the connection handshake.
    fn connect(&self) -> impl Future<Output = ProviderResult<()>> + Send;

    /// Point-in-time connected flag. Must not block.
    fn is_connected(&self) -> bool;
}

/// A provider able to hand out clients for service `S`.
pub trait Provide<S: Service>: Provider {
    type Client: Clone + Send + Sync + 'static;

    /// Resolve a client. May suspend if the provider must refresh its connection.
    fn service(&self) -> impl Future<Output = ProviderResult<Self::Client>> + Send;
}

/// The client type a provider hands out for `S`.
pub type ClientOf<P, S> = <P as Provide<S>>::Client;

/// View service: planning, asset listing and transaction submission.
pub trait ViewClient: Send + Sync {
    fn transaction_planner(
        &self,
        request: TransactionPlannerRequest,
    ) -> impl Future<Output = ProviderResult<TransactionPlannerResponse>> + Send;

    /// Stream every asset the wallet knows about. The stream is finite and not
    /// restartable.
    fn assets(&self) -> impl Future<Output = ProviderResult<AssetStream>> + Send;

    /// Ask the wallet to authorize the plan and build the transaction.
    fn authorize_and_build(
        &self,
        plan: TransactionPlan,
    ) -> impl Future<Output = ProviderResult<Transaction>> + Send;

    /// Broadcast a built transaction, optionally waiting until the wallet detects it on chain.
    fn broadcast_transaction(
        &self,
        transaction: Transaction,
        await_detection: bool,
    ) -> impl Future<Output = ProviderResult<TransactionId>> + Send;
}

/// Staking query service.
pub trait StakeClient: Send + Sync {
    fn validator_info(
        &self,
        request: ValidatorInfoRequest,
    ) -> impl Future<Output = ProviderResult<ValidatorInfoResponse>> + Send;
}
