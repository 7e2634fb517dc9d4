//! In-memory wallet provider for tests and demos.
//!
//! [`MockProvider`] implements every provider contract against shared
//! in-process state, with knobs for failure injection and counters for
//! verification.
//!
//! # Example
//!
//! ```no_run
//! use penstake_client::mock::MockProvider;
//! use penstake_client::{ConnectionBroker, ServiceClientCache};
//! use penstake_core::{Failure, Service, StakeService};
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let provider = Arc::new(
//!     MockProvider::new().fail_service(StakeService::DESCRIPTOR, Failure::message("locked")),
//! );
//! let broker = Arc::new(ConnectionBroker::new(provider.clone()));
//! let clients = ServiceClientCache::new(broker.clone());
//!
//! assert!(clients.acquire::<StakeService>().await.is_err());
//! assert_eq!(broker.state().error.as_deref(), Some("locked"));
//! # }
//! ```

use crate::notify::{NotificationKind, Notifier, ProgressId};
use crate::provider::{
    AssetStream, Provide, Provider, ProviderResult, StakeClient, ViewClient,
};
use futures_util::stream::{self, StreamExt};
use penstake_core::{
    Amount, AssetId, AssetsResponse, CustodyService, DenomUnit, Failure, GovernanceService,
    IdentityKey, Metadata, RateData, Service, ServiceDescriptor, StakeService, Transaction,
    TransactionId, TransactionPlan, TransactionPlannerRequest, TransactionPlannerResponse,
    ValidatorInfo, ValidatorInfoRequest, ValidatorInfoResponse, ViewService,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Knobs {
    connect_failure: Option<Failure>,
    service_failures: HashMap<ServiceDescriptor, Failure>,
    resolutions: HashMap<ServiceDescriptor, usize>,
    plan: Option<TransactionPlan>,
    planner_failure: Option<Failure>,
    planner_requests: Vec<TransactionPlannerRequest>,
    assets: Vec<ProviderResult<AssetsResponse>>,
    validators: HashMap<IdentityKey, ValidatorInfo>,
    authorize_failure: Option<Failure>,
    broadcast_failure: Option<Failure>,
    broadcast_gate: Option<Arc<Notify>>,
    on_connect: Option<Hook>,
    on_broadcast: Option<Hook>,
}

#[derive(Default)]
struct Shared {
    connected: AtomicBool,
    asset_queries: AtomicUsize,
    broadcasts: AtomicUsize,
    knobs: Mutex<Knobs>,
}

impl Shared {
    fn knobs(&self) -> MutexGuard<'_, Knobs> {
        self.knobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A scriptable stand-in for the wallet extension.
#[derive(Clone)]
pub struct MockProvider {
    shared: Arc<Shared>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Disconnected provider whose planner returns a plan and whose calls all succeed.
    pub fn new() -> Self {
        let shared = Shared::default();
        shared.knobs().plan = Some(TransactionPlan(serde_json::json!({
            "actions": [{ "delegate": {} }]
        })));
        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn fail_connect(self, failure: Failure) -> Self {
        self.shared.knobs().connect_failure = Some(failure);
        self
    }

    pub fn fail_service(self, descriptor: ServiceDescriptor, failure: Failure) -> Self {
        self.shared.knobs().service_failures.insert(descriptor, failure);
        self
    }

    pub fn with_assets(self, assets: Vec<AssetsResponse>) -> Self {
        self.shared.knobs().assets = assets.into_iter().map(Ok).collect();
        self
    }

    /// Make the asset stream fail after yielding `assets`.
    pub fn with_broken_asset_stream(self, assets: Vec<AssetsResponse>, failure: Failure) -> Self {
        let mut items: Vec<_> = assets.into_iter().map(Ok).collect();
        items.push(Err(failure));
        self.shared.knobs().assets = items;
        self
    }

    pub fn with_validator(self, info: (IdentityKey, ValidatorInfo)) -> Self {
        self.shared.knobs().validators.insert(info.0, info.1);
        self
    }

    pub fn without_plan(self) -> Self {
        self.set_plan(None);
        self
    }

    pub fn fail_planner(self, failure: Failure) -> Self {
        self.shared.knobs().planner_failure = Some(failure);
        self
    }

    pub fn fail_authorize(self, failure: Failure) -> Self {
        self.shared.knobs().authorize_failure = Some(failure);
        self
    }

    pub fn fail_broadcast(self, failure: Failure) -> Self {
        self.shared.knobs().broadcast_failure = Some(failure);
        self
    }

    pub fn set_plan(&self, plan: Option<TransactionPlan>) {
        self.shared.knobs().plan = plan;
    }

    pub fn set_connected(&self, connected: bool) {
        self.shared.connected.store(connected, Ordering::Release);
    }

    /// Run `hook` inside every connect call, before it resolves.
    pub fn on_connect(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.shared.knobs().on_connect = Some(Box::new(hook));
    }

    /// Run `hook` inside every broadcast, before it resolves.
    pub fn on_broadcast(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.shared.knobs().on_broadcast = Some(Box::new(hook));
    }

    /// Park broadcasts until the returned handle is notified.
    pub fn hold_broadcast(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.shared.knobs().broadcast_gate = Some(gate.clone());
        gate
    }

    /// How many times a client for `descriptor` was handed out or refused.
    pub fn resolutions(&self, descriptor: ServiceDescriptor) -> usize {
        self.shared.knobs().resolutions.get(&descriptor).copied().unwrap_or(0)
    }

    pub fn planner_requests(&self) -> Vec<TransactionPlannerRequest> {
        self.shared.knobs().planner_requests.clone()
    }

    pub fn asset_queries(&self) -> usize {
        self.shared.asset_queries.load(Ordering::Acquire)
    }

    pub fn broadcasts(&self) -> usize {
        self.shared.broadcasts.load(Ordering::Acquire)
    }

    fn resolve<C>(&self, descriptor: ServiceDescriptor, client: C) -> ProviderResult<C> {
        let mut knobs = self.shared.knobs();
        *knobs.resolutions.entry(descriptor).or_default() += 1;
        match knobs.service_failures.get(&descriptor) {
            Some(failure) => Err(failure.clone()),
            None => Ok(client),
        }
    }
}

impl Provider for MockProvider {
    async fn connect(&self) -> ProviderResult<()> {
        let failure = {
            let knobs = self.shared.knobs();
            if let Some(hook) = &knobs.on_connect {
                hook();
            }
            knobs.connect_failure.clone()
        };
        match failure {
            Some(failure) => Err(failure),
            None => {
                self.set_connected(true);
                Ok(())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }
}

/// View service client backed by [`MockProvider`] state.
#[derive(Clone)]
pub struct MockViewClient {
    shared: Arc<Shared>,
}

/// Staking query client backed by [`MockProvider`] state.
#[derive(Clone)]
pub struct MockStakeClient {
    shared: Arc<Shared>,
}

/// Client for services the mock only needs to resolve, not serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockHandle {
    pub descriptor: ServiceDescriptor,
}

impl Provide<ViewService> for MockProvider {
    type Client = MockViewClient;

    async fn service(&self) -> ProviderResult<MockViewClient> {
        let client = MockViewClient {
            shared: self.shared.clone(),
        };
        self.resolve(ViewService::DESCRIPTOR, client)
    }
}

impl Provide<StakeService> for MockProvider {
    type Client = MockStakeClient;

    async fn service(&self) -> ProviderResult<MockStakeClient> {
        let client = MockStakeClient {
            shared: self.shared.clone(),
        };
        self.resolve(StakeService::DESCRIPTOR, client)
    }
}

impl Provide<CustodyService> for MockProvider {
    type Client = MockHandle;

    async fn service(&self) -> ProviderResult<MockHandle> {
        let descriptor = CustodyService::DESCRIPTOR;
        self.resolve(descriptor, MockHandle { descriptor })
    }
}

impl Provide<GovernanceService> for MockProvider {
    type Client = MockHandle;

    async fn service(&self) -> ProviderResult<MockHandle> {
        let descriptor = GovernanceService::DESCRIPTOR;
        self.resolve(descriptor, MockHandle { descriptor })
    }
}

impl ViewClient for MockViewClient {
    async fn transaction_planner(
        &self,
        request: TransactionPlannerRequest,
    ) -> ProviderResult<TransactionPlannerResponse> {
        let mut knobs = self.shared.knobs();
        knobs.planner_requests.push(request);
        if let Some(failure) = &knobs.planner_failure {
            return Err(failure.clone());
        }
        Ok(TransactionPlannerResponse {
            plan: knobs.plan.clone(),
        })
    }

    async fn assets(&self) -> ProviderResult<AssetStream> {
        self.shared.asset_queries.fetch_add(1, Ordering::AcqRel);
        let items = self.shared.knobs().assets.clone();
        Ok(stream::iter(items).boxed())
    }

    async fn authorize_and_build(&self, plan: TransactionPlan) -> ProviderResult<Transaction> {
        if let Some(failure) = &self.shared.knobs().authorize_failure {
            return Err(failure.clone());
        }
        Ok(Transaction(serde_json::json!({ "plan": plan.0, "auth": "mock" })))
    }

    async fn broadcast_transaction(
        &self,
        transaction: Transaction,
        _await_detection: bool,
    ) -> ProviderResult<TransactionId> {
        let gate = {
            let knobs = self.shared.knobs();
            if let Some(hook) = &knobs.on_broadcast {
                hook();
            }
            knobs.broadcast_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(failure) = &self.shared.knobs().broadcast_failure {
            return Err(failure.clone());
        }
        let n = self.shared.broadcasts.fetch_add(1, Ordering::AcqRel) + 1;
        let digest = transaction.0.to_string().len();
        Ok(TransactionId(format!("{n:04x}{digest:060x}")))
    }
}

impl StakeClient for MockStakeClient {
    async fn validator_info(
        &self,
        request: ValidatorInfoRequest,
    ) -> ProviderResult<ValidatorInfoResponse> {
        match self.shared.knobs().validators.get(&request.identity_key) {
            Some(info) => Ok(ValidatorInfoResponse {
                validator_info: Some(info.clone()),
            }),
            None => Err(Failure::message(format!(
                "validator {} not found",
                request.identity_key
            ))),
        }
    }
}

/// Notifier that remembers every call.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    history: Mutex<Vec<(ProgressId, NotificationKind, String)>>,
}

impl RecordingNotifier {
    fn record(&self, kind: NotificationKind, message: &str, id: ProgressId) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, kind, message.to_string()));
    }

    /// Every call in order.
    pub fn history(&self) -> Vec<(ProgressId, NotificationKind, String)> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// What is currently shown under `id`.
    pub fn current(&self, id: ProgressId) -> Option<(NotificationKind, String)> {
        self.history()
            .into_iter()
            .rev()
            .find(|(i, _, _)| *i == id)
            .map(|(_, kind, msg)| (kind, msg))
    }

    /// The most recent call.
    pub fn last(&self) -> Option<(NotificationKind, String)> {
        self.history().pop().map(|(_, kind, msg)| (kind, msg))
    }

    /// Distinct ids used so far, i.e. the number of visible notifications.
    pub fn ids(&self) -> BTreeSet<ProgressId> {
        self.history().into_iter().map(|(id, _, _)| id).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn loading(&self, message: &str, id: ProgressId) {
        self.record(NotificationKind::Loading, message, id)
    }

    fn success(&self, message: &str, id: ProgressId) {
        self.record(NotificationKind::Success, message, id)
    }

    fn error(&self, message: &str, id: ProgressId) {
        self.record(NotificationKind::Error, message, id)
    }
}

/// Metadata for a test asset whose id bytes are all `id`.
pub fn sample_metadata(id: u8, symbol: &str) -> Metadata {
    let base = format!("u{}", symbol.to_lowercase());
    Metadata {
        penumbra_asset_id: AssetId([id; AssetId::LEN]),
        display: symbol.to_lowercase(),
        symbol: symbol.to_string(),
        denom_units: vec![
            DenomUnit {
                denom: base.clone(),
                exponent: 0,
            },
            DenomUnit {
                denom: symbol.to_lowercase(),
                exponent: 6,
            },
        ],
        base,
    }
}

/// A validator with rate data, ready for [`MockProvider::with_validator`].
pub fn sample_validator(identity_key: &IdentityKey) -> (IdentityKey, ValidatorInfo) {
    let info = ValidatorInfo {
        name: format!("validator {}", identity_key.payload()),
        rate_data: Some(RateData {
            identity_key: identity_key.clone(),
            epoch_index: 1,
            validator_reward_rate: Amount::from(10_000u64),
            validator_exchange_rate: Amount::from(100_000_000u64),
        }),
    };
    (identity_key.clone(), info)
}
