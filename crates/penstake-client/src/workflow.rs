//! Delegation workflow: plan, authorize, submit.
//!
//! ```text
//!          submit()              success
//!   Idle ───────────▶ Submitting ───────▶ Idle
//!    ▲                    │
//!    │                    │ failure
//!    │     submit()       ▼
//!    └──────────────── Error
//! ```
//!
//! Progress is reported through one notification id per submission. Failures
//! inside a submission are absorbed: they end up in the workflow state, the
//! notification and the returned [`Outcome`], never as an `Err`.

use crate::clients::ServiceClientCache;
use crate::error::{Error, Result};
use crate::notify::{Notifier, ProgressId};
use crate::provider::{ClientOf, Provide, StakeClient, ViewClient};
use crate::submit::{AuthorizeAndBroadcast, SubmissionPipeline};
use penstake_core::{
    Amount, FeeTier, IdentityKey, RateData, StakeService, TransactionId, TransactionPlan,
    TransactionPlannerRequest, ValidatorInfoRequest, ViewService,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

pub const PREPARING_MESSAGE: &str = "Preparing to submit stake...";
pub const PLANNING_MESSAGE: &str = "Planning stake transaction...";
pub const AUTHORIZING_MESSAGE: &str = "Authorizing stake transaction...";
pub const SUCCESS_MESSAGE: &str = "Delegation submitted successfully!";
const UNKNOWN_ERROR: &str = "An unknown error occurred";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkflowState {
    #[default]
    Idle,
    Submitting,
    Error,
}

/// How a submission that ran to completion ended.
#[derive(Debug, Clone)]
pub enum Outcome {
    Submitted(TransactionId),
    Failed(Error),
}

impl Outcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }
}

/// Text shown when a submission fails.
pub fn failure_notification(err: &Error) -> String {
    format!(
        "Failed to submit delegation: {}",
        err.user_message().as_deref().unwrap_or(UNKNOWN_ERROR)
    )
}

/// One delegation widget's worth of state.
pub struct StakeWorkflow<P, N, X> {
    clients: Arc<ServiceClientCache<P>>,
    notifier: N,
    pipeline: X,
    fee_tier: FeeTier,
    state: watch::Sender<WorkflowState>,
    last_error: Mutex<Option<Error>>,
}

impl<P, N> StakeWorkflow<P, N, AuthorizeAndBroadcast<N>>
where
    N: Notifier + Clone,
{
    /// A workflow submitting through the view service.
    pub fn standard(clients: Arc<ServiceClientCache<P>>, notifier: N) -> Self {
        let pipeline = AuthorizeAndBroadcast::new(notifier.clone());
        Self::new(clients, notifier, pipeline)
    }
}

impl<P, N, X> StakeWorkflow<P, N, X> {
    pub fn new(clients: Arc<ServiceClientCache<P>>, notifier: N, pipeline: X) -> Self {
        let (state, _) = watch::channel(WorkflowState::Idle);
        Self {
            clients,
            notifier,
            pipeline,
            fee_tier: FeeTier::default(),
            state,
            last_error: Mutex::new(None),
        }
    }

    pub fn with_fee_tier(mut self, fee_tier: FeeTier) -> Self {
        self.fee_tier = fee_tier;
        self
    }

    pub fn state(&self) -> WorkflowState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    /// A submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.state() == WorkflowState::Submitting
    }

    /// Error of the most recent submission, cleared by a successful one.
    pub fn last_error(&self) -> Option<Error> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_last_error(&self, err: Option<Error>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = err;
    }
}

impl<P, N, X> StakeWorkflow<P, N, X>
where
    P: Provide<ViewService> + Provide<StakeService>,
    ClientOf<P, ViewService>: ViewClient,
    ClientOf<P, StakeService>: StakeClient,
    N: Notifier,
    X: SubmissionPipeline<ClientOf<P, ViewService>>,
{
    /// Delegate `amount` from `account` to `validator`.
    ///
    /// Returns `Err` only when another submission on this workflow is still
    /// running; every other failure is reported as [`Outcome::Failed`].
    pub async fn submit(
        &self,
        amount: Amount,
        account: u32,
        validator: &IdentityKey,
    ) -> Result<Outcome> {
        let progress = ProgressId::next();
        let Some(busy) = Busy::acquire(&self.state, &self.notifier, &self.last_error, progress)
        else {
            tracing::warn!("Rejecting delegation to {}: submission in progress", validator);
            return Err(Error::ConcurrentSubmission);
        };

        self.notifier.loading(PREPARING_MESSAGE, progress);

        match self.run(amount, account, validator, progress).await {
            Ok(id) => {
                tracing::info!("Delegated {} to {} in {}", amount, validator, id);
                self.notifier.success(SUCCESS_MESSAGE, progress);
                self.set_last_error(None);
                busy.finish(WorkflowState::Idle);
                Ok(Outcome::Submitted(id))
            }
            Err(err) => {
                tracing::warn!("Delegation to {} failed: {}", validator, err);
                self.notifier.error(&failure_notification(&err), progress);
                self.set_last_error(Some(err.clone()));
                busy.finish(WorkflowState::Error);
                Ok(Outcome::Failed(err))
            }
        }
    }

    async fn run(
        &self,
        amount: Amount,
        account: u32,
        validator: &IdentityKey,
        progress: ProgressId,
    ) -> Result<TransactionId> {
        self.notifier.loading(PLANNING_MESSAGE, progress);
        let view = self.clients.acquire::<ViewService>().await?;
        let stake = self.clients.acquire::<StakeService>().await?;

        let rate_data = self.rate_data(&stake, validator).await?;
        let plan = self.plan(&view, amount, account, rate_data).await?;

        self.notifier.loading(AUTHORIZING_MESSAGE, progress);
        self.pipeline.submit(&view, plan, progress).await
    }

    async fn rate_data(
        &self,
        stake: &ClientOf<P, StakeService>,
        validator: &IdentityKey,
    ) -> Result<RateData> {
        let response = stake
            .validator_info(ValidatorInfoRequest {
                identity_key: validator.clone(),
            })
            .await
            .map_err(|source| Error::Query {
                rpc: "validator_info",
                source,
            })?;

        response
            .validator_info
            .and_then(|info| info.rate_data)
            .ok_or_else(|| Error::MissingRateData(validator.clone()))
    }

    async fn plan(
        &self,
        view: &ClientOf<P, ViewService>,
        amount: Amount,
        account: u32,
        rate_data: RateData,
    ) -> Result<TransactionPlan> {
        let request =
            TransactionPlannerRequest::delegate(self.fee_tier, account, amount, rate_data);
        tracing::debug!("Planning delegation of {} from account {}", amount, account);

        let response = view
            .transaction_planner(request)
            .await
            .map_err(|source| Error::Query {
                rpc: "transaction_planner",
                source,
            })?;
        response.plan.ok_or(Error::Planning)
    }
}

/// Exclusive claim on a workflow for one submission.
///
/// Dropping it before [`Busy::finish`] (the submit future was cancelled)
/// replaces the progress notification with a cancellation error and leaves
/// the workflow in the `Error` state.
struct Busy<'a> {
    state: &'a watch::Sender<WorkflowState>,
    notifier: &'a dyn Notifier,
    last_error: &'a Mutex<Option<Error>>,
    progress: ProgressId,
    finished: bool,
}

impl<'a> Busy<'a> {
    fn acquire(
        state: &'a watch::Sender<WorkflowState>,
        notifier: &'a dyn Notifier,
        last_error: &'a Mutex<Option<Error>>,
        progress: ProgressId,
    ) -> Option<Self> {
        let claimed = state.send_if_modified(|s| {
            if *s == WorkflowState::Submitting {
                return false;
            }
            *s = WorkflowState::Submitting;
            true
        });
        claimed.then_some(Self {
            state,
            notifier,
            last_error,
            progress,
            finished: false,
        })
    }

    fn finish(mut self, next: WorkflowState) {
        self.finished = true;
        self.state.send_replace(next);
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!("Delegation submission cancelled");
        let err = Error::Cancelled;
        self.notifier.error(&failure_notification(&err), self.progress);
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
        self.state.send_replace(WorkflowState::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::ConnectionBroker;
    use crate::mock::{MockProvider, RecordingNotifier, sample_validator};
    use crate::notify::NotificationKind;
    use penstake_core::{Failure, FeeMode, Service};

    type Workflow = StakeWorkflow<
        MockProvider,
        Arc<RecordingNotifier>,
        AuthorizeAndBroadcast<Arc<RecordingNotifier>>,
    >;

    fn validator() -> IdentityKey {
        "penumbravalid1testvalidator".parse().unwrap()
    }

    async fn setup(
        provider: MockProvider,
    ) -> (Arc<MockProvider>, Arc<RecordingNotifier>, Workflow) {
        let provider = Arc::new(provider.with_validator(sample_validator(&validator())));
        let broker = Arc::new(ConnectionBroker::new(provider.clone()));
        broker.request_connection().await.unwrap();
        let clients = Arc::new(ServiceClientCache::new(broker));
        let notifier = Arc::new(RecordingNotifier::default());
        let workflow = StakeWorkflow::standard(clients, notifier.clone());
        (provider, notifier, workflow)
    }

    #[tokio::test]
    async fn happy_path() {
        let (provider, notifier, workflow) = setup(MockProvider::new()).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        provider.on_broadcast({
            let rx = workflow.subscribe();
            let seen = seen.clone();
            move || seen.lock().unwrap().push(*rx.borrow())
        });

        let outcome = workflow.submit(Amount::from(100u64), 0, &validator()).await.unwrap();
        seen.lock().unwrap().push(workflow.state());

        assert!(outcome.is_submitted());
        assert_eq!(*seen.lock().unwrap(), vec![WorkflowState::Submitting, WorkflowState::Idle]);

        let (kind, text) = notifier.last().unwrap();
        assert_eq!(kind, NotificationKind::Success);
        assert!(text.contains("successfully"));
        assert_eq!(notifier.ids().len(), 1);
        assert!(workflow.last_error().is_none());
    }

    #[tokio::test]
    async fn planner_request_carries_amount_account_and_rate_data() {
        let (provider, _, workflow) = setup(MockProvider::new()).await;
        workflow.submit(Amount::new(u128::from(u64::MAX) + 5), 3, &validator()).await.unwrap();

        let requests = provider.planner_requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.fee_mode, FeeMode::AutoFee { fee_tier: FeeTier::Low });
        assert_eq!(request.source.account, 3);
        assert_eq!(request.delegations[0].amount, Amount { lo: 4, hi: 1 });
        assert_eq!(request.delegations[0].rate_data.identity_key, validator());
    }

    #[tokio::test]
    async fn missing_plan_fails_workflow() {
        let (provider, notifier, workflow) = setup(MockProvider::new().without_plan()).await;

        let outcome = workflow.submit(Amount::from(100u64), 0, &validator()).await.unwrap();

        assert!(matches!(outcome, Outcome::Failed(Error::Planning)));
        assert_eq!(workflow.state(), WorkflowState::Error);
        assert_eq!(
            notifier.last().unwrap(),
            (
                NotificationKind::Error,
                "Failed to submit delegation: Failed to create transaction plan".to_string()
            )
        );
        assert_eq!(provider.broadcasts(), 0);
    }

    #[tokio::test]
    async fn broadcast_rejection_fails_workflow() {
        let (_, notifier, workflow) =
            setup(MockProvider::new().fail_broadcast(Failure::message("network down"))).await;

        let outcome = workflow.submit(Amount::from(100u64), 0, &validator()).await.unwrap();

        assert!(matches!(outcome, Outcome::Failed(Error::Submission(_))));
        assert_eq!(workflow.state(), WorkflowState::Error);
        assert_eq!(notifier.last().unwrap().1, "Failed to submit delegation: network down");
    }

    #[tokio::test]
    async fn opaque_failure_reads_unknown() {
        let (_, notifier, workflow) =
            setup(MockProvider::new().fail_broadcast(Failure::Opaque)).await;

        workflow.submit(Amount::from(1u64), 0, &validator()).await.unwrap();
        assert_eq!(
            notifier.last().unwrap().1,
            "Failed to submit delegation: An unknown error occurred"
        );
    }

    #[tokio::test]
    async fn empty_failure_message_is_shown_as_is() {
        let (_, notifier, workflow) =
            setup(MockProvider::new().fail_broadcast(Failure::message(""))).await;

        workflow.submit(Amount::from(1u64), 0, &validator()).await.unwrap();
        assert_eq!(notifier.last().unwrap().1, "Failed to submit delegation: ");
    }

    #[tokio::test]
    async fn acquisition_failure_fails_workflow_and_marks_disconnected() {
        let provider = MockProvider::new().fail_service(StakeService::DESCRIPTOR, Failure::Opaque);
        let (_, notifier, workflow) = setup(provider).await;

        let outcome = workflow.submit(Amount::from(1u64), 0, &validator()).await.unwrap();

        assert!(matches!(outcome, Outcome::Failed(Error::ClientAcquisition { .. })));
        assert!(!workflow.clients.broker().state().connected);
        assert_eq!(
            notifier.last().unwrap().1,
            "Failed to submit delegation: An unknown error occurred"
        );
    }

    #[tokio::test]
    async fn unknown_validator_is_query_error() {
        let (_, _, workflow) = setup(MockProvider::new()).await;
        let other: IdentityKey = "penumbravalid1other".parse().unwrap();

        let outcome = workflow.submit(Amount::from(1u64), 0, &other).await.unwrap();
        assert!(matches!(
            outcome,
            Outcome::Failed(Error::Query {
                rpc: "validator_info",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn validator_without_rate_data_fails_workflow() {
        let bare: IdentityKey = "penumbravalid1bare".parse().unwrap();
        let (key, mut info) = sample_validator(&bare);
        info.rate_data = None;
        let (provider, notifier, workflow) =
            setup(MockProvider::new().with_validator((key, info))).await;

        let outcome = workflow.submit(Amount::from(1u64), 0, &bare).await.unwrap();

        assert!(
            matches!(outcome, Outcome::Failed(Error::MissingRateData(ref ik)) if *ik == bare)
        );
        assert_eq!(workflow.state(), WorkflowState::Error);
        assert_eq!(
            notifier.last().unwrap(),
            (
                NotificationKind::Error,
                "Failed to submit delegation: No rate data for validator penumbravalid1bare"
                    .to_string()
            )
        );
        assert!(provider.planner_requests().is_empty());
    }

    #[tokio::test]
    async fn retry_after_error_succeeds() {
        let (provider, _, workflow) = setup(MockProvider::new().without_plan()).await;
        workflow.submit(Amount::from(1u64), 0, &validator()).await.unwrap();
        assert_eq!(workflow.state(), WorkflowState::Error);

        provider.set_plan(Some(TransactionPlan(serde_json::json!({ "retry": true }))));
        let outcome = workflow.submit(Amount::from(1u64), 0, &validator()).await.unwrap();
        assert!(outcome.is_submitted());
        assert_eq!(workflow.state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn notification_sequence_reuses_one_id() {
        let (_, notifier, workflow) = setup(MockProvider::new()).await;
        workflow.submit(Amount::from(1u64), 0, &validator()).await.unwrap();

        let messages: Vec<String> = notifier.history().into_iter().map(|(_, _, m)| m).collect();
        assert_eq!(
            messages,
            vec![
                PREPARING_MESSAGE,
                PLANNING_MESSAGE,
                AUTHORIZING_MESSAGE,
                "Building transaction...",
                "Broadcasting transaction...",
                SUCCESS_MESSAGE,
            ]
        );
        assert_eq!(notifier.ids().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_submit_is_rejected() {
        let (provider, _, workflow) = setup(MockProvider::new()).await;
        let gate = provider.hold_broadcast();
        let workflow = Arc::new(workflow);

        let first = tokio::spawn({
            let workflow = workflow.clone();
            async move { workflow.submit(Amount::from(1u64), 0, &validator()).await }
        });
        workflow
            .subscribe()
            .wait_for(|s| *s == WorkflowState::Submitting)
            .await
            .unwrap();

        let second = workflow.submit(Amount::from(2u64), 0, &validator()).await;
        assert!(matches!(second, Err(Error::ConcurrentSubmission)));

        gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(first.is_submitted());
        assert_eq!(provider.broadcasts(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_submit_releases_workflow() {
        let (provider, notifier, workflow) = setup(MockProvider::new()).await;
        let _gate = provider.hold_broadcast();
        let reached = Arc::new(tokio::sync::Notify::new());
        provider.on_broadcast({
            let reached = reached.clone();
            move || reached.notify_one()
        });
        let workflow = Arc::new(workflow);

        let task = tokio::spawn({
            let workflow = workflow.clone();
            async move { workflow.submit(Amount::from(1u64), 0, &validator()).await }
        });
        reached.notified().await;
        let progress = *notifier.ids().iter().next().unwrap();
        assert_eq!(notifier.current(progress).unwrap().0, NotificationKind::Loading);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert_eq!(workflow.state(), WorkflowState::Error);
        assert_eq!(
            notifier.current(progress).unwrap(),
            (
                NotificationKind::Error,
                "Failed to submit delegation: Submission was cancelled".to_string()
            )
        );
        assert!(matches!(workflow.last_error(), Some(Error::Cancelled)));

        // The workflow accepts a retry after cancellation.
        provider.hold_broadcast().notify_one();
        let retry = workflow.submit(Amount::from(1u64), 0, &validator()).await.unwrap();
        assert!(retry.is_submitted());
    }
}
