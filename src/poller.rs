//! Lifecycle polling.
//!
//! Waits for a remote resource to settle after an asynchronous operation by
//! repeatedly describing it until a terminal state is observed.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{RemoteResource, ResourceApi};
use crate::config::{PollConfig, ResourceKind};
use crate::error::FailureCause;
use crate::state::LifecycleState;

/// How absence of the resource is treated while polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// Absence is the goal (deletion).
    Success,
    /// Absence is an error (creation, update).
    Fatal,
}

/// States that end a poll.
#[derive(Debug, Clone, Copy)]
pub struct PollTarget<'a> {
    /// States that end the poll successfully.
    pub terminal: &'a [LifecycleState],
    /// States that end the poll with a failure.
    pub failure: &'a [LifecycleState],
    /// Treatment of absence.
    pub not_found: NotFoundPolicy,
}

/// Final observation of a successful poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The resource reached a terminal state.
    Reached(RemoteResource),
    /// The resource no longer exists.
    Gone,
}

/// Repeatedly describes a resource until it settles.
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

const READY: &[LifecycleState] = &[LifecycleState::Ready];
const FAILED: &[LifecycleState] = &[LifecycleState::Failed];

impl PollTarget<'static> {
    /// Waits for `READY`, failing on `FAILED` or absence.
    #[must_use]
    pub const fn ready() -> Self {
        Self {
            terminal: READY,
            failure: FAILED,
            not_found: NotFoundPolicy::Fatal,
        }
    }

    /// Waits for the resource to disappear.
    #[must_use]
    pub const fn gone() -> Self {
        Self {
            terminal: &[],
            failure: &[],
            not_found: NotFoundPolicy::Success,
        }
    }
}

impl Poller {
    /// Creates an unbounded poller with the given interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
            cancel: None,
        }
    }

    /// Creates a poller from configuration.
    #[must_use]
    pub fn from_config(config: &PollConfig) -> Self {
        Self {
            interval: config.interval(),
            timeout: config.timeout(),
            cancel: None,
        }
    }

    /// Sets an overall deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a token that stops polling when cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Polls until the resource reaches one of the target's states.
    ///
    /// Sleeps one interval before every describe call. Cancellation and the
    /// deadline also cut an in-flight describe short.
    ///
    /// # Errors
    ///
    /// Returns `TerminalFailureState` on a failure state, `NotFound` when
    /// absence is fatal, `RemoteFailure` on any other describe error,
    /// `PollTimeout` when the deadline passes, and `ClientCancelled` when the
    /// token is cancelled.
    pub async fn await_terminal<A>(
        &self,
        api: &A,
        kind: ResourceKind,
        resource_id: &str,
        target: PollTarget<'_>,
    ) -> Result<PollOutcome, FailureCause>
    where
        A: ResourceApi + ?Sized,
    {
        let start = Instant::now();
        let deadline = self.timeout.map(|t| start + t);

        loop {
            tokio::select! {
                biased;
                cause = self.interrupted(start, deadline) => {
                    debug!("Polling {kind} {resource_id} stopped: {cause}");
                    return Err(cause);
                }
                () = tokio::time::sleep(self.interval) => {}
            }

            // A hung describe must not hold back cancellation or the deadline.
            let described = tokio::select! {
                biased;
                cause = self.interrupted(start, deadline) => {
                    debug!("Polling {kind} {resource_id} stopped mid-request: {cause}");
                    return Err(cause);
                }
                described = api.describe(kind, resource_id) => described,
            };

            match described {
                Ok(resource) => {
                    debug!("{kind} {resource_id} is {}", resource.state);
                    if target.failure.contains(&resource.state) {
                        return Err(FailureCause::TerminalFailureState { state: resource.state });
                    }
                    if target.terminal.contains(&resource.state) {
                        return Ok(PollOutcome::Reached(resource));
                    }
                }
                Err(err) if err.is_not_found() => {
                    debug!("{kind} {resource_id} not found");
                    return match target.not_found {
                        NotFoundPolicy::Success => Ok(PollOutcome::Gone),
                        NotFoundPolicy::Fatal => Err(FailureCause::NotFound),
                    };
                }
                Err(err) => return Err(FailureCause::RemoteFailure(err)),
            }
        }
    }

    /// Resolves once the token is cancelled or the deadline passes.
    async fn interrupted(&self, start: Instant, deadline: Option<Instant>) -> FailureCause {
        tokio::select! {
            biased;
            () = Self::cancelled(self.cancel.as_ref()) => FailureCause::ClientCancelled,
            () = Self::deadline(deadline) => FailureCause::PollTimeout { elapsed: start.elapsed() },
        }
    }

    async fn cancelled(token: Option<&CancellationToken>) {
        match token {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    }

    async fn deadline(deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ApiResult, AttributeUpdate, CreatedResource, FilterDescription, MockResourceApi, RemoteAttributes,
    };
    use crate::config::{Credentials, ResourceConfig};
    use crate::error::ApiError;
    use std::collections::VecDeque;

    fn fast() -> Poller {
        Poller::new(Duration::from_millis(5))
    }

    fn filter(state: LifecycleState) -> RemoteResource {
        RemoteResource {
            resource_id: String::from("flt-1"),
            state,
            attributes: RemoteAttributes::Filter(FilterDescription {
                data_source_id: String::from("ds-1"),
                description: None,
            }),
        }
    }

    fn scripted(responses: Vec<Result<RemoteResource, ApiError>>) -> MockResourceApi {
        let count = responses.len();
        let mut queue: VecDeque<_> = responses.into();
        let mut api = MockResourceApi::new();
        api.expect_describe()
            .times(count)
            .returning(move |_, _| queue.pop_front().unwrap_or_else(|| Err(ApiError::network("exhausted"))));
        api
    }

    #[tokio::test]
    async fn test_waits_until_ready() {
        let api = scripted(vec![
            Ok(filter(LifecycleState::Creating)),
            Ok(filter(LifecycleState::Other(String::from("PROVISIONING")))),
            Ok(filter(LifecycleState::Ready)),
        ]);

        let outcome = fast()
            .await_terminal(&api, ResourceKind::Filter, "flt-1", PollTarget::ready())
            .await
            .expect("poll");

        assert_eq!(outcome, PollOutcome::Reached(filter(LifecycleState::Ready)));
    }

    #[tokio::test]
    async fn test_failure_state_is_terminal() {
        let api = scripted(vec![Ok(filter(LifecycleState::Creating)), Ok(filter(LifecycleState::Failed))]);

        let err = fast()
            .await_terminal(&api, ResourceKind::Filter, "flt-1", PollTarget::ready())
            .await
            .expect_err("failed");

        assert!(matches!(
            err,
            FailureCause::TerminalFailureState {
                state: LifecycleState::Failed
            }
        ));
    }

    #[tokio::test]
    async fn test_not_found_is_success_when_deleting() {
        let api = scripted(vec![
            Ok(filter(LifecycleState::Deleting)),
            Err(ApiError::not_found(ResourceKind::Filter, "flt-1")),
        ]);

        let outcome = fast()
            .await_terminal(&api, ResourceKind::Filter, "flt-1", PollTarget::gone())
            .await
            .expect("poll");

        assert_eq!(outcome, PollOutcome::Gone);
    }

    #[tokio::test]
    async fn test_not_found_is_fatal_when_creating() {
        let api = scripted(vec![Err(ApiError::not_found(ResourceKind::Filter, "flt-1"))]);

        let err = fast()
            .await_terminal(&api, ResourceKind::Filter, "flt-1", PollTarget::ready())
            .await
            .expect_err("not found");

        assert!(matches!(err, FailureCause::NotFound));
    }

    #[tokio::test]
    async fn test_other_describe_errors_propagate() {
        let api = scripted(vec![Err(ApiError::request_failed(500, "internal"))]);

        let err = fast()
            .await_terminal(&api, ResourceKind::Filter, "flt-1", PollTarget::ready())
            .await
            .expect_err("remote failure");

        assert!(matches!(err, FailureCause::RemoteFailure(ApiError::RequestFailed { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_timeout() {
        let mut api = MockResourceApi::new();
        api.expect_describe()
            .returning(|_, _| Ok(filter(LifecycleState::Creating)));

        let err = fast()
            .with_timeout(Duration::from_millis(30))
            .await_terminal(&api, ResourceKind::Filter, "flt-1", PollTarget::ready())
            .await
            .expect_err("timeout");

        let FailureCause::PollTimeout { elapsed } = err else {
            panic!("expected a timeout");
        };
        assert!(elapsed >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_describe() {
        let mut api = MockResourceApi::new();
        api.expect_describe().never();

        let token = CancellationToken::new();
        token.cancel();

        let err = Poller::new(Duration::from_secs(60))
            .with_cancellation(token)
            .await_terminal(&api, ResourceKind::Filter, "flt-1", PollTarget::ready())
            .await
            .expect_err("cancelled");

        assert!(matches!(err, FailureCause::ClientCancelled));
    }

    #[tokio::test]
    async fn test_cancellation_while_polling() {
        let mut api = MockResourceApi::new();
        api.expect_describe()
            .returning(|_, _| Ok(filter(LifecycleState::Creating)));

        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                token.cancel();
            })
        };

        let err = fast()
            .with_cancellation(token)
            .await_terminal(&api, ResourceKind::Filter, "flt-1", PollTarget::ready())
            .await
            .expect_err("cancelled");
        canceller.await.expect("canceller");

        assert!(matches!(err, FailureCause::ClientCancelled));
    }

    /// Remote whose describe never answers.
    struct Unresponsive;

    #[async_trait::async_trait]
    impl ResourceApi for Unresponsive {
        async fn create(&self, _config: &ResourceConfig) -> ApiResult<CreatedResource> {
            Err(ApiError::network("unused"))
        }

        async fn describe(&self, _kind: ResourceKind, _resource_id: &str) -> ApiResult<RemoteResource> {
            std::future::pending().await
        }

        async fn update_credentials(
            &self,
            _kind: ResourceKind,
            _resource_id: &str,
            _credentials: &Credentials,
        ) -> ApiResult<LifecycleState> {
            Err(ApiError::network("unused"))
        }

        async fn update_attributes(&self, _resource_id: &str, _update: &AttributeUpdate) -> ApiResult<LifecycleState> {
            Err(ApiError::network("unused"))
        }

        async fn delete(&self, _kind: ResourceKind, _resource_id: &str) -> ApiResult<LifecycleState> {
            Err(ApiError::network("unused"))
        }
    }

    #[tokio::test]
    async fn test_hung_describe_is_cancelled() {
        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                token.cancel();
            })
        };

        let err = fast()
            .with_cancellation(token)
            .await_terminal(&Unresponsive, ResourceKind::Filter, "flt-1", PollTarget::ready())
            .await
            .expect_err("cancelled");
        canceller.await.expect("canceller");

        assert!(matches!(err, FailureCause::ClientCancelled));
    }

    #[tokio::test]
    async fn test_hung_describe_times_out() {
        let err = fast()
            .with_timeout(Duration::from_millis(20))
            .await_terminal(&Unresponsive, ResourceKind::Filter, "flt-1", PollTarget::ready())
            .await
            .expect_err("timeout");

        assert!(matches!(err, FailureCause::PollTimeout { .. }));
    }

    #[test]
    fn test_from_config() {
        let poller = Poller::from_config(&PollConfig::default());
        assert_eq!(poller.interval(), Duration::from_secs(10));
        assert!(poller.timeout.is_none());
    }
}
