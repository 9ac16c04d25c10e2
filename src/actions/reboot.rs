//! Reboots the tracked server and waits for its transport to come back.

use tracing::{debug, info, warn};

use super::{ACTION_TARGET, Action, ActionError, ActionFuture};
use crate::context::ExecutionContext;
use crate::gateway::{CloudServerGateway, RebootMode};
use crate::notify::{REBOOTING_SERVER, TracingNotifier, UserNotifier, WAITING_FOR_SSH};
use crate::poll::{PollOutcome, ReadinessPoller, ReadinessProbe, Sleeper, TokioSleeper};

/// Soft-reboots the tracked server, then blocks in a [`ReadinessPoller`]
/// until the probe reports ready or the context's interrupt flag is raised.
#[derive(Clone, Debug)]
pub struct RebootServer<G, P, N = TracingNotifier, S = TokioSleeper> {
    gateway: G,
    probe: P,
    notifier: N,
    poller: ReadinessPoller<S>,
    mode: RebootMode,
}

impl<G: CloudServerGateway, P: ReadinessProbe> RebootServer<G, P> {
    /// Creates the action with a soft reboot, the default notifier, and an
    /// unbounded poller using the default interval.
    #[must_use]
    pub const fn new(gateway: G, probe: P) -> Self {
        Self {
            gateway,
            probe,
            notifier: TracingNotifier,
            poller: ReadinessPoller::new(),
            mode: RebootMode::Soft,
        }
    }
}

impl<G, P, N, S> RebootServer<G, P, N, S>
where
    G: CloudServerGateway,
    P: ReadinessProbe,
    N: UserNotifier,
    S: Sleeper,
{
    /// Replaces the notifier.
    #[must_use]
    pub fn with_notifier<M: UserNotifier>(self, notifier: M) -> RebootServer<G, P, M, S> {
        RebootServer {
            gateway: self.gateway,
            probe: self.probe,
            notifier,
            poller: self.poller,
            mode: self.mode,
        }
    }

    /// Replaces the poller, for example to add a deadline.
    #[must_use]
    pub fn with_poller<T: Sleeper>(self, poller: ReadinessPoller<T>) -> RebootServer<G, P, N, T> {
        RebootServer {
            gateway: self.gateway,
            probe: self.probe,
            notifier: self.notifier,
            poller,
            mode: self.mode,
        }
    }

    /// Selects the reboot flavour.
    #[must_use]
    pub const fn with_mode(mut self, mode: RebootMode) -> Self {
        self.mode = mode;
        self
    }
}

impl<G, P, N, S> Action<G::Error> for RebootServer<G, P, N, S>
where
    G: CloudServerGateway,
    P: ReadinessProbe,
    N: UserNotifier,
    S: Sleeper,
{
    fn name(&self) -> &'static str {
        "reboot_server"
    }

    fn call<'a>(&'a self, ctx: &'a mut ExecutionContext) -> ActionFuture<'a, G::Error> {
        Box::pin(async move {
            let Some(id) = ctx.machine_id.clone() else {
                debug!(target: ACTION_TARGET, "no tracked server to reboot");
                return Ok(());
            };

            self.notifier.info(REBOOTING_SERVER);
            let server = self
                .gateway
                .get_server(&id)
                .await
                .map_err(ActionError::Gateway)?;
            let Some(record) = server else {
                warn!(target: ACTION_TARGET, server = %id, "server gone, forgetting it");
                ctx.clear_machine_id();
                return Ok(());
            };

            self.gateway
                .reboot_server(&record.id, self.mode)
                .await
                .map_err(ActionError::Gateway)?;

            self.notifier.info(WAITING_FOR_SSH);
            match self.poller.wait(&self.probe, &ctx.interrupt).await? {
                PollOutcome::Ready => {
                    info!(target: ACTION_TARGET, server = %record.id, "server ready after reboot");
                }
                PollOutcome::Interrupted => {
                    info!(target: ACTION_TARGET, server = %record.id, "reboot wait interrupted");
                }
            }
            Ok(())
        })
    }
}
