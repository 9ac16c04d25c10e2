//! Deletes the tracked server, if there is one.

use tracing::{debug, info, warn};

use super::{ACTION_TARGET, Action, ActionError, ActionFuture};
use crate::context::ExecutionContext;
use crate::gateway::CloudServerGateway;
use crate::notify::{DELETING_SERVER, TracingNotifier, UserNotifier};

/// Destroys the tracked server and forgets its identifier.
///
/// With no tracked identifier this is a no-op that makes no gateway calls.
/// A tracked identifier the gateway no longer knows is treated as already
/// deleted.
#[derive(Clone, Debug)]
pub struct DeleteServer<G, N = TracingNotifier> {
    gateway: G,
    notifier: N,
}

impl<G: CloudServerGateway> DeleteServer<G> {
    /// Creates the action with the default notifier.
    #[must_use]
    pub const fn new(gateway: G) -> Self {
        Self {
            gateway,
            notifier: TracingNotifier,
        }
    }
}

impl<G: CloudServerGateway, N: UserNotifier> DeleteServer<G, N> {
    /// Replaces the notifier.
    #[must_use]
    pub fn with_notifier<M: UserNotifier>(self, notifier: M) -> DeleteServer<G, M> {
        DeleteServer {
            gateway: self.gateway,
            notifier,
        }
    }
}

impl<G: CloudServerGateway, N: UserNotifier> Action<G::Error> for DeleteServer<G, N> {
    fn name(&self) -> &'static str {
        "delete_server"
    }

    fn call<'a>(&'a self, ctx: &'a mut ExecutionContext) -> ActionFuture<'a, G::Error> {
        Box::pin(async move {
            let Some(id) = ctx.machine_id.clone() else {
                debug!(target: ACTION_TARGET, "no tracked server to delete");
                return Ok(());
            };

            self.notifier.info(DELETING_SERVER);
            let server = self
                .gateway
                .get_server(&id)
                .await
                .map_err(ActionError::Gateway)?;

            if let Some(record) = server {
                self.gateway
                    .destroy_server(&record.id)
                    .await
                    .map_err(ActionError::Gateway)?;
                info!(target: ACTION_TARGET, server = %record.id, "server deleted");
            } else {
                warn!(target: ACTION_TARGET, server = %id, "server already gone");
            }

            ctx.clear_machine_id();
            Ok(())
        })
    }
}
