//! Publishes the identifiers of every visible server.

use tracing::debug;

use super::{ACTION_TARGET, Action, ActionError, ActionFuture};
use crate::context::ExecutionContext;
use crate::gateway::CloudServerGateway;

/// Lists all servers and stores their identifiers, in gateway order, in
/// [`ExecutionContext::nfs_valid_ids`].
///
/// Downstream NFS export pruning uses the list to tell live machines from
/// stale exports.
#[derive(Clone, Debug)]
pub struct SyncValidIds<G> {
    gateway: G,
}

impl<G: CloudServerGateway> SyncValidIds<G> {
    /// Creates the action.
    #[must_use]
    pub const fn new(gateway: G) -> Self {
        Self { gateway }
    }
}

impl<G: CloudServerGateway> Action<G::Error> for SyncValidIds<G> {
    fn name(&self) -> &'static str {
        "sync_valid_ids"
    }

    fn call<'a>(&'a self, ctx: &'a mut ExecutionContext) -> ActionFuture<'a, G::Error> {
        Box::pin(async move {
            let servers = self
                .gateway
                .list_servers()
                .await
                .map_err(ActionError::Gateway)?;
            ctx.nfs_valid_ids = servers.into_iter().map(|server| server.id).collect();
            debug!(target: ACTION_TARGET, count = ctx.nfs_valid_ids.len(), "valid server ids");
            Ok(())
        })
    }
}
