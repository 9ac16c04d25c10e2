//! Resolves the host and guest addresses used for NFS synced folders.

use tracing::{debug, info};

use super::{ACTION_TARGET, Action, ActionError, ActionFuture};
use crate::context::ExecutionContext;
use crate::gateway::CloudServerGateway;
use crate::resolve::{InterfaceLister, ResolutionPolicy, SystemInterfaces};

/// Fills [`ExecutionContext::nfs_host_ip`] and
/// [`ExecutionContext::nfs_machine_ip`] when any synced folder uses NFS.
///
/// Without NFS folders the action makes no calls and leaves both outputs
/// untouched. The guest server is found by the tracked identifier or, when
/// none is tracked, by the first server whose name matches the machine name.
/// A missing server is not an error: the guest address stays `None` and a
/// stale tracked identifier is cleared.
#[derive(Clone, Debug)]
pub struct PrepareNfsSettings<G, L = SystemInterfaces> {
    gateway: G,
    policy: ResolutionPolicy,
    lister: L,
}

impl<G: CloudServerGateway> PrepareNfsSettings<G> {
    /// Creates the action using the system interface list for host
    /// detection.
    #[must_use]
    pub const fn new(gateway: G, policy: ResolutionPolicy) -> Self {
        Self {
            gateway,
            policy,
            lister: SystemInterfaces,
        }
    }
}

impl<G: CloudServerGateway, L: InterfaceLister> PrepareNfsSettings<G, L> {
    /// Replaces the interface lister used for host detection.
    #[must_use]
    pub fn with_lister<M: InterfaceLister>(self, lister: M) -> PrepareNfsSettings<G, M> {
        PrepareNfsSettings {
            gateway: self.gateway,
            policy: self.policy,
            lister,
        }
    }

    async fn lookup_id_by_name(&self, name: &str) -> Result<Option<String>, ActionError<G::Error>> {
        let servers = self
            .gateway
            .list_servers()
            .await
            .map_err(ActionError::Gateway)?;
        Ok(servers
            .into_iter()
            .find(|server| server.name == name)
            .map(|server| server.id))
    }

    async fn machine_ip(
        &self,
        ctx: &mut ExecutionContext,
    ) -> Result<Option<String>, ActionError<G::Error>> {
        let id = match ctx.machine_id.clone() {
            Some(id) => id,
            None => match self.lookup_id_by_name(&ctx.machine_name).await? {
                Some(id) => id,
                None => {
                    debug!(
                        target: ACTION_TARGET,
                        name = %ctx.machine_name,
                        "no server matches the machine name"
                    );
                    return Ok(None);
                }
            },
        };

        let server = self
            .gateway
            .get_server(&id)
            .await
            .map_err(ActionError::Gateway)?;
        let Some(record) = server else {
            info!(
                target: ACTION_TARGET,
                server = %id,
                "machine could not be found, assuming it was destroyed"
            );
            ctx.clear_machine_id();
            return Ok(None);
        };

        let address = self
            .policy
            .machine_ip(&record, ctx.floating_ip.as_deref())?;
        Ok(Some(address))
    }
}

impl<G: CloudServerGateway, L: InterfaceLister> Action<G::Error> for PrepareNfsSettings<G, L> {
    fn name(&self) -> &'static str {
        "prepare_nfs_settings"
    }

    fn call<'a>(&'a self, ctx: &'a mut ExecutionContext) -> ActionFuture<'a, G::Error> {
        Box::pin(async move {
            if !ctx.uses_nfs() {
                debug!(target: ACTION_TARGET, "no NFS synced folders");
                return Ok(());
            }

            let host_ip = self.policy.host_ip(&self.lister)?;
            info!(target: ACTION_TARGET, host_ip = %host_ip, "host IP");
            ctx.nfs_host_ip = Some(host_ip);
            ctx.nfs_machine_ip = self.machine_ip(ctx).await?;
            Ok(())
        })
    }
}
