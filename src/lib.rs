//! Lifecycle actions for OpenStack-backed development machines.
//!
//! The crate models the steps a machine manager runs against an OpenStack
//! compute instance: destroying it, soft rebooting it and waiting for SSH,
//! listing valid machine ids, and resolving the host and guest addresses used
//! for NFS synced folders. Actions talk to the cloud through the
//! [`CloudServerGateway`] trait; [`NovaGateway`] implements it over the
//! Compute API.

pub mod actions;
pub mod config;
pub mod context;
pub mod gateway;
pub mod notify;
pub mod nova;
pub mod poll;
pub mod resolve;
pub mod server;
pub mod telemetry;
pub mod test_support;

pub use actions::{
    Action, ActionError, DeleteServer, Pipeline, PrepareNfsSettings, RebootServer, SyncValidIds,
};
pub use config::{ConfigError, OpenStackConfig};
pub use context::{ContextReport, ExecutionContext, SyncedFolder, SyncedFolderKind};
pub use gateway::{CloudServerGateway, GatewayFuture, RebootMode};
pub use notify::{TracingNotifier, UserNotifier};
pub use nova::{NovaGateway, NovaGatewayError};
pub use poll::{
    InterruptFlag, PollError, PollOutcome, ProbeError, ReadinessPoller, ReadinessProbe,
    SshPortProbe,
};
pub use resolve::{
    AddressSelector, FLOATING_IP_SENTINEL, InterfaceLister, ResolutionPolicy, ResolveError,
    SystemInterfaces,
};
pub use server::{AddressFamily, NetworkAddress, ServerRecord};
