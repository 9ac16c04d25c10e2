//! Lifecycle actions composed into a sequential pipeline.
//!
//! Each action follows the same shape: check a precondition on the
//! [`ExecutionContext`], call the gateway, update the context, and return so
//! the next stage can run. A [`Pipeline`] runs its stages strictly in order;
//! the first error aborts the run.

mod delete;
mod nfs;
mod reboot;
mod valid_ids;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::poll::PollError;
use crate::resolve::ResolveError;

pub use delete::DeleteServer;
pub use nfs::PrepareNfsSettings;
pub use reboot::RebootServer;
pub use valid_ids::SyncValidIds;

const ACTION_TARGET: &str = "nova_machine::actions";

/// Errors surfaced by lifecycle actions.
///
/// Gateway failures are carried unchanged so callers can present them with
/// full provider context.
#[derive(Debug, Error)]
pub enum ActionError<GatewayError>
where
    GatewayError: std::error::Error + 'static,
{
    /// Raised when a gateway call fails.
    #[error(transparent)]
    Gateway(GatewayError),
    /// Raised when no usable host or guest address can be determined.
    #[error("address resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    /// Raised when waiting for the instance fails.
    #[error("readiness wait failed: {0}")]
    Poll(#[from] PollError),
}

/// Future returned by [`Action::call`].
pub type ActionFuture<'a, E> = Pin<Box<dyn Future<Output = Result<(), ActionError<E>>> + Send + 'a>>;

/// A single pipeline stage.
pub trait Action<E>: Send + Sync
where
    E: std::error::Error + 'static,
{
    /// Stable stage name used in logs.
    fn name(&self) -> &'static str;

    /// Runs the stage against the shared context.
    fn call<'a>(&'a self, ctx: &'a mut ExecutionContext) -> ActionFuture<'a, E>;
}

/// Ordered list of actions sharing one gateway error type.
pub struct Pipeline<E>
where
    E: std::error::Error + 'static,
{
    stages: Vec<Box<dyn Action<E>>>,
}

impl<E> Default for Pipeline<E>
where
    E: std::error::Error + 'static,
{
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<E> Pipeline<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn then(mut self, action: impl Action<E> + 'static) -> Self {
        self.stages.push(Box::new(action));
        self
    }

    /// Names of the stages in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs every stage in order against `ctx`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ActionError`] raised by a stage; later stages do
    /// not run.
    pub async fn run(&self, ctx: &mut ExecutionContext) -> Result<(), ActionError<E>> {
        for stage in &self.stages {
            debug!(target: ACTION_TARGET, stage = stage.name(), "running stage");
            stage.call(ctx).await?;
        }
        Ok(())
    }
}
