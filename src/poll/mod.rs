//! Cooperative readiness polling.
//!
//! [`ReadinessPoller`] repeatedly asks a [`ReadinessProbe`] whether an
//! instance can accept connections. It stops when the probe reports ready,
//! when the shared [`InterruptFlag`] is raised, or when an optional deadline
//! passes. Unreachable-network probe failures count as "not ready yet";
//! every other probe failure ends the wait.

mod interrupt;
mod ssh;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

pub use interrupt::InterruptFlag;
pub use ssh::SshPortProbe;

/// Default delay between probe attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

const POLL_TARGET: &str = "nova_machine::poll";

/// Future returned by readiness probes.
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = Result<bool, ProbeError>> + Send + 'a>>;

/// Future returned by [`Sleeper`] implementations.
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Errors reported by a readiness probe.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProbeError {
    /// The network or host cannot be reached yet.
    #[error("target unreachable: {message}")]
    Unreachable {
        /// Message from the transport.
        message: String,
    },
    /// Any other transport failure.
    #[error("readiness probe failed: {message}")]
    Transport {
        /// Message from the transport.
        message: String,
    },
}

impl ProbeError {
    /// Whether the failure is transient and polling should continue.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// Checks whether the instance's transport accepts connections.
pub trait ReadinessProbe: Send + Sync {
    /// Returns `Ok(true)` once the transport is ready.
    fn is_ready(&self) -> ProbeFuture<'_>;
}

/// Source of delays between probe attempts.
pub trait Sleeper: Send + Sync {
    /// Waits for `duration`.
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// How a poll ended without error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    /// The probe reported ready.
    Ready,
    /// The interrupt flag was raised before the probe reported ready.
    Interrupted,
}

/// Errors that end a poll.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PollError {
    /// The probe failed with a non-transient error.
    #[error(transparent)]
    Probe(#[from] ProbeError),
    /// The configured deadline passed before the probe reported ready.
    #[error("target not ready after {attempts} attempts within {deadline:?}")]
    DeadlineExceeded {
        /// Configured deadline.
        deadline: Duration,
        /// Number of probe attempts made.
        attempts: u32,
    },
}

/// Polls a probe until ready, interrupted, or past its deadline.
#[derive(Clone, Debug)]
pub struct ReadinessPoller<S = TokioSleeper> {
    interval: Duration,
    deadline: Option<Duration>,
    sleeper: S,
}

impl Default for ReadinessPoller<TokioSleeper> {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessPoller<TokioSleeper> {
    /// Creates an unbounded poller using [`DEFAULT_POLL_INTERVAL`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
            sleeper: TokioSleeper,
        }
    }
}

impl<S: Sleeper> ReadinessPoller<S> {
    /// Overrides the delay between probe attempts.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bounds the total wait; `None` polls until ready or interrupted.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Replaces the sleeper, mainly so tests can avoid real delays.
    #[must_use]
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> ReadinessPoller<T> {
        ReadinessPoller {
            interval: self.interval,
            deadline: self.deadline,
            sleeper,
        }
    }

    /// Delay between probe attempts.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Polls `probe` until it reports ready or `interrupt` is raised.
    ///
    /// A raised interrupt is a clean exit; it also cuts short a pending sleep.
    /// With a deadline, the last sleep is shortened so the final attempt
    /// lands on the deadline rather than a full interval past it.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Probe`] for non-transient probe failures and
    /// [`PollError::DeadlineExceeded`] when a deadline is configured and
    /// passes first.
    pub async fn wait<P: ReadinessProbe + ?Sized>(
        &self,
        probe: &P,
        interrupt: &InterruptFlag,
    ) -> Result<PollOutcome, PollError> {
        let deadline = self.deadline.map(|limit| (limit, Instant::now() + limit));
        let mut attempts: u32 = 0;

        loop {
            if interrupt.is_interrupted() {
                debug!(target: POLL_TARGET, attempts, "poll interrupted");
                return Ok(PollOutcome::Interrupted);
            }

            attempts = attempts.saturating_add(1);
            match probe.is_ready().await {
                Ok(true) => {
                    debug!(target: POLL_TARGET, attempts, "target ready");
                    return Ok(PollOutcome::Ready);
                }
                Ok(false) => debug!(target: POLL_TARGET, attempts, "target not ready"),
                Err(err) if err.is_transient() => {
                    debug!(target: POLL_TARGET, attempts, error = %err, "target unreachable, retrying");
                }
                Err(err) => return Err(PollError::Probe(err)),
            }

            if let Some((limit, _)) = deadline.filter(|&(_, at)| Instant::now() >= at) {
                return Err(PollError::DeadlineExceeded {
                    deadline: limit,
                    attempts,
                });
            }

            let pause = deadline.map_or(self.interval, |(_, at)| {
                self.interval.min(at.saturating_duration_since(Instant::now()))
            });
            tokio::select! {
                () = self.sleeper.sleep(pause) => {}
                () = interrupt.raised() => {}
            }
        }
    }
}
