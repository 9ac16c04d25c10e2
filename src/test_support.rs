//! Test doubles shared across unit and integration tests.
//!
//! Every double records what it was asked to do and replays scripted
//! answers, so lifecycle behaviour can be asserted without a cloud account,
//! real sockets, or real delays.

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::gateway::{CloudServerGateway, GatewayFuture, RebootMode};
use crate::notify::UserNotifier;
use crate::poll::{ProbeError, ProbeFuture, ReadinessProbe, SleepFuture, Sleeper};
use crate::resolve::{InterfaceLister, ResolveError};
use crate::server::ServerRecord;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Error returned by [`FakeGateway`] when a failure is scripted.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("fake gateway failure: {0}")]
pub struct FakeGatewayError(pub String);

/// A call observed by [`FakeGateway`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GatewayCall {
    /// `get_server(id)`.
    Get(String),
    /// `list_servers()`.
    List,
    /// `destroy_server(id)`.
    Destroy(String),
    /// `reboot_server(id, mode)`.
    Reboot(String, RebootMode),
}

#[derive(Debug, Default)]
struct FakeGatewayState {
    servers: Vec<ServerRecord>,
    calls: Vec<GatewayCall>,
    failures: VecDeque<String>,
}

/// In-memory gateway over a list of servers.
///
/// Clones share state. Destroying a server removes it from the list.
#[derive(Clone, Debug, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeGatewayState>>,
}

impl FakeGateway {
    /// Creates a gateway that knows `servers`, in listing order.
    #[must_use]
    pub fn new(servers: impl IntoIterator<Item = ServerRecord>) -> Self {
        let gateway = Self::default();
        lock(&gateway.state).servers = servers.into_iter().collect();
        gateway
    }

    /// Makes the next call fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        lock(&self.state).failures.push_back(message.into());
    }

    /// Calls observed so far.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.state).calls.clone()
    }

    /// Servers currently known.
    #[must_use]
    pub fn servers(&self) -> Vec<ServerRecord> {
        lock(&self.state).servers.clone()
    }

    fn record(&self, call: GatewayCall) -> Result<(), FakeGatewayError> {
        let mut state = lock(&self.state);
        state.calls.push(call);
        state.failures.pop_front().map_or(Ok(()), |message| Err(FakeGatewayError(message)))
    }
}

impl CloudServerGateway for FakeGateway {
    type Error = FakeGatewayError;

    fn get_server<'a>(
        &'a self,
        id: &'a str,
    ) -> GatewayFuture<'a, Option<ServerRecord>, Self::Error> {
        Box::pin(async move {
            self.record(GatewayCall::Get(id.to_owned()))?;
            Ok(lock(&self.state)
                .servers
                .iter()
                .find(|server| server.id == id)
                .cloned())
        })
    }

    fn list_servers(&self) -> GatewayFuture<'_, Vec<ServerRecord>, Self::Error> {
        Box::pin(async move {
            self.record(GatewayCall::List)?;
            Ok(self.servers())
        })
    }

    fn destroy_server<'a>(&'a self, id: &'a str) -> GatewayFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.record(GatewayCall::Destroy(id.to_owned()))?;
            lock(&self.state).servers.retain(|server| server.id != id);
            Ok(())
        })
    }

    fn reboot_server<'a>(
        &'a self,
        id: &'a str,
        mode: RebootMode,
    ) -> GatewayFuture<'a, (), Self::Error> {
        Box::pin(async move { self.record(GatewayCall::Reboot(id.to_owned(), mode)) })
    }
}

#[derive(Debug)]
struct ProbeScript {
    responses: VecDeque<Result<bool, ProbeError>>,
    fallback: Result<bool, ProbeError>,
    calls: usize,
}

/// Probe that replays scripted answers, then repeats a fallback answer.
#[derive(Clone, Debug)]
pub struct ScriptedProbe {
    script: Arc<Mutex<ProbeScript>>,
}

impl ScriptedProbe {
    /// Replays `responses`, then reports ready forever.
    #[must_use]
    pub fn new(responses: impl IntoIterator<Item = Result<bool, ProbeError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(ProbeScript {
                responses: responses.into_iter().collect(),
                fallback: Ok(true),
                calls: 0,
            })),
        }
    }

    /// Answers every call with `response`.
    #[must_use]
    pub fn always(response: Result<bool, ProbeError>) -> Self {
        Self {
            script: Arc::new(Mutex::new(ProbeScript {
                responses: VecDeque::new(),
                fallback: response,
                calls: 0,
            })),
        }
    }

    /// Number of times the probe was called.
    #[must_use]
    pub fn calls(&self) -> usize {
        lock(&self.script).calls
    }
}

impl ReadinessProbe for ScriptedProbe {
    fn is_ready(&self) -> ProbeFuture<'_> {
        let response = {
            let mut script = lock(&self.script);
            script.calls += 1;
            let fallback = script.fallback.clone();
            script.responses.pop_front().unwrap_or(fallback)
        };
        Box::pin(async move { response })
    }
}

/// Sleeper that returns immediately and records each requested duration.
#[derive(Clone, Debug, Default)]
pub struct CountingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl CountingSleeper {
    /// Durations requested so far.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

impl Sleeper for CountingSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
        lock(&self.sleeps).push(duration);
        Box::pin(std::future::ready(()))
    }
}

/// Notifier that keeps every message.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    /// Messages received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

impl UserNotifier for RecordingNotifier {
    fn info(&self, message: &str) {
        lock(&self.messages).push(message.to_owned());
    }
}

/// Interface lister with a fixed answer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StaticInterfaces {
    answer: Result<Vec<Ipv4Addr>, String>,
}

impl StaticInterfaces {
    /// Lists `addresses`.
    #[must_use]
    pub fn new(addresses: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        Self {
            answer: Ok(addresses.into_iter().collect()),
        }
    }

    /// Fails every lookup with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            answer: Err(message.into()),
        }
    }
}

impl InterfaceLister for StaticInterfaces {
    fn private_ipv4_addresses(&self) -> Result<Vec<Ipv4Addr>, ResolveError> {
        self.answer
            .clone()
            .map_err(|message| ResolveError::InterfaceLookup { message })
    }
}
