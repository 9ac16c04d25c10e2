//! Shared fixture for lifecycle scenarios.

use std::cell::RefCell;
use std::net::Ipv4Addr;

use nova_machine::test_support::{
    CountingSleeper, FakeGateway, FakeGatewayError, RecordingNotifier, ScriptedProbe,
    StaticInterfaces,
};
use nova_machine::{ActionError, ExecutionContext, ReadinessPoller, ResolveError, ServerRecord};
use rstest::fixture;

/// How a scenario's action finished.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ActionOutcome {
    Success,
    Failure(FailureKind),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    Gateway,
    NoValidHost,
    FloatingIpNotValid,
    NoHostIp,
    InterfaceLookup,
    Poll,
}

impl FailureKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "gateway" => Some(Self::Gateway),
            "no_valid_host" => Some(Self::NoValidHost),
            "floating_ip_not_valid" => Some(Self::FloatingIpNotValid),
            "no_host_ip" => Some(Self::NoHostIp),
            "interface_lookup" => Some(Self::InterfaceLookup),
            "poll" => Some(Self::Poll),
            _ => None,
        }
    }

    pub const fn of(err: &ActionError<FakeGatewayError>) -> Self {
        match err {
            ActionError::Gateway(_) => Self::Gateway,
            ActionError::Resolve(ResolveError::NoValidHost { .. }) => Self::NoValidHost,
            ActionError::Resolve(ResolveError::FloatingIpNotValid { .. }) => {
                Self::FloatingIpNotValid
            }
            ActionError::Resolve(ResolveError::NoHostIp) => Self::NoHostIp,
            ActionError::Resolve(ResolveError::InterfaceLookup { .. }) => Self::InterfaceLookup,
            ActionError::Poll(_) => Self::Poll,
        }
    }
}

/// Mutable scenario state shared by the steps.
#[derive(Debug)]
pub struct LifecycleWorld {
    pub servers: RefCell<Vec<ServerRecord>>,
    pub gateway: RefCell<FakeGateway>,
    pub probe: RefCell<ScriptedProbe>,
    pub host_addresses: RefCell<Vec<Ipv4Addr>>,
    pub notifier: RecordingNotifier,
    pub sleeper: CountingSleeper,
    pub context: RefCell<ExecutionContext>,
    pub outcome: RefCell<Option<ActionOutcome>>,
}

impl LifecycleWorld {
    pub fn add_server(&self, server: ServerRecord) {
        self.servers.borrow_mut().push(server);
        let listed = self.servers.borrow().clone();
        self.gateway.replace(FakeGateway::new(listed));
    }

    pub fn gateway(&self) -> FakeGateway {
        self.gateway.borrow().clone()
    }

    pub fn interfaces(&self) -> StaticInterfaces {
        StaticInterfaces::new(self.host_addresses.borrow().iter().copied())
    }

    pub fn poller(&self) -> ReadinessPoller<CountingSleeper> {
        ReadinessPoller::new().with_sleeper(self.sleeper.clone())
    }

    pub fn record(&self, result: Result<(), ActionError<FakeGatewayError>>) {
        let outcome = match result {
            Ok(()) => ActionOutcome::Success,
            Err(err) => ActionOutcome::Failure(FailureKind::of(&err)),
        };
        self.outcome.replace(Some(outcome));
    }
}

#[fixture]
pub fn lifecycle_world() -> LifecycleWorld {
    LifecycleWorld {
        servers: RefCell::new(Vec::new()),
        gateway: RefCell::new(FakeGateway::default()),
        probe: RefCell::new(ScriptedProbe::always(Ok(true))),
        host_addresses: RefCell::new(Vec::new()),
        notifier: RecordingNotifier::default(),
        sleeper: CountingSleeper::default(),
        context: RefCell::new(ExecutionContext::new("default")),
        outcome: RefCell::new(None),
    }
}
