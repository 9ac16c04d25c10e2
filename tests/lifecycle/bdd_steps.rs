//! BDD step definitions for the lifecycle actions.

use std::net::Ipv4Addr;

use camino::Utf8PathBuf;
use nova_machine::test_support::{FakeGatewayError, GatewayCall, ScriptedProbe};
use nova_machine::{
    Action, ActionError, DeleteServer, PrepareNfsSettings, ProbeError, RebootMode, RebootServer,
    ResolutionPolicy, ServerRecord, SyncValidIds, SyncedFolder, SyncedFolderKind,
};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{ActionOutcome, FailureKind, LifecycleWorld};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn run_action(
    lifecycle_world: &LifecycleWorld,
    action: &dyn Action<FakeGatewayError>,
) -> Result<(), StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let mut ctx = lifecycle_world.context.borrow().clone();
    let result: Result<(), ActionError<FakeGatewayError>> =
        runtime.block_on(async { action.call(&mut ctx).await });
    lifecycle_world.context.replace(ctx);
    lifecycle_world.record(result);
    Ok(())
}

#[given("a server \"{id}\" named \"{name}\" with private address \"{address}\"")]
fn private_server(lifecycle_world: &LifecycleWorld, id: String, name: String, address: String) {
    lifecycle_world.add_server(ServerRecord::new(id, name).with_private_addresses([address]));
}

#[given("a server \"{id}\" named \"{name}\" with public address \"{address}\"")]
fn public_server(lifecycle_world: &LifecycleWorld, id: String, name: String, address: String) {
    lifecycle_world.add_server(ServerRecord::new(id, name).with_public_addresses([address]));
}

#[given("the tracked server id is \"{id}\"")]
fn tracked_id(lifecycle_world: &LifecycleWorld, id: String) {
    lifecycle_world.context.borrow_mut().machine_id = Some(id);
}

#[given("the machine is named \"{name}\"")]
fn machine_named(lifecycle_world: &LifecycleWorld, name: String) {
    lifecycle_world.context.borrow_mut().machine_name = name;
}

#[given("the floating IP is \"{address}\"")]
fn floating_ip(lifecycle_world: &LifecycleWorld, address: String) {
    lifecycle_world.context.borrow_mut().floating_ip = Some(address);
}

#[given("an NFS synced folder is configured")]
fn nfs_folder(lifecycle_world: &LifecycleWorld) {
    lifecycle_world
        .context
        .borrow_mut()
        .synced_folders
        .push(SyncedFolder {
            host_path: Utf8PathBuf::from("/srv/project"),
            guest_path: Utf8PathBuf::from("/vagrant"),
            kind: SyncedFolderKind::Nfs,
        });
}

#[given("the host has private address \"{address}\"")]
fn host_address(lifecycle_world: &LifecycleWorld, address: String) -> Result<(), StepError> {
    let parsed: Ipv4Addr = address
        .parse()
        .map_err(|_| StepError::Assertion(format!("invalid host address: {address}")))?;
    lifecycle_world.host_addresses.borrow_mut().push(parsed);
    Ok(())
}

#[given("the probe reports the network as unreachable {count} times")]
fn probe_unreachable(lifecycle_world: &LifecycleWorld, count: usize) {
    let responses = (0..count).map(|_| {
        Err(ProbeError::Unreachable {
            message: String::from("network is unreachable"),
        })
    });
    lifecycle_world.probe.replace(ScriptedProbe::new(responses));
}

#[given("the probe never reports ready")]
fn probe_never_ready(lifecycle_world: &LifecycleWorld) {
    lifecycle_world.probe.replace(ScriptedProbe::always(Ok(false)));
}

#[given("the run has been interrupted")]
fn run_interrupted(lifecycle_world: &LifecycleWorld) {
    lifecycle_world.context.borrow().interrupt.interrupt();
}

#[when("the delete action runs")]
fn delete_runs(lifecycle_world: &LifecycleWorld) -> Result<(), StepError> {
    let action = DeleteServer::new(lifecycle_world.gateway())
        .with_notifier(lifecycle_world.notifier.clone());
    run_action(lifecycle_world, &action)
}

#[when("the reboot action runs")]
fn reboot_runs(lifecycle_world: &LifecycleWorld) -> Result<(), StepError> {
    let probe = lifecycle_world.probe.borrow().clone();
    let action = RebootServer::new(lifecycle_world.gateway(), probe)
        .with_notifier(lifecycle_world.notifier.clone())
        .with_poller(lifecycle_world.poller());
    run_action(lifecycle_world, &action)
}

#[when("the valid id snapshot runs")]
fn snapshot_runs(lifecycle_world: &LifecycleWorld) -> Result<(), StepError> {
    let action = SyncValidIds::new(lifecycle_world.gateway());
    run_action(lifecycle_world, &action)
}

#[when("the NFS preparation runs")]
fn nfs_runs(lifecycle_world: &LifecycleWorld) -> Result<(), StepError> {
    let action = PrepareNfsSettings::new(lifecycle_world.gateway(), ResolutionPolicy::default())
        .with_lister(lifecycle_world.interfaces());
    run_action(lifecycle_world, &action)
}

#[then("the action succeeds")]
fn action_succeeds(lifecycle_world: &LifecycleWorld) -> Result<(), StepError> {
    match lifecycle_world.outcome.borrow().clone() {
        Some(ActionOutcome::Success) => Ok(()),
        Some(ActionOutcome::Failure(kind)) => Err(StepError::Assertion(format!(
            "expected success, got {kind:?}"
        ))),
        None => Err(StepError::Assertion(String::from("no action ran"))),
    }
}

#[then("the action fails with \"{kind}\"")]
fn action_fails(lifecycle_world: &LifecycleWorld, kind: String) -> Result<(), StepError> {
    let expected = FailureKind::parse(&kind)
        .ok_or_else(|| StepError::Assertion(format!("unknown failure kind: {kind}")))?;
    match lifecycle_world.outcome.borrow().clone() {
        Some(ActionOutcome::Failure(actual)) if actual == expected => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected failure {expected:?}, got {other:?}"
        ))),
    }
}

#[then("the gateway destroyed \"{id}\"")]
fn gateway_destroyed(lifecycle_world: &LifecycleWorld, id: String) -> Result<(), StepError> {
    let gateway = lifecycle_world.gateway();
    if !gateway.calls().contains(&GatewayCall::Destroy(id.clone())) {
        return Err(StepError::Assertion(format!("{id} was not destroyed")));
    }
    if gateway.servers().iter().any(|server| server.id == id) {
        return Err(StepError::Assertion(format!("{id} is still listed")));
    }
    Ok(())
}

#[then("the gateway soft rebooted \"{id}\"")]
fn gateway_rebooted(lifecycle_world: &LifecycleWorld, id: String) -> Result<(), StepError> {
    let calls = lifecycle_world.gateway().calls();
    if calls.contains(&GatewayCall::Reboot(id.clone(), RebootMode::Soft)) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected a soft reboot of {id}, saw {calls:?}"
        )))
    }
}

#[then("the gateway received no calls")]
fn gateway_untouched(lifecycle_world: &LifecycleWorld) -> Result<(), StepError> {
    let calls = lifecycle_world.gateway().calls();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!("unexpected calls: {calls:?}")))
    }
}

#[then("no server id is tracked")]
fn no_tracked_id(lifecycle_world: &LifecycleWorld) -> Result<(), StepError> {
    match lifecycle_world.context.borrow().machine_id.clone() {
        None => Ok(()),
        Some(id) => Err(StepError::Assertion(format!("{id} is still tracked"))),
    }
}

#[then("the tracked server id is still \"{id}\"")]
fn still_tracked(lifecycle_world: &LifecycleWorld, id: String) -> Result<(), StepError> {
    let tracked = lifecycle_world.context.borrow().machine_id.clone();
    if tracked.as_deref() == Some(id.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {id} to be tracked, found {tracked:?}"
        )))
    }
}

#[then("the probe was called {count} times")]
fn probe_calls(lifecycle_world: &LifecycleWorld, count: usize) -> Result<(), StepError> {
    let calls = lifecycle_world.probe.borrow().calls();
    if calls == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} probe calls, saw {calls}"
        )))
    }
}

#[then("the valid ids are \"{ids}\"")]
fn valid_ids(lifecycle_world: &LifecycleWorld, ids: String) -> Result<(), StepError> {
    let expected: Vec<String> = ids.split(',').map(str::to_owned).collect();
    let actual = lifecycle_world.context.borrow().nfs_valid_ids.clone();
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected ids {expected:?}, got {actual:?}"
        )))
    }
}

#[then("the NFS host address is \"{address}\"")]
fn nfs_host(lifecycle_world: &LifecycleWorld, address: String) -> Result<(), StepError> {
    let actual = lifecycle_world.context.borrow().nfs_host_ip.clone();
    if actual.as_deref() == Some(address.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected host address {address}, got {actual:?}"
        )))
    }
}

#[then("the NFS machine address is \"{address}\"")]
fn nfs_machine(lifecycle_world: &LifecycleWorld, address: String) -> Result<(), StepError> {
    let actual = lifecycle_world.context.borrow().nfs_machine_ip.clone();
    if actual.as_deref() == Some(address.as_str()) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected machine address {address}, got {actual:?}"
        )))
    }
}

#[then("no NFS machine address is set")]
fn no_nfs_machine(lifecycle_world: &LifecycleWorld) -> Result<(), StepError> {
    match lifecycle_world.context.borrow().nfs_machine_ip.clone() {
        None => Ok(()),
        Some(address) => Err(StepError::Assertion(format!(
            "unexpected machine address {address}"
        ))),
    }
}
