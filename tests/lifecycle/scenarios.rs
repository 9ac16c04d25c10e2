//! BDD scenarios for the lifecycle actions.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleWorld, lifecycle_world};

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Destroy a tracked server"
)]
fn scenario_destroy_tracked(lifecycle_world: LifecycleWorld) {
    drop(lifecycle_world);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Destroy without a tracked server makes no calls"
)]
fn scenario_destroy_untracked(lifecycle_world: LifecycleWorld) {
    drop(lifecycle_world);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Reboot waits through unreachable probes"
)]
fn scenario_reboot_unreachable(lifecycle_world: LifecycleWorld) {
    drop(lifecycle_world);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Reboot stops waiting once interrupted"
)]
fn scenario_reboot_interrupted(lifecycle_world: LifecycleWorld) {
    drop(lifecycle_world);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Snapshot valid server ids in gateway order"
)]
fn scenario_valid_id_snapshot(lifecycle_world: LifecycleWorld) {
    drop(lifecycle_world);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Resolve NFS addresses by machine name"
)]
fn scenario_nfs_by_name(lifecycle_world: LifecycleWorld) {
    drop(lifecycle_world);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Forget a stale server id during NFS preparation"
)]
fn scenario_nfs_stale_id(lifecycle_world: LifecycleWorld) {
    drop(lifecycle_world);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Reject a floating IP that is not attached"
)]
fn scenario_nfs_floating_mismatch(lifecycle_world: LifecycleWorld) {
    drop(lifecycle_world);
}
