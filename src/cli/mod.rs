//! Command-line interface definitions for the `nova-machine` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page. It
//! must not depend on the library crate.

use clap::{Args, Parser};

/// Top-level CLI for the `nova-machine` binary.
#[derive(Debug, Parser)]
#[command(
    name = "nova-machine",
    about = "Run lifecycle actions against an OpenStack compute instance",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Delete the tracked server.
    #[command(name = "destroy", about = "Delete the server and forget its id")]
    Destroy(DestroyCommand),
    /// Reboot the tracked server and wait for SSH.
    #[command(name = "reboot", about = "Reboot the server and wait until SSH answers")]
    Reboot(RebootCommand),
    /// List the identifiers of every visible server.
    #[command(name = "valid-ids", about = "List the ids of every visible server")]
    ValidIds,
    /// Resolve the host and guest addresses for NFS synced folders.
    #[command(
        name = "nfs-settings",
        about = "Resolve host and guest addresses for NFS synced folders"
    )]
    NfsSettings(NfsSettingsCommand),
}

/// Arguments for `nova-machine destroy`.
#[derive(Debug, Args)]
pub(crate) struct DestroyCommand {
    /// Identifier of the server to delete.
    #[arg(long, value_name = "ID")]
    pub(crate) id: String,
}

/// Arguments for `nova-machine reboot`.
#[derive(Debug, Args)]
pub(crate) struct RebootCommand {
    /// Identifier of the server to reboot.
    #[arg(long, value_name = "ID")]
    pub(crate) id: String,
    /// Give up waiting for SSH after this many seconds. Waits until
    /// interrupted when omitted.
    #[arg(long, value_name = "SECONDS")]
    pub(crate) deadline_secs: Option<u64>,
    /// Request a hard reboot instead of a soft one.
    #[arg(long)]
    pub(crate) hard: bool,
}

/// Arguments for `nova-machine nfs-settings`.
#[derive(Debug, Args)]
pub(crate) struct NfsSettingsCommand {
    /// Identifier of the server, if known.
    #[arg(long, value_name = "ID")]
    pub(crate) id: Option<String>,
    /// Machine name used to find the server when no id is given.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: String,
    /// Synced folder as `HOST:GUEST[:TYPE]`; repeat for several folders.
    #[arg(long = "synced-folder", value_name = "HOST:GUEST[:TYPE]")]
    pub(crate) synced_folders: Vec<String>,
}
