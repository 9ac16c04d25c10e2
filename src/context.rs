//! Execution context threaded through one lifecycle pipeline run.
//!
//! The context is created once per invocation, handed to each action by
//! mutable reference in turn, and discarded afterwards. `machine_id` is the
//! single source of truth for whether a tracked instance exists.

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::Serialize;
use thiserror::Error;

use crate::poll::InterruptFlag;

/// Sharing protocol requested by a synced folder.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum SyncedFolderKind {
    /// Provider default.
    #[default]
    Default,
    /// rsync over SSH.
    Rsync,
    /// NFS export from the host.
    Nfs,
    /// Any other named protocol.
    Other(String),
}

impl SyncedFolderKind {
    /// Parses a protocol name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "default" => Self::Default,
            "rsync" => Self::Rsync,
            "nfs" => Self::Nfs,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for SyncedFolderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Rsync => f.write_str("rsync"),
            Self::Nfs => f.write_str("nfs"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Folder shared between the host and the instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyncedFolder {
    /// Path on the host.
    pub host_path: Utf8PathBuf,
    /// Path inside the instance.
    pub guest_path: Utf8PathBuf,
    /// Sharing protocol.
    pub kind: SyncedFolderKind,
}

/// Errors raised when parsing a `HOST:GUEST[:TYPE]` folder entry.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SyncedFolderParseError {
    /// The entry lacks a host or guest path.
    #[error("synced folder '{0}' must look like HOST:GUEST[:TYPE]")]
    Malformed(String),
}

/// Parses `HOST:GUEST[:TYPE]`.
///
/// The guest path is an absolute path inside the instance, so a final
/// segment that does not start with `/` names the type. The host path may
/// contain colons, as in `C:\src:/vagrant:nfs`.
impl FromStr for SyncedFolder {
    type Err = SyncedFolderParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || SyncedFolderParseError::Malformed(value.to_owned());
        // Split from the right so host paths may carry a drive prefix.
        let (paths, kind) = match value.rsplit_once(':') {
            Some((rest, last))
                if rest.contains(':') && !last.trim_start().starts_with('/') =>
            {
                (rest, SyncedFolderKind::parse(last))
            }
            _ => (value, SyncedFolderKind::Default),
        };
        let (raw_host, raw_guest) = paths.rsplit_once(':').ok_or_else(malformed)?;
        let (host, guest) = (raw_host.trim(), raw_guest.trim());
        if host.is_empty() || guest.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            host_path: Utf8PathBuf::from(host),
            guest_path: Utf8PathBuf::from(guest),
            kind,
        })
    }
}

/// Mutable state shared by the actions of one pipeline run.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    /// Tracked instance identifier; `None` means no instance.
    pub machine_id: Option<String>,
    /// Machine name used for name-based lookup when no id is tracked.
    pub machine_name: String,
    /// Floating IP assigned before the actions run.
    pub floating_ip: Option<String>,
    /// Cooperative interrupt flag, settable from outside the pipeline.
    pub interrupt: InterruptFlag,
    /// Folders configured for sharing with the instance.
    pub synced_folders: Vec<SyncedFolder>,
    /// Host-side NFS address, written by NFS preparation.
    pub nfs_host_ip: Option<String>,
    /// Guest-side NFS address, written by NFS preparation.
    pub nfs_machine_ip: Option<String>,
    /// Identifiers of every server visible to the credentials.
    pub nfs_valid_ids: Vec<String>,
}

impl ExecutionContext {
    /// Creates a context for the named machine.
    #[must_use]
    pub fn new(machine_name: impl Into<String>) -> Self {
        Self {
            machine_name: machine_name.into(),
            ..Self::default()
        }
    }

    /// Sets the tracked instance identifier.
    #[must_use]
    pub fn with_machine_id(mut self, machine_id: Option<String>) -> Self {
        self.machine_id = machine_id;
        self
    }

    /// Sets the floating IP.
    #[must_use]
    pub fn with_floating_ip(mut self, floating_ip: Option<String>) -> Self {
        self.floating_ip = floating_ip;
        self
    }

    /// Sets the synced folders.
    #[must_use]
    pub fn with_synced_folders(mut self, folders: Vec<SyncedFolder>) -> Self {
        self.synced_folders = folders;
        self
    }

    /// Shares an existing interrupt flag with this context.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Whether any synced folder asks for NFS.
    #[must_use]
    pub fn uses_nfs(&self) -> bool {
        self.synced_folders
            .iter()
            .any(|folder| folder.kind == SyncedFolderKind::Nfs)
    }

    /// Forgets the tracked instance, returning the previous identifier.
    pub const fn clear_machine_id(&mut self) -> Option<String> {
        self.machine_id.take()
    }

    /// Serialisable view of the context outputs.
    #[must_use]
    pub fn report(&self) -> ContextReport {
        ContextReport {
            machine_id: self.machine_id.clone(),
            nfs_host_ip: self.nfs_host_ip.clone(),
            nfs_machine_ip: self.nfs_machine_ip.clone(),
            nfs_valid_ids: self.nfs_valid_ids.clone(),
        }
    }
}

/// Outputs of a pipeline run, printed by the binary.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ContextReport {
    /// Tracked instance identifier after the run.
    pub machine_id: Option<String>,
    /// Host-side NFS address.
    pub nfs_host_ip: Option<String>,
    /// Guest-side NFS address.
    pub nfs_machine_ip: Option<String>,
    /// Identifiers of every visible server.
    pub nfs_valid_ids: Vec<String>,
}
