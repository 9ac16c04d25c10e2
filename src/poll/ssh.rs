//! TCP readiness probe for the SSH port.

use std::io::{self, ErrorKind};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{ProbeError, ProbeFuture, ReadinessProbe};

const SSH_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Reports ready once a TCP connection to the SSH port succeeds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SshPortProbe {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl SshPortProbe {
    /// Creates a probe for `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: SSH_CONNECT_TIMEOUT,
        }
    }

    /// Overrides the per-attempt connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Target host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Target port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl ReadinessProbe for SshPortProbe {
    fn is_ready(&self) -> ProbeFuture<'_> {
        Box::pin(async move {
            let connect = timeout(
                self.connect_timeout,
                TcpStream::connect((self.host.as_str(), self.port)),
            )
            .await;
            match connect {
                Ok(Ok(_)) => Ok(true),
                Ok(Err(err)) => classify(&err),
                Err(_) => Ok(false),
            }
        })
    }
}

fn classify(err: &io::Error) -> Result<bool, ProbeError> {
    match err.kind() {
        ErrorKind::NetworkUnreachable | ErrorKind::HostUnreachable => {
            Err(ProbeError::Unreachable {
                message: err.to_string(),
            })
        }
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::TimedOut => Ok(false),
        _ => Err(ProbeError::Transport {
            message: err.to_string(),
        }),
    }
}
