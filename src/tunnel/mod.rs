//! Local port forwarding to the database host.
//!
//! A tunnel is acquired once per question and released on every exit path.
//! [`ActiveTunnel::close`] consumes the handle so it cannot be closed twice;
//! implementations also release their resources on drop.

pub mod ssh;

use crate::types::Result;
use async_trait::async_trait;
use std::net::SocketAddr;

pub use ssh::{SshTunnel, SshTunnelProvider};

/// Opens tunnels.
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    type Tunnel: ActiveTunnel;

    /// Open a forward and return once the local port accepts connections.
    ///
    /// # Errors
    ///
    /// Returns `AskError::TunnelError` if the host is unreachable, the
    /// credentials are rejected or the local port cannot be bound
    async fn open(&self) -> Result<Self::Tunnel>;

    /// Human-readable forward target, e.g. `bastion:3306`.
    fn describe_remote(&self) -> String;
}

/// An open tunnel.
#[async_trait]
pub trait ActiveTunnel: Send {
    /// Local address the database client should connect to.
    fn local_addr(&self) -> SocketAddr;

    /// Tear the tunnel down.
    async fn close(self) -> Result<()>;
}
