//! SSH `direct-tcpip` forwarding with russh.
//!
//! Password authentication only: no agent, no key files. Each connection
//! accepted on the local port gets its own SSH channel to
//! `remote_host:remote_port`, resolved on the SSH server.

use crate::config::ConnectionDescriptor;
use crate::otel::spans::tunnel_span;
use crate::tunnel::{ActiveTunnel, TunnelProvider};
use crate::types::{AskError, Result};
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::Disconnect;
use russh_keys::key::PublicKey;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;

/// Local interface the forward binds to.
pub const LOCAL_BIND_HOST: Ipv4Addr = Ipv4Addr::LOCALHOST;

const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Host key policy for one connection.
struct ForwardClient {
    expected_fingerprint: Option<String>,
}

/// Strip the optional `SHA256:` prefix and base64 padding.
fn normalize_fingerprint(fingerprint: &str) -> &str {
    let trimmed = fingerprint.trim();
    trimmed
        .strip_prefix("SHA256:")
        .unwrap_or(trimmed)
        .trim_end_matches('=')
}

#[async_trait]
impl client::Handler for ForwardClient {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        match &self.expected_fingerprint {
            Some(expected) => {
                let accepted =
                    normalize_fingerprint(expected) == normalize_fingerprint(&fingerprint);
                if !accepted {
                    tracing::error!(
                        fingerprint = %fingerprint,
                        "SSH host key does not match SSH_HOST_FINGERPRINT"
                    );
                }
                Ok(accepted)
            }
            None => {
                tracing::debug!(fingerprint = %fingerprint, "Accepting SSH host key");
                Ok(true)
            }
        }
    }
}

/// Opens [`SshTunnel`]s from a connection descriptor.
pub struct SshTunnelProvider {
    descriptor: ConnectionDescriptor,
}

impl SshTunnelProvider {
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self { descriptor }
    }

    async fn connect(&self) -> Result<Handle<ForwardClient>> {
        let d = &self.descriptor;
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(INACTIVITY_TIMEOUT),
            ..Default::default()
        });
        let handler = ForwardClient {
            expected_fingerprint: d.ssh_host_fingerprint.clone(),
        };

        let mut handle = client::connect(config, (d.ssh_host.as_str(), d.ssh_port), handler)
            .await
            .map_err(|e| match e {
                russh::Error::UnknownKey => {
                    AskError::tunnel(format!("host key of {} rejected", d.ssh_host))
                }
                other => AskError::tunnel(format!(
                    "cannot reach {}:{}: {}",
                    d.ssh_host, d.ssh_port, other
                )),
            })?;

        let authenticated = handle
            .authenticate_password(d.ssh_user.clone(), d.ssh_password.clone())
            .await
            .map_err(|e| AskError::tunnel(format!("authentication failed: {}", e)))?;

        if !authenticated {
            return Err(AskError::tunnel(format!(
                "authentication rejected for {}@{}",
                d.ssh_user, d.ssh_host
            )));
        }

        Ok(handle)
    }
}

#[async_trait]
impl TunnelProvider for SshTunnelProvider {
    type Tunnel = SshTunnel;

    async fn open(&self) -> Result<SshTunnel> {
        let d = &self.descriptor;
        let span = tunnel_span(&d.ssh_host, &self.describe_remote());

        async {
            let handle = self.connect().await?;

            let listener = match TcpListener::bind((LOCAL_BIND_HOST, d.local_port)).await {
                Ok(listener) => listener,
                Err(e) => {
                    let _ = handle.disconnect(Disconnect::ByApplication, "", "en").await;
                    return Err(AskError::tunnel(format!(
                        "cannot bind {}:{}: {}",
                        LOCAL_BIND_HOST, d.local_port, e
                    )));
                }
            };
            let local_addr = listener.local_addr()?;
            tracing::Span::current().record("tunnel.local_port", local_addr.port());

            let handle = Arc::new(handle);
            let forward = tokio::spawn(forward_connections(
                listener,
                Arc::clone(&handle),
                d.remote_host.clone(),
                d.remote_port,
            ));

            tracing::info!(local = %local_addr, "SSH tunnel open");

            Ok(SshTunnel {
                handle,
                local_addr,
                forward: Some(forward),
            })
        }
        .instrument(span)
        .await
    }

    fn describe_remote(&self) -> String {
        format!("{}:{}", self.descriptor.ssh_host, self.descriptor.remote_port)
    }
}

/// Accept local connections and pipe each through its own SSH channel.
///
/// Per-connection tasks live in a `JoinSet` so aborting this task aborts
/// them too.
async fn forward_connections(
    listener: TcpListener,
    handle: Arc<Handle<ForwardClient>>,
    remote_host: String,
    remote_port: u16,
) {
    let mut connections = JoinSet::new();

    loop {
        let (mut socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Tunnel listener stopped");
                break;
            }
        };

        // reap finished connections
        while connections.try_join_next().is_some() {}

        let handle = Arc::clone(&handle);
        let remote_host = remote_host.clone();
        connections.spawn(async move {
            let channel = match handle
                .channel_open_direct_tcpip(
                    remote_host,
                    u32::from(remote_port),
                    peer.ip().to_string(),
                    u32::from(peer.port()),
                )
                .await
            {
                Ok(channel) => channel,
                Err(e) => {
                    tracing::warn!(peer = %peer, error = %e, "Cannot open forwarding channel");
                    return;
                }
            };

            let mut stream = channel.into_stream();
            match tokio::io::copy_bidirectional(&mut socket, &mut stream).await {
                Ok((sent, received)) => {
                    tracing::debug!(peer = %peer, sent, received, "Forwarded connection closed")
                }
                Err(e) => tracing::debug!(peer = %peer, error = %e, "Forwarded connection ended"),
            }
        });
    }
}

/// An open SSH forward.
///
/// Dropping it stops the listener; [`ActiveTunnel::close`] additionally
/// sends an SSH disconnect.
pub struct SshTunnel {
    handle: Arc<Handle<ForwardClient>>,
    local_addr: SocketAddr,
    forward: Option<JoinHandle<()>>,
}

impl SshTunnel {
    fn stop_forwarding(&mut self) {
        if let Some(forward) = self.forward.take() {
            forward.abort();
        }
    }
}

#[async_trait]
impl ActiveTunnel for SshTunnel {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn close(mut self) -> Result<()> {
        self.stop_forwarding();
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| AskError::tunnel(format!("disconnect failed: {}", e)))?;
        tracing::info!(local = %self.local_addr, "SSH tunnel closed");
        Ok(())
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        self.stop_forwarding();
    }
}
