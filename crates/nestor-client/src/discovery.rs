// SPDX-License-Identifier: MIT OR Apache-2.0
//! UDP discovery of Jenkins servers.
//!
//! Jenkins listens on UDP port 33848 and answers any datagram with a short
//! XML document describing itself.

use nestor_config::ClientConfig;
use nestor_error::{ErrorCode, NestorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// Payload of the discovery probe.
pub const PROBE: &[u8] = b"Long live Jenkins!";

const MAX_REPLY: usize = 4096;

/// What a Jenkins server says about itself in a discovery reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscoveredServer {
    /// Jenkins version, e.g. `1.431`.
    pub version: Option<String>,
    /// Root URL the server advertises.
    pub url: Option<String>,
    /// Instance identity.
    pub server_id: Option<String>,
    /// TCP port for inbound agents.
    pub slave_port: Option<String>,
}

impl DiscoveredServer {
    /// Parse the `<hudson>...</hudson>` reply document.
    pub fn from_xml(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml).map_err(|e| {
            NestorError::new(
                ErrorCode::DiscoveryFailed,
                format!("invalid discovery reply: {e}"),
            )
            .with_source(e)
        })
    }
}

/// Sends a discovery probe and waits for the first reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovery {
    port: u16,
    timeout: Duration,
}

impl Discovery {
    /// Probe `port`, giving up after `timeout`.
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Port and timeout from configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.discovery_port(), config.discovery_timeout())
    }

    /// Probe `host` (a name, an address or a broadcast address).
    ///
    /// # Errors
    ///
    /// `DiscoveryTimeout` with "Unable to find any Jenkins instance on
    /// <host>" when nothing answers in time; socket errors are reported as
    /// `DiscoveryFailed` with their original message.
    pub async fn discover(&self, host: &str) -> Result<DiscoveredServer> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await.map_err(socket_error)?;
        socket.set_broadcast(true).map_err(socket_error)?;
        debug!(target: "nestor.discovery", host, port = self.port, "sending probe");
        socket
            .send_to(PROBE, (host, self.port))
            .await
            .map_err(socket_error)?;

        let mut buf = vec![0u8; MAX_REPLY];
        let (len, from) = match tokio::time::timeout(self.timeout, socket.recv_from(&mut buf)).await
        {
            Ok(received) => received.map_err(socket_error)?,
            Err(_) => {
                debug!(target: "nestor.discovery", host, "no reply before timeout");
                return Err(NestorError::discovery_timeout(host));
            }
        };
        debug!(target: "nestor.discovery", %from, bytes = len, "reply received");
        let xml = String::from_utf8_lossy(&buf[..len]);
        DiscoveredServer::from_xml(&xml)
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl crate::JenkinsClient {
    /// [`Discovery::discover`] with this client's discovery settings.
    pub async fn discover(&self, host: &str) -> Result<DiscoveredServer> {
        Discovery::from_config(self.config()).discover(host).await
    }
}

fn socket_error(e: std::io::Error) -> NestorError {
    NestorError::new(ErrorCode::DiscoveryFailed, e.to_string()).with_source(e)
}
