//! Component A — translates the cluster endpoint into a parsed, versioned
//! node roster. Owns its own dedicated connection to the configuration
//! endpoint.

use crate::endpoint::NodeEndpoint;
use crate::error::DiscoveryError;
use crate::wire::{self, ClusterConfigResponse, COMMAND};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Retry policy for the *initial* resolution only. Once the poller is
/// running, each tick owns its own single-retry policy (see `poller.rs`).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub tries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { tries: 5, delay: Duration::from_millis(1000) }
    }
}

/// A dedicated client for the `config get cluster` protocol.
pub struct ConfigNode {
    endpoint: NodeEndpoint,
    connect_timeout: Duration,
    retry: RetryPolicy,
}

impl ConfigNode {
    pub fn new(endpoint: NodeEndpoint, retry: RetryPolicy) -> Self {
        Self { endpoint, connect_timeout: Duration::from_secs(5), retry }
    }

    /// Open a fresh connection, issue `config get cluster`, and parse the
    /// response. Each call opens its own short-lived connection — the
    /// configuration endpoint is low-traffic (one request per poll
    /// interval), so a persistent connection brings no benefit and
    /// complicates reconnect-after-idle handling.
    pub async fn resolve(&self) -> Result<ClusterConfigResponse, DiscoveryError> {
        let addr = (self.endpoint.dial_host(), self.endpoint.port());
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                DiscoveryError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect to {} timed out", self.endpoint),
                ))
            })??;

        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(COMMAND.as_bytes()).await?;

        let mut reader = BufReader::new(read_half);
        let mut header = String::new();
        reader.read_line(&mut header).await?;

        let mut body = String::new();
        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(DiscoveryError::Parse("connection closed before END".into()));
            }
            if line.trim_end() == "END" {
                break;
            }
            body.push_str(&line);
        }

        wire::parse_cluster_response(&header, &body)
    }

    /// Resolve with bounded retry, used only for the initial resolution at
    /// pool start. Sleeps `delay_ms` between attempts; surfaces the last
    /// error once `tries` attempts are exhausted.
    pub async fn resolve_with_retry(&self) -> Result<ClusterConfigResponse, DiscoveryError> {
        let mut last_err: Option<DiscoveryError> = None;
        for attempt in 1..=self.retry.tries.max(1) {
            match self.resolve().await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    warn!(
                        "config_node: resolve attempt {}/{} failed: {}",
                        attempt, self.retry.tries, e
                    );
                    last_err = Some(e);
                    if attempt < self.retry.tries {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }

        let last = last_err.unwrap_or_else(|| DiscoveryError::Parse("no attempts made".into()));
        Err(DiscoveryError::ResolveExhausted { attempts: self.retry.tries, last: Box::new(last) })
    }

    /// A single retry within a poller tick: try once, and on failure try
    /// exactly once more before giving up for this tick.
    pub async fn resolve_tick(&self) -> Result<ClusterConfigResponse, DiscoveryError> {
        match self.resolve().await {
            Ok(resp) => Ok(resp),
            Err(first_err) => {
                debug!("config_node: tick resolve failed once, retrying: {}", first_err);
                self.resolve().await
            }
        }
    }
}
