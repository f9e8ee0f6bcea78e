pub mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use crate::error::DiscoveryError;
use crate::protocol::Protocol;
use std::path::Path;

impl Settings {
    /// Load settings from a file (TOML or JSON, by extension) and apply
    /// `DISCOVERY_*` environment variable overrides, matching the teacher's
    /// file-then-env-then-validate pipeline.
    pub fn load(path: &Path) -> Result<Self, DiscoveryError> {
        let mut settings: Settings = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(DiscoveryError::Io)?;
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => toml::from_str(&content)
                    .map_err(|e| DiscoveryError::Config(format!("invalid TOML: {e}")))?,
                Some("json") => serde_json::from_str(&content)
                    .map_err(|e| DiscoveryError::Config(format!("invalid JSON: {e}")))?,
                Some(ext) => {
                    return Err(DiscoveryError::Config(format!(
                        "unsupported config format: .{ext}, use .toml or .json"
                    )))
                }
                None => {
                    return Err(DiscoveryError::Config(
                        "config file has no extension, use .toml or .json".into(),
                    ))
                }
            }
        } else {
            return Err(DiscoveryError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        };

        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("DISCOVERY_CLUSTER_ENDPOINT_HOSTNAME") {
            self.cluster_endpoint.hostname = v;
        }
        if let Ok(v) = std::env::var("DISCOVERY_CLUSTER_ENDPOINT_PORT") {
            if let Ok(port) = v.parse() {
                self.cluster_endpoint.port = port;
            }
        }
        if let Ok(v) = std::env::var("DISCOVERY_NODE_TRIES") {
            if let Ok(n) = v.parse() {
                self.node.tries = n;
            }
        }
        if let Ok(v) = std::env::var("DISCOVERY_NODE_DELAY_MS") {
            if let Ok(n) = v.parse() {
                self.node.delay_ms = n;
            }
        }
        if let Ok(v) = std::env::var("DISCOVERY_POLLER_INTERVAL_MS") {
            if let Ok(n) = v.parse() {
                self.poller.interval_ms = n;
            }
        }
        if let Ok(v) = std::env::var("DISCOVERY_SOCKET_POOL_DEAD_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.socket_pool.dead_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("DISCOVERY_PROTOCOL") {
            self.protocol = v;
        }
    }

    /// Observable errors: null/empty hostname, non-positive port, endpoint
    /// that does not support auto-discovery, unknown protocol.
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if self.cluster_endpoint.hostname.trim().is_empty() {
            return Err(DiscoveryError::Config("cluster_endpoint.hostname is empty".into()));
        }
        if self.cluster_endpoint.port == 0 {
            return Err(DiscoveryError::Config("cluster_endpoint.port must be > 0".into()));
        }
        if !self.cluster_endpoint.hostname.to_lowercase().contains(".cfg.") {
            return Err(DiscoveryError::Config(format!(
                "cluster endpoint {:?} does not support auto-discovery (missing '.cfg.')",
                self.cluster_endpoint.hostname
            )));
        }
        self.protocol
            .parse::<Protocol>()
            .map_err(DiscoveryError::Config)?;
        Ok(())
    }

    pub fn protocol(&self) -> Protocol {
        // Already validated in `validate()`; constructors must call
        // `validate()` before this is used, so the unwrap cannot fail in
        // practice. Fall back to the documented default defensively.
        self.protocol.parse().unwrap_or(Protocol::Binary)
    }

    /// `poller.interval_ms < 0` means "use the default" — normalize to
    /// `None` so callers don't need to repeat the sentinel check.
    pub fn poller_interval(&self) -> Option<u64> {
        if self.poller.interval_ms < 0 {
            None
        } else {
            Some(self.poller.interval_ms as u64)
        }
    }
}

/// Install a `tracing` subscriber reading `RUST_LOG` (default `info`),
/// matching the teacher's `init_tracing()`. Host applications own calling
/// this — the library itself never installs a global subscriber.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
