use serde::{Deserialize, Serialize};

/// Top-level, construction-time settings for the auto-discovery core.
///
/// Mirrors the "Recognized configuration options" table: everything here is
/// read once at `AutoServerPool::start()` and never changes for the pool's
/// lifetime (membership itself is of course dynamic — only these knobs are
/// static).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub cluster_endpoint: ClusterEndpointSettings,

    #[serde(default)]
    pub node: NodeSettings,

    #[serde(default)]
    pub poller: PollerSettings,

    #[serde(default)]
    pub socket_pool: SocketPoolSettings,

    /// `"text"` or `"binary"`. Selects the operation factory.
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// The server list a consuming client library was constructed with,
    /// before the first discovery round completes. `start()` seeds
    /// `all_nodes` from this list so `locate()` never observes a null
    /// locator even before the poller's first tick.
    #[serde(default)]
    pub initial_nodes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterEndpointSettings {
    pub hostname: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Initial discovery retry count.
    #[serde(default = "default_tries")]
    pub tries: u32,
    /// Delay between initial discovery retries, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self { tries: default_tries(), delay_ms: default_delay_ms() }
    }
}

fn default_tries() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Polling interval in milliseconds. `< 0` (or absent) means use the
    /// default of 60_000ms.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: i64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self { interval_ms: default_interval_ms() }
    }
}

fn default_interval_ms() -> i64 {
    60_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketPoolSettings {
    /// Interval between resurrection attempts, in milliseconds.
    #[serde(default = "default_dead_timeout_ms")]
    pub dead_timeout_ms: u64,
}

impl Default for SocketPoolSettings {
    fn default() -> Self {
        Self { dead_timeout_ms: default_dead_timeout_ms() }
    }
}

fn default_dead_timeout_ms() -> u64 {
    30_000
}

fn default_protocol() -> String {
    "binary".to_string()
}
