//! Auto-discovery client extension for a clustered, memcached-compatible
//! cache (modeled on managed cluster services that expose a *configuration
//! endpoint*, e.g. ElastiCache's cluster auto-discovery).
//!
//! Three subsystems, wired together by [`pool::AutoServerPool`]:
//! - [`config_node`] + [`poller`] — periodically resolve the cluster's true
//!   node roster from the configuration endpoint.
//! - [`pool`] — maintains the live node set, swaps the consistent-hash
//!   routing table atomically, and runs dead-node resurrection.
//! - [`locator`] — the consistent-hash ring `pool` builds and swaps.
//!
//! The memcached wire protocol for user operations (get/set/delete/...), its
//! socket pool, and value serialization are out of scope — this crate plugs
//! into an underlying client library's "server pool" extension point,
//! modeled here as the [`node::NodeHandle`] / [`protocol::OperationFactory`]
//! traits.

pub mod config;
pub mod config_node;
pub mod endpoint;
pub mod error;
pub mod locator;
pub mod metrics;
pub mod node;
pub mod poller;
pub mod pool;
pub mod protocol;
pub mod runtime;
pub mod wire;

pub use config::Settings;
pub use error::DiscoveryError;
pub use pool::{AutoServerPool, PoolState};
