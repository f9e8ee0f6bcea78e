//! Component C — the auto-updating server pool. Owns the live node set,
//! swaps the routing table atomically on membership change, and runs the
//! dead-node resurrection loop.

use crate::config::Settings;
use crate::config_node::{ConfigNode, RetryPolicy};
use crate::endpoint::NodeEndpoint;
use crate::error::DiscoveryError;
use crate::locator::RoutingTable;
use crate::node::{NodeHandle, TcpNodeHandle};
use crate::poller::{ClusterPoller, PollEvent};
use crate::protocol::{self, OperationFactory};
use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{info, warn};

const STATE_NEW: u8 = 0;
const STATE_STARTED: u8 = 1;
const STATE_DISPOSED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    New,
    Started,
    Disposed,
}

impl From<u8> for PoolState {
    fn from(v: u8) -> Self {
        match v {
            STATE_NEW => PoolState::New,
            STATE_STARTED => PoolState::Started,
            _ => PoolState::Disposed,
        }
    }
}

/// Mutex-guarded slot. Everything here is mutated only under `dead_sync`;
/// `locator` lives outside it as an independently swappable atomic pointer.
struct Inner {
    all_nodes: Vec<Arc<dyn NodeHandle>>,
    resurrect_timer_active: bool,
}

pub struct AutoServerPool {
    settings: Settings,
    cluster_endpoint: NodeEndpoint,
    connect_timeout: Duration,
    dead_timeout: Duration,
    initial_nodes: Vec<NodeEndpoint>,
    operation_factory: Box<dyn OperationFactory>,

    state: AtomicU8,
    locator: ArcSwapOption<RoutingTable>,
    last_config_version: AtomicU64,

    // `tokio::sync::Mutex`, not `std::sync::Mutex`: the resurrection tick
    // holds this lock across `ping().await` (see SPEC_FULL.md §5).
    dead_sync: Mutex<Inner>,

    node_failed_tx: broadcast::Sender<NodeEndpoint>,
    failure_tx: mpsc::UnboundedSender<NodeEndpoint>,
    failure_rx: Mutex<Option<mpsc::UnboundedReceiver<NodeEndpoint>>>,

    poll_rx: Mutex<Option<mpsc::UnboundedReceiver<PollEvent>>>,
    poller: Mutex<ClusterPoller>,
}

impl AutoServerPool {
    pub fn new(settings: &Settings) -> Arc<Self> {
        let cluster_endpoint =
            NodeEndpoint::from_host_port(settings.cluster_endpoint.hostname.clone(), settings.cluster_endpoint.port);

        let retry = RetryPolicy { tries: settings.node.tries, delay: Duration::from_millis(settings.node.delay_ms) };
        let config_node = Arc::new(ConfigNode::new(cluster_endpoint.clone(), retry));
        let poller_interval = settings.poller_interval().map(Duration::from_millis);
        let poller = ClusterPoller::new(config_node, poller_interval);

        let initial_nodes = settings
            .initial_nodes
            .iter()
            .filter_map(|s| parse_host_port(s))
            .collect();

        let (node_failed_tx, _) = broadcast::channel(64);
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            settings: settings.clone(),
            cluster_endpoint,
            connect_timeout: Duration::from_secs(5),
            dead_timeout: Duration::from_millis(settings.socket_pool.dead_timeout_ms),
            initial_nodes,
            operation_factory: protocol::build_operation_factory(settings.protocol()),
            state: AtomicU8::new(STATE_NEW),
            locator: ArcSwapOption::from(None),
            last_config_version: AtomicU64::new(0),
            dead_sync: Mutex::new(Inner { all_nodes: Vec::new(), resurrect_timer_active: false }),
            node_failed_tx,
            failure_tx,
            failure_rx: Mutex::new(Some(failure_rx)),
            poll_rx: Mutex::new(None),
            poller: Mutex::new(poller),
        })
    }

    pub fn state(&self) -> PoolState {
        PoolState::from(self.state.load(Ordering::SeqCst))
    }

    /// Validate settings, initialize node handles from the configured
    /// initial server list, build the first routing table, resolve the true
    /// roster with bounded retry, wire node-failure subscriptions, and start
    /// the discovery poller. A configuration error (bad hostname/port,
    /// endpoint missing `.cfg.`, unknown protocol) or a persistent discovery
    /// error ("all initial retries exhausted") fails `start()` and leaves
    /// the pool in `New` so a caller may retry.
    pub async fn start(self: &Arc<Self>) -> Result<(), DiscoveryError> {
        // Validated here (rather than trusted from construction) so an
        // invalid `Settings` fails `start()` regardless of whether the
        // caller routed it through `Settings::load()` or built it directly.
        self.settings.validate()?;

        if self
            .state
            .compare_exchange(STATE_NEW, STATE_STARTED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(()); // already started or disposed; not an error to call twice
        }

        let handles: Vec<Arc<dyn NodeHandle>> = self
            .initial_nodes
            .iter()
            .cloned()
            .map(|ep| self.make_handle(ep))
            .collect();

        {
            let mut inner = self.dead_sync.lock().await;
            inner.all_nodes = handles.clone();
        }
        self.locator.store(Some(Arc::new(RoutingTable::new(handles))));

        let initial = self.poller.lock().await.resolve_once().await;
        match initial {
            Ok(resp) => self.update_locator(resp.endpoints, resp.config_version).await,
            Err(e) => {
                self.state.store(STATE_NEW, Ordering::SeqCst);
                return Err(e);
            }
        }

        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        *self.poll_rx.lock().await = Some(poll_rx);
        self.poller.lock().await.start(poll_tx);

        let failure_rx = self.failure_rx.lock().await.take();
        if let Some(mut failure_rx) = failure_rx {
            let pool = self.clone();
            tokio::spawn(async move {
                while let Some(endpoint) = failure_rx.recv().await {
                    pool.on_node_failed(endpoint).await;
                }
            });
        }

        let poll_rx = self.poll_rx.lock().await.take();
        if let Some(mut poll_rx) = poll_rx {
            let pool = self.clone();
            tokio::spawn(async move {
                while let Some(event) = poll_rx.recv().await {
                    pool.update_locator(event.response.endpoints, event.response.config_version).await;
                }
            });
        }

        info!("pool: started with {} initial node(s)", self.initial_nodes.len());
        Ok(())
    }

    fn make_handle(&self, endpoint: NodeEndpoint) -> Arc<dyn NodeHandle> {
        Arc::new(TcpNodeHandle::new(endpoint, self.connect_timeout, self.failure_tx.clone()))
    }

    /// Pure function of the current routing table. Wait-free.
    pub fn locate(&self, key: &[u8]) -> Option<Arc<dyn NodeHandle>> {
        if self.state() == PoolState::Disposed {
            return None;
        }
        self.locator.load().as_ref().and_then(|table| table.locate(key))
    }

    /// Snapshot of currently-alive nodes.
    pub async fn working_nodes(&self) -> Vec<Arc<dyn NodeHandle>> {
        self.dead_sync
            .lock()
            .await
            .all_nodes
            .iter()
            .filter(|n| n.is_alive())
            .cloned()
            .collect()
    }

    pub fn operation_factory(&self) -> &dyn OperationFactory {
        self.operation_factory.as_ref()
    }

    pub fn subscribe_node_failed(&self) -> broadcast::Receiver<NodeEndpoint> {
        self.node_failed_tx.subscribe()
    }

    /// Applies a new roster from the poller. Stale versions are ignored.
    pub async fn update_locator(&self, endpoints: Vec<NodeEndpoint>, version: u64) {
        if self.state() == PoolState::Disposed {
            return;
        }
        if version <= self.last_config_version.load(Ordering::SeqCst) {
            return;
        }

        let mut inner = self.dead_sync.lock().await;
        if self.state() == PoolState::Disposed {
            return;
        }

        let mut alive_list: Vec<Arc<dyn NodeHandle>> = Vec::with_capacity(endpoints.len());
        let mut dead_list: Vec<Arc<dyn NodeHandle>> = Vec::new();

        for endpoint in &endpoints {
            let existing_dead = inner
                .all_nodes
                .iter()
                .find(|h| h.endpoint() == endpoint && !h.is_alive())
                .cloned();

            match existing_dead {
                Some(handle) => dead_list.push(handle),
                None => alive_list.push(self.make_handle(endpoint.clone())),
            }
        }

        let dropped: Vec<Arc<dyn NodeHandle>> = inner
            .all_nodes
            .iter()
            .filter(|h| !endpoints.contains(h.endpoint()))
            .cloned()
            .collect();

        let new_table = RoutingTable::new(alive_list.clone());

        let mut merged = alive_list;
        merged.extend(dead_list);
        inner.all_nodes = merged;
        drop(inner);

        self.locator.store(Some(Arc::new(new_table)));
        self.last_config_version.store(version, Ordering::SeqCst);

        for handle in dropped {
            handle.dispose();
        }

        metrics::gauge!("discovery_config_version").set(version as f64);
        metrics::counter!("discovery_poll_total", "result" => "applied").increment(1);
        info!("pool: applied config version {}", version);
    }

    /// Invoked when a node handle's `failed` fires. The failing handle has
    /// already flipped `is_alive` to false before this is called.
    async fn on_node_failed(self: &Arc<Self>, endpoint: NodeEndpoint) {
        if self.state() == PoolState::Disposed {
            return;
        }

        let _ = self.node_failed_tx.send(endpoint.clone());
        metrics::counter!("pool_node_failed_total").increment(1);
        warn!("pool: node {} reported failure", endpoint);

        let mut inner = self.dead_sync.lock().await;
        if self.state() == PoolState::Disposed {
            return;
        }

        let alive: Vec<Arc<dyn NodeHandle>> =
            inner.all_nodes.iter().filter(|n| n.is_alive()).cloned().collect();
        self.locator.store(Some(Arc::new(RoutingTable::new(alive))));

        if !inner.resurrect_timer_active {
            inner.resurrect_timer_active = true;
            drop(inner);
            self.arm_resurrection_timer();
        }
    }

    fn arm_resurrection_timer(self: &Arc<Self>) {
        let pool = self.clone();
        let delay = self.dead_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pool.resurrect_tick().await;
        });
    }

    /// Runs on the resurrection timer. Single-shot: rearms itself only if
    /// dead nodes remain after the tick.
    async fn resurrect_tick(self: &Arc<Self>) {
        if self.state() == PoolState::Disposed {
            return;
        }

        let mut inner = self.dead_sync.lock().await;
        if self.state() == PoolState::Disposed {
            return;
        }

        let snapshot = inner.all_nodes.clone();
        let mut alive_list = Vec::with_capacity(snapshot.len());
        let mut changed = false;
        let mut dead_count = 0u32;

        for node in &snapshot {
            if node.is_alive() {
                alive_list.push(node.clone());
                continue;
            }

            metrics::counter!("pool_resurrection_attempts_total").increment(1);
            if node.ping().await {
                changed = true;
                alive_list.push(node.clone());
            } else {
                dead_count += 1;
            }
        }

        if changed {
            self.locator.store(Some(Arc::new(RoutingTable::new(alive_list))));
        }

        metrics::gauge!("pool_nodes_dead").set(dead_count as f64);
        metrics::gauge!("pool_nodes_alive").set((snapshot.len() as u32 - dead_count) as f64);

        if dead_count == 0 {
            inner.resurrect_timer_active = false;
            drop(inner);
        } else {
            drop(inner);
            self.arm_resurrection_timer();
        }
    }

    /// Idempotent teardown: disposes the locator, every node handle, and
    /// cancels the poller. Concurrent callers race safely on the state
    /// swap; only the first actually tears anything down.
    pub async fn dispose(self: &Arc<Self>) {
        if self.state.swap(STATE_DISPOSED, Ordering::SeqCst) == STATE_DISPOSED {
            return;
        }

        self.poller.lock().await.stop().await;
        self.locator.store(None);

        let mut inner = self.dead_sync.lock().await;
        for handle in &inner.all_nodes {
            handle.dispose();
        }
        inner.all_nodes.clear();

        info!("pool: disposed");
    }

    pub fn cluster_endpoint(&self) -> &NodeEndpoint {
        &self.cluster_endpoint
    }
}

fn parse_host_port(s: &str) -> Option<NodeEndpoint> {
    let (host, port) = s.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    Some(NodeEndpoint::from_host_port(host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterEndpointSettings, NodeSettings, PollerSettings, Settings, SocketPoolSettings};
    use crate::node::mock::MockNodeHandle;

    fn test_settings() -> Settings {
        Settings {
            cluster_endpoint: ClusterEndpointSettings { hostname: "foo.cfg.cache.example.com".into(), port: 11211 },
            node: NodeSettings::default(),
            poller: PollerSettings::default(),
            socket_pool: SocketPoolSettings { dead_timeout_ms: 20 },
            protocol: "binary".into(),
            initial_nodes: vec!["a.example:11211".into()],
        }
    }

    #[tokio::test]
    async fn new_pool_has_no_locator() {
        let pool = AutoServerPool::new(&test_settings());
        assert_eq!(pool.state(), PoolState::New);
        assert!(pool.locate(b"x").is_none());
    }

    #[tokio::test]
    async fn update_locator_ignores_stale_version() {
        let pool = AutoServerPool::new(&test_settings());
        pool.last_config_version.store(5, Ordering::SeqCst);
        pool.update_locator(vec![NodeEndpoint::from_host_port("a", 11211)], 3).await;
        assert_eq!(pool.last_config_version.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn update_locator_applies_newer_version() {
        let pool = AutoServerPool::new(&test_settings());
        let a = NodeEndpoint::from_host_port("a", 11211);
        let b = NodeEndpoint::from_host_port("b", 11211);
        pool.update_locator(vec![a.clone(), b.clone()], 1).await;

        assert_eq!(pool.last_config_version.load(Ordering::SeqCst), 1);
        let nodes = pool.working_nodes().await;
        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test]
    async fn update_preserves_existing_dead_handle() {
        let pool = AutoServerPool::new(&test_settings());
        let (tx, _rx) = mpsc::unbounded_channel();
        let dead_concrete = Arc::new(MockNodeHandle::new(NodeEndpoint::from_host_port("a", 11211), tx));
        dead_concrete.report_failure();
        let dead: Arc<dyn NodeHandle> = dead_concrete;

        {
            let mut inner = pool.dead_sync.lock().await;
            inner.all_nodes = vec![dead];
        }

        let a = NodeEndpoint::from_host_port("a", 11211);
        let b = NodeEndpoint::from_host_port("b", 11211);
        pool.update_locator(vec![a.clone(), b.clone()], 1).await;

        let nodes = pool.dead_sync.lock().await.all_nodes.clone();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().any(|n| n.endpoint() == &a && !n.is_alive()));
        assert!(nodes.iter().any(|n| n.endpoint() == &b && n.is_alive()));
    }

    #[tokio::test]
    async fn locate_returns_none_once_disposed() {
        let pool = AutoServerPool::new(&test_settings());
        pool.update_locator(vec![NodeEndpoint::from_host_port("a", 11211)], 1).await;
        assert!(pool.locate(b"x").is_some());
        pool.dispose().await;
        assert!(pool.locate(b"x").is_none());
    }

    #[tokio::test]
    async fn dispose_is_idempotent() {
        let pool = AutoServerPool::new(&test_settings());
        pool.dispose().await;
        pool.dispose().await;
        assert_eq!(pool.state(), PoolState::Disposed);
    }

    #[tokio::test]
    async fn node_failure_arms_resurrection_and_later_clears() {
        let pool = AutoServerPool::new(&test_settings()); // dead_timeout_ms = 20
        let (tx, _rx) = mpsc::unbounded_channel();
        let node = Arc::new(MockNodeHandle::new(NodeEndpoint::from_host_port("a", 11211), tx));
        let handle: Arc<dyn NodeHandle> = node.clone();

        {
            let mut inner = pool.dead_sync.lock().await;
            inner.all_nodes = vec![handle.clone()];
        }
        pool.locator.store(Some(Arc::new(RoutingTable::new(vec![handle.clone()]))));

        node.set_pingable(false);
        node.report_failure();
        assert!(!handle.is_alive());

        pool.on_node_failed(handle.endpoint().clone()).await;
        assert!(pool.locate(b"x").is_none());
        assert!(pool.dead_sync.lock().await.resurrect_timer_active);

        // the resurrection timer fires after dead_timeout_ms; node still unpingable
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(pool.dead_sync.lock().await.resurrect_timer_active);

        node.set_pingable(true);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(pool.locate(b"x").is_some());
        assert!(!pool.dead_sync.lock().await.resurrect_timer_active);
    }
}
