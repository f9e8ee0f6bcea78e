use crate::endpoint::NodeEndpoint;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Duration;

/// The capability an underlying memcached client library exposes per cache
/// node. The pool owns every `NodeHandle` it creates; nothing downstream of
/// this trait holds a reference back to the pool (see `DESIGN.md` on
/// breaking the pool/handle cycle).
#[async_trait]
pub trait NodeHandle: Send + Sync + 'static {
    fn endpoint(&self) -> &NodeEndpoint;

    /// True when the handle has a usable connection, or has not yet been
    /// marked dead. Monotonically resettable: flips false on failure, flips
    /// back true on a successful `ping()`.
    fn is_alive(&self) -> bool;

    /// Attempt to re-establish connectivity. Returns success/failure; on
    /// success flips `is_alive` back to true.
    async fn ping(&self) -> bool;

    /// Release sockets. Idempotent.
    fn dispose(&self);
}

/// A real `NodeHandle` backed by a single TCP connect/probe per `ping()`.
///
/// This crate does not implement the memcached wire protocol for user
/// operations (that belongs to the underlying client library this core
/// plugs into) — so `TcpNodeHandle` only proves connectivity, it does not
/// pool or reuse a socket for traffic. The surrounding library is expected
/// to layer its own socket pool on top of `endpoint()`.
pub struct TcpNodeHandle {
    endpoint: NodeEndpoint,
    alive: AtomicBool,
    connect_timeout: Duration,
    failure_tx: mpsc::UnboundedSender<NodeEndpoint>,
}

impl TcpNodeHandle {
    pub fn new(
        endpoint: NodeEndpoint,
        connect_timeout: Duration,
        failure_tx: mpsc::UnboundedSender<NodeEndpoint>,
    ) -> Self {
        Self {
            endpoint,
            alive: AtomicBool::new(true),
            connect_timeout,
            failure_tx,
        }
    }

    /// Called by the operation layer (out of scope for this crate) when a
    /// request against this node fails terminally. Only the alive → dead
    /// transition is reported upstream — repeated failures on an already-dead
    /// handle are not renotified, since the pool already knows about it.
    pub fn report_failure(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            let _ = self.failure_tx.send(self.endpoint.clone());
        }
    }
}

#[async_trait]
impl NodeHandle for TcpNodeHandle {
    fn endpoint(&self) -> &NodeEndpoint {
        &self.endpoint
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn ping(&self) -> bool {
        let addr = (self.endpoint.dial_host(), self.endpoint.port());
        let connected = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .ok()
            .and_then(Result::ok)
            .is_some();

        if connected {
            self.alive.store(true, Ordering::SeqCst);
        }
        connected
    }

    fn dispose(&self) {
        // No pooled socket is held open by this handle; nothing to release.
        // Real client libraries layering a socket pool on top would close
        // their pooled connections for this endpoint here.
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::AtomicBool;

    /// In-memory `NodeHandle` for pool/resurrection unit tests. `ping()`
    /// succeeds or fails according to a test-controlled flag instead of
    /// touching a real socket.
    pub struct MockNodeHandle {
        endpoint: NodeEndpoint,
        alive: AtomicBool,
        pingable: AtomicBool,
        failure_tx: mpsc::UnboundedSender<NodeEndpoint>,
        disposed: AtomicBool,
    }

    impl MockNodeHandle {
        pub fn new(endpoint: NodeEndpoint, failure_tx: mpsc::UnboundedSender<NodeEndpoint>) -> Self {
            Self {
                endpoint,
                alive: AtomicBool::new(true),
                pingable: AtomicBool::new(true),
                failure_tx,
                disposed: AtomicBool::new(false),
            }
        }

        pub fn set_pingable(&self, pingable: bool) {
            self.pingable.store(pingable, Ordering::SeqCst);
        }

        pub fn report_failure(&self) {
            if self.alive.swap(false, Ordering::SeqCst) {
                let _ = self.failure_tx.send(self.endpoint.clone());
            }
        }

        pub fn is_disposed(&self) -> bool {
            self.disposed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NodeHandle for MockNodeHandle {
        fn endpoint(&self) -> &NodeEndpoint {
            &self.endpoint
        }

        fn is_alive(&self) -> bool {
            self.alive.load(Ordering::SeqCst)
        }

        async fn ping(&self) -> bool {
            let ok = self.pingable.load(Ordering::SeqCst);
            if ok {
                self.alive.store(true, Ordering::SeqCst);
            }
            ok
        }

        fn dispose(&self) {
            self.disposed.store(true, Ordering::SeqCst);
        }
    }
}
