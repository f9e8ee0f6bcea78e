//! Component B — periodically re-resolves the cluster configuration and
//! forwards changes to whatever owns the routing table.

use crate::config_node::ConfigNode;
use crate::error::DiscoveryError;
use crate::wire::ClusterConfigResponse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(60_000);

/// Emitted on every successful poll, whether or not membership actually
/// changed — the receiver (`AutoServerPool::update_locator`) is responsible
/// for deciding whether a version bump is a no-op.
#[derive(Debug, Clone)]
pub struct PollEvent {
    pub response: ClusterConfigResponse,
}

/// Periodically calls `ConfigNode::resolve_tick()` and publishes the result.
/// Non-reentrant: if a tick is still running when the next one is due
/// (e.g. a slow or hung config endpoint), the next tick is skipped rather
/// than queued, matching the teacher's `try_lock`-guarded watch loops.
pub struct ClusterPoller {
    config_node: Arc<ConfigNode>,
    interval: Duration,
    running: Arc<AtomicBool>,
    tick_lock: Arc<Mutex<()>>,
    shutdown: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl ClusterPoller {
    pub fn new(config_node: Arc<ConfigNode>, interval: Option<Duration>) -> Self {
        Self {
            config_node,
            interval: interval.unwrap_or(DEFAULT_INTERVAL),
            running: Arc::new(AtomicBool::new(false)),
            tick_lock: Arc::new(Mutex::new(())),
            shutdown: Arc::new(Notify::new()),
            handle: None,
        }
    }

    /// Spawn the polling loop. Events are sent on `tx`; the loop exits when
    /// the channel's receiver is dropped or `stop()` signals shutdown.
    ///
    /// Waiting for the next tick (or for the very first one) is interrupted
    /// immediately by `stop()`'s shutdown signal; a tick already in flight
    /// is always allowed to finish, matching `stop()`'s "wait for an
    /// in-flight tick" contract.
    pub fn start(&mut self, tx: mpsc::UnboundedSender<PollEvent>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let config_node = self.config_node.clone();
        let interval = self.interval;
        let tick_lock = self.tick_lock.clone();
        let shutdown = self.shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            // first tick fires immediately; still interruptible by shutdown
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.notified() => return,
            }

            loop {
                let Ok(_guard) = tick_lock.try_lock() else {
                    debug!("poller: previous tick still running, skipping this one");
                    tokio::select! {
                        _ = ticker.tick() => continue,
                        _ = shutdown.notified() => return,
                    }
                };

                match config_node.resolve_tick().await {
                    Ok(response) => {
                        if tx.send(PollEvent { response }).is_err() {
                            return; // receiver gone, nothing left to do
                        }
                    }
                    Err(e) => warn!("poller: tick failed: {}", e),
                }

                drop(_guard);

                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.notified() => return,
                }
            }
        });

        self.handle = Some(handle);
    }

    /// Cancels future ticks and waits for an in-flight tick to finish before
    /// returning. Idempotent — calling `stop()` when not running (or twice)
    /// is a no-op past the first call.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One-shot resolve outside the spawned loop, used by `AutoServerPool`
    /// for the synchronous initial resolution at `start()`.
    pub async fn resolve_once(&self) -> Result<ClusterConfigResponse, DiscoveryError> {
        self.config_node.resolve_with_retry().await
    }
}

impl Drop for ClusterPoller {
    fn drop(&mut self) {
        // Drop can't `.await` a graceful `stop()`; this is a best-effort
        // cancellation for pollers dropped without going through
        // `AutoServerPool::dispose()`, which always calls `stop()` first.
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
