//! Hub construction and lifecycle

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::stats::HubMetrics;

use super::actor::HubActor;
use super::config::HubConfig;
use super::handle::HubHandle;

/// Slots per intake point. A single slot plus the acceptance
/// acknowledgement makes each submission a rendezvous with the loop.
const INTAKE_CAPACITY: usize = 1;

/// A hub that has been constructed but not started
///
/// Handles can be taken and passed to dependents before any traffic flows;
/// submissions made before [`Hub::start`] wait until the loop is running.
pub struct Hub {
    handle: HubHandle,
    actor: HubActor,
}

impl Hub {
    /// Create a hub with an empty subscriber set
    pub fn new(config: HubConfig) -> Self {
        let (register_tx, register_rx) = mpsc::channel(INTAKE_CAPACITY);
        let (unregister_tx, unregister_rx) = mpsc::channel(INTAKE_CAPACITY);
        let (publish_tx, publish_rx) = mpsc::channel(INTAKE_CAPACITY);
        let metrics = Arc::new(HubMetrics::default());

        Self {
            handle: HubHandle::new(
                register_tx,
                unregister_tx,
                publish_tx,
                Arc::new(config),
                Arc::clone(&metrics),
            ),
            actor: HubActor::new(register_rx, unregister_rx, publish_rx, metrics),
        }
    }

    /// Get a submission handle
    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        self.handle.config()
    }

    /// Spawn the coordination loop on the current tokio runtime
    pub fn start(self) -> HubTask {
        let (stop, shutdown) = oneshot::channel();

        tracing::info!(delivery = ?self.handle.config().delivery, "Hub started");
        let join = tokio::spawn(self.actor.run(shutdown));

        HubTask {
            handle: self.handle,
            stop,
            join,
        }
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").field("handle", &self.handle).finish()
    }
}

/// A running hub
///
/// Dropping this without calling [`HubTask::shutdown`] detaches the loop:
/// it keeps serving until every [`HubHandle`] is gone.
#[derive(Debug)]
pub struct HubTask {
    handle: HubHandle,
    stop: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl HubTask {
    /// Get a submission handle
    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Check if the loop has exited
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the loop, close every registered handle and wait for exit.
    ///
    /// A broadcast stalled on a slow subscriber is abandoned.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());

        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Hub task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::hub::Resource;
    use crate::HubError;

    #[tokio::test(start_paused = true)]
    async fn test_handles_wired_before_start() {
        let hub = Hub::new(HubConfig::new(&b"pub-key"[..], &b"sub-key"[..]));
        let handle = hub.handle();

        assert_eq!(&handle.publisher_key()[..], b"pub-key");
        assert_eq!(&handle.subscriber_key()[..], b"sub-key");
        assert!(!handle.is_closed());

        // Submitted before the loop exists; completes once it starts
        let (sub_handle, _sub) = handle.channel();
        let pending = tokio::spawn({
            let handle = handle.clone();
            async move { handle.register(sub_handle).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        let running = hub.start();
        let id = pending.await.unwrap().unwrap();
        assert_eq!(id.as_u64(), 1);
        assert_eq!(handle.stats().subscribers, 1);

        running.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_everything() {
        let running = Hub::new(HubConfig::default()).start();
        let handle = running.handle();

        let (sub_handle, mut sub) = handle.channel();
        let id = handle.register(sub_handle).await.unwrap();

        running.shutdown().await;

        assert!(handle.is_closed());
        assert_eq!(sub.recv().await, None);
        assert_eq!(handle.publish(Resource::new("/books/1")).await, Err(HubError::Closed));
        assert_eq!(handle.unregister(id).await, Err(HubError::Closed));
        let (late, _late_sub) = handle.channel();
        assert_eq!(handle.register(late).await, Err(HubError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_loop_keeps_running() {
        let running = Hub::new(HubConfig::default()).start();
        let handle = running.handle();
        drop(running);

        let (sub_handle, mut sub) = handle.channel();
        handle.register(sub_handle).await.unwrap();
        handle.publish(Resource::new("/books/1")).await.unwrap();
        assert_eq!(sub.recv().await.unwrap().iri, "/books/1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_exits_when_all_handles_dropped() {
        let hub = Hub::new(HubConfig::default());
        let (sub_handle, mut sub) = hub.handle().channel();

        let running = hub.start();
        running.handle().register(sub_handle).await.unwrap();

        // Detach, dropping the last handle with it
        drop(running);

        let closed = tokio::time::timeout(Duration::from_secs(1), sub.recv()).await;
        assert_eq!(closed.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_hubs() {
        let first = Hub::new(HubConfig::default()).start();
        let second = Hub::new(HubConfig::default()).start();

        let (sub_handle, mut sub) = first.handle().channel();
        first.handle().register(sub_handle).await.unwrap();

        second.handle().publish(Resource::new("/elsewhere")).await.unwrap();
        first.handle().publish(Resource::new("/books/1")).await.unwrap();

        assert_eq!(sub.recv().await.unwrap().iri, "/books/1");
        assert_eq!(second.handle().stats().published, 1);
        assert_eq!(second.handle().stats().delivered, 0);

        first.shutdown().await;
        second.shutdown().await;
    }
}
