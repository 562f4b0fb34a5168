//! Event submission
//!
//! [`HubHandle`] is the only way into the hub. Each intake point holds a
//! single slot and every submission waits for the loop to acknowledge it,
//! so a call returns only once the hub has actually taken the event.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::error::{HubError, Result};
use crate::stats::{HubMetrics, HubStats};

use super::actor::{Admit, Broadcast, Remove};
use super::config::HubConfig;
use super::resource::Resource;
use super::subscriber::{self, SubscriberHandle, SubscriberId, Subscription};

/// Cloneable submission side of a hub
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<Admit>,
    unregister_tx: mpsc::Sender<Remove>,
    publish_tx: mpsc::Sender<Broadcast>,
    config: Arc<HubConfig>,
    metrics: Arc<HubMetrics>,
}

impl HubHandle {
    pub(super) fn new(
        register_tx: mpsc::Sender<Admit>,
        unregister_tx: mpsc::Sender<Remove>,
        publish_tx: mpsc::Sender<Broadcast>,
        config: Arc<HubConfig>,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        Self {
            register_tx,
            unregister_tx,
            publish_tx,
            config,
            metrics,
        }
    }

    /// Create a subscriber channel using the hub's delivery policy
    pub fn channel(&self) -> (SubscriberHandle, Subscription) {
        subscriber::channel(self.config.delivery)
    }

    /// Register a subscriber.
    ///
    /// Returns once the hub has admitted it; only resources published after
    /// this point are delivered to it. If the future is dropped before the
    /// hub admits the subscriber, the handle is closed instead.
    pub async fn register(&self, handle: SubscriberHandle) -> Result<SubscriberId> {
        let (reply, rx) = oneshot::channel();
        self.register_tx
            .send(Admit { handle, reply })
            .await
            .map_err(|_| HubError::Closed)?;

        rx.await.map_err(|_| HubError::Closed)
    }

    /// Unregister a subscriber and close its handle.
    ///
    /// Returns [`HubError::UnknownSubscriber`] if the subscriber was never
    /// admitted or has already been removed; the hub state is unchanged.
    pub async fn unregister(&self, id: SubscriberId) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.unregister_tx
            .send(Remove { id, reply })
            .await
            .map_err(|_| HubError::Closed)?;

        rx.await.map_err(|_| HubError::Closed)?
    }

    /// Publish a resource to every registered subscriber.
    ///
    /// Returns once the hub has accepted the resource, before fan-out. A
    /// publish whose future is dropped before acceptance is not broadcast.
    pub async fn publish(&self, resource: Resource) -> Result<()> {
        let (accepted, rx) = oneshot::channel();
        self.publish_tx
            .send(Broadcast { resource, accepted })
            .await
            .map_err(|_| HubError::Closed)?;

        rx.await.map_err(|_| HubError::Closed)
    }

    /// Snapshot of hub counters
    pub fn stats(&self) -> HubStats {
        self.metrics.snapshot()
    }

    /// Hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Key material for publisher authentication
    pub fn publisher_key(&self) -> &Bytes {
        &self.config.publisher_key
    }

    /// Key material for subscriber authentication
    pub fn subscriber_key(&self) -> &Bytes {
        &self.config.subscriber_key
    }

    /// Check whether the coordination loop has exited
    pub fn is_closed(&self) -> bool {
        self.publish_tx.is_closed()
    }
}

impl std::fmt::Debug for HubHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubHandle")
            .field("delivery", &self.config.delivery)
            .field("closed", &self.is_closed())
            .finish()
    }
}
