//! Coordination loop
//!
//! The actor owns the subscriber arena and processes one event at a time:
//! admit, remove, or broadcast. Nothing else touches the arena, so no lock
//! is needed and every broadcast sees all admissions and removals accepted
//! before it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use crate::error::{HubError, Result};
use crate::stats::HubMetrics;

use super::resource::Resource;
use super::subscriber::{Delivery, SubscriberHandle, SubscriberId};

/// Request to admit a subscriber
pub(super) struct Admit {
    pub(super) handle: SubscriberHandle,
    pub(super) reply: oneshot::Sender<SubscriberId>,
}

/// Request to remove and close a subscriber
pub(super) struct Remove {
    pub(super) id: SubscriberId,
    pub(super) reply: oneshot::Sender<Result<()>>,
}

/// Request to broadcast a resource
pub(super) struct Broadcast {
    pub(super) resource: Resource,
    pub(super) accepted: oneshot::Sender<()>,
}

/// Entry for a single subscriber in the arena
struct SubscriberRecord {
    handle: SubscriberHandle,
    registered_at: Instant,
    delivered: u64,
}

/// Why the hub removed a subscriber on its own
#[derive(Debug, Clone, Copy)]
enum Eviction {
    Gone,
    Overflow,
}

pub(super) struct HubActor {
    subscribers: HashMap<SubscriberId, SubscriberRecord>,
    next_id: u64,
    register_rx: mpsc::Receiver<Admit>,
    unregister_rx: mpsc::Receiver<Remove>,
    publish_rx: mpsc::Receiver<Broadcast>,
    metrics: Arc<HubMetrics>,
}

impl HubActor {
    pub(super) fn new(
        register_rx: mpsc::Receiver<Admit>,
        unregister_rx: mpsc::Receiver<Remove>,
        publish_rx: mpsc::Receiver<Broadcast>,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        Self {
            subscribers: HashMap::new(),
            next_id: 0,
            register_rx,
            unregister_rx,
            publish_rx,
            metrics,
        }
    }

    /// Run until `shutdown` fires or every intake sender is dropped.
    ///
    /// A dropped `shutdown` sender detaches the loop instead of stopping it.
    pub(super) async fn run(mut self, shutdown: oneshot::Receiver<()>) {
        let mut shutdown = Some(shutdown);
        tracing::debug!("Hub coordination loop started");

        loop {
            tokio::select! {
                _ = stop_requested(&mut shutdown) => break,

                admit = self.register_rx.recv() => match admit {
                    Some(admit) => self.admit(admit),
                    None => break,
                },

                remove = self.unregister_rx.recv() => match remove {
                    Some(remove) => self.remove(remove),
                    None => break,
                },

                broadcast = self.publish_rx.recv() => match broadcast {
                    Some(Broadcast { resource, accepted }) => {
                        // Publisher only waits for acceptance, not for fan-out
                        if accepted.send(()).is_err() {
                            tracing::debug!(iri = %resource.iri, "Publish abandoned before acceptance");
                            continue;
                        }

                        tokio::select! {
                            _ = stop_requested(&mut shutdown) => break,
                            _ = self.broadcast(resource) => {}
                        }
                    }
                    None => break,
                },
            }
        }

        self.close_all();
    }

    fn admit(&mut self, admit: Admit) {
        let Admit { handle, reply } = admit;

        self.next_id += 1;
        let id = SubscriberId::new(self.next_id);

        self.subscribers.insert(
            id,
            SubscriberRecord {
                handle,
                registered_at: Instant::now(),
                delivered: 0,
            },
        );
        self.metrics.on_registered(self.subscribers.len());

        if reply.send(id).is_err() {
            // Caller gave up waiting; nobody could ever unregister this one
            tracing::debug!(subscriber = %id, "Registration abandoned");
            self.evict(id, Eviction::Gone);
            return;
        }

        tracing::debug!(
            subscriber = %id,
            subscribers = self.subscribers.len(),
            "Subscriber registered"
        );
    }

    fn remove(&mut self, remove: Remove) {
        let Remove { id, reply } = remove;

        let result = match self.subscribers.remove(&id) {
            Some(record) => {
                self.metrics.on_unregistered(self.subscribers.len());
                tracing::debug!(
                    subscriber = %id,
                    delivered = record.delivered,
                    connected_ms = record.registered_at.elapsed().as_millis() as u64,
                    subscribers = self.subscribers.len(),
                    "Subscriber unregistered"
                );
                // Dropping the record closes the handle
                Ok(())
            }
            None => {
                tracing::warn!(subscriber = %id, "Unregister for unknown subscriber");
                Err(HubError::UnknownSubscriber(id))
            }
        };

        let _ = reply.send(result);
    }

    async fn broadcast(&mut self, resource: Resource) {
        let mut delivered = 0u64;
        let mut evictions = Vec::new();

        for (id, record) in self.subscribers.iter_mut() {
            match record.handle.deliver(resource.clone()).await {
                Delivery::Delivered => {
                    record.delivered += 1;
                    delivered += 1;
                }
                Delivery::Overflow => evictions.push((*id, Eviction::Overflow)),
                Delivery::Gone => evictions.push((*id, Eviction::Gone)),
            }
        }

        for (id, reason) in evictions {
            self.evict(id, reason);
        }

        self.metrics.on_published(delivered);
        tracing::info!(
            iri = %resource.iri,
            subscribers = self.subscribers.len(),
            delivered = delivered,
            "Broadcast resource"
        );
    }

    fn evict(&mut self, id: SubscriberId, reason: Eviction) {
        if let Some(record) = self.subscribers.remove(&id) {
            self.metrics.on_evicted(self.subscribers.len());
            match reason {
                Eviction::Overflow => tracing::warn!(
                    subscriber = %id,
                    delivered = record.delivered,
                    "Subscriber buffer full, disconnecting"
                ),
                Eviction::Gone => tracing::debug!(
                    subscriber = %id,
                    delivered = record.delivered,
                    "Subscriber went away, removing"
                ),
            }
        }
    }

    fn close_all(&mut self) {
        let closed = self.subscribers.len();
        self.subscribers.clear();
        self.metrics.on_closed();

        tracing::info!(closed = closed, "Hub stopped");
    }
}

/// Resolves when shutdown is requested; never resolves once detached
async fn stop_requested(shutdown: &mut Option<oneshot::Receiver<()>>) {
    if let Some(rx) = shutdown {
        if rx.await.is_ok() {
            return;
        }
        *shutdown = None;
    }
    std::future::pending::<()>().await
}
