//! Subscriber channels
//!
//! A subscriber is a pair created by the transport layer: the
//! [`SubscriberHandle`] is moved into the hub, the [`Subscription`] stays with
//! whatever streams resources to the client. Dropping the handle closes the
//! subscription, so a handle that has been unregistered can never be reused.

use tokio::sync::{broadcast, mpsc, oneshot};

use super::config::{DeliveryPolicy, OverflowPolicy};
use super::resource::Resource;

/// Identifier assigned to a subscriber when the hub admits it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Rendezvous hand-off: the hub waits on `taken` until the consumer has it
#[derive(Debug)]
struct Envelope {
    resource: Resource,
    taken: oneshot::Sender<()>,
}

#[derive(Debug)]
enum Outlet {
    Rendezvous(mpsc::Sender<Envelope>),
    DropOldest(broadcast::Sender<Resource>),
    Disconnect(mpsc::Sender<Resource>),
}

#[derive(Debug)]
enum Inlet {
    Rendezvous(mpsc::Receiver<Envelope>),
    DropOldest(broadcast::Receiver<Resource>),
    Disconnect(mpsc::Receiver<Resource>),
}

/// Outcome of offering one resource to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Resource handed over (or queued)
    Delivered,
    /// Buffer full under [`OverflowPolicy::Disconnect`]
    Overflow,
    /// Consumer dropped its subscription
    Gone,
}

/// Sending half of a subscriber channel, owned by the hub once registered
#[derive(Debug)]
pub struct SubscriberHandle {
    outlet: Outlet,
}

impl SubscriberHandle {
    /// Offer a resource according to the channel's delivery policy.
    ///
    /// Under rendezvous delivery this does not return until the consumer
    /// has taken the resource or gone away.
    pub(crate) async fn deliver(&self, resource: Resource) -> Delivery {
        match &self.outlet {
            Outlet::Rendezvous(tx) => {
                let (taken, taken_rx) = oneshot::channel();
                if tx.send(Envelope { resource, taken }).await.is_err() {
                    return Delivery::Gone;
                }
                // Err means the envelope was dropped with the subscription
                match taken_rx.await {
                    Ok(()) => Delivery::Delivered,
                    Err(_) => Delivery::Gone,
                }
            }
            // send only fails when the receiver is gone; a full ring
            // overwrites its oldest slot
            Outlet::DropOldest(tx) => match tx.send(resource) {
                Ok(_) => Delivery::Delivered,
                Err(_) => Delivery::Gone,
            },
            Outlet::Disconnect(tx) => match tx.try_send(resource) {
                Ok(()) => Delivery::Delivered,
                Err(mpsc::error::TrySendError::Full(_)) => Delivery::Overflow,
                Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Gone,
            },
        }
    }

    /// Check whether the consumer has dropped its subscription
    pub fn is_closed(&self) -> bool {
        match &self.outlet {
            Outlet::Rendezvous(tx) => tx.is_closed(),
            Outlet::DropOldest(tx) => tx.receiver_count() == 0,
            Outlet::Disconnect(tx) => tx.is_closed(),
        }
    }
}

/// Receiving half of a subscriber channel
#[derive(Debug)]
pub struct Subscription {
    inlet: Inlet,
    skipped: u64,
}

impl Subscription {
    /// Receive the next resource.
    ///
    /// Returns `None` once the hub has closed the handle and everything
    /// already queued has been drained.
    pub async fn recv(&mut self) -> Option<Resource> {
        match &mut self.inlet {
            Inlet::Rendezvous(rx) => {
                let envelope = rx.recv().await?;
                let _ = envelope.taken.send(());
                Some(envelope.resource)
            }
            Inlet::DropOldest(rx) => loop {
                match rx.recv().await {
                    Ok(resource) => return Some(resource),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        self.skipped += n;
                        tracing::trace!(skipped = n, "Subscription lagged, oldest resources dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
            Inlet::Disconnect(rx) => rx.recv().await,
        }
    }

    /// Receive a resource if one is ready, without waiting
    pub fn try_recv(&mut self) -> Option<Resource> {
        match &mut self.inlet {
            Inlet::Rendezvous(rx) => {
                let envelope = rx.try_recv().ok()?;
                let _ = envelope.taken.send(());
                Some(envelope.resource)
            }
            Inlet::DropOldest(rx) => loop {
                match rx.try_recv() {
                    Ok(resource) => return Some(resource),
                    Err(broadcast::error::TryRecvError::Lagged(n)) => self.skipped += n,
                    Err(_) => return None,
                }
            },
            Inlet::Disconnect(rx) => rx.try_recv().ok(),
        }
    }

    /// Number of resources overwritten before this subscription read them
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

/// Create a subscriber channel for the given delivery policy
///
/// Bounded capacities are clamped to
/// `1..=`[`MAX_SUBSCRIBER_CAPACITY`](super::config::MAX_SUBSCRIBER_CAPACITY).
/// Drop-oldest buffers are backed by a broadcast ring, whose size is rounded
/// up to the next power of two.
pub fn channel(policy: DeliveryPolicy) -> (SubscriberHandle, Subscription) {
    let (outlet, inlet) = match policy.normalized() {
        DeliveryPolicy::Rendezvous => {
            let (tx, rx) = mpsc::channel(1);
            (Outlet::Rendezvous(tx), Inlet::Rendezvous(rx))
        }
        DeliveryPolicy::Bounded {
            capacity,
            overflow: OverflowPolicy::DropOldest,
        } => {
            let (tx, rx) = broadcast::channel(capacity);
            (Outlet::DropOldest(tx), Inlet::DropOldest(rx))
        }
        DeliveryPolicy::Bounded {
            capacity,
            overflow: OverflowPolicy::Disconnect,
        } => {
            let (tx, rx) = mpsc::channel(capacity);
            (Outlet::Disconnect(tx), Inlet::Disconnect(rx))
        }
    };

    (
        SubscriberHandle { outlet },
        Subscription { inlet, skipped: 0 },
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;

    #[tokio::test]
    async fn test_rendezvous_waits_for_consumer() {
        let (handle, mut sub) = channel(DeliveryPolicy::Rendezvous);

        let mut delivery = task::spawn(handle.deliver(Resource::new("/books/1")));
        assert_pending!(delivery.poll());

        let received = sub.try_recv().unwrap();
        assert_eq!(received.iri, "/books/1");

        assert!(delivery.is_woken());
        assert_eq!(assert_ready!(delivery.poll()), Delivery::Delivered);
    }

    #[tokio::test]
    async fn test_rendezvous_gone_when_subscription_dropped() {
        let (handle, sub) = channel(DeliveryPolicy::Rendezvous);

        let mut delivery = task::spawn(handle.deliver(Resource::new("/books/1")));
        assert_pending!(delivery.poll());

        drop(sub);
        assert_eq!(assert_ready!(delivery.poll()), Delivery::Gone);
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_drop_oldest_overwrites() {
        let (handle, mut sub) = channel(DeliveryPolicy::drop_oldest(2));

        for i in 1..=5 {
            let delivery = handle.deliver(Resource::new(format!("/books/{}", i))).await;
            assert_eq!(delivery, Delivery::Delivered);
        }

        // Only the two newest survive
        assert_eq!(sub.recv().await.unwrap().iri, "/books/4");
        assert_eq!(sub.recv().await.unwrap().iri, "/books/5");
        assert_eq!(sub.skipped(), 3);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_reports_overflow() {
        let (handle, mut sub) = channel(DeliveryPolicy::disconnect(2));

        assert_eq!(handle.deliver(Resource::new("/a")).await, Delivery::Delivered);
        assert_eq!(handle.deliver(Resource::new("/b")).await, Delivery::Delivered);
        assert_eq!(handle.deliver(Resource::new("/c")).await, Delivery::Overflow);

        assert_eq!(sub.recv().await.unwrap().iri, "/a");
        assert_eq!(sub.skipped(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_after_handle_dropped() {
        let (handle, mut sub) = channel(DeliveryPolicy::disconnect(4));

        handle.deliver(Resource::new("/queued")).await;
        drop(handle);

        // Queued resources drain before the close is observed
        assert_eq!(sub.recv().await.unwrap().iri, "/queued");
        let closed = tokio::time::timeout(Duration::from_secs(1), sub.recv()).await;
        assert_eq!(closed.unwrap(), None);
    }

    #[tokio::test]
    async fn test_gone_for_every_policy() {
        for policy in [
            DeliveryPolicy::Rendezvous,
            DeliveryPolicy::drop_oldest(4),
            DeliveryPolicy::disconnect(4),
        ] {
            let (handle, sub) = channel(policy);
            drop(sub);

            assert!(handle.is_closed());
            assert_eq!(handle.deliver(Resource::new("/x")).await, Delivery::Gone);
        }
    }

    #[tokio::test]
    async fn test_oversized_capacity_is_capped() {
        // Policies built by hand skip the helper clamps
        for overflow in [OverflowPolicy::DropOldest, OverflowPolicy::Disconnect] {
            let (handle, mut sub) = channel(DeliveryPolicy::Bounded {
                capacity: usize::MAX,
                overflow,
            });

            assert_eq!(handle.deliver(Resource::new("/big")).await, Delivery::Delivered);
            assert_eq!(sub.recv().await.unwrap().iri, "/big");
        }
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised() {
        let (handle, mut sub) = channel(DeliveryPolicy::Bounded {
            capacity: 0,
            overflow: OverflowPolicy::Disconnect,
        });

        assert_eq!(handle.deliver(Resource::new("/a")).await, Delivery::Delivered);
        assert_eq!(handle.deliver(Resource::new("/b")).await, Delivery::Overflow);
        assert_eq!(sub.recv().await.unwrap().iri, "/a");
    }

    #[test]
    fn test_subscriber_id_display() {
        let id = SubscriberId::new(42);
        assert_eq!(id.to_string(), "sub-42");
        assert_eq!(id.as_u64(), 42);
    }
}
