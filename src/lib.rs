//! # resource-hub
//!
//! A real-time broadcast hub for resource updates. Publishers submit
//! resources, and every subscriber registered at the time of the broadcast
//! receives them, in publish order.
//!
//! Transport (SSE, WebSocket, ...) and authentication live outside this
//! crate: the transport creates a subscriber channel, registers the handle
//! with the hub and streams whatever arrives on the [`Subscription`].
//!
//! ## Example
//!
//! ```no_run
//! use resource_hub::{Hub, HubConfig, Resource};
//!
//! # async fn example() -> resource_hub::Result<()> {
//! let hub = Hub::new(HubConfig::new(&b"publisher-key"[..], &b"subscriber-key"[..]));
//! let handle = hub.handle();
//! let running = hub.start();
//!
//! let (subscriber, mut subscription) = handle.channel();
//! let id = handle.register(subscriber).await?;
//!
//! tokio::spawn(async move {
//!     while let Some(resource) = subscription.recv().await {
//!         println!("update: {}", resource.iri);
//!     }
//! });
//!
//! handle.publish(Resource::new("/books/1")).await?;
//! handle.unregister(id).await?;
//! running.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod hub;
pub mod stats;

pub use error::{HubError, Result};
pub use hub::{
    channel, DeliveryPolicy, Hub, HubConfig, HubHandle, HubTask, OverflowPolicy, Resource,
    SubscriberHandle, SubscriberId, Subscription, MAX_SUBSCRIBER_CAPACITY,
};
pub use stats::HubStats;
