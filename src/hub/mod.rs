//! Broadcast hub for resource updates
//!
//! The hub owns the set of live subscribers and fans every published
//! resource out to all of them. A single coordination task processes
//! registrations, removals and publishes one at a time, so no lock guards
//! the subscriber set.
//!
//! # Architecture
//!
//! ```text
//!    [Transport]            [Transport]             [Publisher]
//!    register()             unregister()            publish()
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!   ┌──────────┐           ┌──────────┐           ┌──────────┐
//!   │ mpsc(1)  │           │ mpsc(1)  │           │ mpsc(1)  │
//!   └────┬─────┘           └────┬─────┘           └────┬─────┘
//!        └───────────────────────┼───────────────────────┘
//!                                ▼
//!                     ┌──────────────────────┐
//!                     │ HubActor (select!)   │
//!                     │ subscribers: HashMap │
//!                     │  <SubscriberId,      │
//!                     │   SubscriberRecord>  │
//!                     └──────────┬───────────┘
//!                                │ deliver() per subscriber
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!      Subscription        Subscription        Subscription
//!        .recv()             .recv()             .recv()
//! ```
//!
//! # Backpressure
//!
//! With [`DeliveryPolicy::Rendezvous`] each delivery waits for the consumer,
//! so one subscriber that stops reading stalls the whole hub. The bounded
//! policies trade that for per-subscriber buffers that either overwrite the
//! oldest resource or disconnect the subscriber.

pub mod config;
pub mod handle;
pub mod lifecycle;
pub mod resource;
pub mod subscriber;

mod actor;

pub use config::{DeliveryPolicy, HubConfig, OverflowPolicy, MAX_SUBSCRIBER_CAPACITY};
pub use handle::HubHandle;
pub use lifecycle::{Hub, HubTask};
pub use resource::Resource;
pub use subscriber::{channel, SubscriberHandle, SubscriberId, Subscription};
