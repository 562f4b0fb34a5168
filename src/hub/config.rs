//! Hub configuration

use bytes::Bytes;

/// Largest per-subscriber buffer, in resources
///
/// Drop-oldest rings are allocated up front for every subscriber.
pub const MAX_SUBSCRIBER_CAPACITY: usize = 1 << 16;

/// Clamp a bounded capacity into what the channel for `overflow` can hold.
///
/// Drop-oldest rings are sized in powers of two, so the capacity is rounded
/// up to the size the ring will actually have.
pub(crate) fn normalize_capacity(capacity: usize, overflow: OverflowPolicy) -> usize {
    let capacity = capacity.clamp(1, MAX_SUBSCRIBER_CAPACITY);
    match overflow {
        OverflowPolicy::DropOldest => capacity.next_power_of_two(),
        OverflowPolicy::Disconnect => capacity,
    }
}

/// What the hub does when a bounded subscriber buffer is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Overwrite the oldest undelivered resource
    DropOldest,
    /// Evict the subscriber and close its handle
    Disconnect,
}

/// How resources are handed to each subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Hand-off completes only when the consumer takes the resource.
    ///
    /// A consumer that stops reading stalls the whole hub until it is
    /// removed or resumes.
    Rendezvous,

    /// Per-subscriber buffer; delivery never waits on the consumer.
    Bounded {
        /// Buffer size in resources, between 1 and [`MAX_SUBSCRIBER_CAPACITY`]
        capacity: usize,
        /// Behavior when the buffer is full
        overflow: OverflowPolicy,
    },
}

impl DeliveryPolicy {
    /// Bounded delivery that overwrites the oldest resource on overflow.
    ///
    /// The capacity is rounded up to a power of two.
    pub fn drop_oldest(capacity: usize) -> Self {
        Self::bounded(capacity, OverflowPolicy::DropOldest)
    }

    /// Bounded delivery that disconnects the subscriber on overflow
    pub fn disconnect(capacity: usize) -> Self {
        Self::bounded(capacity, OverflowPolicy::Disconnect)
    }

    fn bounded(capacity: usize, overflow: OverflowPolicy) -> Self {
        DeliveryPolicy::Bounded {
            capacity: normalize_capacity(capacity, overflow),
            overflow,
        }
    }

    /// Same policy with its capacity clamped into range
    pub fn normalized(self) -> Self {
        match self {
            DeliveryPolicy::Bounded { capacity, overflow } => Self::bounded(capacity, overflow),
            DeliveryPolicy::Rendezvous => DeliveryPolicy::Rendezvous,
        }
    }

    /// Whether a slow consumer can block the hub
    pub fn is_blocking(&self) -> bool {
        matches!(self, DeliveryPolicy::Rendezvous)
    }
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        DeliveryPolicy::Rendezvous
    }
}

/// Hub configuration options
#[derive(Clone, Default)]
pub struct HubConfig {
    /// Key material for verifying publisher credentials.
    ///
    /// Carried for the auth layer; the hub itself never reads it.
    pub publisher_key: Bytes,

    /// Key material for verifying subscriber credentials
    pub subscriber_key: Bytes,

    /// Delivery policy applied to subscriber channels created via
    /// [`HubHandle::channel`](crate::HubHandle::channel)
    pub delivery: DeliveryPolicy,
}

impl HubConfig {
    /// Create a config with both credential keys
    pub fn new(publisher_key: impl Into<Bytes>, subscriber_key: impl Into<Bytes>) -> Self {
        Self {
            publisher_key: publisher_key.into(),
            subscriber_key: subscriber_key.into(),
            ..Default::default()
        }
    }

    /// Set the publisher key
    pub fn publisher_key(mut self, key: impl Into<Bytes>) -> Self {
        self.publisher_key = key.into();
        self
    }

    /// Set the subscriber key
    pub fn subscriber_key(mut self, key: impl Into<Bytes>) -> Self {
        self.subscriber_key = key.into();
        self
    }

    /// Set the delivery policy
    pub fn delivery(mut self, policy: DeliveryPolicy) -> Self {
        self.delivery = policy.normalized();
        self
    }
}

impl std::fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes stay out of logs
        f.debug_struct("HubConfig")
            .field("publisher_key", &format_args!("<{} bytes>", self.publisher_key.len()))
            .field("subscriber_key", &format_args!("<{} bytes>", self.subscriber_key.len()))
            .field("delivery", &self.delivery)
            .finish()
    }
}
