//! Broadcast hub demo
//!
//! Run with: cargo run --example broadcast [POLICY]
//!
//! Examples:
//!   cargo run --example broadcast                # rendezvous delivery
//!   cargo run --example broadcast drop-oldest    # bounded, overwrite oldest
//!   cargo run --example broadcast disconnect     # bounded, evict on overflow
//!
//! Three subscribers join: two read promptly, one reads slowly. With
//! rendezvous delivery the slow reader paces the whole hub; with a bounded
//! policy it falls behind (or is dropped) while the others keep up.
//!
//! Set `RUST_LOG=resource_hub=debug` for per-subscriber events.

use std::time::Duration;

use bytes::Bytes;
use resource_hub::{DeliveryPolicy, Hub, HubConfig, HubHandle, Resource, Subscription};
use tracing_subscriber::EnvFilter;

fn spawn_reader(
    name: &'static str,
    mut sub: Subscription,
    delay: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(resource) = sub.recv().await {
            tracing::info!(
                reader = name,
                iri = %resource.iri,
                bytes = resource.data.len(),
                "Received"
            );
            tokio::time::sleep(delay).await;
        }
        tracing::info!(reader = name, skipped = sub.skipped(), "Subscription closed");
    })
}

async fn join(
    hub: &HubHandle,
    name: &'static str,
    delay: Duration,
) -> resource_hub::Result<tokio::task::JoinHandle<()>> {
    let (handle, sub) = hub.channel();
    let id = hub.register(handle).await?;
    tracing::info!(reader = name, subscriber = %id, "Joined");
    Ok(spawn_reader(name, sub, delay))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let policy = match std::env::args().nth(1).as_deref() {
        Some("drop-oldest") => DeliveryPolicy::drop_oldest(4),
        Some("disconnect") => DeliveryPolicy::disconnect(4),
        _ => DeliveryPolicy::Rendezvous,
    };

    let config = HubConfig::new(&b"!ChangeMe!"[..], &b"!ChangeMe!"[..]).delivery(policy);
    let hub = Hub::new(config);
    let handle = hub.handle();
    let running = hub.start();

    let readers = vec![
        join(&handle, "fast-1", Duration::from_millis(5)).await?,
        join(&handle, "fast-2", Duration::from_millis(5)).await?,
        join(&handle, "slow", Duration::from_millis(200)).await?,
    ];

    for i in 1..=10 {
        let body = format!("{{\"@id\":\"/books/{}\",\"title\":\"Book {}\"}}", i, i);
        handle
            .publish(Resource::with_data(format!("/books/{}", i), Bytes::from(body)))
            .await?;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    let stats = handle.stats();
    tracing::info!(
        subscribers = stats.subscribers,
        published = stats.published,
        delivered = stats.delivered,
        evicted = stats.evicted,
        "Hub stats"
    );

    running.shutdown().await;
    for reader in readers {
        reader.await?;
    }

    Ok(())
}
