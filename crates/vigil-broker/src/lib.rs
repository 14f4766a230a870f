//! The bus between the scheduler and the executor.
//!
//! The scheduler publishes serialized tasks onto a named topic; executor
//! workers subscribe as a shared, named channel on that topic. Delivery is
//! at-least-once and messages are distributed across the channel's
//! subscribers, so adding workers rebalances consumption automatically.
//!
//! The production backend is NATS JetStream ([`nats`]); [`memory`] provides
//! an in-process bus with the same shape for tests.

pub mod error;
pub mod memory;
pub mod nats;


pub use error::BrokerError;

use async_trait::async_trait;

/// Publishes payloads onto the topic fixed at construction, returning only
/// once the broker has accepted the payload.
#[async_trait]
pub trait Publish: Send + Sync {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BrokerError>;

    async fn close(&self);
}

/// A consumer membership in a topic's channel.
#[async_trait]
pub trait Subscribe: Send {
    /// Waits for the next delivery; `None` once the subscription is closed.
    async fn next(&mut self) -> Result<Option<Delivery>, BrokerError>;

    /// Leaves the channel; in-flight deliveries may still be redelivered to
    /// other members per the at-least-once contract.
    async fn unsubscribe(&mut self);
}

/// One message handed to a consumer. Call [`Delivery::ack`] after the
/// processing attempt; an un-acked delivery is eventually redelivered by
/// the broker.
pub struct Delivery {
    pub payload: Vec<u8>,
    acker: Option<Box<dyn Ack>>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, acker: Box<dyn Ack>) -> Self {
        Delivery {
            payload,
            acker: Some(acker),
        }
    }

    /// A delivery with no acknowledgement backing (in-memory bus).
    pub fn unacked(payload: Vec<u8>) -> Self {
        Delivery {
            payload,
            acker: None,
        }
    }

    /// Acknowledges the delivery; failures are logged, not surfaced. The
    /// worst case is a redelivery.
    pub async fn ack(mut self) {
        if let Some(acker) = self.acker.take() {
            acker.ack().await;
        }
    }
}

#[async_trait]
pub trait Ack: Send {
    async fn ack(self: Box<Self>);
}
