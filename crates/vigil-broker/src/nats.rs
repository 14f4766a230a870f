//! NATS JetStream backend.
//!
//! A topic maps to a stream whose single subject is the topic name; a
//! channel maps to a durable pull consumer on that stream. Every channel
//! member pulls from the same durable, which distributes messages across
//! members and redelivers un-acked ones.

use crate::error::BrokerError;
use crate::{Ack, Delivery, Publish, Subscribe};
use async_nats::jetstream;
use async_nats::jetstream::consumer::PullConsumer;
use async_trait::async_trait;
use futures::StreamExt;

async fn jetstream_for(addr: &str) -> Result<jetstream::Context, BrokerError> {
    let client = async_nats::connect(addr)
        .await
        .map_err(|e| BrokerError::Connect(e.to_string()))?;
    Ok(jetstream::new(client))
}

async fn ensure_stream(
    context: &jetstream::Context,
    topic: &str,
) -> Result<jetstream::stream::Stream, BrokerError> {
    context
        .get_or_create_stream(jetstream::stream::Config {
            name: topic.to_string(),
            subjects: vec![topic.to_string()],
            ..Default::default()
        })
        .await
        .map_err(|e| BrokerError::Subscribe(e.to_string()))
}

/// Publishes onto one topic, awaiting the broker's acknowledgement for
/// every payload.
pub struct NatsPublisher {
    context: jetstream::Context,
    subject: String,
}

impl NatsPublisher {
    pub async fn connect(addr: &str, topic: &str) -> Result<Self, BrokerError> {
        let context = jetstream_for(addr).await?;
        ensure_stream(&context, topic).await?;
        Ok(NatsPublisher {
            context,
            subject: topic.to_string(),
        })
    }
}

#[async_trait]
impl Publish for NatsPublisher {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BrokerError> {
        let published = self
            .context
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;
        published
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) {}
}

/// One member of a topic channel.
pub struct NatsSubscriber {
    messages: Option<jetstream::consumer::pull::Stream>,
}

impl NatsSubscriber {
    /// Joins `channel` on `topic`, creating both as needed.
    pub async fn subscribe(addr: &str, topic: &str, channel: &str) -> Result<Self, BrokerError> {
        let context = jetstream_for(addr).await?;
        let stream = ensure_stream(&context, topic).await?;

        let consumer: PullConsumer = stream
            .get_or_create_consumer(
                channel,
                jetstream::consumer::pull::Config {
                    durable_name: Some(channel.to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;

        Ok(NatsSubscriber {
            messages: Some(messages),
        })
    }
}

#[async_trait]
impl Subscribe for NatsSubscriber {
    async fn next(&mut self) -> Result<Option<Delivery>, BrokerError> {
        let Some(messages) = self.messages.as_mut() else {
            return Ok(None);
        };

        match messages.next().await {
            Some(Ok(message)) => {
                let payload = message.payload.to_vec();
                Ok(Some(Delivery::new(payload, Box::new(NatsAck(message)))))
            }
            Some(Err(e)) => Err(BrokerError::Consume(e.to_string())),
            None => Ok(None),
        }
    }

    async fn unsubscribe(&mut self) {
        self.messages = None;
    }
}

struct NatsAck(jetstream::Message);

#[async_trait]
impl Ack for NatsAck {
    async fn ack(self: Box<Self>) {
        if let Err(e) = self.0.ack().await {
            tracing::warn!(error = %e, "Failed to ack delivery; the broker will redeliver");
        }
    }
}
