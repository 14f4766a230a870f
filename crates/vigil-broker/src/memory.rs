//! In-process bus with the same topic/channel shape as the NATS backend.
//!
//! Channels fan out: every channel of a topic sees every payload; members
//! within one channel compete for deliveries. Payloads published before the
//! first channel exists are buffered and flushed to it. Used by tests and
//! wherever a broker round-trip is not wanted.

use crate::error::BrokerError;
use crate::{Delivery, Publish, Subscribe};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Clone, Default)]
pub struct MemoryBroker {
    topics: Arc<Mutex<HashMap<String, TopicState>>>,
}

#[derive(Default)]
struct TopicState {
    channels: HashMap<String, ChannelState>,
    backlog: VecDeque<Vec<u8>>,
}

struct ChannelState {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publisher(&self, topic: &str) -> MemoryPublisher {
        MemoryPublisher {
            broker: self.clone(),
            topic: topic.to_string(),
        }
    }

    pub fn subscriber(&self, topic: &str, channel: &str) -> MemorySubscriber {
        let mut topics = self.topics.lock().unwrap_or_else(|p| p.into_inner());
        let state = topics.entry(topic.to_string()).or_default();

        let first_channel = state.channels.is_empty();
        let channel = state
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                ChannelState {
                    tx,
                    rx: Arc::new(tokio::sync::Mutex::new(rx)),
                }
            });

        if first_channel {
            for payload in state.backlog.drain(..) {
                let _ = channel.tx.send(payload);
            }
        }

        MemorySubscriber {
            rx: Some(channel.rx.clone()),
        }
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) {
        let mut topics = self.topics.lock().unwrap_or_else(|p| p.into_inner());
        let state = topics.entry(topic.to_string()).or_default();

        if state.channels.is_empty() {
            state.backlog.push_back(payload);
            return;
        }
        for channel in state.channels.values() {
            let _ = channel.tx.send(payload.clone());
        }
    }
}

pub struct MemoryPublisher {
    broker: MemoryBroker,
    topic: String,
}

#[async_trait]
impl Publish for MemoryPublisher {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BrokerError> {
        self.broker.publish(&self.topic, payload);
        Ok(())
    }

    async fn close(&self) {}
}

pub struct MemorySubscriber {
    rx: Option<Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>>,
}

#[async_trait]
impl Subscribe for MemorySubscriber {
    async fn next(&mut self) -> Result<Option<Delivery>, BrokerError> {
        let Some(rx) = self.rx.as_ref() else {
            return Ok(None);
        };
        let payload = rx.lock().await.recv().await;
        Ok(payload.map(Delivery::unacked))
    }

    async fn unsubscribe(&mut self) {
        self.rx = None;
    }
}
