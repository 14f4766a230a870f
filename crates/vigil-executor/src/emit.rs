//! Event sinks.
//!
//! Emission is best effort: a failed emit is logged and counted by the
//! caller, never surfaced to the worker. [`build_emitter`] picks the sink
//! from the `emit` config section.

use crate::config::EmitConfig;
use anyhow::Result;
use async_nats::jetstream;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;
use vigil_common::Event;

/// Errors a sink can hit while emitting one event.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("emit: encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("emit: write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("emit: publish failed: {0}")]
    Publish(String),
}

#[async_trait]
pub trait Emit: Send + Sync {
    async fn emit(&self, event: &Event) -> Result<(), EmitError>;

    /// Idempotent.
    async fn close(&self);
}

/// Builds the sink selected by `config.kind`.
pub async fn build_emitter(config: &EmitConfig) -> Result<Box<dyn Emit>> {
    match config.kind.as_str() {
        "file" => Ok(Box::new(FileEmitter::open(&config.filename)?)),
        "topic" => Ok(Box::new(
            TopicEmitter::connect(&config.broker_publish_addr, &config.topic).await?,
        )),
        "queue" => Ok(Box::new(
            QueueEmitter::connect(&config.broker_publish_addr, &config.queue).await?,
        )),
        other => anyhow::bail!("unsupported emit type: {other}"),
    }
}

/// Appends one JSON event per line. The file is opened once; writes are
/// blocking and unordered across workers.
pub struct FileEmitter {
    file: Mutex<Option<File>>,
}

impl FileEmitter {
    pub fn open(filename: &str) -> Result<Self, EmitError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(filename)?;
        Ok(FileEmitter {
            file: Mutex::new(Some(file)),
        })
    }
}

#[async_trait]
impl Emit for FileEmitter {
    async fn emit(&self, event: &Event) -> Result<(), EmitError> {
        let mut line = event.to_json()?;
        line.push(b'\n');

        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_mut() {
            Some(file) => Ok(file.write_all(&line)?),
            None => Ok(()),
        }
    }

    async fn close(&self) {
        let mut guard = self.file.lock().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }
}

/// Publishes each event as a JSON message onto a broker topic.
pub struct TopicEmitter {
    client: async_nats::Client,
    subject: String,
}

impl TopicEmitter {
    pub async fn connect(addr: &str, topic: &str) -> Result<Self, EmitError> {
        let client = async_nats::connect(addr)
            .await
            .map_err(|e| EmitError::Publish(e.to_string()))?;
        Ok(TopicEmitter {
            client,
            subject: topic.to_string(),
        })
    }
}

#[async_trait]
impl Emit for TopicEmitter {
    async fn emit(&self, event: &Event) -> Result<(), EmitError> {
        let payload = event.to_json()?;
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| EmitError::Publish(e.to_string()))?;
        self.client
            .flush()
            .await
            .map_err(|e| EmitError::Publish(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) {
        let _ = self.client.flush().await;
    }
}

/// Durable publish onto a stream-backed queue, `application/json` body.
pub struct QueueEmitter {
    context: jetstream::Context,
    subject: String,
}

impl QueueEmitter {
    pub async fn connect(addr: &str, queue: &str) -> Result<Self, EmitError> {
        let client = async_nats::connect(addr)
            .await
            .map_err(|e| EmitError::Publish(e.to_string()))?;
        let context = jetstream::new(client);
        context
            .get_or_create_stream(jetstream::stream::Config {
                name: queue.to_string(),
                subjects: vec![queue.to_string()],
                ..Default::default()
            })
            .await
            .map_err(|e| EmitError::Publish(e.to_string()))?;
        Ok(QueueEmitter {
            context,
            subject: queue.to_string(),
        })
    }
}

#[async_trait]
impl Emit for QueueEmitter {
    async fn emit(&self, event: &Event) -> Result<(), EmitError> {
        let payload = event.to_json()?;
        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Content-Type", "application/json");

        let published = self
            .context
            .publish_with_headers(self.subject.clone(), headers, payload.into())
            .await
            .map_err(|e| EmitError::Publish(e.to_string()))?;
        published
            .await
            .map_err(|e| EmitError::Publish(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) {}
}
