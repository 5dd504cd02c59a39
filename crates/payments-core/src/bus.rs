//! Message Bus
//!
//! Outbound event publishing. Other services (orders, notifications) listen on
//! the bus; this crate only ever emits.

use async_nats::ServerAddr;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::error::{PaymentError, Result};

/// Message bus client (Strategy pattern)
///
/// Publishing is fire-and-forget from the caller's point of view: delivery
/// guarantees and retries belong to the implementation.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish an event payload under a topic name
    async fn publish(&self, topic: &str, payload: Value) -> Result<()>;

    /// Bus name, for logs
    fn name(&self) -> &str;
}

/// Wrap a payload the way NestJS `ClientProxy::emit` does, so Nest consumers
/// of the topic decode it without changes.
pub fn event_envelope(topic: &str, payload: Value) -> Value {
    json!({
        "pattern": topic,
        "data": payload,
    })
}

/// NATS-backed bus
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connect to one or more NATS servers (`nats://host:port`)
    pub async fn connect(servers: &[String]) -> Result<Self> {
        let addrs = servers
            .iter()
            .map(|server| {
                server.parse::<ServerAddr>().map_err(|e| {
                    PaymentError::Config(format!("invalid NATS server address {server}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if addrs.is_empty() {
            return Err(PaymentError::Config("no NATS servers configured".into()));
        }

        let client = async_nats::connect(addrs.as_slice())
            .await
            .map_err(|e| PaymentError::Bus(e.to_string()))?;

        Ok(Self::from_client(client))
    }

    pub fn from_client(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn publish(&self, topic: &str, payload: Value) -> Result<()> {
        let body = serde_json::to_vec(&event_envelope(topic, payload))
            .map_err(|e| PaymentError::Bus(e.to_string()))?;

        self.client
            .publish(topic.to_string(), body.into())
            .await
            .map_err(|e| PaymentError::Bus(e.to_string()))
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// A message captured by [`MemoryBus`]
#[derive(Clone, Debug, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Value,
}

/// In-memory bus (for development and tests)
#[derive(Default)]
pub struct MemoryBus {
    published: Mutex<Vec<PublishedMessage>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, oldest first
    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: Value) -> Result<()> {
        self.published.lock().await.push(PublishedMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
