//! Publish/subscribe broker capability
//!
//! The bus only needs four things from a broker: wildcard subscriptions,
//! fire-and-forget publish, correlated request/reply, and serving a reply
//! channel. Implementations:
//! - [`crate::nats::NatsBroker`] for a live NATS server
//! - [`MemoryBroker`] in-process, for tests and local wiring

pub mod memory;

use crate::error::Result;
use crate::message::TranscriptMessage;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub use memory::MemoryBroker;

/// A message delivered by the broker
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Concrete topic the message was published on
    pub topic: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
    /// Reply address when the sender expects a response
    pub reply: Option<String>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            reply: None,
        }
    }

    /// Payload as UTF-8, if it is valid UTF-8
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Decode the payload as a transcript message
    pub fn transcript(&self) -> Result<TranscriptMessage> {
        TranscriptMessage::from_payload(&self.payload)
    }
}

/// Callback invoked once per delivered message.
pub type MessageHandler = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Produces the reply payload for an RPC request.
pub type RpcResponder =
    Arc<dyn Fn(InboundMessage) -> BoxFuture<'static, Result<Vec<u8>>> + Send + Sync>;

/// Handle to an active subscription.
///
/// Dropping the handle leaves the subscription running; call [`cancel`](Self::cancel)
/// to stop delivery.
#[derive(Debug)]
pub struct Subscription {
    pattern: String,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(pattern: impl Into<String>, task: JoinHandle<()>) -> Self {
        Self {
            pattern: pattern.into(),
            task,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop dispatching messages to the handler
    pub fn cancel(self) {
        self.task.abort();
    }
}

/// Broker capability consumed by [`crate::TranscriptBus`]
///
/// Patterns use `*` as a single-segment wildcard. Messages on one subscription
/// are handed to its handler in delivery order; there is no ordering across
/// subscriptions.
#[async_trait::async_trait]
pub trait Broker: Send + Sync {
    /// Register `handler` for every message whose topic matches `pattern`.
    ///
    /// The subscription is live once this returns.
    async fn subscribe(&self, pattern: &str, handler: MessageHandler) -> Result<Subscription>;

    /// Fire-and-forget publish. Success means the broker accepted the
    /// message, not that anyone received it.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Send a request on `channel` and wait up to `timeout` for the
    /// correlated reply.
    async fn rpc_call(
        &self,
        channel: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<InboundMessage>;

    /// Answer requests arriving on `channel` with `responder`.
    ///
    /// A responder error is logged and no reply is sent, so the caller sees a
    /// timeout.
    async fn serve_rpc(&self, channel: &str, responder: RpcResponder) -> Result<Subscription>;

    /// Wait until buffered publishes have been handed to the server.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
