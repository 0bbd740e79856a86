use crate::broker::{Broker, InboundMessage, MessageHandler, RpcResponder, Subscription};
use crate::error::{Result, TranscriptError};
use async_nats::client::RequestErrorKind;
use async_nats::{Client, Message, Request};
use futures::stream::StreamExt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// [`Broker`] backed by a NATS connection.
///
/// NATS subjects use the same `*` single-token wildcard as the transcript
/// patterns, so patterns are passed through unchanged. Request/reply uses the
/// client's inbox correlation.
#[derive(Clone)]
pub struct NatsBroker {
    client: Client,
}

impl NatsBroker {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .map_err(|e| TranscriptError::delivery(url, format!("failed to connect: {}", e)))?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Wrap an already connected client; the connection stays shared with the caller.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn inbound(message: Message) -> InboundMessage {
    InboundMessage {
        topic: message.subject.to_string(),
        payload: message.payload.to_vec(),
        reply: message.reply.map(|r| r.to_string()),
    }
}

#[async_trait::async_trait]
impl Broker for NatsBroker {
    async fn subscribe(&self, pattern: &str, handler: MessageHandler) -> Result<Subscription> {
        info!("Subscribing to {}", pattern);

        let mut subscriber = self
            .client
            .subscribe(pattern.to_string())
            .await
            .map_err(|e| TranscriptError::delivery(pattern, e))?;

        let subject = pattern.to_string();
        let task = tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                handler(inbound(message));
            }
            debug!("Subscription to {} closed", subject);
        });

        info!("Subscribed to {}", pattern);

        Ok(Subscription::new(pattern, task))
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let bytes = payload.len();

        self.client
            .publish(topic.to_string(), payload.into())
            .await
            .map_err(|e| TranscriptError::delivery(topic, e))?;

        debug!("Published to {} ({} bytes)", topic, bytes);

        Ok(())
    }

    async fn rpc_call(
        &self,
        channel: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<InboundMessage> {
        debug!("Requesting {} (timeout {:?})", channel, timeout);

        // The per-request timeout replaces the client-wide default of 10s
        let request = Request::new()
            .payload(payload.into())
            .timeout(Some(timeout));

        match self.client.send_request(channel.to_string(), request).await {
            Ok(reply) => Ok(inbound(reply)),
            Err(e) => Err(match e.kind() {
                RequestErrorKind::NoResponders => TranscriptError::NoResponders {
                    channel: channel.to_string(),
                },
                RequestErrorKind::TimedOut => TranscriptError::RpcTimeout {
                    channel: channel.to_string(),
                    timeout,
                },
                _ => TranscriptError::delivery(channel, e),
            }),
        }
    }

    async fn serve_rpc(&self, channel: &str, responder: RpcResponder) -> Result<Subscription> {
        info!("Serving requests on {}", channel);

        let mut requests = self
            .client
            .subscribe(channel.to_string())
            .await
            .map_err(|e| TranscriptError::delivery(channel, e))?;

        let client = self.client.clone();
        let channel_name = channel.to_string();

        let task = tokio::spawn(async move {
            while let Some(message) = requests.next().await {
                let request = inbound(message);
                let Some(reply_to) = request.reply.clone() else {
                    warn!("Ignoring request on {} without reply subject", channel_name);
                    continue;
                };

                match responder(request).await {
                    Ok(reply) => {
                        if let Err(e) = client.publish(reply_to, reply.into()).await {
                            error!("Failed to reply on {}: {}", channel_name, e);
                        }
                    }
                    Err(e) => warn!("Responder on {} failed: {}", channel_name, e),
                }
            }
            debug!("Stopped serving {}", channel_name);
        });

        Ok(Subscription::new(channel, task))
    }

    async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| TranscriptError::delivery("flush", e))
    }
}
