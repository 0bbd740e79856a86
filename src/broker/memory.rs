use super::{Broker, InboundMessage, MessageHandler, RpcResponder, Subscription};
use crate::error::{Result, TranscriptError};
use crate::topic::pattern_matches;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

const INBOX_PREFIX: &str = "_INBOX.memory";

type ReplyWaiters = HashMap<String, oneshot::Sender<InboundMessage>>;

/// In-process broker with single-segment wildcard routing and inbox-based
/// request/reply correlation.
///
/// Every publish and RPC request is also recorded, so tests can assert on
/// exactly what went over the wire.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: Mutex<Vec<Subscriber>>,
    pending_replies: std::sync::Mutex<ReplyWaiters>,
    published: Mutex<Vec<InboundMessage>>,
    requests: Mutex<Vec<InboundMessage>>,
    next_inbox: AtomicU64,
}

impl Inner {
    fn pending_replies(&self) -> MutexGuard<'_, ReplyWaiters> {
        self.pending_replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Unregisters a reply inbox once its call returns or is dropped.
struct PendingReply {
    inner: Arc<Inner>,
    inbox: String,
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.inner.pending_replies().remove(&self.inbox);
    }
}

struct Subscriber {
    pattern: String,
    tx: mpsc::UnboundedSender<InboundMessage>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted by `publish`, in order. RPC replies are not included.
    pub async fn published(&self) -> Vec<InboundMessage> {
        self.inner.published.lock().await.clone()
    }

    /// Requests issued through `rpc_call`, in order
    pub async fn requests(&self) -> Vec<InboundMessage> {
        self.inner.requests.lock().await.clone()
    }

    /// Reply inboxes still waiting for an answer
    pub fn pending_reply_count(&self) -> usize {
        self.inner.pending_replies().len()
    }

    /// Number of live subscriptions
    pub async fn subscriber_count(&self) -> usize {
        let mut subscribers = self.inner.subscribers.lock().await;
        subscribers.retain(|s| !s.tx.is_closed());
        subscribers.len()
    }

    async fn deliver(&self, message: &InboundMessage) -> usize {
        let mut subscribers = self.inner.subscribers.lock().await;
        subscribers.retain(|s| !s.tx.is_closed());

        let mut delivered = 0;
        for subscriber in subscribers.iter() {
            if pattern_matches(&subscriber.pattern, &message.topic)
                && subscriber.tx.send(message.clone()).is_ok()
            {
                delivered += 1;
            }
        }
        delivered
    }
}

#[async_trait::async_trait]
impl Broker for MemoryBroker {
    async fn subscribe(&self, pattern: &str, handler: MessageHandler) -> Result<Subscription> {
        let (tx, mut rx) = mpsc::unbounded_channel::<InboundMessage>();

        self.inner.subscribers.lock().await.push(Subscriber {
            pattern: pattern.to_string(),
            tx,
        });

        let task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                handler(message);
            }
        });

        debug!("Memory subscription on {}", pattern);
        Ok(Subscription::new(pattern, task))
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let message = InboundMessage::new(topic, payload);

        let waiter = self.inner.pending_replies().remove(topic);
        if let Some(waiter) = waiter {
            // Caller may have given up already
            let _ = waiter.send(message);
            return Ok(());
        }

        self.inner.published.lock().await.push(message.clone());
        let delivered = self.deliver(&message).await;
        debug!("Published to {} ({} subscribers)", topic, delivered);
        Ok(())
    }

    async fn rpc_call(
        &self,
        channel: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<InboundMessage> {
        let inbox = format!(
            "{}.{}",
            INBOX_PREFIX,
            self.inner.next_inbox.fetch_add(1, Ordering::SeqCst)
        );
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner
            .pending_replies()
            .insert(inbox.clone(), reply_tx);
        let _pending = PendingReply {
            inner: Arc::clone(&self.inner),
            inbox: inbox.clone(),
        };

        let request = InboundMessage {
            topic: channel.to_string(),
            payload,
            reply: Some(inbox.clone()),
        };
        self.inner.requests.lock().await.push(request.clone());

        if self.deliver(&request).await == 0 {
            return Err(TranscriptError::NoResponders {
                channel: channel.to_string(),
            });
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(TranscriptError::delivery(channel, "reply inbox closed")),
            Err(_) => Err(TranscriptError::RpcTimeout {
                channel: channel.to_string(),
                timeout,
            }),
        }
    }

    async fn serve_rpc(&self, channel: &str, responder: RpcResponder) -> Result<Subscription> {
        let broker = self.clone();
        let channel_name = channel.to_string();

        let handler: MessageHandler = Arc::new(move |request: InboundMessage| {
            let Some(reply_to) = request.reply.clone() else {
                warn!("Ignoring request on {} without reply address", channel_name);
                return;
            };
            let broker = broker.clone();
            let responder = Arc::clone(&responder);
            let channel_name = channel_name.clone();

            tokio::spawn(async move {
                match responder(request).await {
                    Ok(reply) => {
                        if let Err(e) = broker.publish(&reply_to, reply).await {
                            warn!("Failed to reply on {}: {}", channel_name, e);
                        }
                    }
                    Err(e) => warn!("Responder on {} failed: {}", channel_name, e),
                }
            });
        });

        self.subscribe(channel, handler).await
    }
}
