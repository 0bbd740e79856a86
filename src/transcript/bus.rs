use super::builder::TranscriptBusBuilder;
use super::rpc::{TagChannelRequest, TAG_CHANNEL_DONE};
use crate::broker::{Broker, InboundMessage, MessageHandler, RpcResponder, Subscription};
use crate::config::Config;
use crate::error::{Result, TranscriptError};
use crate::message::{enrich, Clock, IdGenerator, TranscriptMessage};
use crate::nats::NatsBroker;
use crate::store::{KeyValueStore, RedisStore};
use crate::topic::{
    event_topic, rpc_channel, Command, ALL_PATTERN, FINAL_PATTERN, INTERIM_PATTERN, KEYWORDS_KEY,
};
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Publish, subscribe to and command the transcription worker fleet.
///
/// The bus holds no mutable state of its own. Cloning is cheap and clones share
/// the same broker and store bindings.
#[derive(Clone)]
pub struct TranscriptBus {
    broker: Arc<dyn Broker>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    rpc_timeout: Duration,
}

impl TranscriptBus {
    pub fn builder() -> TranscriptBusBuilder {
        TranscriptBusBuilder::new()
    }

    pub(super) fn from_parts(
        broker: Arc<dyn Broker>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            broker,
            store,
            clock,
            ids,
            rpc_timeout,
        }
    }

    /// Connect to the NATS broker and Redis store named in `config`.
    pub async fn connect(config: &Config) -> Result<Self> {
        let broker = NatsBroker::connect(&config.broker.url).await?;
        let store = RedisStore::connect(&config.store.url).await?;

        Self::builder()
            .broker(Arc::new(broker))
            .store(Arc::new(store))
            .rpc_timeout(config.broker.rpc_timeout())
            .build()
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    // ========================================================================
    // Consumers
    // ========================================================================

    /// Subscribe to final transcripts from every mic
    pub async fn on_final<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        self.on(FINAL_PATTERN, Arc::new(handler)).await
    }

    /// Subscribe to interim transcripts, emitted before a sentence is finalized
    pub async fn on_interim<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        self.on(INTERIM_PATTERN, Arc::new(handler)).await
    }

    /// Subscribe to every transcript, interim and final
    pub async fn on_all<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(InboundMessage) + Send + Sync + 'static,
    {
        self.on(ALL_PATTERN, Arc::new(handler)).await
    }

    async fn on(&self, pattern: &str, handler: MessageHandler) -> Result<Subscription> {
        let subscription = self.broker.subscribe(pattern, handler).await?;
        info!("Listening for transcripts on {}", pattern);
        Ok(subscription)
    }

    // ========================================================================
    // Fleet commands
    // ========================================================================

    /// Ask every worker to switch to `model`. No acknowledgment is collected.
    pub async fn switch_model(&self, model: &str) -> Result<()> {
        let topic = Command::SwitchModel.topic();
        self.broker
            .publish(topic.as_str(), model.as_bytes().to_vec())
            .await?;
        info!("Requested model switch to {}", model);
        Ok(())
    }

    /// Ask every worker to stop publishing, e.g. to enter privacy mode.
    pub async fn stop_publishing(&self) -> Result<()> {
        let topic = Command::StopPublishing.topic();
        self.broker.publish(topic.as_str(), Vec::new()).await?;
        info!("Requested workers to stop publishing");
        Ok(())
    }

    /// Ask worker `worker_id` to tag `channel_index` with `speaker`.
    ///
    /// `worker_id` and `channel_index` are found in the `workerID` and
    /// `channelIndex` fields of that worker's transcripts. Resolves to the
    /// worker's reply, `done` on success.
    pub async fn tag_channel(
        &self,
        worker_id: &str,
        channel_index: u32,
        speaker: &str,
    ) -> Result<InboundMessage> {
        self.tag_channel_until(worker_id, channel_index, speaker, std::future::pending())
            .await
    }

    /// [`tag_channel`](Self::tag_channel), abandoned with
    /// [`TranscriptError::Cancelled`] if `cancel` completes first.
    pub async fn tag_channel_until<C>(
        &self,
        worker_id: &str,
        channel_index: u32,
        speaker: &str,
        cancel: C,
    ) -> Result<InboundMessage>
    where
        C: Future<Output = ()> + Send,
    {
        let channel = rpc_channel(worker_id)?;
        let payload = serde_json::to_vec(&TagChannelRequest {
            channel_index,
            speaker: speaker.to_string(),
        })?;

        info!(
            "Tagging channel {} of worker {} as {}",
            channel_index, worker_id, speaker
        );

        tokio::select! {
            reply = self.broker.rpc_call(channel.as_str(), payload, self.rpc_timeout) => reply,
            _ = cancel => {
                warn!("Tag channel request on {} cancelled", channel);
                Err(TranscriptError::Cancelled {
                    channel: channel.to_string(),
                })
            }
        }
    }

    // ========================================================================
    // Keywords
    // ========================================================================

    /// Add keywords for every worker to boost. An empty list is a no-op.
    pub async fn add_keywords<S: AsRef<str>>(&self, words: &[S]) -> Result<()> {
        if words.is_empty() {
            debug!("No keywords to add");
            return Ok(());
        }

        let words: Vec<String> = words.iter().map(|w| w.as_ref().to_string()).collect();
        self.store.add_members(KEYWORDS_KEY, &words).await?;
        info!("Added {} keywords to {}", words.len(), KEYWORDS_KEY);
        Ok(())
    }

    // ========================================================================
    // Producers
    // ========================================================================

    /// Publish a transcript on `{mic_type}.{final|interim}.transcript`.
    ///
    /// Fills in `time_captured` when missing and stamps a fresh `messageID`.
    /// Returns the message as published. There is no delivery confirmation.
    pub async fn publish(
        &self,
        mic_type: &str,
        is_final: bool,
        message: TranscriptMessage,
    ) -> Result<TranscriptMessage> {
        let topic = event_topic(mic_type, is_final)?;
        let message = enrich(message, self.clock.as_ref(), self.ids.as_ref());
        let payload = message.to_payload()?;

        self.broker.publish(topic.as_str(), payload).await?;

        debug!(
            "Published transcript {} on {}",
            message.message_id().unwrap_or_default(),
            topic
        );

        Ok(message)
    }

    // ========================================================================
    // Worker side
    // ========================================================================

    /// Serve tag-channel requests addressed to `worker_id`.
    ///
    /// Each request is decoded and handed to `handler`; on success the caller
    /// receives `done`. A failing handler sends no reply.
    pub async fn on_tag_channel<F>(&self, worker_id: &str, handler: F) -> Result<Subscription>
    where
        F: Fn(TagChannelRequest) -> Result<()> + Send + Sync + 'static,
    {
        let channel = rpc_channel(worker_id)?;
        let handler = Arc::new(handler);
        let responder: RpcResponder =
            Arc::new(move |request| answer_tag_channel(Arc::clone(&handler), request).boxed());

        self.broker.serve_rpc(channel.as_str(), responder).await
    }

    /// Subscribe to model switch commands; `handler` receives the model name.
    pub async fn on_switch_model<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let topic = Command::SwitchModel.topic();
        let handler: MessageHandler = Arc::new(move |message: InboundMessage| {
            handler(String::from_utf8_lossy(&message.payload).into_owned())
        });
        self.broker.subscribe(topic.as_str(), handler).await
    }

    /// Subscribe to stop-publishing commands.
    pub async fn on_stop_publishing<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let topic = Command::StopPublishing.topic();
        let handler: MessageHandler = Arc::new(move |_: InboundMessage| handler());
        self.broker.subscribe(topic.as_str(), handler).await
    }

    /// Push buffered publishes to the broker, e.g. before the process exits.
    pub async fn flush(&self) -> Result<()> {
        self.broker.flush().await
    }
}

async fn answer_tag_channel<F>(handler: Arc<F>, request: InboundMessage) -> Result<Vec<u8>>
where
    F: Fn(TagChannelRequest) -> Result<()> + Send + Sync,
{
    let tag: TagChannelRequest = serde_json::from_slice(&request.payload)?;
    handler(tag)?;
    Ok(TAG_CHANNEL_DONE.to_vec())
}
