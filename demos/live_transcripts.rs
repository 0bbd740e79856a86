// Example: simulate a transcription worker and a consumer over a live NATS server
//
// 1. Start a worker that answers tag-channel requests
// 2. Subscribe to final transcripts
// 3. Publish interim and final transcripts for each mic type
// 4. Tag the worker's channel and wait for "done"
//
// Requirements: NATS on localhost:4222, Redis on localhost:6379
//
// Usage: cargo run --example live_transcripts

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, Level};
use transcript_bus::{MicType, NatsBroker, RedisStore, TranscriptBus, TranscriptMessage};

const WORKER_ID: &str = "demo-worker";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let broker = NatsBroker::connect("nats://localhost:4222").await?;
    let store = RedisStore::connect("redis://127.0.0.1:6379").await?;

    let bus = TranscriptBus::builder()
        .broker(Arc::new(broker))
        .store(Arc::new(store))
        .rpc_timeout(Duration::from_secs(2))
        .build()?;

    let worker = bus
        .on_tag_channel(WORKER_ID, |tag| {
            info!("Worker tagged channel {} as {}", tag.channel_index, tag.speaker);
            Ok(())
        })
        .await?;

    let finals = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&finals);
    let listener = bus
        .on_final(move |message| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Ok(transcript) = message.transcript() {
                info!("{}: {}", message.topic, transcript.text().unwrap_or_default());
            }
        })
        .await?;

    for mic in MicType::ALL {
        for is_final in [false, true] {
            let message = TranscriptMessage::new()
                .with("transcript", format!("hello from the {} mic", mic))
                .with("workerID", WORKER_ID)
                .with("channelIndex", 0);
            bus.publish(mic.as_str(), is_final, message).await?;
        }
    }
    bus.add_keywords(&["standup", "retro"]).await?;

    sleep(Duration::from_millis(500)).await;
    info!("Received {} final transcripts", finals.load(Ordering::SeqCst));

    let reply = bus.tag_channel(WORKER_ID, 0, "Alice").await?;
    info!("Worker replied: {}", reply.payload_str().unwrap_or_default());

    listener.cancel();
    worker.cancel();

    Ok(())
}
