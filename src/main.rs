use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};
use transcript_bus::{Config, InboundMessage, TranscriptBus, TranscriptMessage};

#[derive(Parser)]
#[command(name = "transcript-bus")]
#[command(about = "Publish, follow and command live transcripts")]
struct Args {
    /// Config file path (extension optional)
    #[arg(short, long, default_value = "config/transcript-bus")]
    config: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print transcripts as they arrive
    Listen {
        /// Only final transcripts
        #[arg(long, conflicts_with = "interim")]
        r#final: bool,
        /// Only interim transcripts
        #[arg(long)]
        interim: bool,
    },
    /// Publish a transcript given as a JSON object
    Publish {
        /// Mic type: near, far or beamform
        mic_type: String,
        /// JSON object, e.g. '{"transcript":"hello"}'
        message: String,
        /// Mark the transcript as final
        #[arg(long)]
        r#final: bool,
    },
    /// Ask all workers to switch model
    SwitchModel { model: String },
    /// Ask all workers to stop publishing
    StopPublishing,
    /// Tag a worker's channel with a speaker name
    TagChannel {
        worker_id: String,
        channel_index: u32,
        speaker: String,
    },
    /// Add keywords for all workers
    AddKeywords {
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Act as a worker: answer tag-channel requests and log commands
    ServeWorker { worker_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    info!("{} starting", cfg.service.name);
    info!("Broker: {} (rpc timeout {:?})", cfg.broker.url, cfg.broker.rpc_timeout());
    info!("Keyword store: {}", cfg.store.url);

    let bus = TranscriptBus::connect(&cfg)
        .await
        .context("Failed to connect transcript bus")?;

    match args.command {
        Cmd::Listen { r#final, interim } => {
            let subscription = if r#final {
                bus.on_final(print_transcript).await?
            } else if interim {
                bus.on_interim(print_transcript).await?
            } else {
                bus.on_all(print_transcript).await?
            };

            tokio::signal::ctrl_c().await?;
            info!("Stopping listener on {}", subscription.pattern());
            subscription.cancel();
        }
        Cmd::Publish {
            mic_type,
            message,
            r#final,
        } => {
            let value: serde_json::Value =
                serde_json::from_str(&message).context("Message is not valid JSON")?;
            let message = TranscriptMessage::try_from(value)?;
            let published = bus.publish(&mic_type, r#final, message).await?;
            bus.flush().await?;
            info!(
                "Published {}",
                published.message_id().unwrap_or_default()
            );
        }
        Cmd::SwitchModel { model } => {
            bus.switch_model(&model).await?;
            bus.flush().await?;
        }
        Cmd::StopPublishing => {
            bus.stop_publishing().await?;
            bus.flush().await?;
        }
        Cmd::TagChannel {
            worker_id,
            channel_index,
            speaker,
        } => {
            let reply = bus
                .tag_channel_until(
                    &worker_id,
                    channel_index,
                    &speaker,
                    cancel_on(tokio::signal::ctrl_c()),
                )
                .await
                .with_context(|| format!("Tag channel request to worker {} failed", worker_id))?;
            info!(
                "Worker {} replied: {}",
                worker_id,
                String::from_utf8_lossy(&reply.payload)
            );
        }
        Cmd::AddKeywords { words } => {
            bus.add_keywords(&words).await?;
        }
        Cmd::ServeWorker { worker_id } => {
            let id = Arc::new(worker_id.clone());
            let tags = bus
                .on_tag_channel(&worker_id, move |tag| {
                    info!(
                        "Worker {}: channel {} is now {}",
                        id, tag.channel_index, tag.speaker
                    );
                    Ok(())
                })
                .await?;
            let models = bus
                .on_switch_model(|model| info!("Switch model requested: {}", model))
                .await?;
            let stops = bus
                .on_stop_publishing(|| warn!("Stop publishing requested"))
                .await?;

            tokio::signal::ctrl_c().await?;
            for subscription in [tags, models, stops] {
                subscription.cancel();
            }
        }
    }

    Ok(())
}

fn print_transcript(message: InboundMessage) {
    match message.transcript() {
        Ok(transcript) => println!(
            "[{}] {}",
            message.topic,
            transcript.text().unwrap_or("<no text>")
        ),
        Err(e) => warn!("Failed to parse transcript on {}: {}", message.topic, e),
    }
}

/// Resolve when `signal` fires. If the signal cannot be listened for, never
/// resolve, so the request still ends by reply or timeout.
async fn cancel_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Cannot listen for Ctrl-C, request is not cancellable: {}", e);
        std::future::pending::<()>().await;
    }
}
