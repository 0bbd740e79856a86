//! Transcript distribution façade
//!
//! This module provides the `TranscriptBus`, which ties together:
//! - Topic naming for transcript events and worker commands
//! - Message enrichment (capture time, message ID) before publish
//! - Wildcard subscriptions for consumers
//! - Targeted tag-channel RPC to a single worker
//! - The shared keyword set

mod builder;
mod bus;
mod rpc;

pub use builder::TranscriptBusBuilder;
pub use bus::TranscriptBus;
pub use rpc::{TagChannelRequest, TAG_CHANNEL_DONE};
