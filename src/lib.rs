pub mod broker;
pub mod config;
pub mod error;
pub mod message;
pub mod nats;
pub mod store;
pub mod topic;
pub mod transcript;

pub use broker::{Broker, InboundMessage, MemoryBroker, MessageHandler, RpcResponder, Subscription};
pub use config::Config;
pub use error::{Result, TranscriptError};
pub use message::{enrich, Clock, IdGenerator, SystemClock, TranscriptMessage, UuidGenerator};
pub use nats::NatsBroker;
pub use store::{KeyValueStore, MemoryStore, RedisStore};
pub use topic::{
    command_topic, event_topic, pattern_matches, rpc_channel, Command, Finality, MicType,
    RpcChannel, Topic, ALL_PATTERN, FINAL_PATTERN, INTERIM_PATTERN, KEYWORDS_KEY,
};
pub use transcript::{TagChannelRequest, TranscriptBus, TranscriptBusBuilder, TAG_CHANNEL_DONE};
