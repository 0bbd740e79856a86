use serde::{Deserialize, Serialize};

/// Reply a worker sends once a channel has been tagged
pub const TAG_CHANNEL_DONE: &[u8] = b"done";

/// Request body sent on `rpc-transcript-{workerID}-tagChannel`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagChannelRequest {
    #[serde(rename = "channelIndex")]
    pub channel_index: u32,
    pub speaker: String,
}
