//! Topic naming for transcript events, worker commands and targeted RPC.
//!
//! Every topic has exactly three dot-separated segments:
//! - `{mic}.{final|interim}.transcript` for transcript events
//! - `{command}.transcript.command` for fleet-wide commands
//!
//! Subscriptions use the broker's single-segment wildcard `*`. The tag-channel
//! RPC is addressed per worker on `rpc-transcript-{workerID}-tagChannel`.

use crate::error::{Result, TranscriptError};
use std::fmt;
use std::str::FromStr;

/// Every final transcript, from any mic.
pub const FINAL_PATTERN: &str = "*.final.transcript";

/// Every interim transcript, from any mic.
pub const INTERIM_PATTERN: &str = "*.interim.transcript";

/// Every transcript event.
pub const ALL_PATTERN: &str = "*.*.transcript";

/// Logical key of the shared keyword set.
pub const KEYWORDS_KEY: &str = "transcript:keywords";

/// Single-segment wildcard.
pub const WILDCARD: &str = "*";

const SEPARATOR: char = '.';
const TRANSCRIPT_CATEGORY: &str = "transcript";
const COMMAND_KIND: &str = "command";

/// A concrete, wildcard-free topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-worker request/reply channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RpcChannel(String);

impl RpcChannel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RpcChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RpcChannel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Microphone types the transcription workers publish from.
///
/// Far-range mics are muted while the agent speaker plays audio; beamform
/// mics only run when no other mic type is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MicType {
    Near,
    Far,
    Beamform,
}

impl MicType {
    pub const ALL: [MicType; 3] = [MicType::Near, MicType::Far, MicType::Beamform];

    pub fn as_str(&self) -> &'static str {
        match self {
            MicType::Near => "near",
            MicType::Far => "far",
            MicType::Beamform => "beamform",
        }
    }
}

impl fmt::Display for MicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MicType {
    type Err = TranscriptError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "near" => Ok(MicType::Near),
            "far" => Ok(MicType::Far),
            "beamform" => Ok(MicType::Beamform),
            other => Err(TranscriptError::validation(
                "mic type",
                format!("unknown mic type '{}'", other),
            )),
        }
    }
}

/// Whether a transcript is settled or may still be revised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finality {
    Final,
    Interim,
}

impl Finality {
    pub fn from_is_final(is_final: bool) -> Self {
        if is_final {
            Finality::Final
        } else {
            Finality::Interim
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Finality::Final => "final",
            Finality::Interim => "interim",
        }
    }
}

/// Commands broadcast to every transcription worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    SwitchModel,
    StopPublishing,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SwitchModel => "switchModel",
            Command::StopPublishing => "stopPublishing",
        }
    }

    pub fn topic(&self) -> Topic {
        Topic(format!("{}.{}.{}", self.name(), TRANSCRIPT_CATEGORY, COMMAND_KIND))
    }
}

/// Topic for a transcript event: `{mic_type}.{final|interim}.transcript`.
///
/// Any valid segment is accepted as mic type, not only the [`MicType`] values.
pub fn event_topic(mic_type: &str, is_final: bool) -> Result<Topic> {
    validate_segment("mic type", mic_type)?;
    Ok(Topic(format!(
        "{}.{}.{}",
        mic_type,
        Finality::from_is_final(is_final).as_str(),
        TRANSCRIPT_CATEGORY
    )))
}

/// Topic for a fleet command: `{command_name}.transcript.command`.
pub fn command_topic(command_name: &str) -> Result<Topic> {
    validate_segment("command name", command_name)?;
    Ok(Topic(format!(
        "{}.{}.{}",
        command_name, TRANSCRIPT_CATEGORY, COMMAND_KIND
    )))
}

/// Request/reply channel of a single worker.
pub fn rpc_channel(worker_id: &str) -> Result<RpcChannel> {
    validate_segment("worker id", worker_id)?;
    Ok(RpcChannel(format!("rpc-transcript-{}-tagChannel", worker_id)))
}

/// Single-segment wildcard matching: `*` stands for exactly one segment and
/// both sides must have the same number of segments.
pub fn pattern_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_segments = pattern.split(SEPARATOR);
    let mut topic_segments = topic.split(SEPARATOR);

    loop {
        match (pattern_segments.next(), topic_segments.next()) {
            (None, None) => return true,
            (Some(p), Some(t)) => {
                if t.is_empty() || (p != WILDCARD && p != t) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

fn validate_segment(field: &'static str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(TranscriptError::validation(field, "must not be empty"));
    }

    // `>` is the broker's multi-segment wildcard; whitespace is illegal in subjects.
    if let Some(c) = segment
        .chars()
        .find(|c| *c == SEPARATOR || *c == '*' || *c == '>' || c.is_whitespace())
    {
        return Err(TranscriptError::validation(
            field,
            format!("'{}' contains reserved character {:?}", segment, c),
        ));
    }

    Ok(())
}
