use crate::error::{Result, TranscriptError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Capture timestamp field, epoch milliseconds.
pub const TIME_CAPTURED: &str = "time_captured";

/// Unique identifier stamped on every published message.
pub const MESSAGE_ID: &str = "messageID";

/// Fields transcription workers conventionally add to their payloads.
pub const WORKER_ID: &str = "workerID";
pub const CHANNEL_INDEX: &str = "channelIndex";
pub const TRANSCRIPT: &str = "transcript";

/// Transcript payload published on `{mic}.{final|interim}.transcript`
///
/// Only `time_captured` and `messageID` are interpreted; every other field is
/// carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranscriptMessage(Map<String, Value>);

impl TranscriptMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn time_captured(&self) -> Option<i64> {
        self.0.get(TIME_CAPTURED).and_then(Value::as_i64)
    }

    pub fn message_id(&self) -> Option<&str> {
        self.0.get(MESSAGE_ID).and_then(Value::as_str)
    }

    pub fn worker_id(&self) -> Option<&str> {
        self.0.get(WORKER_ID).and_then(Value::as_str)
    }

    pub fn channel_index(&self) -> Option<u32> {
        self.0
            .get(CHANNEL_INDEX)
            .and_then(Value::as_u64)
            .and_then(|i| u32::try_from(i).ok())
    }

    pub fn text(&self) -> Option<&str> {
        self.0.get(TRANSCRIPT).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Parse a transcript from a raw broker payload. The payload must be a JSON object.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }
}

impl From<Map<String, Value>> for TranscriptMessage {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for TranscriptMessage {
    type Error = TranscriptError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(TranscriptError::validation(
                "transcript message",
                format!("expected a JSON object, got {}", other),
            )),
        }
    }
}

/// Source of capture timestamps.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Source of message identifiers. Each call must return a fresh value.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Complete an outgoing transcript before publish.
///
/// A missing or falsy `time_captured` is set from `clock`; a truthy one is kept
/// as is. `messageID` is always replaced so every publish is individually
/// addressable, even when the caller republishes a received message.
pub fn enrich(
    mut message: TranscriptMessage,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
) -> TranscriptMessage {
    if message.get(TIME_CAPTURED).map_or(true, is_falsy) {
        message.insert(TIME_CAPTURED, clock.now_millis());
    }
    message.insert(MESSAGE_ID, ids.new_id());
    message
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0 || f.is_nan()),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_values() {
        assert!(is_falsy(&Value::Null));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!(0.0)));
        assert!(is_falsy(&json!("")));
        assert!(!is_falsy(&json!(1)));
        assert!(!is_falsy(&json!("0")));
        assert!(!is_falsy(&json!([])));
        assert!(!is_falsy(&json!({})));
    }

    #[test]
    fn test_try_from_non_object_is_rejected() {
        assert!(TranscriptMessage::try_from(json!("text")).is_err());
        assert!(TranscriptMessage::try_from(json!({"transcript": "hi"})).is_ok());
    }
}
