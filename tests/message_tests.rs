// Tests for transcript message enrichment

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use transcript_bus::message::{enrich, Clock, IdGenerator, TranscriptMessage, UuidGenerator};

struct FixedClock(i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

#[derive(Default)]
struct SequentialIds(AtomicUsize);

impl IdGenerator for SequentialIds {
    fn new_id(&self) -> String {
        format!("msg-{}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

#[test]
fn test_enrich_fills_missing_time_captured() {
    let message = TranscriptMessage::new().with("transcript", "hello");
    let enriched = enrich(message, &FixedClock(1_700_000_000_123), &SequentialIds::default());

    assert_eq!(enriched.time_captured(), Some(1_700_000_000_123));
    assert_eq!(enriched.message_id(), Some("msg-0"));
    assert_eq!(enriched.text(), Some("hello"));
}

#[test]
fn test_enrich_preserves_existing_time_captured() {
    let message = TranscriptMessage::new().with("time_captured", 1_234_567_890_123_i64);
    let enriched = enrich(message, &FixedClock(5), &SequentialIds::default());

    assert_eq!(enriched.time_captured(), Some(1_234_567_890_123));
}

#[test]
fn test_enrich_preserves_non_numeric_time_captured_verbatim() {
    let message = TranscriptMessage::new().with("time_captured", "2025-10-27T14:30:00Z");
    let enriched = enrich(message, &FixedClock(5), &SequentialIds::default());

    assert_eq!(
        enriched.get("time_captured"),
        Some(&json!("2025-10-27T14:30:00Z"))
    );
}

#[test]
fn test_enrich_replaces_falsy_time_captured() {
    for falsy in [json!(0), json!(null), json!(false), json!("")] {
        let message = TranscriptMessage::new().with("time_captured", falsy.clone());
        let enriched = enrich(message, &FixedClock(99), &SequentialIds::default());
        assert_eq!(enriched.time_captured(), Some(99), "falsy value {}", falsy);
    }
}

#[test]
fn test_enrich_always_overwrites_message_id() {
    let ids = SequentialIds::default();
    let message = TranscriptMessage::new().with("messageID", "caller-chosen");

    let enriched = enrich(message, &FixedClock(1), &ids);
    assert_eq!(enriched.message_id(), Some("msg-0"));
}

#[test]
fn test_enrich_passes_other_fields_through() {
    let message = TranscriptMessage::try_from(json!({
        "transcript": "tag me",
        "confidence": 0.93,
        "workerID": "worker-7",
        "channelIndex": 2,
        "alternatives": [{"transcript": "tack me"}]
    }))
    .unwrap();

    let enriched = enrich(message.clone(), &FixedClock(1), &UuidGenerator);

    for (field, value) in message.fields() {
        assert_eq!(enriched.get(field), Some(value));
    }
    assert_eq!(enriched.worker_id(), Some("worker-7"));
    assert_eq!(enriched.channel_index(), Some(2));
    assert_eq!(enriched.fields().len(), message.fields().len() + 2);
}

#[test]
fn test_uuid_generator_is_unique() {
    let a = UuidGenerator.new_id();
    let b = UuidGenerator.new_id();
    assert_ne!(a, b);
    assert!(uuid::Uuid::parse_str(&a).is_ok());
}

#[test]
fn test_payload_serialization() {
    let message = TranscriptMessage::new()
        .with("transcript", "hello world")
        .with("time_captured", 42);

    let payload = message.to_payload().unwrap();
    let value: Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(value, json!({"transcript": "hello world", "time_captured": 42}));

    let parsed = TranscriptMessage::from_payload(&payload).unwrap();
    assert_eq!(parsed, message);
}

#[test]
fn test_from_payload_rejects_non_object() {
    assert!(TranscriptMessage::from_payload(b"[1, 2, 3]").is_err());
    assert!(TranscriptMessage::from_payload(b"not json").is_err());
}
