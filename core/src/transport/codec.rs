//! 数据通道负载解码。
//!
//! 负载为 UTF-8 JSON，按 `type` 字段分派；未知类型直接拒绝，不做字段猜测。

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use serde_json::Value;

use crate::interview::phase::ParticipantRole;
use crate::interview::types::{CoachSuggestion, TranscriptEntry};

use super::error::DecodeError;
use super::types::{DataEvent, TYPE_AI_SPEAKING, TYPE_AI_SUGGESTION, TYPE_TRANSCRIPT_UPDATE};

#[derive(Debug, Deserialize)]
struct TranscriptUpdateWire {
    speaker: ParticipantRole,
    text: String,
    #[serde(default, alias = "timestamp")]
    timestamp_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AiSpeakingWire {
    #[serde(alias = "is_speaking")]
    speaking: bool,
}

pub fn decode_data_event(payload: &[u8]) -> Result<DataEvent, DecodeError> {
    let text = std::str::from_utf8(payload)?;
    let value: Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    match kind.as_str() {
        TYPE_TRANSCRIPT_UPDATE => {
            let wire: TranscriptUpdateWire = serde_json::from_value(value)?;
            let timestamp = wire
                .timestamp_ms
                .map(|ms| UNIX_EPOCH + Duration::from_millis(ms))
                .unwrap_or_else(SystemTime::now);
            Ok(DataEvent::TranscriptUpdate(TranscriptEntry::at(
                wire.speaker,
                wire.text,
                timestamp,
            )))
        }
        TYPE_AI_SUGGESTION => {
            let suggestion: CoachSuggestion = serde_json::from_value(value)?;
            Ok(DataEvent::Suggestion(suggestion))
        }
        TYPE_AI_SPEAKING => {
            let wire: AiSpeakingWire = serde_json::from_value(value)?;
            Ok(DataEvent::AiSpeaking(wire.speaking))
        }
        _ => Err(DecodeError::UnknownType(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_transcript_update_with_timestamp() {
        let event = decode_data_event(
            br#"{"type":"TRANSCRIPT_UPDATE","speaker":"candidate","text":"I led the migration.","timestamp":1700000000000}"#,
        )
        .expect("decode transcript");

        match event {
            DataEvent::TranscriptUpdate(entry) => {
                assert_eq!(entry.speaker, ParticipantRole::Candidate);
                assert_eq!(entry.text, "I led the migration.");
                assert_eq!(
                    entry.timestamp,
                    UNIX_EPOCH + Duration::from_millis(1_700_000_000_000)
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_suggestion_with_optional_fields() {
        let event = decode_data_event(
            br#"{"type":"AI_SUGGESTION","suggestion_text":"Dig into the trade-offs","verdict_category":"shallow","issue_type":"depth","prior_quote":"we used kafka"}"#,
        )
        .expect("decode suggestion");

        match event {
            DataEvent::Suggestion(suggestion) => {
                assert_eq!(suggestion.suggestion_text, "Dig into the trade-offs");
                assert_eq!(suggestion.verdict_category, "shallow");
                assert_eq!(suggestion.issue_type.as_deref(), Some("depth"));
                assert_eq!(suggestion.prior_quote.as_deref(), Some("we used kafka"));
                assert!(suggestion.current_quote.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decodes_speaking_state() {
        let event = decode_data_event(br#"{"type":"AI_SPEAKING","is_speaking":true}"#)
            .expect("decode speaking");
        assert_eq!(event, DataEvent::AiSpeaking(true));
        assert_eq!(event.kind(), "AI_SPEAKING");
    }

    #[test]
    fn rejects_unknown_type() {
        let err = decode_data_event(br#"{"type":"LEGACY_HINT","answer_quality":"good"}"#)
            .expect_err("unknown type must fail");
        assert!(matches!(err, DecodeError::UnknownType(ref kind) if kind == "LEGACY_HINT"));
    }

    #[test]
    fn rejects_missing_type_and_garbage() {
        assert!(matches!(
            decode_data_event(br#"{"text":"hi"}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(
            decode_data_event(b"not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            decode_data_event(&[0xff, 0xfe, 0x00]),
            Err(DecodeError::Utf8(_))
        ));
    }

    #[test]
    fn rejects_unknown_speaker() {
        let result = decode_data_event(
            br#"{"type":"TRANSCRIPT_UPDATE","speaker":"moderator","text":"hello"}"#,
        );
        assert!(matches!(result, Err(DecodeError::Json(_))));
    }
}
