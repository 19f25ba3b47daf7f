use serde_json::Value;

use crate::request::Task;
use crate::response::TokenUsage;

use super::scanner::RawFrame;

/// Message reported when a frame's data is not valid JSON.
pub const PARSE_FAILURE_MESSAGE: &str = "Failed to parse stream";
/// Message reported when an `error` frame carries no message.
pub const DEFAULT_STREAM_ERROR: &str = "Streaming error";

/// Typed event decoded from one frame of the response stream.
#[derive(Clone, Debug, PartialEq)]
pub enum ProtocolEvent {
    /// Output fragment to append, in order.
    Chunk { text: String },
    /// Successful end of the stream.
    End(EndSummary),
    /// Failed end of the stream.
    Error { message: String },
}

impl ProtocolEvent {
    /// Returns true for `End` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End(_) | Self::Error { .. })
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::End(_) => "end",
            Self::Error { .. } => "error",
        }
    }
}

/// Payload of an `end` frame. Missing numbers read as 0, missing strings as
/// empty. `usage.estimated_cost` carries the frame's top-level
/// `estimated_cost`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EndSummary {
    pub id: String,
    pub model: String,
    pub task: Option<Task>,
    pub usage: TokenUsage,
}

impl EndSummary {
    fn from_json(value: &Value) -> Self {
        let usage = value.get("usage");
        let count = |key: &str| {
            usage
                .and_then(|u| u.get(key))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };
        Self {
            id: string_field(value, "id"),
            model: string_field(value, "model"),
            task: value
                .get("task")
                .and_then(Value::as_str)
                .and_then(|t| t.parse().ok()),
            usage: TokenUsage {
                prompt_tokens: count("prompt_tokens"),
                completion_tokens: count("completion_tokens"),
                total_tokens: count("total_tokens"),
                estimated_cost: value
                    .get("estimated_cost")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0),
            },
        }
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Maps one frame to at most one event.
///
/// Empty payloads and unknown event names yield nothing. A payload that is
/// not JSON yields an `Error` for this frame only.
pub fn decode_frame(frame: &RawFrame) -> Option<ProtocolEvent> {
    if frame.data.is_empty() {
        return None;
    }
    let value: Value = match serde_json::from_str(&frame.data) {
        Ok(value) => value,
        Err(_) => {
            return Some(ProtocolEvent::Error {
                message: PARSE_FAILURE_MESSAGE.to_string(),
            });
        }
    };
    match frame.event.as_str() {
        "chunk" => Some(ProtocolEvent::Chunk {
            text: string_field(&value, "text"),
        }),
        "end" => Some(ProtocolEvent::End(EndSummary::from_json(&value))),
        "error" => Some(ProtocolEvent::Error {
            message: error_message(&value),
        }),
        _ => None,
    }
}

fn error_message(value: &Value) -> String {
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| crate::response::ErrorBody::message_from(value))
        .unwrap_or_else(|| DEFAULT_STREAM_ERROR.to_string())
}
