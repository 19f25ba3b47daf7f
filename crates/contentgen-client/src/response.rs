use crate::request::Task;

/// Token accounting attached to a finished request.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub estimated_cost: f64,
}

/// Final record of a completed request.
///
/// Built once per session, either from the buffered response body or by
/// merging request context with the stream's `end` event.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseMeta {
    pub id: String,
    pub task: Task,
    pub model: String,
    pub input_text: String,
    pub output_text: String,
    pub usage: TokenUsage,
    pub created_at: String,
}

/// One row of the service's recent usage list.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UsageHistoryItem {
    pub id: String,
    pub task: Task,
    pub model: String,
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub estimated_cost: f64,
    pub created_at: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct UsageRecentBody {
    #[serde(default)]
    pub items: Vec<UsageHistoryItem>,
}

/// Structured failure body returned by the service.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: ErrorInfo,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorBody {
    /// Extracts the error message from a failure body.
    ///
    /// Accepts `{"error": {...}}` and the same object nested under `detail`.
    pub fn message_from(value: &serde_json::Value) -> Option<String> {
        let error = value
            .get("error")
            .or_else(|| value.get("detail").and_then(|d| d.get("error")))?;
        error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(ToOwned::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_found_at_top_level_or_under_detail() {
        let top = serde_json::json!({"error": {"type": "x", "message": "boom"}});
        let nested = serde_json::json!({"detail": {"error": {"message": "nested boom"}}});
        let missing = serde_json::json!({"detail": "Not Found"});
        assert_eq!(ErrorBody::message_from(&top).as_deref(), Some("boom"));
        assert_eq!(
            ErrorBody::message_from(&nested).as_deref(),
            Some("nested boom")
        );
        assert_eq!(ErrorBody::message_from(&missing), None);
    }

    #[test]
    fn history_item_defaults_missing_counters() {
        let item: UsageHistoryItem = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "task": "generate",
            "model": "gpt-4o-mini",
            "created_at": "2026-01-01T00:00:00"
        }))
        .expect("item");
        assert_eq!(item.task, Task::Generate);
        assert_eq!(item.total_tokens, 0);
    }
}
