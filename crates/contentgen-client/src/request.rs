use std::fmt;

use crate::errors::ValidationError;

/// Default sampling temperature used by `RequestOptions::default()`.
pub const DEFAULT_TEMPERATURE: f64 = 0.6;
/// Default completion budget used by `RequestOptions::default()`.
pub const DEFAULT_MAX_TOKENS: u32 = 600;

/// Text-processing operation requested from the service.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    #[default]
    Summarize,
    Translate,
    Generate,
}

impl Task {
    /// Returns the wire name of the task.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Translate => "translate",
            Self::Generate => "generate",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Task {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "summarize" => Ok(Self::Summarize),
            "translate" => Ok(Self::Translate),
            "generate" => Ok(Self::Generate),
            other => Err(format!("unknown task: {other}")),
        }
    }
}

/// Model settings sent alongside the input.
///
/// `extra` is forwarded as-is and flattened into the `options` object, so
/// server-specific knobs (for example `genre`) need no client changes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RequestOptions {
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(flatten, default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            extra: serde_json::Map::new(),
        }
    }
}

impl RequestOptions {
    /// Sets the sampling temperature, clamped to `[0, 1]`.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    /// Sets the completion budget. Zero is raised to one.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    /// Adds an opaque extension field.
    pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// One submission to the service. Not mutated after `Dispatcher::submit`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Request {
    pub task: Task,
    pub input_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default)]
    pub options: RequestOptions,
}

impl Request {
    /// Creates a request with default options.
    pub fn new(task: Task, input_text: impl Into<String>) -> Self {
        Self {
            task,
            input_text: input_text.into(),
            target_language: None,
            options: RequestOptions::default(),
        }
    }

    /// Shorthand for a `summarize` request.
    pub fn summarize(input_text: impl Into<String>) -> Self {
        Self::new(Task::Summarize, input_text)
    }

    /// Shorthand for a `translate` request.
    pub fn translate(input_text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self::new(Task::Translate, input_text).target_language(target_language)
    }

    /// Shorthand for a `generate` request.
    pub fn generate(input_text: impl Into<String>) -> Self {
        Self::new(Task::Generate, input_text)
    }

    /// Sets the target language. Only sent on the wire for `translate`.
    pub fn target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = Some(language.into());
        self
    }

    /// Replaces the model options.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Checks the request locally.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.input_text.trim().is_empty() {
            return Err(ValidationError::EmptyInput);
        }
        if self.task == Task::Translate
            && self
                .target_language
                .as_deref()
                .is_none_or(|lang| lang.trim().is_empty())
        {
            return Err(ValidationError::MissingTargetLanguage);
        }
        Ok(())
    }

    /// JSON body sent to the service.
    pub(crate) fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "task": self.task,
            "input_text": self.input_text,
            "options": self.options,
        });
        if self.task == Task::Translate
            && let Some(language) = self.target_language.as_deref()
        {
            body["target_language"] = serde_json::Value::String(language.to_string());
        }
        body
    }
}
