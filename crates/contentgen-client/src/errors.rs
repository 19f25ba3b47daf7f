/// Local request validation failures, raised before any transport call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `input_text` is empty after trimming.
    #[error("Input text is required.")]
    EmptyInput,
    /// `task` is `translate` but no target language was given.
    #[error("Target language is required for translate.")]
    MissingTargetLanguage,
}

/// Failures reported by an `InferenceTransport` implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Service answered with a non-success status.
    #[error("http error ({status}): {message}")]
    Http { status: u16, message: String },
    /// Connection, timeout or stream read failure.
    #[error("network error: {0}")]
    Network(String),
    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Creates an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates a network-level error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a body decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Returns the human-readable message, without the category prefix.
    ///
    /// This is what ends up in `SessionState::error`.
    pub fn message(&self) -> &str {
        match self {
            Self::Http { message, .. } => message,
            Self::Network(message) | Self::Decode(message) => message,
        }
    }

    /// Returns the HTTP status when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Top-level error for setup-time failures (configuration, client building).
///
/// Runtime failures of a submitted request never surface as `ClientError`;
/// they are folded into the observed session state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Transport failure outside a session (for example a history fetch).
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_strips_category_prefix() {
        let err = TransportError::http(503, "Both primary and fallback models failed.");
        assert_eq!(err.message(), "Both primary and fallback models failed.");
        assert_eq!(err.status(), Some(503));
        assert_eq!(
            err.to_string(),
            "http error (503): Both primary and fallback models failed."
        );
        assert_eq!(TransportError::network("reset").status(), None);
    }

    #[test]
    fn validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::EmptyInput.to_string(),
            "Input text is required."
        );
        let err: ClientError = ValidationError::MissingTargetLanguage.into();
        assert_eq!(err.to_string(), "Target language is required for translate.");
    }
}
