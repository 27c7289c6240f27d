use thiserror::Error;

pub const FALLBACK_ERROR_MESSAGE: &str =
    "Failed to analyze images. Please check your API key and try again.";

/// Failure of one analysis attempt.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Credential missing or otherwise unusable; raised before any network access.
    #[error("{0}")]
    Configuration(String),
    #[error("no images to analyze")]
    NoImages,
    /// Transport failure, non-success status, or an unreadable response envelope.
    #[error("{0}")]
    Service(String),
    #[error("No response from AI")]
    EmptyResponse,
    #[error("AI response did not match the expected plan: {0}")]
    MalformedResponse(String),
}

impl AnalysisError {
    pub fn missing_credential() -> Self {
        Self::Configuration(
            "API key is missing. Set GEMINI_API_KEY (or GOOGLE_API_KEY / API_KEY).".to_string(),
        )
    }

    pub fn service(err: &anyhow::Error) -> Self {
        Self::Service(error_chain_text(err, 600))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::NoImages => "no_images",
            Self::Service(_) => "service",
            Self::EmptyResponse => "empty_response",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Message stored in the error state; never empty.
    pub fn user_message(&self) -> String {
        let text = self.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return FALLBACK_ERROR_MESSAGE.to_string();
        }
        trimmed.to_string()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("images can only be changed while idle (current state: {state})")]
    NotIdle { state: &'static str },
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts.last().map(|existing| existing == trimmed).unwrap_or(false) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
