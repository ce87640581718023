use thiserror::Error;

/// Errors returned by the Bedrock runtime API
#[derive(Debug, Error, PartialEq)]
pub enum BedrockApiError {
    #[error("Validation error (400): {message}")]
    Validation { message: String },

    #[error("Access denied (403): {message}")]
    AccessDenied { message: String },

    #[error("Model not found (404): {message}")]
    ResourceNotFound { message: String },

    #[error("Model timed out (408): {message}")]
    ModelTimeout { message: String },

    #[error("Model error (424): {message}")]
    ModelError { message: String },

    #[error("Model not ready (429): {message}")]
    ModelNotReady { message: String },

    #[error("Throttled (429): {message}")]
    Throttling { message: String },

    #[error("Service quota exceeded: {message}")]
    ServiceQuotaExceeded { message: String },

    #[error("Internal server error (500): {message}")]
    InternalServer { message: String },

    #[error("Service unavailable (503): {message}")]
    ServiceUnavailable { message: String },

    /// Catch-all for unexpected error types and status codes
    #[error("Unexpected API error ({status}): {message}")]
    Unexpected { status: u16, message: String },
}

impl BedrockApiError {
    /// `error_type` is the `x-amzn-ErrorType` header, which wins over the status code.
    pub fn from_response(status: u16, error_type: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();

        // header values look like "ThrottlingException:http://internal.amazon.com/..."
        let error_type = error_type
            .and_then(|t| t.split(':').next())
            .map(str::trim)
            .unwrap_or_default();

        match (error_type, status) {
            ("ValidationException", _) | ("", 400) => Self::Validation { message },
            ("AccessDeniedException", _) | ("", 403) => Self::AccessDenied { message },
            ("ResourceNotFoundException", _) | ("", 404) => Self::ResourceNotFound { message },
            ("ModelTimeoutException", _) | ("", 408) => Self::ModelTimeout { message },
            ("ModelErrorException", _) | ("", 424) => Self::ModelError { message },
            ("ModelNotReadyException", _) => Self::ModelNotReady { message },
            ("ThrottlingException", _) | ("", 429) => Self::Throttling { message },
            ("ServiceQuotaExceededException", _) => Self::ServiceQuotaExceeded { message },
            ("InternalServerException", _) | ("", 500) => Self::InternalServer { message },
            ("ServiceUnavailableException", _) | ("", 503) => Self::ServiceUnavailable { message },
            _ => Self::Unexpected { status, message },
        }
    }
}
