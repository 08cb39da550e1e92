use std::time::Duration;

use thiserror::Error;

use crate::types::ProviderKind;

/// Structured failure built from a non-2xx vendor response.
///
/// Instances are created once by the per-vendor error parsers and handed to the
/// caller verbatim; nothing in the crate mutates them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} API error (status {status}): {message}")]
pub struct ProviderError {
    /// HTTP status code returned by the vendor.
    pub status: u16,
    /// Vendor that produced the error.
    pub provider: ProviderKind,
    /// Message extracted from the vendor's error envelope.
    pub message: String,
    /// Whether repeating the same request may succeed (5xx and 429).
    pub retryable: bool,
    /// Numeric `Retry-After` hint, when the vendor sent one.
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    /// Builds an error and derives `retryable` from the status class.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_gateway::error::ProviderError;
    /// use kotoba_gateway::ProviderKind;
    ///
    /// let err = ProviderError::new(429, ProviderKind::OpenAi, "slow down");
    /// assert!(err.retryable);
    /// let err = ProviderError::new(400, ProviderKind::OpenAi, "bad request");
    /// assert!(!err.retryable);
    /// ```
    pub fn new(status: u16, provider: ProviderKind, message: impl Into<String>) -> Self {
        Self {
            status,
            provider,
            message: message.into(),
            retryable: is_retryable_status(status),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Generic message used when the vendor envelope carries none.
    pub fn unknown_message(provider: ProviderKind) -> String {
        let label = match provider {
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Gemini => "Gemini",
        };
        format!("Unknown {label} API error")
    }

    /// Returns `true` for 401 and 403.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

/// Returns `true` for 5xx and 429.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Aggregates every failure mode exposed by the gateway.
///
/// Callers can match on the variant to decide whether to retry, fall back to
/// another provider, or surface an actionable message to the user interface.
#[derive(Debug, Error)]
pub enum LLMError {
    /// The adapter was constructed without a credential.
    #[error("missing credential for provider {provider}")]
    MissingCredential { provider: ProviderKind },
    /// The request cannot be expressed for the selected vendor.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Encoding the request body failed.
    #[error("failed to serialize request: {message}")]
    Serialization { message: String },
    /// A 2xx body did not match the expected vendor schema.
    #[error("failed to decode {provider} response: {message}")]
    Decode {
        provider: ProviderKind,
        message: String,
    },
    /// Transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The caller's cancellation token fired before the operation finished.
    #[error("request cancelled")]
    Cancelled,
    /// Non-2xx response normalized from the vendor's error envelope.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// A credential probe was rejected with 401/403.
    #[error("invalid credential for provider {provider}: {message}")]
    InvalidCredential {
        provider: ProviderKind,
        message: String,
    },
    /// The vendor reported an error inside an otherwise successful stream.
    #[error("{provider} stream error: {message}")]
    Stream {
        provider: ProviderKind,
        message: String,
    },
    /// No adapter is registered under the given tag.
    #[error("unknown provider: {provider}")]
    UnknownProvider { provider: String },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_gateway::error::LLMError;
    ///
    /// let err = LLMError::transport("dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Decode`] for the given provider.
    pub fn decode<T: Into<String>>(provider: ProviderKind, message: T) -> Self {
        Self::Decode {
            provider,
            message: message.into(),
        }
    }

    /// Whether a caller-side retry policy may repeat the request.
    ///
    /// Provider errors follow their `retryable` flag and network failures are
    /// considered transient. Everything else points at a local or permanent
    /// problem.
    pub fn is_retryable(&self) -> bool {
        match self {
            LLMError::Provider(err) => err.retryable,
            LLMError::Transport { .. } => true,
            _ => false,
        }
    }

    /// Retry hint carried by provider errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LLMError::Provider(err) => err.retry_after,
            _ => None,
        }
    }

    /// Recodes 401/403 provider errors as [`LLMError::InvalidCredential`].
    ///
    /// Used by credential probes; every other error passes through untouched.
    pub fn into_credential_error(self) -> Self {
        match self {
            LLMError::Provider(err) if err.is_auth_failure() => LLMError::InvalidCredential {
                provider: err.provider,
                message: err.message,
            },
            other => other,
        }
    }
}
