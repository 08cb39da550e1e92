use std::time::Duration;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::types::ProviderKind;

use super::types::GeminiErrorDetail;

const INVALID_KEY_REASON: &str = "API_KEY_INVALID";

/// Parses `google.rpc.Status` error envelopes.
///
/// An `ErrorInfo.reason` is appended to the message, e.g.
/// `API key not valid. (API_KEY_INVALID)`.
pub(crate) fn parse_gemini_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> ProviderError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<GeminiErrorDetail>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(describe)
        .unwrap_or_else(|| {
            tracing::debug!(status, body, "gemini error body has no message");
            ProviderError::unknown_message(ProviderKind::Gemini)
        });

    ProviderError::new(status, ProviderKind::Gemini, message).with_retry_after(retry_after)
}

pub(crate) fn describe(detail: GeminiErrorDetail) -> Option<String> {
    let message = detail.message.filter(|message| !message.is_empty())?;
    let reason = detail
        .details
        .into_iter()
        .find_map(|info| info.reason)
        .or(detail.status);
    Some(match reason {
        Some(reason) => format!("{message} ({reason})"),
        None => message,
    })
}

/// Gemini answers a bad key with 400 instead of 401.
pub(crate) fn is_invalid_api_key(err: &ProviderError) -> bool {
    err.is_auth_failure()
        || (err.status == 400
            && (err.message.contains(INVALID_KEY_REASON)
                || err.message.contains("API key not valid")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVALID_KEY_BODY: &str = r#"{
  "error": {
    "code": 400,
    "message": "API key not valid. Please pass a valid API key.",
    "status": "INVALID_ARGUMENT",
    "details": [
      {
        "@type": "type.googleapis.com/google.rpc.ErrorInfo",
        "reason": "API_KEY_INVALID",
        "domain": "googleapis.com"
      }
    ]
  }
}"#;

    #[test]
    fn parse_invalid_key_envelope() {
        let err = parse_gemini_error(400, INVALID_KEY_BODY, None);
        assert_eq!(err.status, 400);
        assert_eq!(err.provider, ProviderKind::Gemini);
        assert_eq!(
            err.message,
            "API key not valid. Please pass a valid API key. (API_KEY_INVALID)"
        );
        assert!(is_invalid_api_key(&err));
    }

    #[test]
    fn plain_bad_request_is_not_a_credential_problem() {
        let body = r#"{"error":{"code":400,"message":"Invalid JSON payload received.","status":"INVALID_ARGUMENT"}}"#;
        let err = parse_gemini_error(400, body, None);
        assert_eq!(err.message, "Invalid JSON payload received. (INVALID_ARGUMENT)");
        assert!(!is_invalid_api_key(&err));
    }

    #[test]
    fn resource_exhausted_is_retryable() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = parse_gemini_error(429, body, None);
        assert!(err.retryable);
    }

    #[test]
    fn unparseable_body_falls_back_to_generic_message() {
        let err = parse_gemini_error(500, "upstream connect error", None);
        assert_eq!(err.message, "Unknown Gemini API error");
    }
}
