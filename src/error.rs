use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::browser::BrowserError;
use crate::models::outcome::{ErrorKind, ErrorRecord};

/// Failure of a source adapter, classified by the retrieval taxonomy.
///
/// The payload is technical detail for logs. `NoResults` and `Provider` payloads are
/// provider text and may be shown to users.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Blocked by anti-bot challenge: {0}")]
    Blocked(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The provider refused the request (a 4xx status). Never retried.
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected page structure: {0}")]
    Parse(String),

    #[error("No results: {0}")]
    NoResults(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::Timeout(_) => ErrorKind::Timeout,
            RetrievalError::Blocked(_) => ErrorKind::Blocked,
            RetrievalError::Network(_) | RetrievalError::Rejected(_) => ErrorKind::NetworkError,
            RetrievalError::Parse(_) => ErrorKind::ParseError,
            RetrievalError::NoResults(_) => ErrorKind::NoResults,
            RetrievalError::Provider(_) | RetrievalError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetrievalError::Timeout(_) | RetrievalError::Network(_))
    }

    /// Convert into the display-safe record handed to callers.
    pub fn into_record(self) -> ErrorRecord {
        let kind = self.kind();
        match self {
            RetrievalError::NoResults(detail) if !detail.is_empty() => {
                ErrorRecord::new(kind, format!("{} ({detail})", kind.user_message()))
            }
            RetrievalError::Provider(detail) => ErrorRecord::new(
                kind,
                format!(
                    "The job provider reported a problem with this search: {detail}. Please try again later or adjust your filters."
                ),
            ),
            _ => ErrorRecord::notice(kind),
        }
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RetrievalError::Timeout(e.to_string())
        } else if e.is_decode() {
            RetrievalError::Parse(e.to_string())
        } else {
            RetrievalError::Network(e.to_string())
        }
    }
}

impl From<BrowserError> for RetrievalError {
    fn from(e: BrowserError) -> Self {
        match e {
            BrowserError::Timeout(msg) => RetrievalError::Timeout(msg),
            BrowserError::Navigation(msg) => RetrievalError::Network(msg),
            BrowserError::Unavailable(msg) | BrowserError::Launch(msg) => {
                RetrievalError::Unknown(msg)
            }
            BrowserError::Protocol(msg) => RetrievalError::Unknown(msg),
        }
    }
}

/// Errors of the HTTP caller layer.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(RetrievalError::Timeout(String::new()).kind(), ErrorKind::Timeout);
        assert_eq!(RetrievalError::Blocked(String::new()).kind(), ErrorKind::Blocked);
        assert_eq!(
            RetrievalError::Network(String::new()).kind(),
            ErrorKind::NetworkError
        );
        assert_eq!(RetrievalError::Parse(String::new()).kind(), ErrorKind::ParseError);
        assert_eq!(
            RetrievalError::NoResults(String::new()).kind(),
            ErrorKind::NoResults
        );
        assert_eq!(RetrievalError::Provider(String::new()).kind(), ErrorKind::Unknown);
    }

    #[test]
    fn records_hide_technical_detail() {
        let record = RetrievalError::Network("dns error: lookup failed".to_string()).into_record();
        assert_eq!(record.kind, ErrorKind::NetworkError);
        assert!(!record.message.contains("dns"));
    }

    #[test]
    fn provider_text_is_surfaced() {
        let record = RetrievalError::Provider("invalid affiliate id".to_string()).into_record();
        assert!(record.message.contains("invalid affiliate id"));
    }

    #[test]
    fn rejected_requests_are_network_errors_but_final() {
        let err = RetrievalError::Rejected("Careerjet returned 400 Bad Request".to_string());
        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert!(!err.is_retryable());
        assert!(RetrievalError::Network(String::new()).is_retryable());
    }

    #[test]
    fn browser_timeouts_stay_timeouts() {
        let err: RetrievalError = BrowserError::Timeout("homepage".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
    }
}
