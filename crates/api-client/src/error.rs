use admin_api::ErrorBody;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("{}", status_message(*.status, .detail.as_deref()))]
    Status { status: u16, detail: Option<String> },
    #[error("unexpected response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// Builds a status error, pulling the backend's `message`/`error` field
    /// out of the body when it is JSON.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.detail().map(str::to_string));
        ApiError::Status { status, detail }
    }

    /// Backend-provided text suitable for a notification.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn status_message(status: u16, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("HTTP {status}: {detail}"),
        None => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_backend_detail() {
        let err = ApiError::from_status(409, r#"{"message":"dispute already closed"}"#);
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.detail(), Some("dispute already closed"));
        assert_eq!(err.to_string(), "HTTP 409: dispute already closed");
    }

    #[test]
    fn tolerates_non_json_bodies() {
        let err = ApiError::from_status(502, "<html>Bad Gateway</html>");
        assert_eq!(err.detail(), None);
        assert_eq!(err.to_string(), "HTTP 502");
    }
}
