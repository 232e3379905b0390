// Client-side failure classification
use serde_json::{json, Value};
use thiserror::Error;

/// Where a forced logout sends the user
pub const LOGIN_REDIRECT: &str = "/login?expired=true";

/// Classified outcome of a failed API call.
///
/// Malformed local state is never represented here: the session layer
/// answers `false`/`None` for it instead.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// No response at all: timeout, DNS failure, connection refused
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// 401 on an authentication-scoped route. Local session already torn down.
    #[error("Session expired: {message}")]
    SessionExpired { redirect_to: String, message: String },

    /// 401 on any other route. Surfaced without touching the session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // 5xx
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String, body: Option<Value> },

    // 4xx other than 401
    #[error("Request failed ({status}): {message}")]
    Client { status: u16, message: String, body: Option<Value> },

    /// 2xx whose body could not be read as the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rejected before sending (client-side form validation)
    #[error("Invalid input: {0}")]
    Validation(String),
}

impl GatewayError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        GatewayError::Unreachable(message.into())
    }

    pub fn session_expired(message: impl Into<String>) -> Self {
        GatewayError::SessionExpired {
            redirect_to: LOGIN_REDIRECT.to_string(),
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        GatewayError::Unauthorized(message.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        GatewayError::Server { status, message: message.into(), body: None }
    }

    pub fn client(status: u16, message: impl Into<String>) -> Self {
        GatewayError::Client { status, message: message.into(), body: None }
    }

    /// Attach the parsed error body the server sent
    pub fn with_body(mut self, value: Value) -> Self {
        match &mut self {
            GatewayError::Server { body, .. } | GatewayError::Client { body, .. } => {
                *body = Some(value);
            }
            _ => {}
        }
        self
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            GatewayError::Server { body, .. } | GatewayError::Client { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        GatewayError::InvalidResponse(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation(message.into())
    }

    /// HTTP status, if a response was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Unreachable(_) => None,
            GatewayError::SessionExpired { .. } => Some(401),
            GatewayError::Unauthorized(_) => Some(401),
            GatewayError::Server { status, .. } => Some(*status),
            GatewayError::Client { status, .. } => Some(*status),
            GatewayError::InvalidResponse(_) => None,
            GatewayError::Validation(_) => None,
        }
    }

    /// Stable code for callers branching on the failure kind
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Unreachable(_) => "UNREACHABLE",
            GatewayError::SessionExpired { .. } => "SESSION_EXPIRED",
            GatewayError::Unauthorized(_) => "UNAUTHORIZED",
            GatewayError::Server { .. } => "SERVER_ERROR",
            GatewayError::Client { .. } => "CLIENT_ERROR",
            GatewayError::InvalidResponse(_) => "INVALID_RESPONSE",
            GatewayError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, GatewayError::Unreachable(_))
    }

    /// True when the caller must send the user to the login entry point
    pub fn requires_login(&self) -> bool {
        matches!(self, GatewayError::SessionExpired { .. })
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GatewayError::SessionExpired { redirect_to, .. } => Some(redirect_to),
            _ => None,
        }
    }

    /// One human-readable notice per failed user action
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Unreachable(_) => {
                "Cannot reach the server. It may be waking up, please try again shortly.".to_string()
            }
            GatewayError::SessionExpired { .. } => {
                "Your session has expired. Please log in again.".to_string()
            }
            GatewayError::Unauthorized(msg) => non_empty_or(msg, "You are not authorized to do that."),
            GatewayError::Server { message, .. } => {
                non_empty_or(message, "Something went wrong on the server.")
            }
            GatewayError::Client { message, .. } => non_empty_or(message, "The request was rejected."),
            GatewayError::InvalidResponse(_) => "The server sent an unexpected response.".to_string(),
            GatewayError::Validation(msg) => msg.clone(),
        }
    }

    /// Diagnostic JSON body, mirrors the backend's error envelope
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.user_message(),
            "code": self.error_code(),
        });
        if let Some(status) = self.status_code() {
            body["status"] = json!(status);
        }
        if let Some(target) = self.redirect_target() {
            body["redirect_to"] = json!(target);
        }
        body
    }
}

fn non_empty_or(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::invalid_response(err.to_string())
        } else {
            GatewayError::unreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::invalid_response(err.to_string())
    }
}

/// Errors from the local session storage backend
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("No storage directory available (HOME not set)")]
    NoStorageDir,
}

/// Failure of a download-and-save export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Could not save export: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_codes() {
        assert_eq!(GatewayError::unreachable("refused").status_code(), None);
        assert_eq!(GatewayError::session_expired("").status_code(), Some(401));
        assert_eq!(GatewayError::server(503, "down").error_code(), "SERVER_ERROR");
        assert_eq!(GatewayError::client(404, "missing").status_code(), Some(404));
    }

    #[test]
    fn test_session_expired_carries_redirect() {
        let err = GatewayError::session_expired("Token has expired");
        assert!(err.requires_login());
        assert_eq!(err.redirect_target(), Some(LOGIN_REDIRECT));
        assert_eq!(err.to_json()["redirect_to"], LOGIN_REDIRECT);
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        assert_eq!(GatewayError::server(500, "Database offline").user_message(), "Database offline");
        assert_eq!(
            GatewayError::server(500, "  ").user_message(),
            "Something went wrong on the server."
        );
    }

    #[test]
    fn test_body_only_on_http_failures() {
        let err = GatewayError::server(503, "AI offline").with_body(json!({"fallback": "tip"}));
        assert_eq!(err.body().and_then(|b| b["fallback"].as_str()), Some("tip"));
        assert!(GatewayError::unreachable("x").with_body(json!({})).body().is_none());
    }
}
