//! Error type for the API client layer.

use serde_json::Value;

/// Errors surfaced by [`crate::api::DesignApi`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.). Treated as
    /// transient by the poller.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code. `data` carries the parsed
    /// JSON body when one was declared, or the raw text otherwise.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        data: Option<Value>,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Client-side validation failed before the request was sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Validation failure attributable to a single form field, e.g. the
    /// email conflict on registration.
    #[error("{field}: {message}")]
    Field { field: &'static str, message: String },
}

/// Convenience alias for API operation results.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// HTTP status of an [`ApiError::Api`] error, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error invalidated the session (401 or 403). Callers
    /// should redirect to the login entry point.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Whether the targeted entity no longer exists.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether this is a 409 conflict.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        let unauthorized = ApiError::Api {
            status: 401,
            message: "Unauthorized".into(),
            data: None,
        };
        assert!(unauthorized.is_auth_failure());
        assert!(!unauthorized.is_not_found());

        let forbidden = ApiError::Api {
            status: 403,
            message: "Forbidden".into(),
            data: None,
        };
        assert!(forbidden.is_auth_failure());

        let missing = ApiError::Api {
            status: 404,
            message: "Not found".into(),
            data: None,
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_auth_failure());

        let validation = ApiError::Validation("title too long".into());
        assert_eq!(validation.status(), None);
        assert!(!validation.is_auth_failure());
    }

    #[test]
    fn field_error_renders_field_name() {
        let err = ApiError::Field {
            field: "email",
            message: "An account with this email already exists".into(),
        };
        assert_eq!(
            err.to_string(),
            "email: An account with this email already exists"
        );
    }
}
