//! API error types for the JIRA REST client.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when interacting with the JIRA REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed - JIRA answered 401 with an HTML page.
    #[error("Jira API authorization failed for URL {url}. Used '{login}' user. Please check credentials")]
    Unauthorized { url: String, login: String },

    /// Access denied - JIRA answered 403 with an HTML page.
    #[error(
        "Access to the API method is forbidden. URL: {url}. Used '{login}' user. \
         You either have not enough privileges or the captcha shown to your user"
    )]
    Forbidden { url: String, login: String },

    /// Any other HTTP error carrying a non-JSON body.
    #[error("Jira REST API responded with code {status} and content type {content_type}. URL: {url}. API answer: {body:?}")]
    Http {
        status: u16,
        content_type: String,
        url: String,
        body: String,
    },

    /// JIRA reported an error in a JSON payload.
    ///
    /// The decoded payload is kept in `response` for callers that need the
    /// per-field `errors` map.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        response: Value,
    },

    /// The response claimed to be JSON but could not be parsed.
    #[error("Jira REST API interaction error, failed to parse JSON: {reason}. Raw API response: {body:?}")]
    InvalidJson { reason: String, body: String },

    /// The response was not JSON while a decoded value was requested.
    #[error("Jira REST API responded with non-JSON data. Request the raw body if you want to get the result as a string")]
    NonJson,

    /// The request did not complete within the configured timeout.
    #[error("Request to '{url}' timeouted after {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    /// Network or HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A successful response did not have the expected shape.
    #[error("Invalid API response: {0}")]
    Decode(String),

    /// The caller passed an argument the API cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The transition is not available from the current issue status.
    #[error("Transition '{transition}' of '{issue}' is not available for '{login}' in current issue status")]
    TransitionUnavailable {
        transition: String,
        issue: String,
        login: String,
    },

    /// The transition would leave the issue in the status it already has.
    #[error("Issue '{issue}' is already in '{status}' status")]
    AlreadyInStatus { issue: String, status: String },

    /// No transition with the requested name exists for the issue.
    #[error(
        "Can't make '{name}' step for issue '{issue}' in status '{status}'. \
         List of issue steps available in current status: {available}"
    )]
    UnknownTransition {
        issue: String,
        status: String,
        name: String,
        available: String,
    },

    /// A local file to upload could not be read.
    #[error("Failed to read file '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Keyring error when storing/retrieving secrets.
    #[error("Keyring error: {0}")]
    Keyring(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Build an [`ApiError::Api`] from a JSON error payload.
    ///
    /// Uses the `message` field when present, otherwise joins every entry of
    /// `errorMessages` and `errors`.
    pub fn from_payload(status: u16, response: Value) -> Self {
        let message = render_error_message(&response);
        ApiError::Api {
            status,
            message,
            response,
        }
    }

    /// The HTTP status code associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Forbidden { .. } => Some(403),
            ApiError::Http { status, .. } | ApiError::Api { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check whether the error is an authorization failure.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. } | ApiError::Forbidden { .. })
    }

    /// The decoded API payload for [`ApiError::Api`] errors.
    pub fn api_response(&self) -> Option<&Value> {
        match self {
            ApiError::Api { response, .. } => Some(response),
            _ => None,
        }
    }
}

fn render_error_message(response: &Value) -> String {
    if let Some(message) = response.get("message").and_then(Value::as_str) {
        if !message.is_empty() {
            return format!("Jira REST API returned an error: {}", message);
        }
    }

    let mut errors: Vec<String> = Vec::new();
    if let Some(messages) = response.get("errorMessages").and_then(Value::as_array) {
        errors.extend(messages.iter().map(value_to_text));
    }
    if let Some(fields) = response.get("errors").and_then(Value::as_object) {
        errors.extend(fields.values().map(value_to_text));
    }

    format!("Jira REST API returned an error:\n\t{}", errors.join("\n\t"))
}

pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_message_wins() {
        let err = ApiError::from_payload(400, json!({"message": "bad things", "errorMessages": ["x"]}));
        assert_eq!(err.to_string(), "Jira REST API returned an error: bad things");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_payload_joins_messages_and_errors() {
        let err = ApiError::from_payload(
            400,
            json!({"errorMessages": [], "errors": {"summary": "Summary is required"}}),
        );
        assert_eq!(
            err.to_string(),
            "Jira REST API returned an error:\n\tSummary is required"
        );
        assert!(err.api_response().is_some());
    }

    #[test]
    fn test_unauthorized_display() {
        let err = ApiError::Unauthorized {
            url: "https://jira.example.com/rest/api/latest/myself".to_string(),
            login: "bot".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("authorization failed"));
        assert!(msg.contains("'bot'"));
        assert!(err.is_auth_error());
    }

    #[test]
    fn test_forbidden_status() {
        let err = ApiError::Forbidden {
            url: "u".to_string(),
            login: "l".to_string(),
        };
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("captcha"));
    }

    #[test]
    fn test_timeout_display() {
        let err = ApiError::Timeout {
            url: "https://jira/rest".to_string(),
            seconds: 60,
        };
        assert_eq!(
            err.to_string(),
            "Request to 'https://jira/rest' timeouted after 60 seconds"
        );
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_transition_unavailable_display() {
        let err = ApiError::TransitionUnavailable {
            transition: "21".to_string(),
            issue: "PROJ-1".to_string(),
            login: "bot".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Transition '21' of 'PROJ-1' is not available for 'bot' in current issue status"
        );
    }
}
