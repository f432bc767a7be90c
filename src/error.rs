//! Error types of the object model.
//!
//! [`Error`] wraps transport failures ([`ApiError`]) and configuration
//! problems ([`ConfigError`]) and adds the errors raised by the domain objects
//! themselves: unknown fields, values outside the allowed list, missing
//! versions and so on.

use thiserror::Error;

use crate::api::error::ApiError;
use crate::config::ConfigError;

/// The main error type of the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// IO errors (file system, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Issue data is invalid or an issue object was misused.
    #[error("{0}")]
    Issue(String),

    /// The field is not on the create screen of the issue type.
    #[error("Unknown field '{field}' for '{issue_type}' issue in project '{project}'")]
    UnknownField {
        field: String,
        issue_type: String,
        project: String,
    },

    /// The value is not in the field's allowed values.
    #[error("Value '{value}' is impossible for custom field '{field}'")]
    UnknownFieldValue { field: String, value: String },

    /// No issue type with this id or name.
    #[error("Unknown issue type '{issue_type}' for project '{project}'")]
    UnknownIssueType { issue_type: String, project: String },

    /// No priority with this id or name.
    #[error("Unknown priority '{0}'")]
    UnknownPriority(String),

    /// No component with this id or name in the project.
    #[error("Unknown component '{component}' for project '{project}'")]
    UnknownComponent { component: String, project: String },

    /// A custom field was given an item or user it cannot hold.
    #[error("{0}")]
    CustomField(String),

    /// Link creation or lookup failed.
    #[error("{0}")]
    Link(String),

    /// Version lookup or creation failed.
    #[error("{0}")]
    Version(String),

    /// Component lookup failed.
    #[error("{0}")]
    Component(String),

    /// No matching user.
    #[error("{0}")]
    User(String),

    /// A file to upload does not exist.
    #[error("File {0} not found on disk. Can't upload it to JIRA")]
    FileNotFound(String),

    /// A date field holds a value that is not a JIRA date.
    #[error("Can't parse '{field}' field value '{value}' as date")]
    DateParse { field: String, value: String },
}

impl Error {
    /// Create an [`Error::Issue`].
    pub fn issue(msg: impl Into<String>) -> Self {
        Error::Issue(msg.into())
    }

    /// Get a user-friendly message for display.
    pub fn user_message(&self) -> String {
        match self {
            Error::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::CreateDirError(_) => {
                    "Could not create configuration directory. Check file permissions.".to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file exists and is readable.".to_string()
                }
                ConfigError::WriteError(_) => {
                    "Could not save configuration. Please check file permissions.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::SerializeError(_) => {
                    "Could not save configuration. Internal error.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
                ConfigError::ProfileNotFound(name) => format!("Profile '{}' not found.", name),
                ConfigError::MissingSecret(name) => {
                    format!("No password or API token stored for profile '{}'.", name)
                }
            },
            Error::Api(e) => match e {
                ApiError::Unauthorized { login, .. } => format!(
                    "Authentication failed for '{}'. Please check your login and password or API token.",
                    login
                ),
                ApiError::Forbidden { .. } => {
                    "Access denied. You don't have permission to access this resource.".to_string()
                }
                ApiError::NotFound(resource) => format!("'{}' was not found.", resource),
                ApiError::Timeout { seconds, .. } => {
                    format!("JIRA did not answer within {} seconds.", seconds)
                }
                ApiError::Network(_) => {
                    "Connection failed. Please check your network and JIRA URL.".to_string()
                }
                ApiError::Http { status, .. } if *status >= 500 => {
                    "JIRA server error. Please try again later.".to_string()
                }
                ApiError::Keyring(_) => {
                    "Could not access secure storage. Please store the token again.".to_string()
                }
                ApiError::InvalidJson { .. } | ApiError::NonJson | ApiError::Decode(_) => {
                    "Unexpected response from JIRA.".to_string()
                }
                other => other.to_string(),
            },
            Error::Io(_) => "A file operation failed. Please check file permissions.".to_string(),
            other => other.to_string(),
        }
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            Error::Config(ConfigError::NoConfigDir)
            | Error::Config(ConfigError::ProfileNotFound(_)) => {
                Some("Add a [[profiles]] entry to the jira-rest config.toml.")
            }
            Error::Config(ConfigError::MissingSecret(_)) | Error::Api(ApiError::Keyring(_)) => {
                Some("Run 'jira-rest token set' or export JIRA_REST_TOKEN.")
            }
            Error::Api(ApiError::Unauthorized { .. }) => {
                Some("Check the login of the profile and the stored secret.")
            }
            Error::Api(ApiError::Forbidden { .. }) => {
                Some("Log in to the JIRA web UI once to clear a pending captcha.")
            }
            Error::Api(ApiError::Network(_)) | Error::Api(ApiError::Timeout { .. }) => {
                Some("Check your network connection and the JIRA URL.")
            }
            _ => None,
        }
    }
}

/// Result type of the object model.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_config_error() {
        let err: Error = ConfigError::NoConfigDir.into();
        assert!(matches!(err, Error::Config(ConfigError::NoConfigDir)));
    }

    #[test]
    fn test_error_from_api_error() {
        let err: Error = ApiError::NotFound("PROJ-1".to_string()).into();
        assert!(matches!(err, Error::Api(ApiError::NotFound(_))));
    }

    #[test]
    fn test_user_message_unauthorized() {
        let err = Error::Api(ApiError::Unauthorized {
            url: "https://jira.example.com/rest/api/latest/myself".to_string(),
            login: "jdoe".to_string(),
        });
        let msg = err.user_message();
        assert!(msg.contains("Authentication failed"));
        assert!(msg.contains("jdoe"));
    }

    #[test]
    fn test_user_message_not_found() {
        let err = Error::Api(ApiError::NotFound("PROJ-123".to_string()));
        let msg = err.user_message();
        assert!(msg.contains("PROJ-123"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_user_message_server_error() {
        let err = Error::Api(ApiError::Http {
            status: 502,
            content_type: "text/html".to_string(),
            url: "https://jira.example.com/".to_string(),
            body: "<html>".to_string(),
        });
        assert!(err.user_message().contains("server error"));
    }

    #[test]
    fn test_user_message_domain_error() {
        let err = Error::UnknownFieldValue {
            field: "Team".to_string(),
            value: "Ops".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "Value 'Ops' is impossible for custom field 'Team'"
        );
    }

    #[test]
    fn test_user_message_config_validation() {
        let err = Error::Config(ConfigError::ValidationError("duplicate profile".to_string()));
        assert!(err.user_message().contains("duplicate profile"));
    }

    #[test]
    fn test_suggested_action_missing_secret() {
        let err = Error::Config(ConfigError::MissingSecret("work".to_string()));
        assert!(err.suggested_action().unwrap().contains("token set"));
    }

    #[test]
    fn test_suggested_action_none_for_domain_errors() {
        assert!(Error::issue("broken").suggested_action().is_none());
    }
}
