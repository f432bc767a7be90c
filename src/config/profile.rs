//! JIRA profile configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ConfigError, Result, Settings};
use crate::api::{self, Auth, JiraClient, RawClient};

/// Environment variable that overrides every stored secret.
pub const TOKEN_ENV_VAR: &str = "JIRA_REST_TOKEN";

/// A JIRA profile configuration.
///
/// Profiles store connection details for a JIRA instance. Secrets are kept
/// in the OS keyring, a credentials file or the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// The name of this profile.
    ///
    /// Must be non-empty and unique across all profiles.
    pub name: String,

    /// The JIRA web UI root, e.g. "https://jira.example.com".
    pub url: String,

    /// The login used for Basic authentication.
    pub login: String,

    /// REST API prefix, `rest/api/latest/` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_prefix: Option<String>,

    /// Request timeout in seconds, overrides [`Settings::timeout_secs`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// File holding `login:secret` on a single line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
}

/// Resolved login and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

impl Profile {
    /// Create a new profile.
    pub fn new(name: String, url: String, login: String) -> Self {
        Self {
            name,
            url,
            login,
            api_prefix: None,
            timeout_secs: None,
            credentials_file: None,
        }
    }

    /// Validate this profile.
    ///
    /// Checks that:
    /// - The name is non-empty and has no whitespace
    /// - The URL is non-empty and starts with http:// or https://
    /// - The login is non-empty
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "profile name cannot be empty".to_string(),
            ));
        }

        if self.name.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "profile name '{}' cannot contain whitespace",
                self.name
            )));
        }

        if self.url.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL cannot be empty",
                self.name
            )));
        }

        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL must start with http:// or https://",
                self.name
            )));
        }

        if self.login.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': login cannot be empty",
                self.name
            )));
        }

        Ok(())
    }

    /// Resolve the login and secret for this profile.
    ///
    /// Sources are tried in order: the `JIRA_REST_TOKEN` environment
    /// variable, the credentials file, the OS keyring.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSecret` when no source has a secret and
    /// `ConfigError::ReadError` when the credentials file cannot be read.
    pub fn credentials(&self) -> Result<Credentials> {
        if let Ok(secret) = std::env::var(TOKEN_ENV_VAR) {
            if !secret.is_empty() {
                debug!(profile = %self.name, "Using secret from environment");
                return Ok(Credentials {
                    login: self.login.clone(),
                    secret,
                });
            }
        }

        if let Some(path) = &self.credentials_file {
            let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
            return parse_credentials_line(&content).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "profile '{}': credentials file {} must contain 'login:secret'",
                    self.name,
                    path.display()
                ))
            });
        }

        match api::get_token(&self.name) {
            Ok(secret) => Ok(Credentials {
                login: self.login.clone(),
                secret,
            }),
            Err(e) => {
                debug!(profile = %self.name, error = %e, "No secret in keyring");
                Err(ConfigError::MissingSecret(self.name.clone()))
            }
        }
    }

    /// Effective request timeout.
    pub fn timeout(&self, settings: &Settings) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(settings.timeout_secs))
    }

    /// Build a client for this profile.
    pub fn connect(&self, settings: &Settings) -> crate::Result<JiraClient> {
        let credentials = self.credentials()?;
        let mut raw = RawClient::new(&self.url)?
            .with_auth(Auth::new(&credentials.login, &credentials.secret))
            .with_timeout(self.timeout(settings));
        if let Some(prefix) = &self.api_prefix {
            raw = raw.with_api_prefix(prefix);
        }
        Ok(JiraClient::from_raw(raw))
    }
}

/// Parse `login:secret`, ignoring the trailing newline. The secret may itself
/// contain `:`.
fn parse_credentials_line(content: &str) -> Option<Credentials> {
    let line = content.trim_end_matches(['\r', '\n']);
    let (login, secret) = line.split_once(':')?;
    if login.is_empty() || secret.is_empty() {
        return None;
    }
    Some(Credentials {
        login: login.to_string(),
        secret: secret.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    fn profile() -> Profile {
        Profile::new(
            "work".to_string(),
            "https://jira.example.com".to_string(),
            "jdoe".to_string(),
        )
    }

    #[test]
    fn test_valid_profile() {
        assert!(profile().validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut p = profile();
        p.name = String::new();
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("name cannot be empty"));
    }

    #[test]
    fn test_whitespace_name_rejected() {
        let mut p = profile();
        p.name = "my work".to_string();
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("cannot contain whitespace"));
    }

    #[test]
    fn test_invalid_url_scheme_rejected() {
        let mut p = profile();
        p.url = "jira.example.com".to_string();
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("must start with http"));
    }

    #[test]
    fn test_http_url_accepted() {
        let mut p = profile();
        p.url = "http://localhost:8080".to_string();
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_empty_login_rejected() {
        let mut p = profile();
        p.login = " ".to_string();
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("login cannot be empty"));
    }

    #[test]
    fn test_parse_credentials_line() {
        let creds = parse_credentials_line("bot:pa:ss\n").unwrap();
        assert_eq!(creds.login, "bot");
        assert_eq!(creds.secret, "pa:ss");
        assert!(parse_credentials_line("no-separator").is_none());
        assert!(parse_credentials_line(":secret").is_none());
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = Credentials {
            login: "bot".to_string(),
            secret: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    #[serial]
    fn test_credentials_from_env() {
        std::env::set_var(TOKEN_ENV_VAR, "env-secret");
        let creds = profile().credentials();
        std::env::remove_var(TOKEN_ENV_VAR);

        let creds = creds.unwrap();
        assert_eq!(creds.login, "jdoe");
        assert_eq!(creds.secret, "env-secret");
    }

    #[test]
    #[serial]
    fn test_credentials_from_file() {
        std::env::remove_var(TOKEN_ENV_VAR);
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"robot:s3cret\n").unwrap();

        let mut p = profile();
        p.credentials_file = Some(file.path().to_path_buf());
        let creds = p.credentials().unwrap();
        assert_eq!(creds.login, "robot");
        assert_eq!(creds.secret, "s3cret");
    }

    #[test]
    fn test_timeout_override() {
        let settings = Settings::default();
        let mut p = profile();
        assert_eq!(p.timeout(&settings), Duration::from_secs(60));
        p.timeout_secs = Some(5);
        assert_eq!(p.timeout(&settings), Duration::from_secs(5));
    }

    #[test]
    fn test_profile_serialization() {
        let mut p = profile();
        p.api_prefix = Some("rest/api/2/".to_string());

        let toml_str = toml::to_string(&p).unwrap();
        assert!(!toml_str.contains("credentials_file"));
        let parsed: Profile = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, p);
    }
}
