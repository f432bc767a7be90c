//! Authentication handling for the JIRA REST API.
//!
//! JIRA accepts Basic Auth with either a password or an API token as the
//! secret. Secrets can be kept in the OS keyring between runs.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::error::{ApiError, Result};

/// The keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "jira-rest";

/// Authentication credentials for JIRA.
#[derive(Clone, Default)]
pub struct Auth {
    /// The login used for API requests.
    login: String,
    /// The Base64-encoded authorization header value, `None` for anonymous access.
    auth_header: Option<String>,
}

impl Auth {
    /// Create new authentication credentials from a login and secret.
    ///
    /// The secret is immediately encoded and the raw value is not stored.
    pub fn new(login: &str, secret: &str) -> Self {
        Self {
            login: login.to_string(),
            auth_header: Some(build_auth_header(login, secret)),
        }
    }

    /// Anonymous access: requests are sent without an `Authorization` header.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Create authentication using a secret stored in the OS keyring.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret cannot be retrieved from the keyring.
    pub fn from_keyring(profile_name: &str, login: &str) -> Result<Self> {
        let secret = get_token(profile_name)?;
        Ok(Self::new(login, &secret))
    }

    /// Get the authorization header value for HTTP requests.
    pub fn header_value(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    /// Get the login.
    pub fn login(&self) -> &str {
        &self.login
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("login", &self.login)
            .field("auth_header", &self.auth_header.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Build the Basic Auth header value.
///
/// Encodes "login:secret" in Base64 and prepends "Basic ".
fn build_auth_header(login: &str, secret: &str) -> String {
    let credentials = format!("{}:{}", login, secret);
    let encoded = BASE64.encode(credentials.as_bytes());
    format!("Basic {}", encoded)
}

/// Store a secret in the OS keyring.
///
/// # Arguments
///
/// * `profile_name` - The profile name to use as the keyring username
/// * `token` - The password or API token to store
///
/// # Errors
///
/// Returns an error if the secret cannot be stored in the keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to create keyring entry: {}", e)))?;

    entry
        .set_password(token)
        .map_err(|e| ApiError::Keyring(format!("failed to store token: {}", e)))?;

    Ok(())
}

/// Retrieve a secret from the OS keyring.
///
/// # Errors
///
/// Returns an error if the secret cannot be retrieved from the keyring.
pub fn get_token(profile_name: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))?;

    entry
        .get_password()
        .map_err(|e| ApiError::Keyring(format!("failed to retrieve token: {}", e)))
}

/// Delete a secret from the OS keyring.
///
/// # Errors
///
/// Returns an error if the secret cannot be deleted from the keyring.
pub fn delete_token(profile_name: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))?;

    entry
        .delete_password()
        .map_err(|e| ApiError::Keyring(format!("failed to delete token: {}", e)))?;

    Ok(())
}

/// Check if a secret exists in the OS keyring for a profile.
pub fn has_token(profile_name: &str) -> bool {
    get_token(profile_name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_auth_header() {
        let header = build_auth_header("jira-bot", "s3cret");
        assert!(header.starts_with("Basic "));

        let encoded = header.strip_prefix("Basic ").unwrap();
        let decoded = BASE64.decode(encoded).unwrap();
        let decoded_str = String::from_utf8(decoded).unwrap();
        assert_eq!(decoded_str, "jira-bot:s3cret");
    }

    #[test]
    fn test_auth_new() {
        let auth = Auth::new("jira-bot", "s3cret");
        assert_eq!(auth.login(), "jira-bot");
        assert!(auth.header_value().unwrap().starts_with("Basic "));
    }

    #[test]
    fn test_anonymous_has_no_header() {
        let auth = Auth::anonymous();
        assert_eq!(auth.login(), "");
        assert!(auth.header_value().is_none());
    }

    #[test]
    fn test_auth_does_not_expose_secret() {
        let auth = Auth::new("jira-bot", "secret_token");
        let debug_output = format!("{:?}", auth);

        assert!(!debug_output.contains("secret_token"));
        assert!(!debug_output.contains(auth.header_value().unwrap_or_default()));
        assert!(debug_output.contains("jira-bot"));
    }
}
