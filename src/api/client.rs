//! Raw JIRA REST API transport.
//!
//! [`RawClient`] knows nothing about JIRA resources. It builds request URLs,
//! authenticates, encodes arguments and turns HTTP responses into JSON values
//! or typed [`ApiError`]s. Every request is sent exactly once.

use std::time::Duration;

use reqwest::{header, multipart::Form, Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::auth::Auth;
use super::error::{value_to_text, ApiError, Result};

/// Default JIRA REST API prefix.
pub const DEFAULT_API_PREFIX: &str = "rest/api/latest/";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Query arguments for GET and DELETE requests.
pub type Query<'a> = [(&'a str, String)];

/// Low-level JIRA REST API client.
///
/// Requests go to `<jira_url><api_prefix><api_method>`. GET and DELETE
/// arguments are sent as a query string, POST and PUT arguments as a JSON
/// body.
#[derive(Debug, Clone)]
pub struct RawClient {
    /// The HTTP client.
    http: Client,
    /// JIRA web UI root, always ending with a single `/`.
    jira_url: String,
    /// API path prefix, no leading `/`, single trailing `/`.
    api_prefix: String,
    /// Authentication credentials.
    auth: Auth,
    /// Per-request timeout.
    timeout: Duration,
}

enum Payload<'a> {
    Query(&'a Query<'a>),
    Json(&'a Value),
    Multipart(Form),
}

impl RawClient {
    /// Create a new anonymous client for the JIRA instance at `jira_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(jira_url: &str) -> Result<Self> {
        let http = Client::builder().build().map_err(ApiError::Network)?;

        Ok(Self {
            http,
            jira_url: normalize_jira_url(jira_url),
            api_prefix: normalize_api_prefix(DEFAULT_API_PREFIX),
            auth: Auth::anonymous(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Set the API prefix, e.g. `/rest/api/2`.
    pub fn with_api_prefix(mut self, api_prefix: &str) -> Self {
        self.api_prefix = normalize_api_prefix(api_prefix);
        self
    }

    /// Set the credentials used for every request.
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The JIRA web UI root, ending with `/`.
    pub fn jira_url(&self) -> &str {
        &self.jira_url
    }

    /// The API prefix, ending with `/`.
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    /// The login requests are made with.
    pub fn login(&self) -> &str {
        self.auth.login()
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the full URL for an API method.
    pub fn url_for(&self, api_method: &str) -> String {
        format!(
            "{}{}{}",
            self.jira_url,
            self.api_prefix,
            api_method.trim_start_matches('/')
        )
    }

    /// `GET` an API method and decode the JSON answer.
    pub async fn get(&self, api_method: &str, query: &Query<'_>) -> Result<Value> {
        self.json(Method::GET, api_method, Payload::Query(query)).await
    }

    /// `GET` an API method and return the body as-is.
    pub async fn get_raw(&self, api_method: &str, query: &Query<'_>) -> Result<String> {
        self.raw(Method::GET, api_method, Payload::Query(query)).await
    }

    /// `POST` a JSON body.
    pub async fn post(&self, api_method: &str, body: &Value) -> Result<Value> {
        self.json(Method::POST, api_method, Payload::Json(body)).await
    }

    /// `PUT` a JSON body.
    pub async fn put(&self, api_method: &str, body: &Value) -> Result<Value> {
        self.json(Method::PUT, api_method, Payload::Json(body)).await
    }

    /// `DELETE` an API method, passing arguments in the query string.
    pub async fn delete(&self, api_method: &str, query: &Query<'_>) -> Result<Value> {
        self.json(Method::DELETE, api_method, Payload::Query(query)).await
    }

    pub async fn post_raw(&self, api_method: &str, body: &Value) -> Result<String> {
        self.raw(Method::POST, api_method, Payload::Json(body)).await
    }

    pub async fn put_raw(&self, api_method: &str, body: &Value) -> Result<String> {
        self.raw(Method::PUT, api_method, Payload::Json(body)).await
    }

    pub async fn delete_raw(&self, api_method: &str, query: &Query<'_>) -> Result<String> {
        self.raw(Method::DELETE, api_method, Payload::Query(query)).await
    }

    /// `POST` a multipart form (file uploads).
    pub async fn multipart(&self, api_method: &str, form: Form) -> Result<Value> {
        self.json(Method::POST, api_method, Payload::Multipart(form))
            .await
    }

    async fn json(&self, method: Method, api_method: &str, payload: Payload<'_>) -> Result<Value> {
        let (status, content_type, url, body) = self.send(method, api_method, payload).await?;
        match self.handle_response(status, &content_type, &url, &body)? {
            Some(value) => Ok(value),
            None => Err(ApiError::NonJson),
        }
    }

    async fn raw(&self, method: Method, api_method: &str, payload: Payload<'_>) -> Result<String> {
        let (status, content_type, url, body) = self.send(method, api_method, payload).await?;
        self.handle_response(status, &content_type, &url, &body)?;
        Ok(body)
    }

    #[instrument(skip(self, payload), fields(method = %method))]
    async fn send(
        &self,
        method: Method,
        api_method: &str,
        payload: Payload<'_>,
    ) -> Result<(StatusCode, String, String, String)> {
        let url = self.url_for(api_method);
        debug!(url = %url, "Sending request");

        let mut request = self
            .http
            .request(method, &url)
            .timeout(self.timeout)
            .header(header::ACCEPT, "application/json");

        request = match payload {
            Payload::Query(query) => {
                let request = request.header(header::CONTENT_TYPE, "application/json");
                if query.is_empty() {
                    request
                } else {
                    request.query(query)
                }
            }
            Payload::Json(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.to_string()),
            Payload::Multipart(form) => request
                .header("X-Atlassian-Token", "no-check")
                .multipart(form),
        };

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        debug!(status = status.as_u16(), content_type = %content_type, "Received response");
        Ok((status, content_type, final_url, body))
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            warn!(url = %url, "Request timed out");
            ApiError::Timeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            ApiError::Network(e)
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.header_value() {
            Some(value) => request.header(header::AUTHORIZATION, value),
            None => request,
        }
    }

    /// Classify a response.
    ///
    /// Returns `Ok(None)` for a successful non-JSON answer and
    /// `Ok(Some(Value::Null))` for an empty successful one.
    fn handle_response(
        &self,
        status: StatusCode,
        content_type: &str,
        url: &str,
        body: &str,
    ) -> Result<Option<Value>> {
        let code = status.as_u16();
        let is_json = content_type.starts_with("application/json");

        if matches!(code, 200 | 201 | 204) && body.is_empty() {
            return Ok(Some(Value::Null));
        }

        let parsed = serde_json::from_str::<Value>(body);
        if is_json {
            if let Err(e) = &parsed {
                return Err(ApiError::InvalidJson {
                    reason: e.to_string(),
                    body: body.to_string(),
                });
            }
        }

        self.check_api_error(code, content_type, url, body, parsed.as_ref().ok())?;

        Ok(parsed.ok())
    }

    fn check_api_error(
        &self,
        code: u16,
        content_type: &str,
        url: &str,
        body: &str,
        response: Option<&Value>,
    ) -> Result<()> {
        let is_json = content_type.starts_with("application/json");

        if code == 401 && !is_json {
            return Err(ApiError::Unauthorized {
                url: url.to_string(),
                login: self.login().to_string(),
            });
        }

        if code == 403 && !is_json {
            return Err(ApiError::Forbidden {
                url: url.to_string(),
                login: self.login().to_string(),
            });
        }

        if code >= 400 && !is_json {
            return Err(ApiError::Http {
                status: code,
                content_type: content_type.to_string(),
                url: url.to_string(),
                body: body.to_string(),
            });
        }

        let Some(response) = response.filter(|_| is_json) else {
            return Ok(());
        };

        if let Some(messages) = response.get("errorMessages").and_then(Value::as_array) {
            if !messages.is_empty() {
                let joined = messages
                    .iter()
                    .map(value_to_text)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(ApiError::Api {
                    status: code,
                    message: format!("Jira REST API call error: {}", joined),
                    response: response.clone(),
                });
            }
        }

        if code >= 400 {
            return Err(ApiError::from_payload(code, response.clone()));
        }

        Ok(())
    }
}

/// Force the JIRA URL to end with exactly one `/`.
fn normalize_jira_url(url: &str) -> String {
    let url = url.trim_end_matches('/');

    if !url.starts_with("https://") && !url.contains("localhost") && !url.contains("127.0.0.1") {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }

    format!("{}/", url)
}

/// Strip leading and trailing `/` from the prefix, then append one `/`.
fn normalize_api_prefix(prefix: &str) -> String {
    format!("{}/", prefix.trim_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> RawClient {
        RawClient::new("https://jira.example.com")
            .unwrap()
            .with_auth(Auth::new("bot", "secret"))
    }

    #[test]
    fn test_normalize_jira_url_adds_trailing_slash() {
        assert_eq!(
            normalize_jira_url("https://jira.example.com"),
            "https://jira.example.com/"
        );
    }

    #[test]
    fn test_normalize_jira_url_collapses_slashes() {
        assert_eq!(
            normalize_jira_url("https://jira.example.com/jira///"),
            "https://jira.example.com/jira/"
        );
    }

    #[test]
    fn test_normalize_api_prefix() {
        assert_eq!(normalize_api_prefix("/rest/api/2"), "rest/api/2/");
        assert_eq!(normalize_api_prefix("rest/api/latest/"), "rest/api/latest/");
    }

    #[test]
    fn test_url_for_strips_leading_slash() {
        let client = client().with_api_prefix("/rest/api/2/");
        assert_eq!(
            client.url_for("/issue/PROJ-1"),
            "https://jira.example.com/rest/api/2/issue/PROJ-1"
        );
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(client().timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_empty_success_is_null() {
        let result = client()
            .handle_response(StatusCode::NO_CONTENT, "", "u", "")
            .unwrap();
        assert_eq!(result, Some(Value::Null));
    }

    #[test]
    fn test_broken_json_is_rejected() {
        let err = client()
            .handle_response(StatusCode::OK, "application/json;charset=UTF-8", "u", "{oops")
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidJson { .. }));
    }

    #[test]
    fn test_html_401_is_unauthorized() {
        let err = client()
            .handle_response(StatusCode::UNAUTHORIZED, "text/html", "u", "<html/>")
            .unwrap_err();
        match err {
            ApiError::Unauthorized { login, .. } => assert_eq!(login, "bot"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_html_403_is_forbidden() {
        let err = client()
            .handle_response(StatusCode::FORBIDDEN, "text/html;charset=UTF-8", "u", "<html/>")
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden { .. }));
    }

    #[test]
    fn test_non_json_error_is_http_error() {
        let err = client()
            .handle_response(StatusCode::BAD_GATEWAY, "text/plain", "u", "upstream down")
            .unwrap_err();
        match err {
            ApiError::Http { status, body, .. } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_messages_fail_even_on_success() {
        let body = json!({"errorMessages": ["one", "two"]}).to_string();
        let err = client()
            .handle_response(StatusCode::OK, "application/json", "u", &body)
            .unwrap_err();
        assert_eq!(err.to_string(), "Jira REST API call error: one; two");
    }

    #[test]
    fn test_json_error_uses_payload() {
        let body = json!({"errorMessages": [], "errors": {"name": "taken"}}).to_string();
        let err = client()
            .handle_response(StatusCode::BAD_REQUEST, "application/json", "u", &body)
            .unwrap_err();
        assert_eq!(err.to_string(), "Jira REST API returned an error:\n\ttaken");
    }

    #[test]
    fn test_non_json_success_is_none() {
        let result = client()
            .handle_response(StatusCode::OK, "text/plain", "u", "hello")
            .unwrap();
        assert!(result.is_none());
    }
}
