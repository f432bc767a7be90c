//! Resource sections of the JIRA REST API.
//!
//! [`JiraClient`] is the entry point: a cheap, cloneable handle over one
//! [`RawClient`] and the caches the sections share. Sections are borrowed
//! views created on demand, e.g. `client.issue().comment().list(...)`.

mod attachment;
mod catalog;
mod comment;
mod component;
mod field;
mod group;
mod issue;
mod issue_link;
mod jql;
mod project;
mod transitions;
mod user;
mod version;
mod watchers;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};

use super::auth::Auth;
use super::cache::Caches;
use super::client::RawClient;
use super::error::{ApiError, Result};
use super::types::{SearchResult, UserData};

pub use attachment::{AttachmentSection, IssueAttachmentSection};
pub use catalog::{CatalogItem, CatalogSection};
pub(crate) use catalog::names_match;
pub use comment::CommentSection;
pub use component::ComponentSection;
pub use field::FieldSection;
pub use group::GroupSection;
pub use issue::{
    CreateIssueRequest, IssueSection, EXPAND_CHANGELOG, EXPAND_CREATEMETA_FIELDS,
    EXPAND_RENDERED_FIELDS, ISSUE_SEARCH_LIMIT,
};
pub use issue_link::IssueLinkSection;
pub use jql::JqlSection;
pub use project::{compare_versions, ProjectSection};
pub use transitions::TransitionsSection;
pub use user::{UserSection, UserUpdate};
pub use version::{VersionPosition, VersionSection};
pub use watchers::WatchersSection;

/// Default page size of [`JiraClient::search`].
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// The JIRA API client.
///
/// Cloning is cheap: clones share the transport and every cache.
#[derive(Debug, Clone)]
pub struct JiraClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    raw: RawClient,
    caches: Caches,
}

impl JiraClient {
    /// Wrap a configured transport.
    pub fn from_raw(raw: RawClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                raw,
                caches: Caches::default(),
            }),
        }
    }

    /// Create an anonymous client for the JIRA instance at `jira_url`.
    pub fn new(jira_url: &str) -> Result<Self> {
        Ok(Self::from_raw(RawClient::new(jira_url)?))
    }

    /// Create a client with explicit credentials.
    ///
    /// Does NOT validate the connection automatically.
    ///
    /// # Arguments
    ///
    /// * `jira_url` - The JIRA instance URL
    /// * `login` - The user's login
    /// * `secret` - The password or API token
    pub fn with_credentials(jira_url: &str, login: &str, secret: &str) -> Result<Self> {
        let raw = RawClient::new(jira_url)?.with_auth(Auth::new(login, secret));
        Ok(Self::from_raw(raw))
    }

    /// The underlying transport.
    pub fn raw(&self) -> &RawClient {
        &self.inner.raw
    }

    /// The JIRA web UI root, ending with `/`.
    pub fn jira_url(&self) -> &str {
        self.inner.raw.jira_url()
    }

    /// The login requests are made with.
    pub fn login(&self) -> &str {
        self.inner.raw.login()
    }

    pub(crate) fn caches(&self) -> &Caches {
        &self.inner.caches
    }

    /// Validate the connection by calling the `myself` endpoint.
    #[instrument(skip(self))]
    pub async fn validate_connection(&self) -> Result<UserData> {
        debug!("Validating JIRA connection");

        let user = self.myself().await.map_err(|e| {
            error!("Connection validation failed: {}", e);
            e
        })?;

        info!("Connected as user: {}", user);
        Ok(user)
    }

    /// Get the current authenticated user.
    pub async fn myself(&self) -> Result<UserData> {
        decode(self.raw().get("myself", &[]).await?)
    }

    /// Search for issues using JQL.
    ///
    /// # Arguments
    ///
    /// * `jql` - The JQL query string
    /// * `fields` - Fields to load, empty for the server default
    /// * `expand` - Expand groups, e.g. `changelog`
    /// * `max_results` - Page size
    /// * `start_at` - The index of the first issue to return (0-based)
    #[instrument(skip(self, fields, expand), fields(jql = %jql))]
    pub async fn search(
        &self,
        jql: &str,
        fields: &[&str],
        expand: &[&str],
        max_results: u32,
        start_at: u32,
    ) -> Result<SearchResult> {
        let mut body = json!({
            "jql": jql,
            "startAt": start_at,
            "maxResults": max_results,
            "validateQuery": true,
        });
        if !fields.is_empty() {
            body["fields"] = json!(fields);
        }
        if !expand.is_empty() {
            body["expand"] = json!(expand);
        }

        let result: SearchResult = decode(self.raw().post("search", &body).await?)?;
        debug!("Found {} issues (total: {})", result.issues.len(), result.total);
        Ok(result)
    }

    pub fn issue(&self) -> IssueSection<'_> {
        IssueSection::new(self)
    }

    pub fn attachment(&self) -> AttachmentSection<'_> {
        AttachmentSection::new(self)
    }

    pub fn component(&self) -> ComponentSection<'_> {
        ComponentSection::new(self)
    }

    pub fn field(&self) -> FieldSection<'_> {
        FieldSection::new(self)
    }

    pub fn group(&self) -> GroupSection<'_> {
        GroupSection::new(self)
    }

    pub fn issue_link(&self) -> IssueLinkSection<'_> {
        IssueLinkSection::new(self)
    }

    pub fn issue_link_type(&self) -> CatalogSection<'_, super::types::LinkTypeData> {
        CatalogSection::new(self)
    }

    pub fn issue_type(&self) -> CatalogSection<'_, super::types::IssueTypeData> {
        CatalogSection::new(self)
    }

    pub fn priority(&self) -> CatalogSection<'_, super::types::PriorityData> {
        CatalogSection::new(self)
    }

    pub fn resolution(&self) -> CatalogSection<'_, super::types::ResolutionData> {
        CatalogSection::new(self)
    }

    pub fn status(&self) -> CatalogSection<'_, super::types::StatusData> {
        CatalogSection::new(self)
    }

    pub fn status_category(&self) -> CatalogSection<'_, super::types::StatusCategoryData> {
        CatalogSection::new(self)
    }

    pub fn security_level(&self) -> CatalogSection<'_, super::types::SecurityLevelData> {
        CatalogSection::new(self)
    }

    pub fn jql(&self) -> JqlSection<'_> {
        JqlSection::new(self)
    }

    pub fn project(&self) -> ProjectSection<'_> {
        ProjectSection::new(self)
    }

    pub fn user(&self) -> UserSection<'_> {
        UserSection::new(self)
    }

    pub fn version(&self) -> VersionSection<'_> {
        VersionSection::new(self)
    }
}

/// Decode a JSON answer into a typed payload.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Encode a path segment (issue keys, project keys, names).
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value.trim()).into_owned()
}

/// Projects and issue types may be referenced either by numeric id or by key/name.
pub(crate) fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Join string lists the way JIRA query parameters expect.
pub(crate) fn join(items: &[&str]) -> String {
    items.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_encodes_spaces() {
        assert_eq!(segment(" PROJ-1 "), "PROJ-1");
        assert_eq!(segment("jira users"), "jira%20users");
    }

    #[test]
    fn test_is_numeric() {
        assert!(is_numeric("10000"));
        assert!(!is_numeric("PROJ"));
        assert!(!is_numeric(""));
        assert!(!is_numeric("12a"));
    }

    #[test]
    fn test_decode_reports_shape_errors() {
        let err = decode::<UserData>(serde_json::json!([1, 2])).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
