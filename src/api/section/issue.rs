//! `issue` section: loading, searching, editing and creating issues.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

use super::{
    decode, is_numeric, join, segment, CommentSection, IssueAttachmentSection, JiraClient,
    TransitionsSection, WatchersSection,
};
use crate::api::cache::lock;
use crate::api::error::{ApiError, Result};
use crate::api::types::{CreateMetaProject, CreatedIssue, FieldMeta, IssueData, TransitionData};

/// Expand group with the issue change log.
pub const EXPAND_CHANGELOG: &str = "changelog";
/// Expand group with HTML-rendered field values.
pub const EXPAND_RENDERED_FIELDS: &str = "renderedFields";
/// Expand group with field metadata on the create screen.
pub const EXPAND_CREATEMETA_FIELDS: &str = "projects.issuetypes.fields";

/// Page size of [`IssueSection::search`].
pub const ISSUE_SEARCH_LIMIT: u32 = 1000;

/// Body of `POST issue`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateIssueRequest {
    pub fields: Map<String, Value>,
    pub update: Map<String, Value>,
    pub transition: Option<Value>,
    pub properties: Vec<Value>,
    pub history_metadata: Option<Value>,
}

impl CreateIssueRequest {
    /// Build the JSON body, skipping empty parts.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        if !self.fields.is_empty() {
            body.insert("fields".to_string(), Value::Object(self.fields.clone()));
        }
        if !self.update.is_empty() {
            body.insert("update".to_string(), Value::Object(self.update.clone()));
        }
        if let Some(transition) = &self.transition {
            body.insert("transition".to_string(), transition.clone());
        }
        if !self.properties.is_empty() {
            body.insert("properties".to_string(), Value::Array(self.properties.clone()));
        }
        if let Some(meta) = &self.history_metadata {
            body.insert("historyMetadata".to_string(), meta.clone());
        }
        Value::Object(body)
    }
}

#[derive(Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<TransitionData>,
}

#[derive(Deserialize)]
struct CreateMetaResponse {
    #[serde(default)]
    projects: Vec<CreateMetaProject>,
}

#[derive(Deserialize)]
struct EditMetaResponse {
    #[serde(default)]
    fields: BTreeMap<String, FieldMeta>,
}

/// Issue endpoints.
#[derive(Debug, Clone, Copy)]
pub struct IssueSection<'a> {
    client: &'a JiraClient,
}

impl<'a> IssueSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    pub fn comment(&self) -> CommentSection<'a> {
        CommentSection::new(self.client)
    }

    pub fn watchers(&self) -> WatchersSection<'a> {
        WatchersSection::new(self.client)
    }

    pub fn attachment(&self) -> IssueAttachmentSection<'a> {
        IssueAttachmentSection::new(self.client)
    }

    pub fn transitions(&self) -> TransitionsSection<'a> {
        TransitionsSection::new(self.client)
    }

    /// Get a single issue by key.
    ///
    /// `names` is always added to the expand list so field display names come
    /// along with the values.
    ///
    /// # Errors
    ///
    /// Fails without a request when the key is empty.
    #[instrument(skip(self, fields, expand, properties), fields(issue_key = %key))]
    pub async fn get(
        &self,
        key: &str,
        fields: &[&str],
        expand: &[&str],
        properties: &[&str],
    ) -> Result<IssueData> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::InvalidArgument(
                "Can't get info for issue with empty key".to_string(),
            ));
        }

        let mut query = Vec::new();
        if !fields.is_empty() {
            query.push(("fields", join(fields)));
        }
        query.push(("expand", with_names(expand).join(",")));
        if !properties.is_empty() {
            query.push(("properties", join(properties)));
        }

        debug!("Fetching issue");
        let value = self
            .client
            .raw()
            .get(&format!("issue/{}", segment(key)), &query)
            .await?;
        decode(value)
    }

    /// Search issues by JQL, returning only the issues list. The `names`
    /// expand group is always requested.
    pub async fn search(
        &self,
        jql: &str,
        fields: &[&str],
        expand: &[&str],
        max_results: u32,
        start_at: u32,
    ) -> Result<Vec<IssueData>> {
        let result = self
            .client
            .search(jql, fields, &with_names(expand), max_results, start_at)
            .await?;
        Ok(result.issues)
    }

    /// Assign an issue. `None` unassigns it.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn assign(&self, key: &str, user_name: Option<&str>) -> Result<()> {
        self.client
            .raw()
            .put(
                &format!("issue/{}/assignee", segment(key)),
                &json!({ "name": user_name }),
            )
            .await?;
        info!("Assigned issue to {:?}", user_name);
        Ok(())
    }

    /// List the transitions available in the issue's current status.
    pub async fn list_transitions(&self, key: &str, expand_fields: bool) -> Result<Vec<TransitionData>> {
        let mut query = Vec::new();
        if expand_fields {
            query.push(("expand", "transitions.fields".to_string()));
        }
        let value = self
            .client
            .raw()
            .get(&format!("issue/{}/transitions", segment(key)), &query)
            .await?;
        Ok(decode::<TransitionsResponse>(value)?.transitions)
    }

    /// Get create-screen metadata.
    ///
    /// Numeric project and issue type references are sent as ids, the rest as
    /// keys and names.
    pub async fn create_meta(
        &self,
        projects: &[&str],
        issue_types: &[&str],
        expand_fields: bool,
    ) -> Result<Vec<CreateMetaProject>> {
        let (project_ids, project_keys): (Vec<&str>, Vec<&str>) =
            projects.iter().copied().partition(|p| is_numeric(p));
        let (type_ids, type_names): (Vec<&str>, Vec<&str>) =
            issue_types.iter().copied().partition(|t| is_numeric(t));

        let mut query = Vec::new();
        if !project_ids.is_empty() {
            query.push(("projectIds", join(&project_ids)));
        }
        if !project_keys.is_empty() {
            query.push(("projectKeys", join(&project_keys)));
        }
        if !type_ids.is_empty() {
            query.push(("issuetypeIds", join(&type_ids)));
        }
        if !type_names.is_empty() {
            query.push(("issuetypeNames", join(&type_names)));
        }
        if expand_fields {
            query.push(("expand", EXPAND_CREATEMETA_FIELDS.to_string()));
        }

        let value = self.client.raw().get("issue/createmeta", &query).await?;
        Ok(decode::<CreateMetaResponse>(value)?.projects)
    }

    /// Get edit-screen field metadata. Cached per issue key.
    pub async fn edit_meta(&self, key: &str) -> Result<BTreeMap<String, FieldMeta>> {
        if let Some(meta) = lock(&self.client.caches().edit_meta).get(key) {
            return Ok(meta.clone());
        }

        let value = self
            .client
            .raw()
            .get(&format!("issue/{}/editmeta", segment(key)), &[])
            .await?;
        let fields = decode::<EditMetaResponse>(value)?.fields;

        lock(&self.client.caches().edit_meta).insert(key.to_string(), fields.clone());
        Ok(fields)
    }

    /// Update an issue.
    ///
    /// # Arguments
    ///
    /// * `fields` - Field values to set
    /// * `update` - Update operations per field, e.g. `{"labels": [{"add": "x"}]}`
    /// * `properties` - Entity properties to set
    /// * `notify_users` - Whether JIRA should send notifications
    #[instrument(skip(self, fields, update, properties), fields(issue_key = %key))]
    pub async fn edit(
        &self,
        key: &str,
        fields: &Map<String, Value>,
        update: &Map<String, Value>,
        properties: &[Value],
        notify_users: bool,
    ) -> Result<()> {
        let mut body = Map::new();
        if !fields.is_empty() {
            body.insert("fields".to_string(), Value::Object(fields.clone()));
        }
        if !update.is_empty() {
            body.insert("update".to_string(), Value::Object(update.clone()));
        }
        if !properties.is_empty() {
            body.insert("properties".to_string(), Value::Array(properties.to_vec()));
        }
        body.insert("notifyUsers".to_string(), Value::Bool(notify_users));

        self.client
            .raw()
            .put(&format!("issue/{}", segment(key)), &Value::Object(body))
            .await?;
        info!("Issue updated");
        Ok(())
    }

    /// Create a new issue.
    #[instrument(skip(self, request))]
    pub async fn create(&self, request: &CreateIssueRequest) -> Result<CreatedIssue> {
        let created: CreatedIssue =
            decode(self.client.raw().post("issue", &request.to_body()).await?)?;
        info!(issue_key = %created.key, "Issue created");
        Ok(created)
    }

    /// Delete an issue.
    #[instrument(skip(self), fields(issue_key = %key))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .raw()
            .delete(&format!("issue/{}", segment(key)), &[])
            .await?;
        info!("Issue deleted");
        Ok(())
    }
}

fn with_names<'s>(expand: &[&'s str]) -> Vec<&'s str> {
    let mut groups: Vec<&str> = Vec::with_capacity(expand.len() + 1);
    for group in expand.iter().copied().chain(std::iter::once("names")) {
        if !groups.contains(&group) {
            groups.push(group);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_names_appends_once() {
        assert_eq!(with_names(&[]), vec!["names"]);
        assert_eq!(with_names(&["changelog"]), vec!["changelog", "names"]);
        assert_eq!(with_names(&["names", "changelog"]), vec!["names", "changelog"]);
    }

    #[test]
    fn test_create_request_skips_empty_parts() {
        let mut request = CreateIssueRequest::default();
        assert_eq!(request.to_body(), json!({}));

        request
            .fields
            .insert("summary".to_string(), json!("New issue"));
        request.transition = Some(json!({"id": 11}));
        assert_eq!(
            request.to_body(),
            json!({"fields": {"summary": "New issue"}, "transition": {"id": 11}})
        );
    }
}
