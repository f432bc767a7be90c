//! JIRA issues.
//!
//! [`Issue`] loads its payload lazily and keeps it until something changes
//! the issue. Edits are collected locally as JIRA update operations and go
//! out in one request on [`Issue::save`], [`Issue::transition`] or
//! [`Issue::step`].
//!
//! ```no_run
//! # async fn run(client: jira_rest::JiraClient) -> jira_rest::Result<()> {
//! let mut issue = jira_rest::Issue::new("PRJ-1", &client)?;
//! println!("{}", issue.summary().await?);
//!
//! issue.set_summary("Crash on start").add_labels(&["crash"]);
//! issue.save(&[], true).await?;
//! # Ok(())
//! # }
//! ```

mod attachments;
mod comment;
mod create;
mod history;
mod links;
mod refs;
mod watchers;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::api::types::{
    body_to_text, parse_datetime, CommentData, FieldMeta, IssueData, Visibility,
};
use crate::api::{
    is_numeric, JiraClient, EXPAND_CHANGELOG, EXPAND_RENDERED_FIELDS, ISSUE_SEARCH_LIMIT,
};
use crate::component::Component;
use crate::error::{Error, Result};
use crate::user::User;
use crate::version::Version;

pub use attachments::{Attachments, File};
pub use comment::Comment;
pub use create::CreateRequest;
pub use history::{
    Changelog, History, HistoryRecord, LogRecordItem, FIELD_TYPE_CUSTOM, FIELD_TYPE_JIRA,
};
pub use links::{Link, LinkType, LinksList};
pub use refs::{CatalogRef, IssueType, Priority, Resolution, SecurityLevel, Status, StatusCategory};
pub use watchers::WatchersList;

/// Payload keys outside of `fields` that a partial load still provides.
const TOP_LEVEL_KEYS: &[&str] = &["id", "key", "self"];

/// A JIRA issue.
#[derive(Debug, Clone)]
pub struct Issue {
    client: JiraClient,
    key: String,
    id: Option<u64>,
    self_url: Option<String>,

    /// Full payload; only set when every field was loaded.
    base: Option<IssueData>,
    expands: Vec<String>,
    /// Fields of a partial load, absent ones stored as null.
    fields: HashMap<String, Value>,
    dates: HashMap<String, Option<DateTime<Utc>>>,
    edit_meta: Option<BTreeMap<String, FieldMeta>>,

    watchers: Option<WatchersList>,
    attachments: Option<Attachments>,
    history: Option<History>,
    links: Option<LinksList>,

    /// Update operations per field id, sent on save.
    pending: BTreeMap<String, Vec<Value>>,
}

impl Issue {
    /// Reference an issue by key without loading it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Issue`] when the key is blank.
    pub fn new(key: &str, client: &JiraClient) -> Result<Self> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::issue("Can't create Issue object with empty issue key"));
        }

        Ok(Self {
            client: client.clone(),
            key: key.to_string(),
            id: None,
            self_url: None,
            base: None,
            expands: Vec::new(),
            fields: HashMap::new(),
            dates: HashMap::new(),
            edit_meta: None,
            watchers: None,
            attachments: None,
            history: None,
            links: None,
            pending: BTreeMap::new(),
        })
    }

    /// Wrap an issue payload.
    ///
    /// # Arguments
    ///
    /// * `data` - Payload as JIRA returned it
    /// * `fields` - Fields the payload was requested with; empty means all
    /// * `expand` - Expand groups the payload was requested with
    ///
    /// With an empty `fields` list the payload is kept as a full load.
    /// Otherwise only the listed fields are remembered and anything else
    /// triggers a full load on access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Issue`] when the payload has no key, or when both
    /// `fields` and `expand` are given.
    pub fn from_data(
        data: IssueData,
        fields: &[&str],
        expand: &[&str],
        client: &JiraClient,
    ) -> Result<Self> {
        if data.key.trim().is_empty() {
            return Err(Error::issue("Provided data does not contain attribute \"key\""));
        }
        if !fields.is_empty() && !expand.is_empty() {
            return Err(Error::issue(
                "Issue object does not support partial fields load in combination with \
                 non-empty 'expand' parameter. Use any of them, but not both",
            ));
        }

        let mut issue = Self::new(&data.key, client)?;
        issue.id = Some(data.id);
        if !data.self_url.is_empty() {
            issue.self_url = Some(data.self_url.clone());
        }

        if fields.is_empty() {
            issue.expands = expand.iter().map(|e| e.to_string()).collect();
            issue.base = Some(data);
        } else {
            for field in fields {
                if TOP_LEVEL_KEYS.contains(field) {
                    continue;
                }
                let value = data.fields.get(*field).cloned().unwrap_or(Value::Null);
                issue.fields.insert(field.to_string(), value);
            }
        }
        Ok(issue)
    }

    /// Load an issue.
    ///
    /// # Arguments
    ///
    /// * `fields` - Fields to load; empty loads everything
    /// * `expand` - Expand groups to request, e.g. [`EXPAND_CHANGELOG`]
    pub async fn by_key(
        key: &str,
        fields: &[&str],
        expand: &[&str],
        client: &JiraClient,
    ) -> Result<Self> {
        let data = client.issue().get(key, fields, expand, &[]).await?;
        Self::from_data(data, fields, expand, client)
    }

    /// Load several issues with one search. An empty key list makes no
    /// request.
    pub async fn by_keys(
        keys: &[&str],
        fields: &[&str],
        expand: &[&str],
        client: &JiraClient,
    ) -> Result<Vec<Self>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let jql = format!("key IN ({})", keys.join(","));
        Self::search(&jql, fields, expand, ISSUE_SEARCH_LIMIT, 0, client).await
    }

    /// Find issues by JQL.
    pub async fn search(
        jql: &str,
        fields: &[&str],
        expand: &[&str],
        limit: u32,
        offset: u32,
        client: &JiraClient,
    ) -> Result<Vec<Self>> {
        client
            .issue()
            .search(jql, fields, expand, limit, offset)
            .await?
            .into_iter()
            .map(|data| Self::from_data(data, fields, expand, client))
            .collect()
    }

    pub fn client(&self) -> &JiraClient {
        &self.client
    }

    /// The full payload, loading it when missing.
    ///
    /// Asking for an expand group that was not requested before drops the
    /// loaded data and reloads with every group requested so far.
    async fn base(&mut self, expand: &[&str]) -> Result<&IssueData> {
        for group in expand {
            if !self.expands.iter().any(|e| e == group) {
                self.drop_cache();
                self.expands.push(group.to_string());
            }
        }

        let data = match self.base.take() {
            Some(data) => data,
            None => {
                self.drop_cache();
                let expand: Vec<&str> = self.expands.iter().map(String::as_str).collect();
                debug!(issue_key = %self.key, ?expand, "Loading issue");
                self.client.issue().get(&self.key, &[], &expand, &[]).await?
            }
        };
        self.id = Some(data.id);
        Ok(self.base.insert(data))
    }

    /// Forget everything loaded. Pending edits are kept.
    pub fn drop_cache(&mut self) {
        self.base = None;
        self.fields.clear();
        self.dates.clear();
        self.edit_meta = None;
        self.watchers = None;
        self.attachments = None;
        self.history = None;
        self.links = None;
    }

    /// Raw value of a field, `null` when the issue has no value.
    ///
    /// # Arguments
    ///
    /// * `field_id` - Field id, e.g. `summary` or `customfield_10010`
    /// * `expand` - Expand groups the value depends on
    pub async fn field_value(&mut self, field_id: &str, expand: &[&str]) -> Result<Value> {
        if let Some(value) = self.fields.get(field_id) {
            return Ok(value.clone());
        }
        Ok(self
            .base(expand)
            .await?
            .fields
            .get(field_id)
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Whether the value of a field is loaded.
    pub fn is_field_loaded(&self, field_id: &str) -> bool {
        self.fields.contains_key(field_id)
            || self
                .base
                .as_ref()
                .is_some_and(|b| b.fields.contains_key(field_id))
    }

    fn loaded_value(&self, field_id: &str) -> Option<&Value> {
        self.fields
            .get(field_id)
            .or_else(|| self.base.as_ref().and_then(|b| b.fields.get(field_id)))
    }

    /// Value of a field found by display name on the edit screen.
    pub async fn field_value_by_name(&mut self, name: &str, expand: &[&str]) -> Result<Value> {
        let field_id = self
            .edit_meta()
            .await?
            .iter()
            .find(|(_, meta)| meta.name == name || meta.key.as_deref() == Some(name))
            .map(|(id, _)| id.clone());
        match field_id {
            Some(id) => self.field_value(&id, expand).await,
            None => Ok(Value::Null),
        }
    }

    /// HTML-rendered value of a field.
    pub async fn rendered_field(&mut self, field_id: &str) -> Result<Option<String>> {
        Ok(self
            .base(&[EXPAND_RENDERED_FIELDS])
            .await?
            .rendered_fields
            .as_ref()
            .and_then(|fields| fields.get(field_id))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Value of a date field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DateParse`] when the value is not a JIRA date.
    pub async fn date_field(&mut self, field_id: &str) -> Result<Option<DateTime<Utc>>> {
        if let Some(date) = self.dates.get(field_id) {
            return Ok(*date);
        }

        let date = match self.field_value(field_id, &[]).await? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(parse_datetime(&s).ok_or_else(|| Error::DateParse {
                field: field_id.to_string(),
                value: s.clone(),
            })?),
            other => {
                return Err(Error::DateParse {
                    field: field_id.to_string(),
                    value: other.to_string(),
                })
            }
        };
        self.dates.insert(field_id.to_string(), date);
        Ok(date)
    }

    /// Edit-screen metadata, keyed by field id.
    pub async fn edit_meta(&mut self) -> Result<&BTreeMap<String, FieldMeta>> {
        let meta = match self.edit_meta.take() {
            Some(meta) => meta,
            None => self.client.issue().edit_meta(&self.key).await?,
        };
        Ok(self.edit_meta.insert(meta))
    }

    /// Whether the current user can edit the field.
    pub async fn is_editable(&mut self, field_id: &str) -> Result<bool> {
        Ok(self.edit_meta().await?.contains_key(field_id))
    }

    pub async fn id(&mut self) -> Result<u64> {
        if let Some(id) = self.id {
            return Ok(id);
        }
        Ok(self.base(&[]).await?.id)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// API link of the issue.
    pub async fn self_url(&mut self) -> Result<String> {
        if let Some(url) = &self.self_url {
            return Ok(url.clone());
        }
        let url = self.base(&[]).await?.self_url.clone();
        self.self_url = Some(url.clone());
        Ok(url)
    }

    /// Re-read the key from JIRA. Keys change when issues move between
    /// projects.
    pub async fn update_key(&mut self, reload: bool) -> Result<&str> {
        if reload {
            self.drop_cache();
        }
        let key = self.base(&[]).await?.key.clone();
        self.key = key;
        Ok(&self.key)
    }

    /// Keys the issue had before being moved, oldest first.
    pub async fn previous_keys(&mut self) -> Result<Vec<String>> {
        Ok(self
            .history()
            .await?
            .track_field("Key")
            .into_iter()
            .filter(|change| change.is_string_changed())
            .map(|change| change.from_string().to_string())
            .collect())
    }

    /// Browser link of the issue.
    pub fn url(&self) -> String {
        format!("{}browse/{}", self.client.jira_url(), self.key)
    }

    /// Project key, taken from the issue key.
    pub fn project(&self) -> &str {
        self.key.split('-').next().unwrap_or_default()
    }

    pub fn is_in_project(&self, projects: &[&str]) -> bool {
        projects.contains(&self.project())
    }

    pub async fn summary(&mut self) -> Result<String> {
        Ok(self
            .field_value("summary", &[])
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    /// Description as plain text.
    pub async fn description(&mut self) -> Result<String> {
        Ok(body_to_text(&self.field_value("description", &[]).await?))
    }

    pub async fn labels(&mut self) -> Result<Vec<String>> {
        Ok(string_list(&self.field_value("labels", &[]).await?))
    }

    pub async fn created(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.date_field("created").await
    }

    pub async fn updated(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.date_field("updated").await
    }

    pub async fn resolution_date(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.date_field("resolutiondate").await
    }

    pub async fn due_date(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.date_field("duedate").await
    }

    pub async fn issue_type(&mut self) -> Result<IssueType> {
        let value = self.field_value("issuetype", &[]).await?;
        IssueType::from_value(value, &self.client)
    }

    pub async fn status(&mut self) -> Result<Status> {
        let value = self.field_value("status", &[]).await?;
        Status::from_value(value, &self.client)
    }

    /// Priority; issues of some types have none.
    pub async fn priority(&mut self) -> Result<Option<Priority>> {
        let value = self.field_value("priority", &[]).await?;
        optional(value, |v| Priority::from_value(v, &self.client))
    }

    pub async fn security(&mut self) -> Result<Option<SecurityLevel>> {
        let value = self.field_value("security", &[]).await?;
        optional(value, |v| SecurityLevel::from_value(v, &self.client))
    }

    /// Resolution; `None` while the issue is unresolved.
    pub async fn resolution(&mut self) -> Result<Option<Resolution>> {
        let value = self.field_value("resolution", &[]).await?;
        optional(value, |v| Resolution::from_value(v, &self.client))
    }

    pub async fn components(&mut self) -> Result<Vec<Component>> {
        let project = self.project().to_string();
        match self.field_value("components", &[]).await? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| Component::from_issue_field(item, &project, &self.client))
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// Fix versions.
    pub async fn fix_versions(&mut self) -> Result<Vec<Version>> {
        let Value::Array(items) = self.field_value("fixVersions", &[]).await? else {
            return Ok(Vec::new());
        };

        // Versions inside an issue lack the project id.
        let project_id = self.field_value("project", &[]).await?.get("id").cloned();
        items
            .into_iter()
            .map(|mut item| {
                if let (Some(obj), Some(id)) = (item.as_object_mut(), project_id.clone()) {
                    obj.entry("projectId").or_insert(id);
                }
                Version::from_value(item, &self.client)
            })
            .collect()
    }

    /// Comments in the order JIRA lists them.
    pub async fn comments(&mut self) -> Result<Vec<Comment>> {
        let value = self.field_value("comment", &[]).await?;
        let Some(list) = value.get("comments").cloned() else {
            return Ok(Vec::new());
        };
        let comments: Vec<CommentData> = crate::api::decode(list)?;
        Ok(comments
            .into_iter()
            .map(|data| Comment::from_data(data, &self.key, &self.client))
            .collect())
    }

    /// Reference one comment without loading it.
    pub fn comment(&self, id: u64) -> Comment {
        Comment::new(&self.key, id, &self.client)
    }

    pub async fn last_comment(&mut self) -> Result<Option<Comment>> {
        Ok(self.comments().await?.pop())
    }

    pub async fn reporter(&mut self) -> Result<Option<User>> {
        let value = self.field_value("reporter", &[]).await?;
        optional(value, |v| User::from_value(v, &self.client))
    }

    pub async fn assignee(&mut self) -> Result<Option<User>> {
        let value = self.field_value("assignee", &[]).await?;
        optional(value, |v| User::from_value(v, &self.client))
    }

    /// Watchers, listed on first access.
    pub fn watchers(&mut self) -> &mut WatchersList {
        let key = self.key.clone();
        let client = self.client.clone();
        self.watchers
            .get_or_insert_with(|| WatchersList::new(&key, &client))
    }

    pub async fn attachments(&mut self) -> Result<&mut Attachments> {
        let attachments = match self.attachments.take() {
            Some(attachments) => attachments,
            None => {
                let value = self.field_value("attachment", &[]).await?;
                Attachments::from_value(value, &self.key, &self.client)?
            }
        };
        Ok(self.attachments.insert(attachments))
    }

    /// Upload a file to the issue.
    pub async fn attach_file(
        &mut self,
        path: &Path,
        file_name: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<File> {
        self.attachments()
            .await?
            .attach(path, file_name, mime_type)
            .await
    }

    /// Change history. Loads the issue with its change log.
    pub async fn history(&mut self) -> Result<&History> {
        let history = match self.history.take() {
            Some(history) => history,
            None => {
                let histories = self
                    .base(&[EXPAND_CHANGELOG])
                    .await?
                    .changelog
                    .as_ref()
                    .map(|c| c.histories.clone())
                    .unwrap_or_default();
                let created = self.created().await?.ok_or_else(|| {
                    Error::issue(format!("Issue {} has no creation date", self.key))
                })?;
                let status = self.field_value("status", &[]).await?;
                let status = status
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                History::from_data(histories, &self.key, created, status, &self.client)?
            }
        };
        Ok(self.history.insert(history))
    }

    /// Time since the last status change, or since creation.
    pub async fn time_in_last_status(&mut self) -> Result<Duration> {
        Ok(self.history().await?.time_in_last_status())
    }

    /// Weekdays spent in a status.
    pub async fn workdays_in_status(&mut self, status: &str) -> Result<f64> {
        Ok(self.history().await?.workdays_in_status(status))
    }

    pub async fn links(&mut self) -> Result<&mut LinksList> {
        let links = match self.links.take() {
            Some(links) => links,
            None => {
                let value = self.field_value("issuelinks", &[]).await?;
                LinksList::from_value(value, &self.key, &self.client)?
            }
        };
        Ok(self.links.insert(links))
    }

    pub async fn sub_issues(&self) -> Result<Vec<Issue>> {
        let jql = format!("parent = '{}'", self.key);
        Self::search(&jql, &[], &[], ISSUE_SEARCH_LIMIT, 0, &self.client).await
    }

    pub async fn is_sub_issue(&mut self) -> Result<bool> {
        Ok(!self.field_value("parent", &[]).await?.is_null())
    }

    pub async fn has_sub_issues(&mut self) -> Result<bool> {
        Ok(self
            .field_value("subtasks", &[])
            .await?
            .as_array()
            .is_some_and(|tasks| !tasks.is_empty()))
    }

    pub async fn parent_issue(&mut self) -> Result<Option<Issue>> {
        let parent = self.field_value("parent", &[]).await?;
        match parent.get("key").and_then(Value::as_str) {
            Some(key) => Ok(Some(Self::by_key(key, &[], &[], &self.client).await?)),
            None => Ok(None),
        }
    }

    /// Pending update operations of one field.
    pub fn pending_update(&self, field_id: &str) -> Option<&[Value]> {
        self.pending.get(field_id).map(Vec::as_slice)
    }

    /// Every pending update, keyed by field id.
    pub fn pending_updates(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.pending
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Replace the pending update operations of a field.
    ///
    /// ```no_run
    /// # fn run(issue: &mut jira_rest::Issue) {
    /// issue.edit("labels", vec![serde_json::json!({"add": "regression"})]);
    /// # }
    /// ```
    pub fn edit(&mut self, field_id: &str, operations: Vec<Value>) -> &mut Self {
        self.pending.insert(field_id.to_string(), operations);
        self
    }

    pub(crate) fn append_edit(&mut self, field_id: &str, operations: Vec<Value>) -> &mut Self {
        self.pending
            .entry(field_id.to_string())
            .or_default()
            .extend(operations);
        self
    }

    pub fn set_summary(&mut self, summary: &str) -> &mut Self {
        self.edit("summary", vec![json!({ "set": summary })])
    }

    pub fn set_description(&mut self, description: &str) -> &mut Self {
        self.edit("description", vec![json!({ "set": description })])
    }

    /// Replace the labels. Duplicates are dropped.
    pub fn set_labels(&mut self, labels: &[&str]) -> &mut Self {
        self.edit("labels", vec![json!({ "set": dedup(labels) })])
    }

    pub fn add_labels(&mut self, labels: &[&str]) -> &mut Self {
        let ops = dedup(labels)
            .into_iter()
            .map(|label| json!({ "add": label }))
            .collect();
        self.append_edit("labels", ops)
    }

    pub fn set_priority(&mut self, priority_id: u64) -> &mut Self {
        self.edit("priority", vec![set_id(priority_id)])
    }

    pub fn set_security(&mut self, security_level_id: u64) -> &mut Self {
        self.edit("security", vec![set_id(security_level_id)])
    }

    pub fn set_resolution(&mut self, resolution_id: u64) -> &mut Self {
        self.edit("resolution", vec![set_id(resolution_id)])
    }

    pub fn set_reporter(&mut self, user_name: &str) -> &mut Self {
        self.edit("reporter", vec![json!({ "set": { "name": user_name } })])
    }

    pub fn set_assignee(&mut self, user_name: &str) -> &mut Self {
        self.edit("assignee", vec![json!({ "set": { "name": user_name } })])
    }

    /// Replace the components. Numeric values are ids, the rest names.
    pub fn set_components(&mut self, components: &[&str]) -> &mut Self {
        let refs: Vec<Value> = components.iter().map(|c| component_ref(c)).collect();
        self.edit("components", vec![json!({ "set": refs })])
    }

    pub fn add_components(&mut self, components: &[&str]) -> &mut Self {
        let ops = components
            .iter()
            .map(|c| json!({ "add": component_ref(c) }))
            .collect();
        self.append_edit("components", ops)
    }

    pub fn remove_components(&mut self, components: &[&str]) -> &mut Self {
        let ops = components
            .iter()
            .map(|c| json!({ "remove": component_ref(c) }))
            .collect();
        self.append_edit("components", ops)
    }

    fn take_updates(&mut self) -> Map<String, Value> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(field, ops)| (field, Value::Array(ops)))
            .collect()
    }

    /// Send the pending edits in one request. Does nothing without edits.
    ///
    /// # Arguments
    ///
    /// * `properties` - Entity properties to set along with the edits
    /// * `notify_users` - Whether JIRA should notify watchers
    pub async fn save(&mut self, properties: &[Value], notify_users: bool) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let update = self.take_updates();
        let result = self
            .client
            .issue()
            .edit(&self.key, &Map::new(), &update, properties, notify_users)
            .await;
        if let Err(e) = result {
            self.restore_updates(update);
            return Err(e.into());
        }

        info!(issue_key = %self.key, fields = update.len(), "Issue saved");
        self.drop_cache();
        Ok(())
    }

    fn restore_updates(&mut self, update: Map<String, Value>) {
        for (field, ops) in update {
            if let Value::Array(ops) = ops {
                self.pending.entry(field).or_insert(ops);
            }
        }
    }

    /// Perform a transition by id, sending the pending edits with it.
    ///
    /// With `safe` set, edits of fields missing on the transition screen are
    /// dropped instead of failing the request.
    pub async fn transition(&mut self, transition_id: u64, safe: bool) -> Result<()> {
        let update = self.take_updates();
        let transitions = self.client.issue().transitions();
        let result = if safe {
            transitions
                .perform_safe(&self.key, transition_id, &Map::new(), &update)
                .await
        } else {
            transitions
                .perform(&self.key, transition_id, &Map::new(), &update)
                .await
        };
        if let Err(e) = result {
            self.restore_updates(update);
            return Err(e.into());
        }

        self.drop_cache();
        Ok(())
    }

    /// Perform a transition by name, sending the pending edits with it.
    ///
    /// # Arguments
    ///
    /// * `step_name` - Transition name as shown in the UI
    /// * `same_status` - Allow a transition into the current status
    /// * `safe` - Drop edits of fields missing on the transition screen
    pub async fn step(&mut self, step_name: &str, same_status: bool, safe: bool) -> Result<()> {
        let update = self.take_updates();
        let result = self
            .client
            .issue()
            .transitions()
            .step(&self.key, step_name, &Map::new(), &update, safe, same_status)
            .await;
        if let Err(e) = result {
            self.restore_updates(update);
            return Err(e.into());
        }

        self.drop_cache();
        Ok(())
    }

    /// Post a comment.
    pub async fn add_comment(
        &mut self,
        text: &str,
        visibility: Option<&Visibility>,
    ) -> Result<Comment> {
        let data = self
            .client
            .issue()
            .comment()
            .create(&self.key, text, visibility, false)
            .await?;
        self.drop_cache();
        Ok(Comment::from_data(data, &self.key, &self.client))
    }

    /// Add a fix version and save the issue right away.
    ///
    /// # Arguments
    ///
    /// * `version_name` - Version to add
    /// * `create` - Create the version in the project when it does not exist
    ///
    /// # Errors
    ///
    /// Returns [`Error::Version`] when the project has no such version and
    /// `create` is off.
    pub async fn add_version(&mut self, version_name: &str, create: bool) -> Result<Version> {
        let mut versions_to_set = Vec::new();
        for mut added in self.fix_versions().await? {
            if added.name().await? == version_name {
                return Ok(added);
            }
            versions_to_set.push(json!({ "id": added.id().to_string() }));
        }

        let project = self.project().to_string();
        let version =
            if create && !Version::exists(&project, version_name, &self.client).await? {
                let mut version = Version::new(0, &self.client);
                version.set_project(&project).set_name(version_name);
                version.save().await?;
                version
            } else {
                Version::by_name(&project, version_name, &self.client).await?
            };

        versions_to_set.push(json!({ "id": version.id().to_string() }));
        self.edit("fixVersions", vec![json!({ "set": versions_to_set })]);
        self.save(&[], true).await?;
        Ok(version)
    }

    pub async fn delete(&self) -> Result<()> {
        self.client.issue().delete(&self.key).await?;
        Ok(())
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.loaded_value("summary").and_then(Value::as_str) {
            Some(summary) => write!(f, "[{}]: {}", self.key, summary),
            None => write!(f, "[{}]", self.key),
        }
    }
}

fn optional<T>(value: Value, wrap: impl FnOnce(Value) -> Result<T>) -> Result<Option<T>> {
    if value.is_null() {
        Ok(None)
    } else {
        wrap(value).map(Some)
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn dedup<'s>(items: &[&'s str]) -> Vec<&'s str> {
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(item) {
            unique.push(*item);
        }
    }
    unique
}

fn set_id(id: u64) -> Value {
    json!({ "set": { "id": id.to_string() } })
}

fn component_ref(component: &str) -> Value {
    if is_numeric(component) {
        json!({ "id": component })
    } else {
        json!({ "name": component })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> JiraClient {
        JiraClient::new("https://jira.example.com").unwrap()
    }

    fn data(value: Value) -> IssueData {
        serde_json::from_value(value).unwrap()
    }

    fn full_issue() -> Issue {
        Issue::from_data(
            data(json!({
                "id": "10001",
                "key": "PRJ-1",
                "self": "https://jira.example.com/rest/api/2/issue/10001",
                "fields": {
                    "summary": "Crash on start",
                    "description": "Stack trace attached",
                    "labels": ["crash", "ios"],
                    "created": "2020-01-02T10:00:00.000+0000",
                    "duedate": null,
                    "priority": null,
                    "status": {"id": "1", "name": "Open"},
                    "issuetype": {"id": "3", "name": "Bug"},
                    "parent": null,
                    "subtasks": [],
                    "components": [{"id": "10200", "name": "Backend"}],
                    "project": {"id": "10000", "key": "PRJ"},
                    "fixVersions": [{"id": "10100", "name": "1.0"}],
                    "comment": {"comments": [
                        {"id": "1", "body": "first"},
                        {"id": "2", "body": "second"}
                    ]}
                }
            })),
            &[],
            &[],
            &client(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_blank_key() {
        assert!(matches!(Issue::new("  ", &client()), Err(Error::Issue(_))));
        assert_eq!(Issue::new(" PRJ-1 ", &client()).unwrap().key(), "PRJ-1");
    }

    #[test]
    fn test_from_data_rejects_fields_with_expand() {
        let err = Issue::from_data(
            data(json!({"id": 1, "key": "PRJ-1"})),
            &["summary"],
            &["changelog"],
            &client(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Issue(_)));
    }

    #[test]
    fn test_from_data_requires_key() {
        let err = Issue::from_data(data(json!({"id": 1, "key": ""})), &[], &[], &client())
            .unwrap_err();
        assert!(matches!(err, Error::Issue(_)));
    }

    #[tokio::test]
    async fn test_partial_load_caches_listed_fields() {
        let mut issue = Issue::from_data(
            data(json!({"id": "7", "key": "PRJ-7", "self": "s", "fields": {"summary": "Short"}})),
            &["summary", "assignee"],
            &[],
            &client(),
        )
        .unwrap();

        assert_eq!(issue.id().await.unwrap(), 7);
        assert_eq!(issue.self_url().await.unwrap(), "s");
        assert_eq!(issue.summary().await.unwrap(), "Short");
        assert!(issue.assignee().await.unwrap().is_none());
        assert!(issue.is_field_loaded("assignee"));
        assert!(!issue.is_field_loaded("labels"));
    }

    #[tokio::test]
    async fn test_full_load_getters() {
        let mut issue = full_issue();
        assert_eq!(issue.to_string(), "[PRJ-1]: Crash on start");
        assert_eq!(issue.url(), "https://jira.example.com/browse/PRJ-1");
        assert_eq!(issue.project(), "PRJ");
        assert!(issue.is_in_project(&["OTHER", "PRJ"]));
        assert_eq!(issue.labels().await.unwrap(), vec!["crash", "ios"]);
        assert_eq!(issue.description().await.unwrap(), "Stack trace attached");
        assert_eq!(
            issue.created().await.unwrap().unwrap().timestamp(),
            1577959200
        );
        assert!(issue.due_date().await.unwrap().is_none());
        assert!(issue.priority().await.unwrap().is_none());
        assert_eq!(issue.status().await.unwrap().name().await.unwrap(), "Open");
        assert_eq!(issue.issue_type().await.unwrap().id(), 3);
        assert!(!issue.is_sub_issue().await.unwrap());
        assert!(!issue.has_sub_issues().await.unwrap());
    }

    #[tokio::test]
    async fn test_components_versions_and_comments() {
        let mut issue = full_issue();

        let mut components = issue.components().await.unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].project_key().await.unwrap(), "PRJ");

        let mut versions = issue.fix_versions().await.unwrap();
        assert_eq!(versions[0].project_id().await.unwrap(), 10000);

        let comments = issue.comments().await.unwrap();
        assert_eq!(comments.iter().map(Comment::id).collect::<Vec<_>>(), vec![1, 2]);
        let mut last = issue.last_comment().await.unwrap().unwrap();
        assert_eq!(last.text().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_unparseable_date_is_an_error() {
        let mut issue = Issue::from_data(
            data(json!({"id": 1, "key": "PRJ-1", "fields": {"updated": "yesterday"}})),
            &["updated"],
            &[],
            &client(),
        )
        .unwrap();
        let err = issue.updated().await.unwrap_err();
        assert!(matches!(err, Error::DateParse { .. }));
    }

    #[test]
    fn test_pending_edits_accumulate() {
        let mut issue = Issue::new("PRJ-1", &client()).unwrap();
        issue
            .set_summary("New summary")
            .add_labels(&["a", "b", "a"])
            .add_labels(&["c"])
            .add_components(&["10200", "Frontend"])
            .remove_components(&["Legacy"])
            .set_priority(2);

        assert!(issue.has_changes());
        assert_eq!(
            issue.pending_update("summary").unwrap(),
            &[json!({"set": "New summary"})]
        );
        assert_eq!(
            issue.pending_update("labels").unwrap(),
            &[json!({"add": "a"}), json!({"add": "b"}), json!({"add": "c"})]
        );
        assert_eq!(
            issue.pending_update("components").unwrap(),
            &[
                json!({"add": {"id": "10200"}}),
                json!({"add": {"name": "Frontend"}}),
                json!({"remove": {"name": "Legacy"}})
            ]
        );
        assert_eq!(
            issue.pending_update("priority").unwrap(),
            &[json!({"set": {"id": "2"}})]
        );
    }

    #[test]
    fn test_set_replaces_pending_ops() {
        let mut issue = Issue::new("PRJ-1", &client()).unwrap();
        issue.add_labels(&["old"]).set_labels(&["x", "x", "y"]);
        assert_eq!(
            issue.pending_update("labels").unwrap(),
            &[json!({"set": ["x", "y"]})]
        );

        issue.set_components(&["Backend", "42"]);
        assert_eq!(
            issue.pending_update("components").unwrap(),
            &[json!({"set": [{"name": "Backend"}, {"id": "42"}]})]
        );
    }

    #[tokio::test]
    async fn test_save_without_changes_makes_no_request() {
        let mut issue = Issue::new("PRJ-1", &client()).unwrap();
        issue.save(&[], true).await.unwrap();
    }

    #[test]
    fn test_display_without_summary() {
        let issue = Issue::new("PRJ-1", &client()).unwrap();
        assert_eq!(issue.to_string(), "[PRJ-1]");
    }
}
