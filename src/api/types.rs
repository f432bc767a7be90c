//! JIRA REST API request and response types.
//!
//! These types model JIRA payloads as they come over the wire. Issue fields
//! stay a JSON map because their shape depends on the instance's field
//! configuration; the domain layer interprets them lazily.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Timestamp format used by JIRA, e.g. `2018-06-19T12:53:31.000+0000`.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Date format used by date-only fields, e.g. `2018-06-19`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a JIRA timestamp or a plain date (taken as midnight UTC).
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(value, DATETIME_FORMAT) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Format a date the way JIRA date fields expect it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// JIRA sends numeric identifiers as strings; accept both.
pub(crate) fn de_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid id {}", n))),
        Value::String(s) => s
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id '{}'", s))),
        other => Err(serde::de::Error::custom(format!("invalid id {}", other))),
    }
}

pub(crate) fn de_opt_id<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_u64()),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid id '{}'", s))),
        Some(other) => Err(serde::de::Error::custom(format!("invalid id {}", other))),
    }
}

fn default_true() -> bool {
    true
}

/// Avatar URLs for a user or project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvatarUrls {
    /// 48x48 pixel avatar.
    #[serde(rename = "48x48")]
    pub size_48: Option<String>,
    /// 24x24 pixel avatar.
    #[serde(rename = "24x24")]
    pub size_24: Option<String>,
    /// 16x16 pixel avatar.
    #[serde(rename = "16x16")]
    pub size_16: Option<String>,
    /// 32x32 pixel avatar.
    #[serde(rename = "32x32")]
    pub size_32: Option<String>,
}

/// A JIRA user.
///
/// Server instances identify users by `name`, cloud instances by
/// `accountId`; either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub avatar_urls: Option<AvatarUrls>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
    /// Present only when requested with `expand=groups`.
    #[serde(default)]
    pub groups: Option<UserGroups>,
}

impl UserData {
    /// The identifier used in API calls: `name`, falling back to `accountId`.
    pub fn login(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.account_id.as_deref())
    }
}

impl fmt::Display for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .display_name
            .as_deref()
            .or(self.login())
            .unwrap_or("Unknown");
        write!(f, "{}", name)
    }
}

/// Group membership list attached to a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserGroups {
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub items: Vec<GroupData>,
}

/// A JIRA group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupData {
    pub name: String,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// One page of `GET group/member`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMembersPage {
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default = "default_true")]
    pub is_last: bool,
    #[serde(default)]
    pub values: Vec<UserData>,
}

/// Watchers of an issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchersData {
    #[serde(default)]
    pub watch_count: u32,
    #[serde(default)]
    pub is_watching: bool,
    #[serde(default)]
    pub watchers: Vec<UserData>,
}

/// Search result from a JQL query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub issues: Vec<IssueData>,
}

/// A raw JIRA issue payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub key: String,
    #[serde(default, rename = "self")]
    pub self_url: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub rendered_fields: Option<Map<String, Value>>,
    /// Field ID to display name, present with `expand=names`.
    #[serde(default)]
    pub names: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub changelog: Option<ChangelogData>,
    #[serde(default)]
    pub transitions: Option<Vec<TransitionData>>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl IssueData {
    /// Get a field value from the payload.
    pub fn field(&self, id: &str) -> Option<&Value> {
        self.fields.get(id)
    }
}

/// Response of `POST issue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedIssue {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub key: String,
    #[serde(default, rename = "self")]
    pub self_url: String,
}

/// Issue status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
    #[serde(default)]
    pub status_category: Option<StatusCategoryData>,
}

impl fmt::Display for StatusData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Status category (groups statuses into to-do, in-progress, done).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCategoryData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub color_name: Option<String>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// Issue type (Bug, Story, Task, Epic, etc.).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTypeData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub subtask: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

impl fmt::Display for IssueTypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Issue priority.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub status_color: Option<String>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

impl fmt::Display for PriorityData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Issue resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// Issue security level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityLevelData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// A JIRA project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lead: Option<UserData>,
    #[serde(default)]
    pub avatar_urls: Option<AvatarUrls>,
    #[serde(default)]
    pub components: Vec<ComponentData>,
    #[serde(default)]
    pub versions: Vec<VersionData>,
    #[serde(default)]
    pub issue_types: Vec<IssueTypeData>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// Statuses available for one issue type of a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIssueTypeStatuses {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub subtask: bool,
    #[serde(default)]
    pub statuses: Vec<StatusData>,
}

/// A project component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Project key.
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub lead: Option<UserData>,
    #[serde(default)]
    pub assignee_type: Option<String>,
    #[serde(default)]
    pub assignee: Option<UserData>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// A project version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub released: bool,
    #[serde(default)]
    pub overdue: Option<bool>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// A comment on a JIRA issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    /// Plain text on v2 APIs, an Atlassian document on v3.
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub rendered_body: Option<String>,
    #[serde(default)]
    pub author: Option<UserData>,
    #[serde(default)]
    pub update_author: Option<UserData>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

impl CommentData {
    /// The comment body as plain text.
    pub fn text(&self) -> String {
        body_to_text(&self.body)
    }
}

/// Restricts who can see a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    /// `group` or `role`.
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Visibility {
    /// Visible only to members of a group.
    pub fn group(name: &str) -> Self {
        Self {
            kind: "group".to_string(),
            value: name.to_string(),
        }
    }

    /// Visible only to a project role.
    pub fn role(name: &str) -> Self {
        Self {
            kind: "role".to_string(),
            value: name.to_string(),
        }
    }
}

/// Comments page from `GET issue/{key}/comment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsPage {
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub comments: Vec<CommentData>,
}

/// An attached file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub filename: String,
    #[serde(default)]
    pub author: Option<UserData>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// A workflow transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    pub to: StatusData,
    #[serde(default)]
    pub has_screen: bool,
    /// Fields on the transition screen, present with `expand=transitions.fields`.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldMeta>,
}

/// Field schema description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub custom: Option<String>,
    #[serde(default)]
    pub custom_id: Option<u64>,
}

/// Field metadata from edit, create or transition screens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub schema: FieldSchema,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default)]
    pub has_default_value: bool,
}

/// Field description from `GET field`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldData {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    pub name: String,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub orderable: bool,
    #[serde(default)]
    pub navigable: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub clause_names: Vec<String>,
    #[serde(default)]
    pub schema: Option<FieldSchema>,
}

/// Create-screen metadata for one project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetaProject {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuetypes: Vec<CreateMetaIssueType>,
}

/// Create-screen metadata for one issue type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMetaIssueType {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub subtask: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldMeta>,
}

/// Issue link type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkTypeData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub inward: String,
    #[serde(default)]
    pub outward: String,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// Issue link. Inside the `issuelinks` field only the far side is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueLinkData {
    #[serde(deserialize_with = "de_id")]
    pub id: u64,
    #[serde(rename = "type")]
    pub link_type: LinkTypeData,
    #[serde(default)]
    pub inward_issue: Option<IssueData>,
    #[serde(default)]
    pub outward_issue: Option<IssueData>,
    #[serde(default, rename = "self")]
    pub self_url: Option<String>,
}

/// Issue change log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogData {
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub histories: Vec<HistoryData>,
}

/// One change log entry: a set of field changes made at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryData {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<u64>,
    #[serde(default)]
    pub author: Option<UserData>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub items: Vec<HistoryItemData>,
}

/// One changed field inside a change log entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItemData {
    pub field: String,
    #[serde(default)]
    pub fieldtype: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub from_string: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default, rename = "toString")]
    pub to_string: Option<String>,
}

/// One JQL auto-complete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JqlSuggestion {
    pub value: String,
    #[serde(default)]
    pub display_name: String,
}

/// Render a text body (plain string or Atlassian document) as plain text.
pub fn body_to_text(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_json::from_value::<AtlassianDoc>(other.clone())
            .map(|doc| doc.to_plain_text())
            .unwrap_or_default(),
    }
}

/// Atlassian Document Format (ADF) content.
///
/// Cloud instances on API v3 use ADF for rich text fields like descriptions
/// and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlassianDoc {
    /// The document type (always "doc" for root documents).
    #[serde(rename = "type")]
    pub doc_type: String,
    /// The document version (typically 1).
    #[serde(default)]
    pub version: Option<u32>,
    /// The content nodes within the document.
    #[serde(default)]
    pub content: Vec<Value>,
}

impl AtlassianDoc {
    /// Convert ADF content to plain text.
    pub fn to_plain_text(&self) -> String {
        let mut result = String::new();
        for node in &self.content {
            Self::extract_text(node, &mut result);
        }
        result.trim().to_string()
    }

    fn extract_children(obj: &Map<String, Value>, result: &mut String) {
        if let Some(Value::Array(items)) = obj.get("content") {
            for item in items {
                Self::extract_text(item, result);
            }
        }
    }

    fn extract_text(node: &Value, result: &mut String) {
        let obj = match node {
            Value::Object(obj) => obj,
            Value::Array(items) => {
                for item in items {
                    Self::extract_text(item, result);
                }
                return;
            }
            _ => return,
        };

        let attr = |name: &str| {
            obj.get("attrs")
                .and_then(|a| a.get(name))
                .and_then(Value::as_str)
        };

        match obj.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = obj.get("text").and_then(Value::as_str) {
                    result.push_str(text);
                }
            }
            Some("paragraph") | Some("heading") | Some("codeBlock") => {
                Self::extract_children(obj, result);
                if !result.ends_with('\n') && !result.is_empty() {
                    result.push('\n');
                }
            }
            Some("hardBreak") => result.push('\n'),
            Some("listItem") => {
                result.push_str("• ");
                Self::extract_children(obj, result);
            }
            Some("blockquote") => {
                result.push_str("> ");
                Self::extract_children(obj, result);
            }
            Some("mention") => {
                if let Some(text) = attr("text") {
                    result.push('@');
                    result.push_str(text.trim_start_matches('@'));
                }
            }
            Some("emoji") => {
                if let Some(shortname) = attr("shortName") {
                    result.push_str(shortname);
                }
            }
            Some("inlineCard") | Some("mediaGroup") | Some("mediaSingle") => {}
            _ => Self::extract_children(obj, result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_datetime_jira_format() {
        let dt = parse_datetime("2018-06-19T12:53:31.000+0000").unwrap();
        assert_eq!(dt.timestamp(), 1529412811);
    }

    #[test]
    fn test_parse_datetime_with_offset() {
        let dt = parse_datetime("2018-06-19T15:53:31.000+0300").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2018, 6, 19, 12, 53, 31).unwrap());
    }

    #[test]
    fn test_parse_datetime_plain_date() {
        let dt = parse_datetime("2018-06-19").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2018, 6, 19, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_datetime_garbage() {
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn test_ids_accept_strings_and_numbers() {
        let status: StatusData =
            serde_json::from_value(json!({"id": "10001", "name": "Open"})).unwrap();
        assert_eq!(status.id, 10001);

        let status: StatusData = serde_json::from_value(json!({"id": 3, "name": "Done"})).unwrap();
        assert_eq!(status.id, 3);
    }

    #[test]
    fn test_user_login_falls_back_to_account_id() {
        let user: UserData =
            serde_json::from_value(json!({"accountId": "5b10a2844c20165700ede21g"})).unwrap();
        assert_eq!(user.login(), Some("5b10a2844c20165700ede21g"));

        let user: UserData = serde_json::from_value(json!({"name": "jdoe"})).unwrap();
        assert_eq!(user.login(), Some("jdoe"));
        assert!(user.active);
    }

    #[test]
    fn test_issue_data_parsing() {
        let json = r#"{
            "id": "10002",
            "key": "PROJ-2",
            "self": "https://jira.example.com/rest/api/2/issue/10002",
            "fields": {"summary": "Broken build", "labels": ["ci"]},
            "names": {"summary": "Summary", "labels": "Labels"}
        }"#;

        let issue: IssueData = serde_json::from_str(json).unwrap();
        assert_eq!(issue.id, 10002);
        assert_eq!(issue.key, "PROJ-2");
        assert_eq!(issue.field("summary"), Some(&json!("Broken build")));
        assert_eq!(issue.names.unwrap()["labels"], "Labels");
    }

    #[test]
    fn test_version_dates_parse() {
        let version: VersionData = serde_json::from_value(json!({
            "id": "10100",
            "name": "1.2.0",
            "projectId": 10000,
            "released": true,
            "releaseDate": "2020-02-01"
        }))
        .unwrap();
        assert_eq!(version.project_id, Some(10000));
        assert_eq!(version.release_date, NaiveDate::from_ymd_opt(2020, 2, 1));
        assert!(!version.archived);
    }

    #[test]
    fn test_history_item_strings() {
        let item: HistoryItemData = serde_json::from_value(json!({
            "field": "status",
            "fieldtype": "jira",
            "from": "1",
            "fromString": "Open",
            "to": "3",
            "toString": "In Progress"
        }))
        .unwrap();
        assert_eq!(item.from_string.as_deref(), Some("Open"));
        assert_eq!(item.to_string.as_deref(), Some("In Progress"));
    }

    #[test]
    fn test_body_to_text_plain_string() {
        assert_eq!(body_to_text(&json!("hello")), "hello");
        assert_eq!(body_to_text(&Value::Null), "");
    }

    #[test]
    fn test_atlassian_doc_multiple_paragraphs() {
        let json = r#"{
            "type": "doc",
            "version": 1,
            "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "First paragraph."}]},
                {"type": "paragraph", "content": [{"type": "text", "text": "Second paragraph."}]}
            ]
        }"#;

        let doc: AtlassianDoc = serde_json::from_str(json).unwrap();
        assert_eq!(doc.to_plain_text(), "First paragraph.\nSecond paragraph.");
    }

    #[test]
    fn test_atlassian_doc_mention_and_list() {
        let body = json!({
            "type": "doc",
            "version": 1,
            "content": [
                {"type": "bulletList", "content": [
                    {"type": "listItem", "content": [
                        {"type": "paragraph", "content": [
                            {"type": "mention", "attrs": {"text": "@Jane"}},
                            {"type": "text", "text": " please check"}
                        ]}
                    ]}
                ]}
            ]
        });
        assert_eq!(body_to_text(&body), "• @Jane please check");
    }
}
