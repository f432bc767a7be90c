//! Building new issues.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::Issue;
use crate::api::types::{format_date, FieldMeta, IssueTypeData};
use crate::api::{is_numeric, ApiError, CreateIssueRequest, JiraClient};
use crate::component::Component;
use crate::error::{Error, Result};

/// What the create screen says about one field.
#[derive(Debug, Clone, PartialEq)]
struct FieldInfo {
    id: String,
    kind: String,
    limited_values: bool,
    /// Only known for custom string and string-list fields.
    allowed_values: Option<Vec<String>>,
    custom: bool,
}

impl FieldInfo {
    fn from_meta(id: &str, meta: &FieldMeta) -> Self {
        let custom = is_custom_field(id);
        let kind = meta.schema.kind.clone();
        let limited_values = meta.allowed_values.is_some();

        let string_values = kind == "string"
            || (kind == "array" && meta.schema.items.as_deref() == Some("string"));
        let allowed_values = match &meta.allowed_values {
            Some(values) if custom && string_values => Some(
                values
                    .iter()
                    .filter_map(|v| v.get("value").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect(),
            ),
            _ => None,
        };

        Self {
            id: id.to_string(),
            kind,
            limited_values,
            allowed_values,
            custom,
        }
    }

    fn allows(&self, values: &[String]) -> bool {
        match &self.allowed_values {
            Some(allowed) => values.iter().all(|v| allowed.contains(v)),
            None => true,
        }
    }
}

fn is_custom_field(id: &str) -> bool {
    id.strip_prefix("customfield_").is_some_and(is_numeric)
}

/// A new issue, sent to JIRA with [`CreateRequest::send`].
///
/// Fields are addressed by the names shown on the create screen; custom
/// fields can be addressed by id too.
///
/// ```no_run
/// # async fn run(client: jira_rest::JiraClient) -> jira_rest::Result<()> {
/// let mut request = jira_rest::CreateRequest::new("PRJ", "Bug", &client).await?;
/// request
///     .set_summary("Crash on start")
///     .set_description("Steps to reproduce...")?
///     .add_labels(&["crash"]);
/// request.set_priority("Critical").await?;
/// let issue = request.send().await?;
/// println!("Created {}", issue.key());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CreateRequest {
    client: JiraClient,
    issue_type: IssueTypeData,
    fields: Map<String, Value>,
    available_fields: BTreeMap<String, FieldInfo>,
    components: Vec<u64>,
    labels: BTreeSet<String>,
}

impl CreateRequest {
    /// Start a new issue and load the create screen.
    ///
    /// # Arguments
    ///
    /// * `project_key` - Project to create the issue in
    /// * `issue_type` - Issue type id (numeric) or name
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownIssueType`] when there is no such issue type.
    pub async fn new(project_key: &str, issue_type: &str, client: &JiraClient) -> Result<Self> {
        let project_key = project_key.trim();
        let issue_type = resolve_issue_type(issue_type, project_key, client).await?;

        let mut fields = Map::new();
        fields.insert("project".to_string(), json!({ "key": project_key }));
        fields.insert(
            "issuetype".to_string(),
            json!({ "id": issue_type.id.to_string() }),
        );

        let mut request = Self {
            client: client.clone(),
            issue_type,
            fields,
            available_fields: BTreeMap::new(),
            components: Vec::new(),
            labels: BTreeSet::new(),
        };
        request.load_available_fields().await?;
        Ok(request)
    }

    async fn load_available_fields(&mut self) -> Result<()> {
        let type_id = self.issue_type.id.to_string();
        let projects = self
            .client
            .issue()
            .create_meta(&[self.project()], &[&type_id], true)
            .await?;
        let fields = projects
            .into_iter()
            .next()
            .and_then(|p| p.issuetypes.into_iter().next())
            .map(|t| t.fields)
            .unwrap_or_default();

        for (id, meta) in &fields {
            let info = FieldInfo::from_meta(id, meta);
            if info.custom {
                self.available_fields.insert(id.clone(), info.clone());
            }
            self.available_fields.insert(meta.name.clone(), info);
        }
        debug!(
            project = %self.project(),
            issue_type = %self.issue_type.name,
            fields = fields.len(),
            "Create screen loaded"
        );
        Ok(())
    }

    pub fn project(&self) -> &str {
        self.fields
            .get("project")
            .and_then(|p| p.get("key"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn issue_type_id(&self) -> u64 {
        self.issue_type.id
    }

    pub fn issue_type_name(&self) -> &str {
        &self.issue_type.name
    }

    /// Field values collected so far, keyed by field id.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Whether the create screen has a field with this name or custom id.
    pub fn has_field(&self, field: &str) -> bool {
        self.available_fields.contains_key(field)
    }

    pub fn summary(&self) -> &str {
        self.fields
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn set_summary(&mut self, summary: &str) -> &mut Self {
        self.fields.insert("summary".to_string(), json!(summary));
        self
    }

    pub fn set_description(&mut self, description: &str) -> Result<&mut Self> {
        self.set_field_value("Description", json!(description.trim()), false)
    }

    pub fn set_assignee(&mut self, user_name: &str) -> Result<&mut Self> {
        self.set_field_value("Assignee", json!({ "name": user_name.trim() }), false)
    }

    /// Make the new issue a sub-task of `parent_key`.
    pub fn set_parent_issue(&mut self, parent_key: &str) -> Result<&mut Self> {
        self.set_field_value("Parent", json!({ "key": parent_key }), false)
    }

    pub fn set_labels(&mut self, labels: &[&str]) -> Result<&mut Self> {
        self.set_field_value("Labels", json!(labels), false)
    }

    pub fn set_security_level(&mut self, level_id: u64) -> Result<&mut Self> {
        self.set_field_value(
            "Security Level",
            json!({ "id": level_id.to_string() }),
            false,
        )
    }

    pub fn set_due_date(&mut self, date: NaiveDate) -> Result<&mut Self> {
        self.set_date_field("Due Date", date)
    }

    /// Set the priority by id (numeric) or name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPriority`] when there is no such priority.
    pub async fn set_priority(&mut self, priority: &str) -> Result<&mut Self> {
        let section = self.client.priority();
        let found = if is_numeric(priority) {
            match section.get(priority.parse().unwrap_or_default(), false).await {
                Ok(data) => Some(data),
                Err(e) if e.status() == Some(404) => None,
                Err(e) => return Err(e.into()),
            }
        } else {
            section.search_by_name(priority, true, false).await?
        };

        let Some(found) = found else {
            return Err(Error::UnknownPriority(priority.to_string()));
        };
        self.set_field_value("Priority", json!({ "id": found.id.to_string() }), false)
    }

    /// Set a field by create-screen name, or by id for custom fields.
    ///
    /// Custom fields with a fixed list of values are checked against it and
    /// wrapped the way JIRA expects: `{"value": ...}` for single values, a
    /// list of those for multi-value fields. Other values are sent as given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] when the create screen has no such
    /// field and `skip_unknown` is off, and [`Error::UnknownFieldValue`]
    /// when the value is not allowed.
    pub fn set_field_value(
        &mut self,
        field: &str,
        value: Value,
        skip_unknown: bool,
    ) -> Result<&mut Self> {
        let Some(info) = self.available_fields.get(field) else {
            if skip_unknown {
                return Ok(self);
            }
            return Err(Error::UnknownField {
                field: field.to_string(),
                issue_type: self.issue_type.name.clone(),
                project: self.project().to_string(),
            });
        };

        let to_send = if info.custom && info.limited_values {
            let values: Vec<String> = match &value {
                Value::Array(items) => items.iter().map(value_text).collect(),
                other => vec![value_text(other)],
            };
            if !info.allows(&values) {
                return Err(Error::UnknownFieldValue {
                    field: field.to_string(),
                    value: values.join(", "),
                });
            }

            if info.kind == "array" {
                Value::Array(values.iter().map(|v| json!({ "value": v })).collect())
            } else {
                json!({ "value": value })
            }
        } else {
            value
        };

        let id = info.id.clone();
        self.fields.insert(id, to_send);
        Ok(self)
    }

    /// Set a date field as `YYYY-MM-DD`.
    pub fn set_date_field(&mut self, field: &str, date: NaiveDate) -> Result<&mut Self> {
        self.set_field_value(field, json!(format_date(date)), false)
    }

    /// Add components by id (numeric) or name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownComponent`] when the project has no such
    /// component.
    pub async fn add_components(&mut self, components: &[&str]) -> Result<&mut Self> {
        for component in components {
            let id = self.resolve_component(component.trim()).await?;
            if !self.components.contains(&id) {
                self.components.push(id);
            }
        }
        Ok(self)
    }

    async fn resolve_component(&self, component: &str) -> Result<u64> {
        let unknown = || Error::UnknownComponent {
            component: component.to_string(),
            project: self.project().to_string(),
        };

        if is_numeric(component) {
            let id = component.parse().map_err(|_| unknown())?;
            match Component::get(id, &self.client).await {
                Ok(found) => Ok(found.id()),
                Err(Error::Api(e)) if e.status() == Some(404) => Err(unknown()),
                Err(e) => Err(e),
            }
        } else {
            match Component::by_name(self.project(), component, &self.client).await {
                Ok(found) => Ok(found.id()),
                Err(Error::Component(_)) => Err(unknown()),
                Err(e) => Err(e),
            }
        }
    }

    pub fn add_labels(&mut self, labels: &[&str]) -> &mut Self {
        self.labels.extend(labels.iter().map(|l| l.to_string()));
        self
    }

    /// Create the issue.
    ///
    /// Components and labels go out only when some were added; projects
    /// without those fields on the create screen reject them otherwise.
    pub async fn send(&self) -> Result<Issue> {
        let mut fields = self.fields.clone();
        if !self.components.is_empty() {
            let components: Vec<Value> = self
                .components
                .iter()
                .map(|id| json!({ "id": id.to_string() }))
                .collect();
            fields.insert("components".to_string(), Value::Array(components));
        }
        if !self.labels.is_empty() {
            fields.insert("labels".to_string(), json!(self.labels));
        }

        let request = CreateIssueRequest {
            fields,
            ..Default::default()
        };
        let created = self.client.issue().create(&request).await?;
        info!(issue_key = %created.key, project = %self.project(), "New issue created");

        let data = crate::api::types::IssueData {
            id: created.id,
            key: created.key,
            self_url: created.self_url,
            ..Default::default()
        };
        Issue::from_data(data, &["id", "key", "self"], &[], &self.client)
    }
}

async fn resolve_issue_type(
    issue_type: &str,
    project_key: &str,
    client: &JiraClient,
) -> Result<IssueTypeData> {
    let section = client.issue_type();
    let found = if is_numeric(issue_type) {
        let id = issue_type.parse().unwrap_or_default();
        match section.get(id, false).await {
            Ok(data) => Some(data),
            Err(ApiError::NotFound(_)) => None,
            Err(e) if e.status() == Some(404) => None,
            Err(e) => return Err(e.into()),
        }
    } else {
        section.search_by_name(issue_type, true, false).await?
    };

    found.ok_or_else(|| Error::UnknownIssueType {
        issue_type: issue_type.to_string(),
        project: project_key.to_string(),
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(value: Value) -> FieldMeta {
        serde_json::from_value(value).unwrap()
    }

    fn request(fields: &[(&str, Value)]) -> CreateRequest {
        let mut project = Map::new();
        project.insert("project".to_string(), json!({"key": "PRJ"}));
        let mut request = CreateRequest {
            client: JiraClient::new("https://jira.example.com").unwrap(),
            issue_type: IssueTypeData {
                id: 1,
                name: "Bug".to_string(),
                ..Default::default()
            },
            fields: project,
            available_fields: BTreeMap::new(),
            components: Vec::new(),
            labels: BTreeSet::new(),
        };
        for (id, value) in fields {
            let meta = meta(value.clone());
            let info = FieldInfo::from_meta(id, &meta);
            if info.custom {
                request.available_fields.insert(id.to_string(), info.clone());
            }
            request.available_fields.insert(meta.name.clone(), info);
        }
        request
    }

    fn sample() -> CreateRequest {
        request(&[
            ("description", json!({"name": "Description", "schema": {"type": "string"}})),
            (
                "customfield_10010",
                json!({
                    "name": "Severity",
                    "schema": {"type": "string", "custom": "select"},
                    "allowedValues": [{"value": "High"}, {"value": "Low"}]
                }),
            ),
            (
                "customfield_10020",
                json!({
                    "name": "Platforms",
                    "schema": {"type": "array", "items": "string"},
                    "allowedValues": [{"value": "iOS"}, {"value": "Android"}]
                }),
            ),
            (
                "customfield_10030",
                json!({"name": "Story Points", "schema": {"type": "number"}}),
            ),
        ])
    }

    #[test]
    fn test_custom_field_detection() {
        assert!(is_custom_field("customfield_10010"));
        assert!(!is_custom_field("customfield_"));
        assert!(!is_custom_field("summary"));
    }

    #[test]
    fn test_system_field_sent_as_is() {
        let mut request = sample();
        request.set_description("  Steps  ").unwrap();
        assert_eq!(request.fields()["description"], json!("Steps"));
    }

    #[test]
    fn test_custom_field_by_name_and_id() {
        let mut request = sample();
        request
            .set_field_value("Story Points", json!(3), false)
            .unwrap();
        assert_eq!(request.fields()["customfield_10030"], json!(3));

        request
            .set_field_value("customfield_10030", json!(5), false)
            .unwrap();
        assert_eq!(request.fields()["customfield_10030"], json!(5));
    }

    #[test]
    fn test_unknown_field() {
        let mut request = sample();
        let err = request
            .set_field_value("Sprint", json!(1), false)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
        assert!(request.set_field_value("Sprint", json!(1), true).is_ok());
        assert!(!request.fields().contains_key("Sprint"));
    }

    #[test]
    fn test_limited_values_are_checked_and_wrapped() {
        let mut request = sample();
        let err = request
            .set_field_value("Severity", json!("Blocker"), false)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownFieldValue { .. }));

        request
            .set_field_value("Severity", json!("High"), false)
            .unwrap();
        assert_eq!(request.fields()["customfield_10010"], json!({"value": "High"}));

        request
            .set_field_value("Platforms", json!(["iOS", "Android"]), false)
            .unwrap();
        assert_eq!(
            request.fields()["customfield_10020"],
            json!([{"value": "iOS"}, {"value": "Android"}])
        );
    }

    #[test]
    fn test_date_field() {
        let mut request = request(&[(
            "duedate",
            json!({"name": "Due Date", "schema": {"type": "date"}}),
        )]);
        request
            .set_due_date(NaiveDate::from_ymd_opt(2021, 3, 4).unwrap())
            .unwrap();
        assert_eq!(request.fields()["duedate"], json!("2021-03-04"));
    }

    #[test]
    fn test_summary_and_project() {
        let mut request = sample();
        request.set_summary("Crash");
        assert_eq!(request.summary(), "Crash");
        assert_eq!(request.project(), "PRJ");
        assert_eq!(request.issue_type_name(), "Bug");
    }
}
