//! Project components.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::debug;

use crate::api::types::ComponentData;
use crate::api::JiraClient;
use crate::error::{Error, Result};
use crate::user::User;

/// Who gets issues filed against a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssigneeType {
    /// Leave issues unassigned.
    #[default]
    Unassigned,
    /// Assign to the component lead.
    ComponentLead,
    /// Assign to the project lead.
    ProjectLead,
    /// Use the project's default assignee.
    ProjectDefault,
}

impl AssigneeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssigneeType::Unassigned => "UNASSIGNED",
            AssigneeType::ComponentLead => "COMPONENT_LEAD",
            AssigneeType::ProjectLead => "PROJECT_LEAD",
            AssigneeType::ProjectDefault => "PROJECT_DEFAULT",
        }
    }
}

impl FromStr for AssigneeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "UNASSIGNED" => Ok(AssigneeType::Unassigned),
            "COMPONENT_LEAD" => Ok(AssigneeType::ComponentLead),
            "PROJECT_LEAD" => Ok(AssigneeType::ProjectLead),
            "PROJECT_DEFAULT" => Ok(AssigneeType::ProjectDefault),
            other => Err(Error::Component(format!("Unknown assignee type '{}'", other))),
        }
    }
}

/// A project component.
///
/// Setters are kept locally until [`Component::save`]. A component with id 0
/// is new and gets created on save.
#[derive(Debug, Clone)]
pub struct Component {
    client: JiraClient,
    id: u64,
    data: Option<ComponentData>,
    project_key: Option<String>,
    update: Map<String, Value>,
}

impl Component {
    /// Reference a component by id. Id 0 starts a new component.
    pub fn new(id: u64, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id,
            data: None,
            project_key: None,
            update: Map::new(),
        }
    }

    pub fn from_data(data: ComponentData, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id: data.id,
            project_key: data.project.clone(),
            data: Some(data),
            update: Map::new(),
        }
    }

    /// Wrap an entry of an issue's `components` field. Those entries lack the
    /// project, so the issue's project key is remembered instead.
    pub(crate) fn from_issue_field(
        value: Value,
        project_key: &str,
        client: &JiraClient,
    ) -> Result<Self> {
        let mut component = Self::from_data(crate::api::decode(value)?, client);
        component.project_key = Some(project_key.to_string());
        Ok(component)
    }

    /// Load a component by id.
    pub async fn get(id: u64, client: &JiraClient) -> Result<Self> {
        let mut component = Self::new(id, client);
        component.data().await?;
        Ok(component)
    }

    /// Every component of a project.
    pub async fn for_project(project: &str, client: &JiraClient) -> Result<Vec<Self>> {
        Ok(client
            .project()
            .components(project)
            .await?
            .into_iter()
            .map(|data| Self::from_data(data, client))
            .collect())
    }

    /// Find a project component by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Component`] when the project has no such component.
    pub async fn by_name(project: &str, name: &str, client: &JiraClient) -> Result<Self> {
        client
            .project()
            .components(project)
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .map(|data| Self::from_data(data, client))
            .ok_or_else(|| {
                Error::Component(format!(
                    "Component with name '{}' not found in project '{}'",
                    name, project
                ))
            })
    }

    /// Whether a project has a component with this exact name.
    pub async fn exists(project: &str, name: &str, client: &JiraClient) -> Result<bool> {
        Ok(client
            .project()
            .components(project)
            .await?
            .iter()
            .any(|c| c.name == name))
    }

    async fn data(&mut self) -> Result<&ComponentData> {
        let data = match self.data.take() {
            Some(data) => data,
            None => self.client.component().get(self.id).await?,
        };
        Ok(self.data.insert(data))
    }

    fn drop_cache(&mut self) {
        self.data = None;
        self.project_key = None;
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The project id. Component entries inside issues lack it; the component
    /// is reloaded then.
    pub async fn project_id(&mut self) -> Result<u64> {
        if let Some(id) = self.data().await?.project_id {
            return Ok(id);
        }

        debug!(component_id = self.id, "Project id missing, reloading component");
        let project_key = self.project_key.take();
        self.drop_cache();
        let project_id = self.data().await?.project_id;
        if self.project_key.is_none() {
            self.project_key = project_key;
        }
        project_id.ok_or_else(|| {
            Error::Component(format!("Component {} has no project id", self.id))
        })
    }

    pub async fn project_key(&mut self) -> Result<String> {
        if let Some(key) = &self.project_key {
            return Ok(key.clone());
        }
        let key = self.data().await?.project.clone().unwrap_or_default();
        self.project_key = Some(key.clone());
        Ok(key)
    }

    pub async fn name(&mut self) -> Result<String> {
        Ok(self.data().await?.name.clone())
    }

    pub async fn description(&mut self) -> Result<String> {
        Ok(self.data().await?.description.clone().unwrap_or_default())
    }

    pub async fn lead(&mut self) -> Result<Option<User>> {
        let client = self.client.clone();
        self.data()
            .await?
            .lead
            .clone()
            .map(|data| User::from_data(data, &client))
            .transpose()
    }

    pub async fn assignee_type(&mut self) -> Result<AssigneeType> {
        match self.data().await?.assignee_type.as_deref() {
            Some(kind) => kind.parse(),
            None => Ok(AssigneeType::default()),
        }
    }

    pub async fn default_assignee(&mut self) -> Result<Option<User>> {
        let client = self.client.clone();
        self.data()
            .await?
            .assignee
            .clone()
            .map(|data| User::from_data(data, &client))
            .transpose()
    }

    /// Move the component to a project, given by key or numeric id.
    pub fn set_project(&mut self, project: &str) -> &mut Self {
        match project.parse::<u64>() {
            Ok(id) if crate::api::is_numeric(project) => {
                self.update.remove("project");
                self.update.insert("projectId".to_string(), Value::from(id));
            }
            _ => {
                self.update.remove("projectId");
                self.update
                    .insert("project".to_string(), Value::from(project));
            }
        }
        self
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.update.insert("name".to_string(), Value::from(name));
        self
    }

    pub fn set_description(&mut self, description: &str) -> &mut Self {
        self.update
            .insert("description".to_string(), Value::from(description));
        self
    }

    pub fn set_lead(&mut self, user_name: &str) -> &mut Self {
        self.update
            .insert("leadUserName".to_string(), Value::from(user_name));
        self
    }

    pub fn set_assignee_type(&mut self, assignee_type: AssigneeType) -> &mut Self {
        self.update.insert(
            "assigneeType".to_string(),
            Value::from(assignee_type.as_str()),
        );
        self
    }

    /// Whether there are unsaved changes.
    pub fn has_changes(&self) -> bool {
        !self.update.is_empty()
    }

    /// Send the pending changes, creating the component when it is new.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Component`] when a new component has no project or
    /// name set.
    pub async fn save(&mut self) -> Result<()> {
        let data = if self.id != 0 {
            if self.update.is_empty() {
                return Ok(());
            }
            self.client.component().update(self.id, &self.update).await?
        } else {
            let (project, name) = new_item_identity(&self.update).ok_or_else(|| {
                Error::Component(
                    "JIRA project and component name are required for new component creation"
                        .to_string(),
                )
            })?;
            self.client
                .component()
                .create(&project, &name, &self.update)
                .await?
        };

        self.id = data.id;
        self.update.clear();
        self.drop_cache();
        self.project_key = data.project.clone();
        self.data = Some(data);
        Ok(())
    }

    /// Delete the component, optionally moving its issues to another one.
    pub async fn delete(&self, move_issues_to: Option<u64>) -> Result<()> {
        if self.id == 0 {
            return Ok(());
        }
        self.client
            .component()
            .delete(self.id, move_issues_to)
            .await?;
        Ok(())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) => write!(f, "{}", data.name),
            None => write!(f, "component {}", self.id),
        }
    }
}

/// Project reference and name of a component or version about to be created.
pub(crate) fn new_item_identity(update: &Map<String, Value>) -> Option<(String, String)> {
    let project = match update.get("projectId").or_else(|| update.get("project"))? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    let name = update.get("name")?.as_str()?.to_string();
    Some((project, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> JiraClient {
        JiraClient::new("https://jira.example.com").unwrap()
    }

    #[test]
    fn test_assignee_type_round_trip() {
        for kind in [
            AssigneeType::Unassigned,
            AssigneeType::ComponentLead,
            AssigneeType::ProjectLead,
            AssigneeType::ProjectDefault,
        ] {
            assert_eq!(kind.as_str().parse::<AssigneeType>().unwrap(), kind);
        }
        assert!("SOMEONE".parse::<AssigneeType>().is_err());
    }

    #[test]
    fn test_set_project_replaces_reference() {
        let mut component = Component::new(0, &client());
        component.set_project("PRJ").set_name("Backend");
        component.set_project("10000");
        assert_eq!(
            Value::Object(component.update.clone()),
            json!({"projectId": 10000, "name": "Backend"})
        );
    }

    #[test]
    fn test_new_item_identity() {
        let mut update = Map::new();
        assert!(new_item_identity(&update).is_none());
        update.insert("project".to_string(), json!("PRJ"));
        assert!(new_item_identity(&update).is_none());
        update.insert("name".to_string(), json!("Backend"));
        assert_eq!(
            new_item_identity(&update),
            Some(("PRJ".to_string(), "Backend".to_string()))
        );
    }

    #[tokio::test]
    async fn test_save_new_without_name_fails() {
        let mut component = Component::new(0, &client());
        component.set_project("PRJ");
        let err = component.save().await.unwrap_err();
        assert!(matches!(err, Error::Component(_)));
    }

    #[tokio::test]
    async fn test_issue_field_entry_knows_project() {
        let mut component = Component::from_issue_field(
            json!({"id": "10100", "name": "Backend"}),
            "PRJ",
            &client(),
        )
        .unwrap();
        assert_eq!(component.project_key().await.unwrap(), "PRJ");
        assert_eq!(component.name().await.unwrap(), "Backend");
        assert_eq!(
            component.assignee_type().await.unwrap(),
            AssigneeType::Unassigned
        );
    }
}
