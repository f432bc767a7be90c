//! `component` endpoints.

use serde_json::{Map, Value};
use tracing::{info, instrument};

use super::{decode, is_numeric, JiraClient};
use crate::api::error::Result;
use crate::api::types::ComponentData;

/// Project component endpoints.
#[derive(Debug, Clone, Copy)]
pub struct ComponentSection<'a> {
    client: &'a JiraClient,
}

impl<'a> ComponentSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// Get a component.
    pub async fn get(&self, id: u64) -> Result<ComponentData> {
        decode(self.client.raw().get(&format!("component/{}", id), &[]).await?)
    }

    /// Create a component in `project` (a key or a numeric id).
    ///
    /// # Arguments
    ///
    /// * `optional` - Extra properties, e.g. `description` or `leadUserName`
    #[instrument(skip(self, optional))]
    pub async fn create(
        &self,
        project: &str,
        name: &str,
        optional: &Map<String, Value>,
    ) -> Result<ComponentData> {
        let body = Value::Object(with_project(optional, project, name));
        let component: ComponentData = decode(self.client.raw().post("component", &body).await?)?;
        info!(component_id = component.id, "Component created");
        Ok(component)
    }

    /// Update component properties.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: u64, update: &Map<String, Value>) -> Result<ComponentData> {
        decode(
            self.client
                .raw()
                .put(&format!("component/{}", id), &Value::Object(update.clone()))
                .await?,
        )
    }

    /// Delete a component, optionally moving its issues to another one.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: u64, move_issues_to: Option<u64>) -> Result<()> {
        let mut query = Vec::new();
        if let Some(target) = move_issues_to {
            query.push(("moveIssuesTo", target.to_string()));
        }
        self.client
            .raw()
            .delete(&format!("component/{}", id), &query)
            .await?;
        info!("Component deleted");
        Ok(())
    }
}

/// Body for component and version creation: the project goes under
/// `projectId` when numeric and under `project` otherwise.
pub(crate) fn with_project(
    optional: &Map<String, Value>,
    project: &str,
    name: &str,
) -> Map<String, Value> {
    let mut body = optional.clone();
    match project.parse::<u64>() {
        Ok(id) if is_numeric(project) => {
            body.insert("projectId".to_string(), Value::from(id));
        }
        _ => {
            body.insert("project".to_string(), Value::from(project));
        }
    }
    body.insert("name".to_string(), Value::from(name));
    body
}
