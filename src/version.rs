//! Project versions.

use std::fmt;

use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use tracing::info;

use crate::api::types::{format_date, VersionData};
use crate::api::JiraClient;
use crate::component::new_item_identity;
use crate::error::{Error, Result};

/// A project version (release).
///
/// Setters are kept locally until [`Version::save`]. A version with id 0 is
/// new and gets created on save.
#[derive(Debug, Clone)]
pub struct Version {
    client: JiraClient,
    id: u64,
    data: Option<VersionData>,
    project_key: Option<String>,
    update: Map<String, Value>,
}

impl Version {
    /// Reference a version by id. Id 0 starts a new version.
    pub fn new(id: u64, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id,
            data: None,
            project_key: None,
            update: Map::new(),
        }
    }

    pub fn from_data(data: VersionData, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id: data.id,
            data: Some(data),
            project_key: None,
            update: Map::new(),
        }
    }

    pub(crate) fn from_value(value: Value, client: &JiraClient) -> Result<Self> {
        Ok(Self::from_data(crate::api::decode(value)?, client))
    }

    /// Load a version by id.
    pub async fn get(id: u64, client: &JiraClient) -> Result<Self> {
        let mut version = Self::new(id, client);
        version.data().await?;
        Ok(version)
    }

    /// Every version of a project.
    pub async fn for_project(project: &str, client: &JiraClient) -> Result<Vec<Self>> {
        Ok(client
            .project()
            .versions(project)
            .await?
            .into_iter()
            .map(|data| Self::from_data(data, client))
            .collect())
    }

    /// Find a project version by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Version`] when the project has no such version.
    pub async fn by_name(project: &str, name: &str, client: &JiraClient) -> Result<Self> {
        client
            .project()
            .versions(project)
            .await?
            .into_iter()
            .find(|v| v.name == name)
            .map(|data| Self::from_data(data, client))
            .ok_or_else(|| {
                Error::Version(format!(
                    "Version with name '{}' not found in project '{}'",
                    name, project
                ))
            })
    }

    /// Whether a project has a version with this exact name.
    pub async fn exists(project: &str, name: &str, client: &JiraClient) -> Result<bool> {
        Ok(client
            .project()
            .versions(project)
            .await?
            .iter()
            .any(|v| v.name == name))
    }

    async fn data(&mut self) -> Result<&VersionData> {
        let data = match self.data.take() {
            Some(data) => data,
            None => self.client.version().get(self.id).await?,
        };
        Ok(self.data.insert(data))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn project_id(&mut self) -> Result<u64> {
        let id = self.id;
        self.data()
            .await?
            .project_id
            .ok_or_else(|| Error::Version(format!("Version {} has no project id", id)))
    }

    /// The project key, looked up through the project endpoint.
    pub async fn project_key(&mut self) -> Result<String> {
        if let Some(key) = &self.project_key {
            return Ok(key.clone());
        }
        let project_id = self.project_id().await?;
        let project = self
            .client
            .project()
            .get(&project_id.to_string(), &[])
            .await?;
        self.project_key = Some(project.key.clone());
        Ok(project.key)
    }

    pub async fn name(&mut self) -> Result<String> {
        Ok(self.data().await?.name.clone())
    }

    pub async fn description(&mut self) -> Result<String> {
        Ok(self.data().await?.description.clone().unwrap_or_default())
    }

    pub async fn start_date(&mut self) -> Result<Option<NaiveDate>> {
        Ok(self.data().await?.start_date)
    }

    pub async fn release_date(&mut self) -> Result<Option<NaiveDate>> {
        Ok(self.data().await?.release_date)
    }

    pub async fn is_archived(&mut self) -> Result<bool> {
        Ok(self.data().await?.archived)
    }

    pub async fn is_released(&mut self) -> Result<bool> {
        Ok(self.data().await?.released)
    }

    pub async fn is_overdue(&mut self) -> Result<bool> {
        Ok(self.data().await?.overdue.unwrap_or(false))
    }

    /// Move the version to a project, given by key or numeric id.
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

    /// Set or clear (`None`) the start date.
    pub fn set_start_date(&mut self, date: Option<NaiveDate>) -> &mut Self {
        self.update.insert(
            "startDate".to_string(),
            Value::from(date.map(format_date).unwrap_or_default()),
        );
        self
    }

    /// Set or clear (`None`) the release date.
    pub fn set_release_date(&mut self, date: Option<NaiveDate>) -> &mut Self {
        self.update.insert(
            "releaseDate".to_string(),
            Value::from(date.map(format_date).unwrap_or_default()),
        );
        self
    }

    pub fn set_archived(&mut self, archived: bool) -> &mut Self {
        self.update
            .insert("archived".to_string(), Value::Bool(archived));
        self
    }

    pub fn set_released(&mut self, released: bool) -> &mut Self {
        self.update
            .insert("released".to_string(), Value::Bool(released));
        self
    }

    /// Whether there are unsaved changes.
    pub fn has_changes(&self) -> bool {
        !self.update.is_empty()
    }

    /// Send the pending changes, creating the version when it is new.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Version`] when a new version has no project or name
    /// set.
    pub async fn save(&mut self) -> Result<()> {
        let data = if self.id != 0 {
            if self.update.is_empty() {
                return Ok(());
            }
            self.client.version().update(self.id, &self.update).await?
        } else {
            let (project, name) = new_item_identity(&self.update).ok_or_else(|| {
                Error::Version(
                    "JIRA project and version name are required for new version creation"
                        .to_string(),
                )
            })?;
            self.client
                .version()
                .create(&project, &name, &self.update)
                .await?
        };

        self.id = data.id;
        self.update.clear();
        self.project_key = None;
        self.data = Some(data);
        Ok(())
    }

    /// Delete the version.
    ///
    /// # Arguments
    ///
    /// * `move_fixed_to` - Version id that takes over `Fix Version/s` references
    /// * `move_affected_to` - Version id that takes over `Affects Version/s` references
    pub async fn delete(
        &self,
        move_fixed_to: Option<&str>,
        move_affected_to: Option<&str>,
    ) -> Result<()> {
        if self.id == 0 {
            return Ok(());
        }
        self.client
            .version()
            .delete(self.id, move_fixed_to, move_affected_to)
            .await?;
        Ok(())
    }

    /// Mark the version released today. Does nothing if already released.
    pub async fn release(&mut self) -> Result<()> {
        if self.is_released().await? {
            return Ok(());
        }
        self.set_released(true)
            .set_release_date(Some(Utc::now().date_naive()));
        self.save().await?;
        info!(version_id = self.id, "Version released");
        Ok(())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) => write!(f, "{}", data.name),
            None => write!(f, "version {}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> JiraClient {
        JiraClient::new("https://jira.example.com").unwrap()
    }

    #[test]
    fn test_setters_accumulate() {
        let mut version = Version::new(0, &client());
        version
            .set_project("PRJ")
            .set_name("2.0")
            .set_release_date(NaiveDate::from_ymd_opt(2024, 3, 1))
            .set_start_date(None)
            .set_released(false);
        assert_eq!(
            Value::Object(version.update.clone()),
            json!({
                "project": "PRJ",
                "name": "2.0",
                "releaseDate": "2024-03-01",
                "startDate": "",
                "released": false
            })
        );
    }

    #[tokio::test]
    async fn test_save_new_requires_project_and_name() {
        let mut version = Version::new(0, &client());
        version.set_name("2.0");
        let err = version.save().await.unwrap_err();
        assert!(matches!(err, Error::Version(_)));
    }

    #[tokio::test]
    async fn test_save_without_changes_is_noop() {
        let mut version =
            Version::from_value(json!({"id": "10100", "name": "1.0"}), &client()).unwrap();
        version.save().await.unwrap();
        assert_eq!(version.to_string(), "1.0");
    }

    #[tokio::test]
    async fn test_loaded_flags() {
        let mut version = Version::from_value(
            json!({"id": 7, "name": "1.0", "released": true, "projectId": "10000"}),
            &client(),
        )
        .unwrap();
        assert!(version.is_released().await.unwrap());
        assert!(!version.is_archived().await.unwrap());
        assert!(!version.is_overdue().await.unwrap());
        assert_eq!(version.project_id().await.unwrap(), 10000);
        // Already released: no request is made.
        version.release().await.unwrap();
    }
}
