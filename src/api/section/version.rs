//! `version` endpoints.

use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use super::component::with_project;
use super::{decode, JiraClient};
use crate::api::error::Result;
use crate::api::types::VersionData;

/// Where [`VersionSection::move_version`] puts a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPosition {
    /// An absolute position: `First`, `Last`, `Earlier` or `Later`.
    Position(String),
    /// Right after the version at this URL.
    After(String),
}

/// Project version endpoints.
#[derive(Debug, Clone, Copy)]
pub struct VersionSection<'a> {
    client: &'a JiraClient,
}

impl<'a> VersionSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// Get a version.
    pub async fn get(&self, id: u64) -> Result<VersionData> {
        decode(self.client.raw().get(&format!("version/{}", id), &[]).await?)
    }

    /// Create a version in `project` (a key or a numeric id).
    ///
    /// # Arguments
    ///
    /// * `optional` - Extra properties, e.g. `releaseDate` or `released`
    #[instrument(skip(self, optional))]
    pub async fn create(
        &self,
        project: &str,
        name: &str,
        optional: &Map<String, Value>,
    ) -> Result<VersionData> {
        let body = Value::Object(with_project(optional, project, name));
        let version: VersionData = decode(self.client.raw().post("version", &body).await?)?;
        info!(version_id = version.id, "Version created");
        Ok(version)
    }

    /// Update version properties.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: u64, update: &Map<String, Value>) -> Result<VersionData> {
        decode(
            self.client
                .raw()
                .put(&format!("version/{}", id), &Value::Object(update.clone()))
                .await?,
        )
    }

    /// Delete a version.
    ///
    /// # Arguments
    ///
    /// * `move_fixed_to` - Version that takes over `Fix Version/s` references
    /// * `move_affected_to` - Version that takes over `Affects Version/s` references
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        id: u64,
        move_fixed_to: Option<&str>,
        move_affected_to: Option<&str>,
    ) -> Result<()> {
        let mut query = Vec::new();
        if let Some(target) = move_fixed_to.filter(|t| !t.is_empty()) {
            query.push(("moveFixIssuesTo", target.to_string()));
        }
        if let Some(target) = move_affected_to.filter(|t| !t.is_empty()) {
            query.push(("moveAffectedIssuesTo", target.to_string()));
        }
        self.client
            .raw()
            .delete(&format!("version/{}", id), &query)
            .await?;
        info!("Version deleted");
        Ok(())
    }

    /// Reorder a version within its project.
    #[instrument(skip(self))]
    pub async fn move_version(&self, id: u64, position: &VersionPosition) -> Result<VersionData> {
        let body = match position {
            VersionPosition::Position(position) => json!({ "position": position }),
            VersionPosition::After(after) => json!({ "after": after }),
        };
        decode(
            self.client
                .raw()
                .post(&format!("version/{}/move", id), &body)
                .await?,
        )
    }
}
