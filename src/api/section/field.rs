//! `field` endpoints: the instance's system and custom field definitions.

use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use super::catalog::names_match;
use super::{decode, JiraClient};
use crate::api::cache::lock;
use crate::api::error::{ApiError, Result};
use crate::api::types::FieldData;

/// Field definition endpoints. The list is cached per client.
#[derive(Debug, Clone, Copy)]
pub struct FieldSection<'a> {
    client: &'a JiraClient,
}

impl<'a> FieldSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// Create a custom field. Drops the cached field list.
    ///
    /// # Arguments
    ///
    /// * `field_type` - Custom field type key
    /// * `extra` - Additional properties, e.g. `searcherKey`
    #[instrument(skip(self, extra))]
    pub async fn create(
        &self,
        name: &str,
        description: &str,
        field_type: &str,
        extra: &Map<String, Value>,
    ) -> Result<()> {
        let mut body = json!({
            "name": name,
            "description": description,
            "type": field_type,
        });
        for (key, value) in extra {
            body[key] = value.clone();
        }

        self.client.raw().post("field", &body).await?;
        *lock(&self.client.caches().fields) = None;
        info!("Field created");
        Ok(())
    }

    /// List every field.
    pub async fn list(&self, reload: bool) -> Result<Vec<FieldData>> {
        if !reload {
            if let Some(fields) = lock(&self.client.caches().fields).as_ref() {
                return Ok(fields.clone());
            }
        }

        let fields: Vec<FieldData> = decode(self.client.raw().get("field", &[]).await?)?;
        *lock(&self.client.caches().fields) = Some(fields.clone());
        Ok(fields)
    }

    /// List JIRA's built-in fields.
    pub async fn list_system(&self, reload: bool) -> Result<Vec<FieldData>> {
        Ok(self
            .list(reload)
            .await?
            .into_iter()
            .filter(|f| !f.custom)
            .collect())
    }

    /// List custom fields.
    pub async fn list_custom(&self, reload: bool) -> Result<Vec<FieldData>> {
        Ok(self
            .list(reload)
            .await?
            .into_iter()
            .filter(|f| f.custom)
            .collect())
    }

    /// Get a field by id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when no field has that id.
    pub async fn get(&self, id: &str, reload: bool) -> Result<FieldData> {
        self.list(reload)
            .await?
            .into_iter()
            .find(|f| f.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Field with ID '{}' not found in JIRA", id)))
    }

    /// Find fields by display name. Several fields may share a name.
    pub async fn search(
        &self,
        name: &str,
        case_sensitive: bool,
        reload: bool,
    ) -> Result<Vec<FieldData>> {
        Ok(self
            .list(reload)
            .await?
            .into_iter()
            .filter(|f| names_match(&f.name, name, case_sensitive))
            .collect())
    }
}
