//! Catalog objects referenced by issues: issue type, status, status category,
//! priority, resolution and security level.
//!
//! Each is a [`CatalogRef`] that knows its id and loads the rest from the
//! client's catalog cache on first access.

use crate::api::types::{
    IssueTypeData, PriorityData, ResolutionData, SecurityLevelData, StatusCategoryData,
    StatusData,
};
use crate::api::{decode, CatalogItem, CatalogSection, JiraClient};
use crate::error::Result;

/// A lazily loaded catalog object.
#[derive(Debug, Clone)]
pub struct CatalogRef<T> {
    client: JiraClient,
    id: u64,
    data: Option<T>,
}

/// An issue type, e.g. `Bug`.
pub type IssueType = CatalogRef<IssueTypeData>;
/// An issue status, e.g. `In Progress`.
pub type Status = CatalogRef<StatusData>;
/// The category a status belongs to.
pub type StatusCategory = CatalogRef<StatusCategoryData>;
/// An issue priority.
pub type Priority = CatalogRef<PriorityData>;
/// An issue resolution.
pub type Resolution = CatalogRef<ResolutionData>;
/// An issue security level.
pub type SecurityLevel = CatalogRef<SecurityLevelData>;

impl<T: CatalogItem> CatalogRef<T> {
    /// Reference an object by id without loading it.
    pub fn new(id: u64, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id,
            data: None,
        }
    }

    /// Wrap an already loaded payload.
    pub fn from_data(data: T, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id: data.id(),
            data: Some(data),
        }
    }

    /// Wrap the JSON value of an issue field.
    pub(crate) fn from_value(value: serde_json::Value, client: &JiraClient) -> Result<Self> {
        Ok(Self::from_data(decode(value)?, client))
    }

    /// Load an object by id.
    pub async fn get(id: u64, client: &JiraClient) -> Result<Self> {
        let mut instance = Self::new(id, client);
        instance.data().await?;
        Ok(instance)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The full payload, loaded on first use.
    pub async fn data(&mut self) -> Result<&T> {
        let data = match self.data.take() {
            Some(data) => data,
            None => {
                CatalogSection::<T>::new(&self.client)
                    .get(self.id, false)
                    .await?
            }
        };
        Ok(self.data.insert(data))
    }

    pub async fn name(&mut self) -> Result<String> {
        Ok(self.data().await?.name().to_string())
    }
}

impl CatalogRef<IssueTypeData> {
    pub async fn description(&mut self) -> Result<String> {
        Ok(self.data().await?.description.clone().unwrap_or_default())
    }

    pub async fn is_subtask(&mut self) -> Result<bool> {
        Ok(self.data().await?.subtask)
    }

    pub async fn icon_url(&mut self) -> Result<String> {
        Ok(self.data().await?.icon_url.clone().unwrap_or_default())
    }

    pub async fn self_url(&mut self) -> Result<String> {
        Ok(self.data().await?.self_url.clone().unwrap_or_default())
    }
}

impl CatalogRef<StatusData> {
    pub async fn description(&mut self) -> Result<String> {
        Ok(self.data().await?.description.clone().unwrap_or_default())
    }

    pub async fn icon_url(&mut self) -> Result<String> {
        Ok(self.data().await?.icon_url.clone().unwrap_or_default())
    }

    pub async fn self_url(&mut self) -> Result<String> {
        Ok(self.data().await?.self_url.clone().unwrap_or_default())
    }

    /// The status category, if JIRA sent one with the status.
    pub async fn status_category(&mut self) -> Result<Option<StatusCategory>> {
        let client = self.client.clone();
        Ok(self
            .data()
            .await?
            .status_category
            .clone()
            .map(|category| StatusCategory::from_data(category, &client)))
    }
}

impl CatalogRef<StatusCategoryData> {
    /// Machine name, e.g. `done`.
    pub async fn key(&mut self) -> Result<String> {
        Ok(self.data().await?.key.clone())
    }

    /// Colour name, e.g. `blue-gray`.
    pub async fn color_name(&mut self) -> Result<String> {
        Ok(self.data().await?.color_name.clone().unwrap_or_default())
    }

    pub async fn self_url(&mut self) -> Result<String> {
        Ok(self.data().await?.self_url.clone().unwrap_or_default())
    }
}

impl CatalogRef<PriorityData> {
    pub async fn description(&mut self) -> Result<String> {
        Ok(self.data().await?.description.clone().unwrap_or_default())
    }

    pub async fn icon_url(&mut self) -> Result<String> {
        Ok(self.data().await?.icon_url.clone().unwrap_or_default())
    }

    /// Colour used to display the priority, e.g. `#cc0000`.
    pub async fn status_color(&mut self) -> Result<String> {
        Ok(self.data().await?.status_color.clone().unwrap_or_default())
    }

    pub async fn self_url(&mut self) -> Result<String> {
        Ok(self.data().await?.self_url.clone().unwrap_or_default())
    }
}

impl CatalogRef<ResolutionData> {
    pub async fn description(&mut self) -> Result<String> {
        Ok(self.data().await?.description.clone().unwrap_or_default())
    }

    pub async fn self_url(&mut self) -> Result<String> {
        Ok(self.data().await?.self_url.clone().unwrap_or_default())
    }
}

impl CatalogRef<SecurityLevelData> {
    pub async fn description(&mut self) -> Result<String> {
        Ok(self.data().await?.description.clone().unwrap_or_default())
    }

    pub async fn self_url(&mut self) -> Result<String> {
        Ok(self.data().await?.self_url.clone().unwrap_or_default())
    }
}
