//! Files attached to issues.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::api::types::{parse_datetime, AttachmentData};
use crate::api::JiraClient;
use crate::error::{Error, Result};
use crate::user::User;

/// An attached file.
#[derive(Debug, Clone)]
pub struct File {
    client: JiraClient,
    id: u64,
    data: Option<AttachmentData>,
}

impl File {
    pub fn new(id: u64, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id,
            data: None,
        }
    }

    pub fn from_data(data: AttachmentData, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id: data.id,
            data: Some(data),
        }
    }

    async fn data(&mut self) -> Result<&AttachmentData> {
        let data = match self.data.take() {
            Some(data) => data,
            None => self.client.attachment().get(self.id).await?,
        };
        Ok(self.data.insert(data))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn name(&mut self) -> Result<String> {
        Ok(self.data().await?.filename.clone())
    }

    /// Size in bytes.
    pub async fn size(&mut self) -> Result<u64> {
        Ok(self.data().await?.size)
    }

    pub async fn mime_type(&mut self) -> Result<String> {
        Ok(self.data().await?.mime_type.clone().unwrap_or_default())
    }

    /// Download link of the file contents.
    pub async fn content_link(&mut self) -> Result<String> {
        Ok(self.data().await?.content.clone().unwrap_or_default())
    }

    /// Thumbnail link. Only images have thumbnails.
    pub async fn thumbnail_link(&mut self) -> Result<Option<String>> {
        Ok(self.data().await?.thumbnail.clone())
    }

    pub async fn created(&mut self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .data()
            .await?
            .created
            .as_deref()
            .and_then(parse_datetime))
    }

    pub async fn author(&mut self) -> Result<Option<User>> {
        let client = self.client.clone();
        self.data()
            .await?
            .author
            .clone()
            .map(|data| User::from_data(data, &client))
            .transpose()
    }

    pub async fn delete(&self) -> Result<()> {
        self.client.attachment().delete(self.id).await?;
        Ok(())
    }
}

/// The files attached to one issue.
#[derive(Debug, Clone)]
pub struct Attachments {
    client: JiraClient,
    issue_key: String,
    files: Option<Vec<File>>,
}

impl Attachments {
    /// Attachments of an issue, listed on first access.
    pub fn new(issue_key: &str, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            issue_key: issue_key.to_string(),
            files: None,
        }
    }

    /// Wrap the `attachment` field of an issue.
    pub(crate) fn from_value(
        value: serde_json::Value,
        issue_key: &str,
        client: &JiraClient,
    ) -> Result<Self> {
        let files: Vec<AttachmentData> = if value.is_null() {
            Vec::new()
        } else {
            crate::api::decode(value)?
        };
        Ok(Self {
            client: client.clone(),
            issue_key: issue_key.to_string(),
            files: Some(
                files
                    .into_iter()
                    .map(|data| File::from_data(data, client))
                    .collect(),
            ),
        })
    }

    pub fn issue_key(&self) -> &str {
        &self.issue_key
    }

    pub async fn files(&mut self) -> Result<&mut Vec<File>> {
        let files = match self.files.take() {
            Some(files) => files,
            None => self
                .client
                .issue()
                .attachment()
                .list(&self.issue_key, false)
                .await?
                .into_iter()
                .map(|data| File::from_data(data, &self.client))
                .collect(),
        };
        Ok(self.files.insert(files))
    }

    /// Upload a file.
    ///
    /// # Arguments
    ///
    /// * `path` - Local file to upload
    /// * `file_name` - Name to show in JIRA, defaults to the file's own name
    /// * `mime_type` - Content type, guessed from the extension when `None`
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] without a request when `path` does not
    /// exist.
    pub async fn attach(
        &mut self,
        path: &Path,
        file_name: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<File> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }

        let data = self
            .client
            .issue()
            .attachment()
            .create(&self.issue_key, path, file_name, mime_type)
            .await?;
        let file = File::from_data(data, &self.client);
        if let Some(files) = self.files.as_mut() {
            files.push(file.clone());
        }
        debug!(issue_key = %self.issue_key, file_id = file.id(), "File attached");
        Ok(file)
    }
}
