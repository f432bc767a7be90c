//! Attachment endpoints, both issue-scoped and global.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{decode, segment, JiraClient};
use crate::api::cache::lock;
use crate::api::error::{ApiError, Result};
use crate::api::types::AttachmentData;

#[derive(Deserialize)]
struct AttachmentFields {
    #[serde(default)]
    attachment: Vec<AttachmentData>,
}

#[derive(Deserialize)]
struct IssueAttachments {
    id: String,
    key: String,
    #[serde(default = "empty_fields")]
    fields: AttachmentFields,
}

fn empty_fields() -> AttachmentFields {
    AttachmentFields {
        attachment: Vec::new(),
    }
}

/// Attachments of one issue. Lists are cached by issue key and id.
#[derive(Debug, Clone, Copy)]
pub struct IssueAttachmentSection<'a> {
    client: &'a JiraClient,
}

impl<'a> IssueAttachmentSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// List files attached to an issue.
    pub async fn list(&self, issue_key: &str, reload: bool) -> Result<Vec<AttachmentData>> {
        if !reload {
            if let Some(cached) = lock(&self.client.caches().attachments).get(issue_key) {
                return Ok(cached.clone());
            }
        }

        let value = self
            .client
            .raw()
            .get(
                &format!("issue/{}", segment(issue_key)),
                &[("fields", "id,key,attachment".to_string())],
            )
            .await?;
        let info: IssueAttachments = decode(value)?;
        let files = info.fields.attachment;

        let mut cache = lock(&self.client.caches().attachments);
        cache.insert(info.key, files.clone());
        cache.insert(info.id, files.clone());
        Ok(files)
    }

    /// Upload a file to an issue.
    ///
    /// # Arguments
    ///
    /// * `path` - Local file to upload
    /// * `file_name` - Name to show in JIRA, defaults to the file's own name
    /// * `mime_type` - Content type, guessed from the extension when `None`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the upload fails.
    #[instrument(skip(self), fields(issue_key = %issue_key))]
    pub async fn create(
        &self,
        issue_key: &str,
        path: &Path,
        file_name: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<AttachmentData> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::File {
            path: path.display().to_string(),
            source,
        })?;

        let name = file_name
            .map(str::to_string)
            .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "attachment".to_string());
        let mime = match mime_type {
            Some(mime) => mime.to_string(),
            None => mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };
        debug!(file_name = %name, mime = %mime, size = bytes.len(), "Uploading attachment");

        let part = Part::bytes(bytes).file_name(name).mime_str(&mime)?;
        let form = Form::new().part("file", part);

        let value = self
            .client
            .raw()
            .multipart(&format!("issue/{}/attachments", segment(issue_key)), form)
            .await?;
        let created: Vec<AttachmentData> = decode(value)?;

        // Lists are cached under both the key and the numeric id.
        lock(&self.client.caches().attachments).clear();

        let attachment = created
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Decode("attachment upload returned no files".to_string()))?;
        info!(attachment_id = attachment.id, "Attachment uploaded");
        Ok(attachment)
    }

    /// Get one attachment of an issue.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the issue has no such attachment.
    pub async fn get(&self, issue_key: &str, id: u64, reload: bool) -> Result<AttachmentData> {
        self.list(issue_key, reload)
            .await?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "Attachment with ID {} not found in issue {}",
                    id, issue_key
                ))
            })
    }
}

/// Global attachment endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentSection<'a> {
    client: &'a JiraClient,
}

impl<'a> AttachmentSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// Get attachment metadata by id.
    pub async fn get(&self, id: u64) -> Result<AttachmentData> {
        decode(
            self.client
                .raw()
                .get(&format!("attachment/{}", id), &[])
                .await?,
        )
    }

    /// Delete an attachment.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<()> {
        self.client
            .raw()
            .delete(&format!("attachment/{}", id), &[])
            .await?;
        lock(&self.client.caches().attachments).clear();
        info!(attachment_id = id, "Attachment deleted");
        Ok(())
    }
}
