//! Issue comments.

use chrono::{DateTime, Utc};

use crate::api::types::{parse_datetime, CommentData, Visibility};
use crate::api::JiraClient;
use crate::error::Result;
use crate::user::User;

/// A comment on an issue, loaded on first access.
#[derive(Debug, Clone)]
pub struct Comment {
    client: JiraClient,
    issue_key: String,
    id: u64,
    data: Option<CommentData>,
}

impl Comment {
    /// Reference a comment without loading it.
    pub fn new(issue_key: &str, id: u64, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            issue_key: issue_key.to_string(),
            id,
            data: None,
        }
    }

    pub fn from_data(data: CommentData, issue_key: &str, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            issue_key: issue_key.to_string(),
            id: data.id,
            data: Some(data),
        }
    }

    /// Load a comment.
    pub async fn get(issue_key: &str, id: u64, client: &JiraClient) -> Result<Self> {
        let mut comment = Self::new(issue_key, id, client);
        comment.data(false).await?;
        Ok(comment)
    }

    async fn data(&mut self, expand_rendered: bool) -> Result<&CommentData> {
        let data = match self.data.take() {
            Some(data) => data,
            None => {
                self.client
                    .issue()
                    .comment()
                    .get(&self.issue_key, self.id, expand_rendered)
                    .await?
            }
        };
        Ok(self.data.insert(data))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn issue_key(&self) -> &str {
        &self.issue_key
    }

    /// The comment body as plain text. Rich-text bodies are flattened.
    pub async fn text(&mut self) -> Result<String> {
        Ok(self.data(false).await?.text())
    }

    /// The HTML-rendered body. Reloads the comment when it was loaded
    /// without rendering.
    pub async fn rendered(&mut self) -> Result<String> {
        if self
            .data
            .as_ref()
            .is_some_and(|d| d.rendered_body.is_none())
        {
            self.data = None;
        }
        Ok(self
            .data(true)
            .await?
            .rendered_body
            .clone()
            .unwrap_or_default())
    }

    pub async fn created(&mut self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .data(false)
            .await?
            .created
            .as_deref()
            .and_then(parse_datetime))
    }

    pub async fn updated(&mut self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .data(false)
            .await?
            .updated
            .as_deref()
            .and_then(parse_datetime))
    }

    pub async fn author(&mut self) -> Result<Option<User>> {
        let client = self.client.clone();
        self.data(false)
            .await?
            .author
            .clone()
            .map(|data| User::from_data(data, &client))
            .transpose()
    }

    /// The user who edited the comment last.
    pub async fn update_author(&mut self) -> Result<Option<User>> {
        let client = self.client.clone();
        self.data(false)
            .await?
            .update_author
            .clone()
            .map(|data| User::from_data(data, &client))
            .transpose()
    }

    /// Whether the plain-text body contains `text`.
    pub async fn contains(&mut self, text: &str) -> Result<bool> {
        Ok(self.text().await?.contains(text))
    }

    /// Replace the comment text and visibility.
    pub async fn update(&mut self, text: &str, visibility: Option<&Visibility>) -> Result<()> {
        let data = self
            .client
            .issue()
            .comment()
            .update(&self.issue_key, self.id, text, visibility, false)
            .await?;
        self.data = Some(data);
        Ok(())
    }

    pub async fn delete(&self) -> Result<()> {
        self.client
            .issue()
            .comment()
            .delete(&self.issue_key, self.id)
            .await?;
        Ok(())
    }
}
