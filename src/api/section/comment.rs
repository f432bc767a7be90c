//! `issue/{key}/comment` endpoints.

use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{decode, segment, JiraClient};
use crate::api::error::Result;
use crate::api::types::{CommentData, CommentsPage, Visibility};

/// Issue comment endpoints.
#[derive(Debug, Clone, Copy)]
pub struct CommentSection<'a> {
    client: &'a JiraClient,
}

impl<'a> CommentSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// List comments of an issue.
    ///
    /// # Arguments
    ///
    /// * `start_at` - Index of the first comment
    /// * `max_results` - Page size, `None` for the server default
    /// * `order_by` - Sort field, e.g. `-created`; empty for the default order
    /// * `expand_rendered` - Also load the HTML-rendered bodies
    pub async fn list(
        &self,
        issue_key: &str,
        start_at: u32,
        max_results: Option<u32>,
        order_by: &str,
        expand_rendered: bool,
    ) -> Result<Vec<CommentData>> {
        let mut query = vec![("startAt", start_at.to_string())];
        if let Some(max) = max_results {
            query.push(("maxResults", max.to_string()));
        }
        if !order_by.is_empty() {
            query.push(("orderBy", order_by.to_string()));
        }
        if expand_rendered {
            query.push(("expand", "renderedBody".to_string()));
        }

        let value = self
            .client
            .raw()
            .get(&format!("issue/{}/comment", segment(issue_key)), &query)
            .await?;
        Ok(decode::<CommentsPage>(value)?.comments)
    }

    /// Get one comment.
    pub async fn get(&self, issue_key: &str, id: u64, expand_rendered: bool) -> Result<CommentData> {
        let query = expand_query(expand_rendered);
        let value = self
            .client
            .raw()
            .get(&format!("issue/{}/comment/{}", segment(issue_key), id), &query)
            .await?;
        decode(value)
    }

    /// Add a comment to an issue.
    #[instrument(skip(self, text, visibility), fields(issue_key = %issue_key))]
    pub async fn create(
        &self,
        issue_key: &str,
        text: &str,
        visibility: Option<&Visibility>,
        expand_rendered: bool,
    ) -> Result<CommentData> {
        let body = comment_body(text, visibility, expand_rendered);
        let value = self
            .client
            .raw()
            .post(&format!("issue/{}/comment", segment(issue_key)), &body)
            .await?;
        info!("Comment added");
        decode(value)
    }

    /// Replace the text (and visibility) of a comment.
    #[instrument(skip(self, text, visibility), fields(issue_key = %issue_key))]
    pub async fn update(
        &self,
        issue_key: &str,
        id: u64,
        text: &str,
        visibility: Option<&Visibility>,
        expand_rendered: bool,
    ) -> Result<CommentData> {
        let body = comment_body(text, visibility, expand_rendered);
        let value = self
            .client
            .raw()
            .put(&format!("issue/{}/comment/{}", segment(issue_key), id), &body)
            .await?;
        info!(comment_id = id, "Comment updated");
        decode(value)
    }

    /// Delete a comment.
    #[instrument(skip(self), fields(issue_key = %issue_key))]
    pub async fn delete(&self, issue_key: &str, id: u64) -> Result<()> {
        self.client
            .raw()
            .delete(&format!("issue/{}/comment/{}", segment(issue_key), id), &[])
            .await?;
        info!(comment_id = id, "Comment deleted");
        Ok(())
    }
}

fn expand_query(expand_rendered: bool) -> Vec<(&'static str, String)> {
    if expand_rendered {
        vec![("expand", "renderedBody".to_string())]
    } else {
        Vec::new()
    }
}

fn comment_body(text: &str, visibility: Option<&Visibility>, expand_rendered: bool) -> Value {
    let mut body = json!({ "body": text });
    if let Some(visibility) = visibility {
        body["visibility"] = json!(visibility);
    }
    if expand_rendered {
        body["expand"] = json!("renderedBody");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_body_plain() {
        assert_eq!(comment_body("hi", None, false), json!({"body": "hi"}));
    }

    #[test]
    fn test_comment_body_with_visibility() {
        let visibility = Visibility::group("developers");
        assert_eq!(
            comment_body("secret", Some(&visibility), true),
            json!({
                "body": "secret",
                "visibility": {"type": "group", "value": "developers"},
                "expand": "renderedBody"
            })
        );
    }
}
