//! `issueLink` endpoints.

use serde_json::{json, Value};
use tracing::{info, instrument};

use super::catalog::names_match;
use super::{decode, segment, JiraClient};
use crate::api::error::Result;
use crate::api::types::{IssueLinkData, Visibility};

/// Issue link endpoints.
#[derive(Debug, Clone, Copy)]
pub struct IssueLinkSection<'a> {
    client: &'a JiraClient,
}

impl<'a> IssueLinkSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// Link two issues.
    ///
    /// # Arguments
    ///
    /// * `link_type` - Link type name, e.g. `Blocks`
    /// * `comment` - Comment added to the outward issue; empty for none
    /// * `visibility` - Visibility of that comment
    #[instrument(skip(self, comment, visibility))]
    pub async fn create(
        &self,
        link_type: &str,
        outward_issue: &str,
        inward_issue: &str,
        comment: &str,
        visibility: Option<&Visibility>,
    ) -> Result<()> {
        let mut body = json!({
            "type": { "name": link_type },
            "outwardIssue": { "key": outward_issue },
            "inwardIssue": { "key": inward_issue },
        });
        if !comment.is_empty() {
            let mut comment = json!({ "body": comment });
            if let Some(visibility) = visibility {
                comment["visibility"] = json!(visibility);
            }
            body["comment"] = comment;
        }

        self.client.raw().post("issueLink", &body).await?;
        info!("Issue link created");
        Ok(())
    }

    /// Get a link.
    pub async fn get(&self, id: u64) -> Result<IssueLinkData> {
        decode(self.client.raw().get(&format!("issueLink/{}", id), &[]).await?)
    }

    /// Delete a link.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<()> {
        self.client
            .raw()
            .delete(&format!("issueLink/{}", id), &[])
            .await?;
        info!("Issue link deleted");
        Ok(())
    }

    /// List the links of an issue.
    ///
    /// A non-empty `link_type` keeps only links whose type name, inward or
    /// outward description equals it.
    pub async fn list_for_issue(
        &self,
        issue_key: &str,
        link_type: &str,
        case_sensitive: bool,
    ) -> Result<Vec<IssueLinkData>> {
        let issue = self
            .client
            .raw()
            .get(
                &format!("issue/{}", segment(issue_key)),
                &[("fields", "issuelinks".to_string())],
            )
            .await?;
        let links = issue
            .pointer("/fields/issuelinks")
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        let links: Vec<IssueLinkData> = decode(links)?;

        if link_type.is_empty() {
            return Ok(links);
        }
        Ok(links
            .into_iter()
            .filter(|link| {
                let kind = &link.link_type;
                [&kind.name, &kind.inward, &kind.outward]
                    .iter()
                    .any(|candidate| names_match(candidate, link_type, case_sensitive))
            })
            .collect())
    }
}
