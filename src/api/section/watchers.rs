//! `issue/{key}/watchers` endpoints.

use serde_json::Value;
use tracing::{info, instrument};

use super::{decode, segment, JiraClient};
use crate::api::error::Result;
use crate::api::types::{UserData, WatchersData};

/// Issue watchers endpoints.
#[derive(Debug, Clone, Copy)]
pub struct WatchersSection<'a> {
    client: &'a JiraClient,
}

impl<'a> WatchersSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// List users watching an issue.
    pub async fn list(&self, issue_key: &str) -> Result<Vec<UserData>> {
        let value = self
            .client
            .raw()
            .get(&format!("issue/{}/watchers", segment(issue_key)), &[])
            .await?;
        if value.get("watchers").is_none() {
            return Ok(Vec::new());
        }
        Ok(decode::<WatchersData>(value)?.watchers)
    }

    /// Start watching: the body is the bare JSON string login.
    #[instrument(skip(self), fields(issue_key = %issue_key))]
    pub async fn add(&self, issue_key: &str, login: &str) -> Result<()> {
        self.client
            .raw()
            .post(
                &format!("issue/{}/watchers", segment(issue_key)),
                &Value::String(login.to_string()),
            )
            .await?;
        info!(login, "Watcher added");
        Ok(())
    }

    /// Stop a user watching an issue.
    #[instrument(skip(self), fields(issue_key = %issue_key))]
    pub async fn remove(&self, issue_key: &str, login: &str) -> Result<()> {
        self.client
            .raw()
            .delete(
                &format!("issue/{}/watchers", segment(issue_key)),
                &[("username", login.to_string())],
            )
            .await?;
        info!(login, "Watcher removed");
        Ok(())
    }
}
