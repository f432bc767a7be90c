//! Issue watchers.

use tracing::info;

use crate::api::JiraClient;
use crate::error::Result;
use crate::user::User;
use crate::users_list::UsersList;

/// The watchers of one issue. Changes go to JIRA immediately.
#[derive(Debug, Clone)]
pub struct WatchersList {
    client: JiraClient,
    issue_key: String,
    users: UsersList,
    loaded: bool,
}

impl WatchersList {
    /// Watchers of an issue, listed on first access.
    pub fn new(issue_key: &str, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            issue_key: issue_key.to_string(),
            users: UsersList::new(),
            loaded: false,
        }
    }

    pub fn issue_key(&self) -> &str {
        &self.issue_key
    }

    async fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        let watchers = self
            .client
            .issue()
            .watchers()
            .list(&self.issue_key)
            .await?;
        for data in watchers {
            self.users.add(User::from_data(data, &self.client)?);
        }
        self.loaded = true;
        Ok(())
    }

    /// Current watchers.
    pub async fn users(&mut self) -> Result<&UsersList> {
        self.load().await?;
        Ok(&self.users)
    }

    pub async fn has_name(&mut self, name: &str) -> Result<bool> {
        Ok(self.users().await?.has_name(name))
    }

    /// Make users watch the issue.
    pub async fn add(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            let user = User::new(name, &self.client);
            user.watch_issue(&self.issue_key, true).await?;
            self.users.add(user);
        }
        Ok(())
    }

    /// Make users stop watching the issue.
    pub async fn remove(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            User::new(name, &self.client)
                .watch_issue(&self.issue_key, false)
                .await?;
            self.users.remove(name);
        }
        Ok(())
    }

    /// Remove every watcher.
    pub async fn clear(&mut self) -> Result<()> {
        self.load().await?;
        for user in self.users.users() {
            user.watch_issue(&self.issue_key, false).await?;
        }
        info!(issue_key = %self.issue_key, count = self.users.len(), "Watchers cleared");
        self.users.clear();
        self.loaded = false;
        Ok(())
    }
}
