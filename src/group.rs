//! JIRA groups.

use std::fmt;

use crate::api::types::GroupData;
use crate::api::JiraClient;
use crate::error::Result;
use crate::user::User;

/// A JIRA group. Members are loaded on first request.
#[derive(Debug, Clone)]
pub struct Group {
    client: JiraClient,
    name: String,
    self_url: Option<String>,
    users: Option<Vec<User>>,
}

impl Group {
    pub fn new(name: &str, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            name: name.to_string(),
            self_url: None,
            users: None,
        }
    }

    pub fn from_data(data: GroupData, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            name: data.name,
            self_url: data.self_url,
            users: None,
        }
    }

    /// Load a group by name.
    pub async fn get(name: &str, client: &JiraClient) -> Result<Self> {
        let data = client.group().get(name, false).await?;
        Ok(Self::from_data(data, client))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn self_url(&self) -> Option<&str> {
        self.self_url.as_deref()
    }

    /// Every active member of the group.
    pub async fn all_users(&mut self) -> Result<&[User]> {
        let users = match self.users.take() {
            Some(users) => users,
            None => self
                .client
                .group()
                .list_all_users(&self.name, false, false)
                .await?
                .into_iter()
                .map(|data| User::from_data(data, &self.client))
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(self.users.insert(users))
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
