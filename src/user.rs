//! JIRA users.

use std::fmt;

use tracing::debug;

use crate::api::types::UserData;
use crate::api::JiraClient;
use crate::error::{Error, Result};
use crate::group::Group;

/// Default page size of [`User::search`].
const SEARCH_LIMIT: u32 = 50;

/// A JIRA user, identified by name.
///
/// Data is loaded on first access. Users taken from other payloads (issue
/// reporter, comment author) start with whatever JIRA sent there and reload
/// when a missing part is requested.
#[derive(Debug, Clone)]
pub struct User {
    client: JiraClient,
    name: String,
    data: Option<UserData>,
    expanded: Vec<String>,
    groups: Option<Vec<Group>>,
}

impl User {
    /// Reference a user by name without loading it.
    pub fn new(name: &str, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            name: name.to_string(),
            data: None,
            expanded: Vec::new(),
            groups: None,
        }
    }

    /// Wrap a user payload. The name falls back to the account id.
    ///
    /// # Errors
    ///
    /// Fails when the payload has neither `name` nor `accountId`.
    pub fn from_data(data: UserData, client: &JiraClient) -> Result<Self> {
        let name = data
            .login()
            .ok_or_else(|| Error::User("User data has neither name nor accountId".to_string()))?
            .to_string();
        Ok(Self {
            client: client.clone(),
            name,
            data: Some(data),
            expanded: Vec::new(),
            groups: None,
        })
    }

    pub(crate) fn from_value(value: serde_json::Value, client: &JiraClient) -> Result<Self> {
        Self::from_data(crate::api::decode(value)?, client)
    }

    /// Load a user by name.
    pub async fn get(name: &str, client: &JiraClient) -> Result<Self> {
        let mut user = Self::new(name, client);
        user.data(&[]).await?;
        Ok(user)
    }

    /// Search users by name, login or email.
    pub async fn search(pattern: &str, client: &JiraClient) -> Result<Vec<Self>> {
        client
            .user()
            .search(pattern, 0, SEARCH_LIMIT, true, false)
            .await?
            .into_iter()
            .map(|data| Self::from_data(data, client))
            .collect()
    }

    /// Find the user with exactly this email.
    ///
    /// # Errors
    ///
    /// Returns [`Error::User`] when no user has that email.
    pub async fn by_email(email: &str, client: &JiraClient) -> Result<Self> {
        let found = client
            .user()
            .search(email, 0, SEARCH_LIMIT, true, false)
            .await?
            .into_iter()
            .find(|data| data.email_address.as_deref() == Some(email));
        match found {
            Some(data) => Self::from_data(data, client),
            None => Err(Error::User(format!(
                "User with email '{}' not found in Jira",
                email
            ))),
        }
    }

    /// Load the user data, reloading when `expand` names a group not
    /// requested before.
    async fn data(&mut self, expand: &[&str]) -> Result<&UserData> {
        let mut new_expand = false;
        for item in expand {
            if !self.expanded.iter().any(|e| e == item) {
                self.expanded.push(item.to_string());
                new_expand = true;
            }
        }

        let data = match self.data.take() {
            Some(data) if !new_expand => data,
            _ => {
                let expanded: Vec<&str> = self.expanded.iter().map(String::as_str).collect();
                self.groups = None;
                self.client
                    .user()
                    .get(&self.name, &expanded, new_expand)
                    .await?
            }
        };
        Ok(self.data.insert(data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn key(&mut self) -> Result<String> {
        Ok(self.data(&[]).await?.key.clone().unwrap_or_default())
    }

    pub async fn display_name(&mut self) -> Result<String> {
        Ok(self.data(&[]).await?.display_name.clone().unwrap_or_default())
    }

    /// The user's email. Some payloads (e.g. component leads) omit it; the
    /// user is reloaded in that case.
    pub async fn email(&mut self) -> Result<String> {
        if self
            .data
            .as_ref()
            .is_some_and(|d| d.email_address.is_none())
        {
            debug!(user = %self.name, "Email missing, reloading user");
            self.data = None;
        }
        Ok(self.data(&[]).await?.email_address.clone().unwrap_or_default())
    }

    /// The email if it is already known, without any request.
    pub fn known_email(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.email_address.as_deref())
    }

    pub async fn is_active(&mut self) -> Result<bool> {
        Ok(self.data(&[]).await?.active)
    }

    /// Groups the user belongs to.
    pub async fn groups(&mut self) -> Result<Vec<Group>> {
        if let Some(groups) = &self.groups {
            return Ok(groups.clone());
        }

        let client = self.client.clone();
        let groups: Vec<Group> = self
            .data(&["groups"])
            .await?
            .groups
            .as_ref()
            .map(|g| {
                g.items
                    .iter()
                    .map(|data| Group::from_data(data.clone(), &client))
                    .collect()
            })
            .unwrap_or_default();
        self.groups = Some(groups.clone());
        Ok(groups)
    }

    /// Whether the user is in any of `group_names`.
    pub async fn is_member_of(&mut self, group_names: &[&str]) -> Result<bool> {
        Ok(self
            .groups()
            .await?
            .iter()
            .any(|g| group_names.contains(&g.name())))
    }

    /// Start or stop watching an issue.
    pub async fn watch_issue(&self, issue_key: &str, watch: bool) -> Result<()> {
        let watchers = self.client.issue().watchers();
        if watch {
            watchers.add(issue_key, &self.name).await?;
        } else {
            watchers.remove(issue_key, &self.name).await?;
        }
        Ok(())
    }

    /// Assign an issue to this user.
    pub async fn assign(&self, issue_key: &str) -> Result<()> {
        self.client
            .issue()
            .assign(issue_key, Some(&self.name))
            .await?;
        Ok(())
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data.as_ref().and_then(|d| d.display_name.as_deref()) {
            Some(display_name) => write!(f, "{} ({})", display_name, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
