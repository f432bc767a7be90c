//! `user` endpoints.

use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use super::{decode, join, JiraClient};
use crate::api::cache::lock;
use crate::api::error::Result;
use crate::api::types::UserData;

/// Applications granted to new users by default.
pub const DEFAULT_APPLICATIONS: &[&str] = &["jira-software"];

/// Changes for [`UserSection::update`]. `None` leaves a property unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub applications: Option<Vec<String>>,
    pub new_name: Option<String>,
}

impl UserUpdate {
    fn to_body(&self) -> Value {
        let mut body = Map::new();
        if let Some(email) = &self.email {
            body.insert("emailAddress".to_string(), json!(email));
        }
        if let Some(display_name) = &self.display_name {
            body.insert("displayName".to_string(), json!(display_name));
        }
        if let Some(applications) = &self.applications {
            body.insert("applicationKeys".to_string(), json!(applications));
        }
        if let Some(new_name) = &self.new_name {
            body.insert("name".to_string(), json!(new_name));
        }
        Value::Object(body)
    }
}

/// User endpoints. Users are cached per client by key and by name.
#[derive(Debug, Clone, Copy)]
pub struct UserSection<'a> {
    client: &'a JiraClient,
}

impl<'a> UserSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    fn remember(&self, user: &UserData) {
        lock(&self.client.caches().users).insert(user);
    }

    /// Create a user.
    #[instrument(skip(self, password))]
    pub async fn create(
        &self,
        name: &str,
        password: &str,
        email: &str,
        display_name: &str,
        applications: &[&str],
    ) -> Result<UserData> {
        let applications = if applications.is_empty() {
            DEFAULT_APPLICATIONS
        } else {
            applications
        };
        let body = json!({
            "name": name,
            "password": password,
            "emailAddress": email,
            "displayName": display_name,
            "applicationKeys": applications,
        });

        let user: UserData = decode(self.client.raw().post("user", &body).await?)?;
        self.remember(&user);
        info!("User created");
        Ok(user)
    }

    /// Update a user.
    #[instrument(skip(self, update))]
    pub async fn update(&self, name: &str, update: &UserUpdate) -> Result<UserData> {
        let method = format!("user?username={}", urlencoding::encode(name));
        let user: UserData = decode(self.client.raw().put(&method, &update.to_body()).await?)?;

        let mut cache = lock(&self.client.caches().users);
        cache.remove(name);
        cache.insert(&user);
        info!("User updated");
        Ok(user)
    }

    /// Delete a user.
    #[instrument(skip(self))]
    pub async fn remove(&self, name: &str) -> Result<()> {
        self.client
            .raw()
            .delete("user", &[("username", name.to_string())])
            .await?;
        lock(&self.client.caches().users).remove(name);
        info!("User removed");
        Ok(())
    }

    /// Get a user by name.
    ///
    /// # Arguments
    ///
    /// * `expand` - Expand groups, e.g. `groups`
    /// * `reload` - Ignore the cached copy
    pub async fn get(&self, name: &str, expand: &[&str], reload: bool) -> Result<UserData> {
        self.fetch("username", name, expand, reload).await
    }

    /// Get a user by key.
    pub async fn get_by_key(&self, key: &str, expand: &[&str], reload: bool) -> Result<UserData> {
        self.fetch("key", key, expand, reload).await
    }

    async fn fetch(&self, param: &str, value: &str, expand: &[&str], reload: bool) -> Result<UserData> {
        // Cached entries may lack expanded data.
        if !reload && expand.is_empty() {
            if let Some(user) = lock(&self.client.caches().users).get(value) {
                return Ok(user);
            }
        }

        let mut query = vec![(param, value.to_string())];
        if !expand.is_empty() {
            query.push(("expand", join(expand)));
        }
        let user: UserData = decode(self.client.raw().get("user", &query).await?)?;
        self.remember(&user);
        Ok(user)
    }

    /// Search users by name, login or email.
    pub async fn search(
        &self,
        pattern: &str,
        start_at: u32,
        max_results: u32,
        include_active: bool,
        include_inactive: bool,
    ) -> Result<Vec<UserData>> {
        let query = [
            ("username", pattern.to_string()),
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
            ("includeActive", include_active.to_string()),
            ("includeInactive", include_inactive.to_string()),
        ];
        let users: Vec<UserData> = decode(self.client.raw().get("user/search", &query).await?)?;

        let mut cache = lock(&self.client.caches().users);
        for user in &users {
            cache.insert(user);
        }
        Ok(users)
    }
}
