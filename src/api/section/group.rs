//! `group` endpoints.

use serde_json::json;
use tracing::{debug, info, instrument};

use super::{decode, JiraClient};
use crate::api::cache::lock;
use crate::api::error::Result;
use crate::api::types::{GroupData, GroupMembersPage, UserData};

/// Page size used when walking all members of a group.
const MEMBERS_PAGE_SIZE: u32 = 50;

/// Group endpoints. Groups and their member lists are cached per client.
#[derive(Debug, Clone, Copy)]
pub struct GroupSection<'a> {
    client: &'a JiraClient,
}

impl<'a> GroupSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    fn forget(&self, name: &str) {
        lock(&self.client.caches().groups).remove(name);
        lock(&self.client.caches().group_members).remove(name);
    }

    /// Create a group.
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str) -> Result<GroupData> {
        let group: GroupData =
            decode(self.client.raw().post("group", &json!({ "name": name })).await?)?;
        lock(&self.client.caches().groups).insert(group.name.clone(), group.clone());
        info!("Group created");
        Ok(group)
    }

    /// Delete a group.
    ///
    /// # Arguments
    ///
    /// * `swap_group` - Group to move restricted comments and worklogs to
    #[instrument(skip(self))]
    pub async fn remove(&self, name: &str, swap_group: Option<&str>) -> Result<()> {
        let mut query = vec![("groupname", name.to_string())];
        if let Some(swap) = swap_group.filter(|s| !s.is_empty()) {
            query.push(("swapGroup", swap.to_string()));
        }
        self.client.raw().delete("group", &query).await?;
        self.forget(name);
        info!("Group removed");
        Ok(())
    }

    /// Get a group by name.
    pub async fn get(&self, name: &str, reload: bool) -> Result<GroupData> {
        if !reload {
            if let Some(group) = lock(&self.client.caches().groups).get(name) {
                return Ok(group.clone());
            }
        }

        let group: GroupData = decode(
            self.client
                .raw()
                .get("group", &[("groupname", name.to_string())])
                .await?,
        )?;
        lock(&self.client.caches().groups).insert(name.to_string(), group.clone());
        Ok(group)
    }

    /// Get one page of group members.
    pub async fn list_users(
        &self,
        name: &str,
        start_at: u32,
        max_results: u32,
        include_inactive: bool,
    ) -> Result<GroupMembersPage> {
        let query = [
            ("groupname", name.to_string()),
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
            ("includeInactive", include_inactive.to_string()),
        ];
        decode(self.client.raw().get("group/member", &query).await?)
    }

    /// Get every member of a group, walking all pages.
    ///
    /// The full list (inactive users included) is cached; inactive users are
    /// filtered out unless `include_inactive` is set.
    pub async fn list_all_users(
        &self,
        name: &str,
        include_inactive: bool,
        reload: bool,
    ) -> Result<Vec<UserData>> {
        let cached = if reload {
            None
        } else {
            lock(&self.client.caches().group_members).get(name).cloned()
        };

        let members = match cached {
            Some(members) => members,
            None => {
                let mut members = std::collections::BTreeMap::new();
                let mut start_at = 0;
                loop {
                    let page = self
                        .list_users(name, start_at, MEMBERS_PAGE_SIZE, true)
                        .await?;
                    debug!(start_at, count = page.values.len(), "Loaded group members page");
                    for user in page.values {
                        if let Some(login) = user.login() {
                            members.insert(login.to_string(), user);
                        }
                    }
                    if page.is_last {
                        break;
                    }
                    start_at += MEMBERS_PAGE_SIZE;
                }
                lock(&self.client.caches().group_members)
                    .insert(name.to_string(), members.clone());
                members
            }
        };

        Ok(members
            .into_values()
            .filter(|u| include_inactive || u.active)
            .collect())
    }

    /// Add a user to a group.
    #[instrument(skip(self))]
    pub async fn add_user(&self, group_name: &str, user_name: &str) -> Result<GroupData> {
        let method = format!("group/user?groupname={}", urlencoding::encode(group_name));
        let group: GroupData = decode(
            self.client
                .raw()
                .post(&method, &json!({ "name": user_name }))
                .await?,
        )?;
        lock(&self.client.caches().group_members).remove(group_name);
        lock(&self.client.caches().groups).insert(group_name.to_string(), group.clone());
        info!("User added to group");
        Ok(group)
    }

    /// Remove a user from a group.
    #[instrument(skip(self))]
    pub async fn remove_user(&self, group_name: &str, user_name: &str) -> Result<()> {
        self.client
            .raw()
            .delete(
                "group/user",
                &[
                    ("groupname", group_name.to_string()),
                    ("username", user_name.to_string()),
                ],
            )
            .await?;
        if let Some(members) = lock(&self.client.caches().group_members).get_mut(group_name) {
            members.remove(user_name);
        }
        info!("User removed from group");
        Ok(())
    }
}
