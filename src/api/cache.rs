//! In-memory caches shared by the API sections.
//!
//! JIRA metadata (issue types, priorities, fields, users, ...) rarely changes
//! during a client's lifetime, so sections keep what they fetched. Locks are
//! never held across an `.await`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::types::{
    AttachmentData, FieldData, FieldMeta, GroupData, IssueTypeData, LinkTypeData, PriorityData,
    ResolutionData, SecurityLevelData, StatusCategoryData, StatusData, UserData,
};

/// An id-indexed list that knows whether it holds every item of its kind.
#[derive(Debug)]
pub struct Catalog<T> {
    pub items: BTreeMap<u64, T>,
    pub complete: bool,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            complete: false,
        }
    }
}

impl<T: Clone> Catalog<T> {
    pub fn get(&self, id: u64) -> Option<T> {
        self.items.get(&id).cloned()
    }

    pub fn insert(&mut self, id: u64, item: T) {
        self.items.insert(id, item);
    }

    /// Replace the whole content with a freshly loaded list.
    pub fn fill(&mut self, items: impl IntoIterator<Item = (u64, T)>) {
        self.items = items.into_iter().collect();
        self.complete = true;
    }

    pub fn all(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }
}

/// Users indexed by both key and name.
#[derive(Debug, Default)]
pub struct UserCache {
    by_key: HashMap<String, UserData>,
    by_name: HashMap<String, UserData>,
}

impl UserCache {
    pub fn insert(&mut self, user: &UserData) {
        if let Some(key) = &user.key {
            self.by_key.insert(key.clone(), user.clone());
        }
        if let Some(name) = user.login() {
            self.by_name.insert(name.to_string(), user.clone());
        }
    }

    /// Look up by key first, then by name.
    pub fn get(&self, key_or_name: &str) -> Option<UserData> {
        self.by_key
            .get(key_or_name)
            .or_else(|| self.by_name.get(key_or_name))
            .cloned()
    }

    pub fn remove(&mut self, key_or_name: &str) {
        if let Some(user) = self.get(key_or_name) {
            if let Some(key) = &user.key {
                self.by_key.remove(key);
            }
            if let Some(name) = user.login() {
                self.by_name.remove(name);
            }
        }
    }
}

/// Every cache kept by a [`JiraClient`](super::JiraClient).
#[derive(Debug, Default)]
pub struct Caches {
    pub edit_meta: Mutex<HashMap<String, BTreeMap<String, FieldMeta>>>,
    pub attachments: Mutex<HashMap<String, Vec<AttachmentData>>>,
    pub fields: Mutex<Option<Vec<FieldData>>>,
    pub users: Mutex<UserCache>,
    pub groups: Mutex<HashMap<String, GroupData>>,
    pub group_members: Mutex<HashMap<String, BTreeMap<String, UserData>>>,
    pub issue_types: Mutex<Catalog<IssueTypeData>>,
    pub priorities: Mutex<Catalog<PriorityData>>,
    pub resolutions: Mutex<Catalog<ResolutionData>>,
    pub statuses: Mutex<Catalog<StatusData>>,
    pub status_categories: Mutex<Catalog<StatusCategoryData>>,
    pub link_types: Mutex<Catalog<LinkTypeData>>,
    pub security_levels: Mutex<Catalog<SecurityLevelData>>,
}

/// Lock a cache, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
