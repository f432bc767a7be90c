//! A set of users indexed by name and by email.

use std::collections::{BTreeMap, HashMap};

use crate::user::User;

/// Users keyed by name. Users whose email is already loaded can also be
/// found by email.
#[derive(Debug, Clone, Default)]
pub struct UsersList {
    by_name: BTreeMap<String, User>,
    by_email: HashMap<String, String>,
}

impl UsersList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, replacing one with the same name.
    pub fn add(&mut self, user: User) {
        if let Some(email) = user.known_email() {
            self.by_email
                .insert(email.to_string(), user.name().to_string());
        }
        self.by_name.insert(user.name().to_string(), user);
    }

    /// Remove a user by name.
    pub fn remove(&mut self, name: &str) -> Option<User> {
        let user = self.by_name.remove(name)?;
        self.by_email.retain(|_, n| n != name);
        Some(user)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.by_email.contains_key(email)
    }

    pub fn get(&self, name: &str) -> Option<&User> {
        self.by_name.get(name)
    }

    pub fn get_by_email(&self, email: &str) -> Option<&User> {
        self.by_email
            .get(email)
            .and_then(|name| self.by_name.get(name))
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
        self.by_email.clear();
    }

    /// Users ordered by name.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.by_name.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl FromIterator<User> for UsersList {
    fn from_iter<I: IntoIterator<Item = User>>(iter: I) -> Self {
        let mut list = Self::new();
        for user in iter {
            list.add(user);
        }
        list
    }
}
