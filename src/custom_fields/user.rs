//! User picker custom fields.

use std::marker::PhantomData;

use serde_json::{json, Value};

use super::{common_methods, pending_set, CustomField};
use crate::error::{Error, Result};
use crate::issue::Issue;
use crate::user::User;

/// Find a user for the field, preferring an exact login match.
async fn load_user(issue: &Issue, name: &str, field_name: &str) -> Result<User> {
    let mut found = User::search(name, issue.client()).await?;
    let exact = found.iter().position(|user| user.name() == name);
    match exact {
        Some(index) => Ok(found.swap_remove(index)),
        None if !found.is_empty() => Ok(found.swap_remove(0)),
        None => Err(Error::CustomField(format!(
            "User '{}' not found in Jira. Can't add it to '{}' field.",
            name, field_name
        ))),
    }
}

fn user_ref(name: &str) -> Value {
    json!({ "name": name })
}

fn login(value: &Value) -> Option<&str> {
    value
        .get("name")
        .or_else(|| value.get("accountId"))
        .and_then(Value::as_str)
}

/// A multi-user picker.
pub struct UserField<'a, F> {
    issue: &'a mut Issue,
    field: PhantomData<F>,
}

common_methods!(UserField);

impl<'a, F: CustomField> UserField<'a, F> {
    /// Users stored in the field.
    pub async fn value(&mut self) -> Result<Vec<User>> {
        let client = self.issue.client().clone();
        match self.original_value().await? {
            Value::Array(users) => users
                .into_iter()
                .map(|user| User::from_value(user, &client))
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn has_user(&mut self, name: &str) -> Result<bool> {
        Ok(self.logins().await?.iter().any(|login| login == name))
    }

    /// Logins in the field, pending changes included.
    async fn logins(&mut self) -> Result<Vec<String>> {
        let values = match pending_set(self.issue, F::ID) {
            Some(values) => values,
            None => match self.original_value().await? {
                Value::Array(values) => values,
                _ => Vec::new(),
            },
        };
        Ok(values
            .iter()
            .filter_map(login)
            .map(str::to_string)
            .collect())
    }

    fn set_logins(&mut self, logins: &[String]) {
        let users: Vec<Value> = logins.iter().map(|login| user_ref(login)).collect();
        self.issue.edit(F::ID, vec![json!({ "set": users })]);
    }

    /// Replace the users.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CustomField`] when a name matches no JIRA user.
    pub async fn set_value(&mut self, names: &[&str]) -> Result<&mut Self> {
        let mut logins = Vec::with_capacity(names.len());
        for name in names {
            let user = load_user(self.issue, name, F::NAME).await?;
            if !logins.iter().any(|l: &String| l == user.name()) {
                logins.push(user.name().to_string());
            }
        }
        self.set_logins(&logins);
        Ok(self)
    }

    pub async fn add_user(&mut self, name: &str) -> Result<&mut Self> {
        let user = load_user(self.issue, name, F::NAME).await?;
        let mut logins = self.logins().await?;
        if !logins.iter().any(|l| l == user.name()) {
            logins.push(user.name().to_string());
        }
        self.set_logins(&logins);
        Ok(self)
    }

    pub async fn remove_user(&mut self, name: &str) -> Result<&mut Self> {
        let mut logins = self.logins().await?;
        logins.retain(|l| l != name);
        self.set_logins(&logins);
        Ok(self)
    }

    pub fn clear(&mut self) -> &mut Self {
        self.set_logins(&[]);
        self
    }
}

/// A single-user picker.
pub struct SingleUserField<'a, F> {
    issue: &'a mut Issue,
    field: PhantomData<F>,
}

common_methods!(SingleUserField);

impl<'a, F: CustomField> SingleUserField<'a, F> {
    pub async fn value(&mut self) -> Result<Option<User>> {
        let client = self.issue.client().clone();
        match self.original_value().await? {
            Value::Null => Ok(None),
            user => User::from_value(user, &client).map(Some),
        }
    }

    /// Set the user; `None` clears the field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CustomField`] when the name matches no JIRA user.
    pub async fn set_value(&mut self, name: Option<&str>) -> Result<&mut Self> {
        let op = match name {
            Some(name) => {
                let user = load_user(self.issue, name, F::NAME).await?;
                json!({ "set": user_ref(user.name()) })
            }
            None => json!({ "set": null }),
        };
        self.issue.edit(F::ID, vec![op]);
        Ok(self)
    }
}
