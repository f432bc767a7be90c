//! Typed access to custom fields.
//!
//! A custom field is described by a marker type implementing [`CustomField`]
//! (and [`FieldOptions`] for fields with a fixed set of items). Wrappers such
//! as [`TextField`] or [`SelectField`] borrow an [`Issue`] mutably, read
//! through its field cache and record changes as pending updates, so the
//! changes of several fields still go out in one request.
//!
//! ```no_run
//! use jira_rest::custom_fields::{CustomField, FieldOptions, SelectField};
//!
//! struct Platforms;
//!
//! impl CustomField for Platforms {
//!     const ID: &'static str = "customfield_10020";
//!     const NAME: &'static str = "Platforms";
//! }
//!
//! impl FieldOptions for Platforms {
//!     const ITEMS: &'static [&'static str] = &["iOS", "Android", "Web"];
//! }
//!
//! # async fn run(client: jira_rest::JiraClient) -> jira_rest::Result<()> {
//! let mut issue = jira_rest::custom_fields::for_issue::<Platforms>("PRJ-1", &client).await?;
//! let mut platforms = SelectField::<Platforms>::new(&mut issue);
//! platforms.select_item("Web", true).await?;
//! platforms.save(&[], true).await?;
//! # Ok(())
//! # }
//! ```

mod select;
mod text;
mod user;

use serde_json::Value;

use crate::api::JiraClient;
use crate::error::{Error, Result};
use crate::issue::Issue;

pub use select::{CheckboxField, RadioField, SelectField, SingleCheckboxField, SingleSelectField};
pub use text::{LabelField, NumberField, TextField};
pub use user::{SingleUserField, UserField};

/// A custom field of the JIRA instance.
pub trait CustomField {
    /// Field id, e.g. `customfield_10010`.
    const ID: &'static str;
    /// Display name.
    const NAME: &'static str;

    /// Numeric part of the id: `customfield_10010` gives 10010.
    fn custom_id() -> u64 {
        Self::ID
            .strip_prefix("customfield_")
            .and_then(|id| id.parse().ok())
            .unwrap_or_default()
    }
}

/// Items of a select, radio or checkbox field.
pub trait FieldOptions: CustomField {
    const ITEMS: &'static [&'static str];
}

/// Load an issue with only the key and one custom field.
///
/// Other fields still load on access, with a full request.
pub async fn for_issue<F: CustomField>(key: &str, client: &JiraClient) -> Result<Issue> {
    Issue::by_key(key, &["key", F::ID], &[], client).await
}

/// Methods every custom field wrapper has.
macro_rules! common_methods {
    ($wrapper:ident) => {
        impl<'a, F: $crate::custom_fields::CustomField> $wrapper<'a, F> {
            pub fn new(issue: &'a mut $crate::issue::Issue) -> Self {
                Self {
                    issue,
                    field: ::std::marker::PhantomData,
                }
            }

            /// The issue the field belongs to.
            pub fn issue(&mut self) -> &mut $crate::issue::Issue {
                &mut *self.issue
            }

            pub fn name(&self) -> &'static str {
                F::NAME
            }

            pub fn id(&self) -> &'static str {
                F::ID
            }

            pub fn custom_id(&self) -> u64 {
                F::custom_id()
            }

            /// The field value as JIRA returned it.
            pub async fn original_value(&mut self) -> $crate::error::Result<::serde_json::Value> {
                self.issue.field_value(F::ID, &[]).await
            }

            pub async fn is_empty(&mut self) -> $crate::error::Result<bool> {
                Ok(self.original_value().await?.is_null())
            }

            /// Whether the current user can edit the field.
            pub async fn is_editable(&mut self) -> $crate::error::Result<bool> {
                self.issue.is_editable(F::ID).await
            }

            pub async fn rendered_value(&mut self) -> $crate::error::Result<String> {
                Ok(self.issue.rendered_field(F::ID).await?.unwrap_or_default())
            }

            /// Send every pending change of the issue.
            pub async fn save(
                &mut self,
                properties: &[::serde_json::Value],
                notify_users: bool,
            ) -> $crate::error::Result<()> {
                self.issue.save(properties, notify_users).await
            }
        }
    };
}

pub(crate) use common_methods;

/// Values of the pending `set` operation of a field, if any.
fn pending_set(issue: &Issue, field_id: &str) -> Option<Vec<Value>> {
    issue
        .pending_update(field_id)?
        .iter()
        .find_map(|op| op.get("set"))
        .and_then(Value::as_array)
        .cloned()
}

/// `value` of every option in a multi-value field.
fn option_values(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("value").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn unknown_item(kind: &str, item: &str, field_name: &str, items: &[&str]) -> Error {
    Error::CustomField(format!(
        "Can't change state of unknown {} '{}'. Available {}s for field '{}' are: '{}'",
        kind,
        item,
        kind,
        field_name,
        items.join("', '")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Severity;

    impl CustomField for Severity {
        const ID: &'static str = "customfield_10010";
        const NAME: &'static str = "Severity";
    }

    #[test]
    fn test_custom_id() {
        assert_eq!(Severity::custom_id(), 10010);
    }

    #[test]
    fn test_pending_set_reads_first_set_op() {
        let client = JiraClient::new("https://jira.example.com").unwrap();
        let mut issue = Issue::new("PRJ-1", &client).unwrap();
        assert!(pending_set(&issue, Severity::ID).is_none());

        issue.edit(Severity::ID, vec![json!({"set": [{"value": "High"}]})]);
        assert_eq!(
            pending_set(&issue, Severity::ID).unwrap(),
            vec![json!({"value": "High"})]
        );
    }

    #[test]
    fn test_option_values() {
        assert_eq!(
            option_values(&json!([{"value": "a", "id": "1"}, {"value": "b"}])),
            vec!["a", "b"]
        );
        assert!(option_values(&Value::Null).is_empty());
    }
}
