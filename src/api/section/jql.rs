//! `jql` endpoints.

use serde_json::Value;

use super::{decode, JiraClient};
use crate::api::error::Result;
use crate::api::types::JqlSuggestion;

/// JQL helper endpoints.
#[derive(Debug, Clone, Copy)]
pub struct JqlSection<'a> {
    client: &'a JiraClient,
}

impl<'a> JqlSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// Autocomplete suggestions for a field value. Empty optional arguments
    /// are not sent.
    pub async fn field_suggestions(
        &self,
        field_name: &str,
        field_value: &str,
        predicate_name: &str,
        predicate_value: &str,
    ) -> Result<Vec<JqlSuggestion>> {
        let mut query = vec![("fieldName", field_name.to_string())];
        for (key, value) in [
            ("fieldValue", field_value),
            ("predicateName", predicate_name),
            ("predicateValue", predicate_value),
        ] {
            if !value.is_empty() {
                query.push((key, value.to_string()));
            }
        }

        let response = self
            .client
            .raw()
            .get("jql/autocompletedata/suggestions", &query)
            .await?;
        decode(
            response
                .get("results")
                .cloned()
                .unwrap_or(Value::Array(Vec::new())),
        )
    }
}
