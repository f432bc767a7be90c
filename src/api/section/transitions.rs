//! `issue/{key}/transitions` endpoints: moving issues through their workflow.

use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

use super::{decode, segment, IssueSection, JiraClient};
use crate::api::error::{ApiError, Result};
use crate::api::types::{IssueData, StatusData, TransitionData};

/// Workflow transition endpoints.
#[derive(Debug, Clone, Copy)]
pub struct TransitionsSection<'a> {
    client: &'a JiraClient,
}

impl<'a> TransitionsSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// List transitions available in the issue's current status.
    pub async fn list(&self, issue_key: &str, expand_fields: bool) -> Result<Vec<TransitionData>> {
        IssueSection::new(self.client)
            .list_transitions(issue_key, expand_fields)
            .await
    }

    /// Get one transition.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::TransitionUnavailable`] when the transition cannot
    /// be made from the current status by the current user.
    pub async fn get(
        &self,
        issue_key: &str,
        transition_id: u64,
        expand_fields: bool,
    ) -> Result<TransitionData> {
        let mut query = vec![("transitionId", transition_id.to_string())];
        if expand_fields {
            query.push(("expand", "transitions.fields".to_string()));
        }

        let value = self
            .client
            .raw()
            .get(&format!("issue/{}/transitions", segment(issue_key)), &query)
            .await?;
        let transitions: Vec<TransitionData> = value
            .get("transitions")
            .cloned()
            .map(decode)
            .transpose()?
            .unwrap_or_default();

        transitions
            .into_iter()
            .find(|t| t.id == transition_id)
            .ok_or_else(|| ApiError::TransitionUnavailable {
                transition: transition_id.to_string(),
                issue: issue_key.to_string(),
                login: self.client.login().to_string(),
            })
    }

    /// Perform a transition.
    ///
    /// # Arguments
    ///
    /// * `fields` - Field values to set on the transition screen
    /// * `update` - Update operations to apply on the transition screen
    #[instrument(skip(self, fields, update), fields(issue_key = %issue_key))]
    pub async fn perform(
        &self,
        issue_key: &str,
        transition_id: u64,
        fields: &Map<String, Value>,
        update: &Map<String, Value>,
    ) -> Result<()> {
        let mut body = json!({ "transition": { "id": transition_id.to_string() } });
        if !fields.is_empty() {
            body["fields"] = Value::Object(fields.clone());
        }
        if !update.is_empty() {
            body["update"] = Value::Object(update.clone());
        }

        self.client
            .raw()
            .post(&format!("issue/{}/transitions", segment(issue_key)), &body)
            .await?;
        info!(transition_id, "Transition performed");
        Ok(())
    }

    /// Perform a transition, dropping fields that are not on its screen.
    ///
    /// JIRA rejects the whole request when a field is not available on the
    /// transition screen.
    pub async fn perform_safe(
        &self,
        issue_key: &str,
        transition_id: u64,
        fields: &Map<String, Value>,
        update: &Map<String, Value>,
    ) -> Result<()> {
        let transition = self.get(issue_key, transition_id, true).await?;
        let fields = retain_screen_fields(fields, &transition);
        let update = retain_screen_fields(update, &transition);
        self.perform(issue_key, transition_id, &fields, &update).await
    }

    /// Move an issue along the workflow by transition name.
    ///
    /// # Arguments
    ///
    /// * `step_name` - Transition name as shown in the UI
    /// * `safe` - Drop fields not on the transition screen
    /// * `same_status` - Allow a transition that leads to the current status
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AlreadyInStatus`] when the transition leads to the
    /// current status and `same_status` is off, and
    /// [`ApiError::UnknownTransition`] when no transition has that name.
    #[instrument(skip(self, fields, update), fields(issue_key = %issue_key))]
    pub async fn step(
        &self,
        issue_key: &str,
        step_name: &str,
        fields: &Map<String, Value>,
        update: &Map<String, Value>,
        safe: bool,
        same_status: bool,
    ) -> Result<()> {
        let value = self
            .client
            .raw()
            .get(
                &format!("issue/{}", segment(issue_key)),
                &[("fields", "status".to_string())],
            )
            .await?;
        let issue: IssueData = decode(value)?;
        let status: StatusData = issue
            .field("status")
            .cloned()
            .map(decode)
            .transpose()?
            .ok_or_else(|| ApiError::Decode(format!("issue '{}' has no status", issue.key)))?;

        let transitions = self.list(&issue.key, false).await?;
        let Some(transition) = transitions.iter().find(|t| t.name == step_name) else {
            let available = transitions
                .iter()
                .map(|t| format!("'{}'", t.name))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ApiError::UnknownTransition {
                issue: issue.key.clone(),
                status: status.name.clone(),
                name: step_name.to_string(),
                available,
            });
        };

        if transition.to.id == status.id && !same_status {
            return Err(ApiError::AlreadyInStatus {
                issue: issue.key,
                status: transition.to.name.clone(),
            });
        }

        debug!(transition_id = transition.id, "Resolved step '{}'", step_name);
        if safe {
            self.perform_safe(&issue.key, transition.id, fields, update)
                .await
        } else {
            self.perform(&issue.key, transition.id, fields, update).await
        }
    }
}

fn retain_screen_fields(values: &Map<String, Value>, transition: &TransitionData) -> Map<String, Value> {
    values
        .iter()
        .filter(|(id, _)| transition.fields.contains_key(id.as_str()))
        .map(|(id, value)| (id.clone(), value.clone()))
        .collect()
}
