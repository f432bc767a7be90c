//! Custom fields with a fixed set of items.

use std::marker::PhantomData;

use serde_json::{json, Value};

use super::{common_methods, option_values, pending_set, unknown_item, FieldOptions};
use crate::error::{Error, Result};
use crate::issue::Issue;

/// Selected items of a multi-value field, pending changes included.
async fn pending_items<F: FieldOptions>(issue: &mut Issue) -> Result<Vec<String>> {
    if let Some(values) = pending_set(issue, F::ID) {
        return Ok(option_values(&Value::Array(values)));
    }
    Ok(option_values(&issue.field_value(F::ID, &[]).await?))
}

/// Known items first, in their declared order, then anything else selected.
fn ordered<F: FieldOptions>(selected: &[String]) -> Vec<String> {
    let mut items: Vec<String> = F::ITEMS
        .iter()
        .filter(|item| selected.iter().any(|s| s == *item))
        .map(|item| item.to_string())
        .collect();
    items.extend(
        selected
            .iter()
            .filter(|s| !F::ITEMS.contains(&s.as_str()))
            .cloned(),
    );
    items
}

fn set_items(issue: &mut Issue, field_id: &str, items: &[String]) {
    let values: Vec<Value> = items.iter().map(|item| json!({ "value": item })).collect();
    issue.edit(field_id, vec![json!({ "set": values })]);
}

async fn toggle<F: FieldOptions>(
    issue: &mut Issue,
    kind: &str,
    item: &str,
    state: bool,
) -> Result<()> {
    if !F::ITEMS.contains(&item) {
        return Err(unknown_item(kind, item, F::NAME, F::ITEMS));
    }

    let mut selected = pending_items::<F>(issue).await?;
    selected.retain(|s| s != item);
    if state {
        selected.push(item.to_string());
    }
    set_items(issue, F::ID, &ordered::<F>(&selected));
    Ok(())
}

/// A multi-select list.
///
/// Item toggles build on the pending value, so several calls before a save
/// combine into one update.
pub struct SelectField<'a, F> {
    issue: &'a mut Issue,
    field: PhantomData<F>,
}

common_methods!(SelectField);

impl<'a, F: FieldOptions> SelectField<'a, F> {
    /// Selected items as stored in JIRA.
    pub async fn value(&mut self) -> Result<Vec<String>> {
        let selected = option_values(&self.original_value().await?);
        Ok(ordered::<F>(&selected))
    }

    pub async fn is_selected(&mut self, item: &str) -> Result<bool> {
        Ok(self.value().await?.iter().any(|s| s == item))
    }

    /// Replace the selection.
    pub fn set_value(&mut self, items: &[&str]) -> &mut Self {
        let items: Vec<String> = items.iter().map(|i| i.to_string()).collect();
        set_items(self.issue, F::ID, &items);
        self
    }

    /// Select or deselect one item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CustomField`] when the field has no such item.
    pub async fn select_item(&mut self, item: &str, selected: bool) -> Result<&mut Self> {
        toggle::<F>(self.issue, "item", item, selected).await?;
        Ok(self)
    }

    pub fn select_all(&mut self, selected: bool) -> &mut Self {
        let items: &[&str] = if selected { F::ITEMS } else { &[] };
        self.set_value(items)
    }
}

/// A single-select list.
pub struct SingleSelectField<'a, F> {
    issue: &'a mut Issue,
    field: PhantomData<F>,
}

/// Radio buttons hold one item, like a single-select list.
pub type RadioField<'a, F> = SingleSelectField<'a, F>;

common_methods!(SingleSelectField);

impl<'a, F: FieldOptions> SingleSelectField<'a, F> {
    /// The selected item, empty when nothing is selected.
    pub async fn value(&mut self) -> Result<String> {
        Ok(self
            .original_value()
            .await?
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Select an item; `None` clears the field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CustomField`] when the field has no such item.
    pub fn set_value(&mut self, item: Option<&str>) -> Result<&mut Self> {
        let op = match item {
            Some(item) if !F::ITEMS.contains(&item) => {
                return Err(Error::CustomField(format!(
                    "Can't select '{}' item. Available items for field '{}' are: '{}'",
                    item,
                    F::NAME,
                    F::ITEMS.join("', '")
                )))
            }
            Some(item) => json!({ "set": { "value": item } }),
            None => json!({ "set": null }),
        };
        self.issue.edit(F::ID, vec![op]);
        Ok(self)
    }
}

/// A group of checkboxes.
pub struct CheckboxField<'a, F> {
    issue: &'a mut Issue,
    field: PhantomData<F>,
}

common_methods!(CheckboxField);

impl<'a, F: FieldOptions> CheckboxField<'a, F> {
    /// Checked boxes as stored in JIRA.
    pub async fn value(&mut self) -> Result<Vec<String>> {
        let checked = option_values(&self.original_value().await?);
        Ok(ordered::<F>(&checked))
    }

    pub async fn is_checked(&mut self, checkbox: &str) -> Result<bool> {
        Ok(self.value().await?.iter().any(|c| c == checkbox))
    }

    /// Replace the checked boxes.
    pub fn set_value(&mut self, checkboxes: &[&str]) -> &mut Self {
        let items: Vec<String> = checkboxes.iter().map(|c| c.to_string()).collect();
        set_items(self.issue, F::ID, &items);
        self
    }

    /// Check or uncheck one box.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CustomField`] when the field has no such checkbox.
    pub async fn check_item(&mut self, checkbox: &str, checked: bool) -> Result<&mut Self> {
        toggle::<F>(self.issue, "checkbox", checkbox, checked).await?;
        Ok(self)
    }

    pub fn check_all(&mut self, checked: bool) -> &mut Self {
        let items: &[&str] = if checked { F::ITEMS } else { &[] };
        self.set_value(items)
    }
}

/// A field with a single checkbox.
pub struct SingleCheckboxField<'a, F> {
    issue: &'a mut Issue,
    field: PhantomData<F>,
}

common_methods!(SingleCheckboxField);

impl<'a, F: FieldOptions> SingleCheckboxField<'a, F> {
    /// Label of the checked box, empty when unchecked.
    pub async fn value(&mut self) -> Result<String> {
        Ok(option_values(&self.original_value().await?)
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    pub async fn is_checked(&mut self) -> Result<bool> {
        Ok(!self.is_empty().await?)
    }

    pub fn set_checked(&mut self, checked: bool) -> &mut Self {
        let items: Vec<String> = if checked {
            F::ITEMS.iter().map(|i| i.to_string()).collect()
        } else {
            Vec::new()
        };
        set_items(self.issue, F::ID, &items);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::IssueData;
    use crate::api::JiraClient;
    use crate::custom_fields::CustomField;

    struct Platforms;

    impl CustomField for Platforms {
        const ID: &'static str = "customfield_10020";
        const NAME: &'static str = "Platforms";
    }

    impl FieldOptions for Platforms {
        const ITEMS: &'static [&'static str] = &["iOS", "Android", "Web"];
    }

    struct Severity;

    impl CustomField for Severity {
        const ID: &'static str = "customfield_10010";
        const NAME: &'static str = "Severity";
    }

    impl FieldOptions for Severity {
        const ITEMS: &'static [&'static str] = &["High", "Low"];
    }

    struct Approved;

    impl CustomField for Approved {
        const ID: &'static str = "customfield_10030";
        const NAME: &'static str = "Approved";
    }

    impl FieldOptions for Approved {
        const ITEMS: &'static [&'static str] = &["Yes"];
    }

    fn issue(fields: Value) -> Issue {
        let client = JiraClient::new("https://jira.example.com").unwrap();
        let data: IssueData =
            serde_json::from_value(json!({"id": 1, "key": "PRJ-1", "fields": fields})).unwrap();
        Issue::from_data(
            data,
            &[Platforms::ID, Severity::ID, Approved::ID],
            &[],
            &client,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_select_value_in_item_order() {
        let mut issue = issue(json!({
            "customfield_10020": [{"value": "Web"}, {"value": "iOS"}]
        }));
        let mut platforms = SelectField::<Platforms>::new(&mut issue);
        assert_eq!(platforms.value().await.unwrap(), vec!["iOS", "Web"]);
        assert!(platforms.is_selected("Web").await.unwrap());
        assert!(!platforms.is_selected("Android").await.unwrap());
    }

    #[tokio::test]
    async fn test_select_toggles_accumulate() {
        let mut issue = issue(json!({"customfield_10020": [{"value": "iOS"}]}));
        let mut platforms = SelectField::<Platforms>::new(&mut issue);
        platforms.select_item("Web", true).await.unwrap();
        platforms.select_item("iOS", false).await.unwrap();
        platforms.select_item("Android", true).await.unwrap();

        assert_eq!(
            issue.pending_update(Platforms::ID).unwrap(),
            &[json!({"set": [{"value": "Android"}, {"value": "Web"}]})]
        );
    }

    #[tokio::test]
    async fn test_select_unknown_item() {
        let mut issue = issue(json!({}));
        let mut platforms = SelectField::<Platforms>::new(&mut issue);
        let err = platforms.select_item("Linux", true).await.err().unwrap();
        assert!(matches!(err, Error::CustomField(_)));
    }

    #[test]
    fn test_select_all() {
        let mut issue = issue(json!({}));
        SelectField::<Platforms>::new(&mut issue).select_all(false);
        assert_eq!(
            issue.pending_update(Platforms::ID).unwrap(),
            &[json!({"set": []})]
        );
    }

    #[tokio::test]
    async fn test_single_select() {
        let mut issue = issue(json!({"customfield_10010": {"value": "Low", "id": "2"}}));
        let mut severity = SingleSelectField::<Severity>::new(&mut issue);
        assert_eq!(severity.value().await.unwrap(), "Low");

        assert!(severity.set_value(Some("Blocker")).is_err());
        severity.set_value(Some("High")).unwrap();
        assert_eq!(
            issue.pending_update(Severity::ID).unwrap(),
            &[json!({"set": {"value": "High"}})]
        );
    }

    #[tokio::test]
    async fn test_radio_clears() {
        let mut issue = issue(json!({}));
        let mut severity = RadioField::<Severity>::new(&mut issue);
        assert_eq!(severity.value().await.unwrap(), "");
        severity.set_value(None).unwrap();
        assert_eq!(
            issue.pending_update(Severity::ID).unwrap(),
            &[json!({"set": null})]
        );
    }

    #[tokio::test]
    async fn test_checkboxes() {
        let mut issue = issue(json!({"customfield_10020": [{"value": "Android"}]}));
        let mut boxes = CheckboxField::<Platforms>::new(&mut issue);
        assert!(boxes.is_checked("Android").await.unwrap());
        boxes.check_item("iOS", true).await.unwrap();
        assert_eq!(
            issue.pending_update(Platforms::ID).unwrap(),
            &[json!({"set": [{"value": "iOS"}, {"value": "Android"}]})]
        );
    }

    #[tokio::test]
    async fn test_single_checkbox() {
        let mut issue = issue(json!({"customfield_10030": [{"value": "Yes"}]}));
        let mut approved = SingleCheckboxField::<Approved>::new(&mut issue);
        assert!(approved.is_checked().await.unwrap());
        assert_eq!(approved.value().await.unwrap(), "Yes");

        approved.set_checked(false);
        assert_eq!(
            issue.pending_update(Approved::ID).unwrap(),
            &[json!({"set": []})]
        );
    }
}
