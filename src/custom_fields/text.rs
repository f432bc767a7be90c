//! Free-form custom fields: text, numbers and labels.

use std::marker::PhantomData;

use serde_json::{json, Value};

use super::{common_methods, CustomField};
use crate::error::Result;
use crate::issue::Issue;

/// A single- or multi-line text field.
pub struct TextField<'a, F> {
    issue: &'a mut Issue,
    field: PhantomData<F>,
}

common_methods!(TextField);

impl<'a, F: CustomField> TextField<'a, F> {
    pub async fn value(&mut self) -> Result<String> {
        Ok(match self.original_value().await? {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    /// Set the text; `None` clears the field.
    pub fn set_value(&mut self, value: Option<&str>) -> &mut Self {
        self.issue.edit(F::ID, vec![json!({ "set": value })]);
        self
    }
}

/// A number field.
pub struct NumberField<'a, F> {
    issue: &'a mut Issue,
    field: PhantomData<F>,
}

common_methods!(NumberField);

impl<'a, F: CustomField> NumberField<'a, F> {
    /// The number, 0 when the field is empty.
    pub async fn value(&mut self) -> Result<f64> {
        Ok(match self.original_value().await? {
            Value::Number(n) => n.as_f64().unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0.0,
        })
    }

    /// Set the number; `None` clears the field.
    pub fn set_value(&mut self, value: Option<f64>) -> &mut Self {
        self.issue.edit(F::ID, vec![json!({ "set": value })]);
        self
    }
}

/// A labels field.
pub struct LabelField<'a, F> {
    issue: &'a mut Issue,
    field: PhantomData<F>,
}

common_methods!(LabelField);

impl<'a, F: CustomField> LabelField<'a, F> {
    pub async fn value(&mut self) -> Result<Vec<String>> {
        Ok(self
            .original_value()
            .await?
            .as_array()
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn add_label(&mut self, label: &str) -> &mut Self {
        self.add_labels(&[label])
    }

    /// Add labels on top of the other pending changes of the field.
    pub fn add_labels(&mut self, labels: &[&str]) -> &mut Self {
        let ops = labels.iter().map(|label| json!({ "add": label })).collect();
        self.issue.append_edit(F::ID, ops);
        self
    }

    /// Replace the labels. Empty and repeated labels are dropped.
    pub fn set_value(&mut self, labels: &[&str]) -> &mut Self {
        let mut unique: Vec<&str> = Vec::with_capacity(labels.len());
        for label in labels.iter().filter(|l| !l.is_empty()) {
            if !unique.contains(label) {
                unique.push(label);
            }
        }
        self.issue.edit(F::ID, vec![json!({ "set": unique })]);
        self
    }
}
