//! Issue change history.
//!
//! A [`History`] is built from the `changelog` expand group of an issue. It
//! keeps the issue's creation time and current status so that time-in-status
//! figures can be computed without going back to the issue.

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::api::types::{parse_datetime, HistoryData, HistoryItemData};
use crate::api::JiraClient;
use crate::error::{Error, Result};
use crate::user::User;

/// `fieldtype` of built-in fields.
pub const FIELD_TYPE_JIRA: &str = "jira";
/// `fieldtype` of custom fields.
pub const FIELD_TYPE_CUSTOM: &str = "custom";

/// One changed field.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecordItem {
    data: HistoryItemData,
    change_time: DateTime<Utc>,
}

impl LogRecordItem {
    fn new(data: HistoryItemData, change_time: DateTime<Utc>) -> Self {
        Self { data, change_time }
    }

    /// When the change was made.
    pub fn change_time(&self) -> DateTime<Utc> {
        self.change_time
    }

    /// Field name as shown in the change log, e.g. `status` or `Key`.
    pub fn field_name(&self) -> &str {
        &self.data.field
    }

    pub fn field_type(&self) -> &str {
        &self.data.fieldtype
    }

    pub fn is_field_system(&self) -> bool {
        self.data.fieldtype == FIELD_TYPE_JIRA
    }

    pub fn is_field_custom(&self) -> bool {
        self.data.fieldtype == FIELD_TYPE_CUSTOM
    }

    /// Raw previous value, e.g. a status id.
    pub fn from(&self) -> Option<&str> {
        self.data.from.as_deref()
    }

    /// Raw new value.
    pub fn to(&self) -> Option<&str> {
        self.data.to.as_deref()
    }

    /// Previous value as displayed, e.g. a status name.
    pub fn from_string(&self) -> &str {
        self.data.from_string.as_deref().unwrap_or_default()
    }

    /// New value as displayed.
    pub fn to_string(&self) -> &str {
        self.data.to_string.as_deref().unwrap_or_default()
    }

    /// Whether the displayed value changed. Transitions to the same status
    /// leave records where it did not.
    pub fn is_string_changed(&self) -> bool {
        self.from_string() != self.to_string()
    }
}

fn parse_change_time(created: &str) -> Result<DateTime<Utc>> {
    parse_datetime(created).ok_or_else(|| Error::DateParse {
        field: "changelog.created".to_string(),
        value: created.to_string(),
    })
}

/// A set of field changes made at once.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    client: JiraClient,
    id: Option<u64>,
    author: Option<crate::api::types::UserData>,
    created: DateTime<Utc>,
    items: Vec<LogRecordItem>,
}

impl HistoryRecord {
    fn from_data(data: HistoryData, client: &JiraClient) -> Result<Self> {
        let created = parse_change_time(&data.created)?;
        Ok(Self {
            client: client.clone(),
            id: data.id,
            author: data.author,
            created,
            items: data
                .items
                .into_iter()
                .map(|item| LogRecordItem::new(item, created))
                .collect(),
        })
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    /// The user who made the change. Automated changes have none.
    pub fn author(&self) -> Result<Option<User>> {
        self.author
            .clone()
            .map(|data| User::from_data(data, &self.client))
            .transpose()
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn items(&self) -> &[LogRecordItem] {
        &self.items
    }

    /// The change of one field in this record.
    pub fn field_change(&self, field_name: &str) -> Option<&LogRecordItem> {
        self.items.iter().find(|i| i.field_name() == field_name)
    }
}

/// The change history of one issue, oldest record first.
#[derive(Debug, Clone)]
pub struct History {
    issue_key: String,
    issue_created: DateTime<Utc>,
    current_status: String,
    records: Vec<HistoryRecord>,
}

impl History {
    /// Build a history from change log entries.
    ///
    /// Records are ordered by creation time; records with equal timestamps
    /// keep the order JIRA sent them in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DateParse`] when a record's timestamp is not a JIRA
    /// date.
    pub(crate) fn from_data(
        histories: Vec<HistoryData>,
        issue_key: &str,
        issue_created: DateTime<Utc>,
        current_status: &str,
        client: &JiraClient,
    ) -> Result<Self> {
        let mut records = histories
            .into_iter()
            .map(|data| HistoryRecord::from_data(data, client))
            .collect::<Result<Vec<_>>>()?;
        records.sort_by_key(|r| r.created);

        Ok(Self {
            issue_key: issue_key.to_string(),
            issue_created,
            current_status: current_status.to_string(),
            records,
        })
    }

    /// Load the history of an issue.
    pub async fn for_issue(issue_key: &str, client: &JiraClient) -> Result<Self> {
        let mut issue = super::Issue::new(issue_key, client)?;
        Ok(issue.history().await?.clone())
    }

    pub fn issue_key(&self) -> &str {
        &self.issue_key
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// Records, newest first.
    pub fn records_reverse(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter().rev()
    }

    /// Every change of one field, oldest first.
    pub fn track_field(&self, field_name: &str) -> Vec<&LogRecordItem> {
        self.records
            .iter()
            .filter_map(|r| r.field_change(field_name))
            .collect()
    }

    /// The newest record.
    pub fn last_changes(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    pub fn last_field_change(&self, field_name: &str) -> Option<&LogRecordItem> {
        self.records
            .iter()
            .rev()
            .find_map(|r| r.field_change(field_name))
    }

    pub fn last_status_change(&self) -> Option<&LogRecordItem> {
        self.last_field_change("status")
    }

    /// Total time the issue spent in a status, including the current stay.
    pub fn time_in_status(&self, status_name: &str) -> Duration {
        self.time_in_status_at(status_name, Utc::now())
    }

    /// [`History::time_in_status`] as seen at `now`.
    pub fn time_in_status_at(&self, status_name: &str, now: DateTime<Utc>) -> Duration {
        let mut last_change = self.issue_created;
        let mut total = Duration::zero();
        for change in self.track_field("status") {
            if change.from_string() == status_name {
                total = total + (change.change_time() - last_change);
            }
            last_change = change.change_time();
        }
        if self.current_status == status_name {
            total = total + (now - last_change);
        }
        total
    }

    /// Time since the last status change, or since creation.
    pub fn time_in_last_status(&self) -> Duration {
        self.time_in_last_status_at(Utc::now())
    }

    pub fn time_in_last_status_at(&self, now: DateTime<Utc>) -> Duration {
        match self.last_status_change() {
            Some(change) => now - change.change_time(),
            None => now - self.issue_created,
        }
    }

    /// Days spent in a status not counting Saturdays and Sundays, rounded
    /// to two decimals.
    pub fn workdays_in_status(&self, status_name: &str) -> f64 {
        self.workdays_in_status_at(status_name, Utc::now())
    }

    pub fn workdays_in_status_at(&self, status_name: &str, now: DateTime<Utc>) -> f64 {
        let mut total = 0.0;
        let mut last_change = self.issue_created;
        for change in self.track_field("status") {
            if !change.is_string_changed() {
                continue;
            }
            if change.from_string() == status_name {
                total += workdays_between(last_change, change.change_time());
            }
            last_change = change.change_time();
        }
        if self.current_status == status_name {
            total += workdays_between(last_change, now);
        }
        (total * 100.0).round() / 100.0
    }

    /// Records with a status change. Transitions to the same status leave a
    /// status record too; `only_status_changes` skips those.
    pub fn transitions(&self, only_status_changes: bool) -> Vec<&HistoryRecord> {
        self.records
            .iter()
            .filter(|r| match r.field_change("status") {
                Some(change) => !only_status_changes || change.is_string_changed(),
                None => false,
            })
            .collect()
    }
}

/// Fractional days between two instants minus the weekend days touched.
fn workdays_between(begin: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let mut weekend_days = 0;
    let mut day = begin;
    while day < end {
        if day.weekday().number_from_monday() > 5 {
            weekend_days += 1;
        }
        day = day + Duration::days(1);
    }
    (end - begin).num_seconds() as f64 / 86_400.0 - weekend_days as f64
}

/// A single change log record delivered outside of an issue's history, e.g.
/// with a webhook event. The timestamp comes from the event.
#[derive(Debug, Clone)]
pub struct Changelog {
    id: Option<u64>,
    issue_key: String,
    created: DateTime<Utc>,
    items: Vec<LogRecordItem>,
}

impl Changelog {
    /// Wrap a `changelog` payload.
    pub fn from_value(
        value: serde_json::Value,
        issue_key: &str,
        created: DateTime<Utc>,
    ) -> Result<Self> {
        let data: HistoryData = crate::api::decode(value)?;
        Ok(Self {
            id: data.id,
            issue_key: issue_key.to_string(),
            created,
            items: data
                .items
                .into_iter()
                .map(|item| LogRecordItem::new(item, created))
                .collect(),
        })
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn issue_key(&self) -> &str {
        &self.issue_key
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn items(&self) -> &[LogRecordItem] {
        &self.items
    }

    /// Items matching a predicate.
    pub fn filter<P>(&self, predicate: P) -> Vec<&LogRecordItem>
    where
        P: Fn(&LogRecordItem) -> bool,
    {
        self.items.iter().filter(|item| predicate(item)).collect()
    }
}
