//! Links between issues.

use tracing::{debug, info};

use super::Issue;
use crate::api::types::{IssueData, IssueLinkData, LinkTypeData, Visibility};
use crate::api::{is_numeric, names_match, JiraClient};
use crate::error::{Error, Result};

/// Fields cached for the far side of a link.
const LINKED_ISSUE_FIELDS: &[&str] = &["summary", "status", "priority", "issuetype"];

/// A link type, e.g. `Blocks` with descriptions `blocks` / `is blocked by`.
///
/// Setters are kept locally until [`LinkType::save`]. A link type with id 0
/// is new and gets created on save.
#[derive(Debug, Clone)]
pub struct LinkType {
    client: JiraClient,
    id: u64,
    data: Option<LinkTypeData>,
    name: Option<String>,
    inward: Option<String>,
    outward: Option<String>,
}

impl LinkType {
    /// Reference a link type by id. Id 0 starts a new link type.
    pub fn new(id: u64, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id,
            data: None,
            name: None,
            inward: None,
            outward: None,
        }
    }

    pub fn from_data(data: LinkTypeData, client: &JiraClient) -> Self {
        let mut link_type = Self::new(data.id, client);
        link_type.data = Some(data);
        link_type
    }

    /// Load a link type by id.
    pub async fn get(id: u64, client: &JiraClient) -> Result<Self> {
        let mut link_type = Self::new(id, client);
        link_type.data().await?;
        Ok(link_type)
    }

    async fn data(&mut self) -> Result<&LinkTypeData> {
        let data = match self.data.take() {
            Some(data) => data,
            None => self.client.issue_link_type().get(self.id, false).await?,
        };
        Ok(self.data.insert(data))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn name(&mut self) -> Result<String> {
        Ok(self.data().await?.name.clone())
    }

    /// Description from the inward side, e.g. `is blocked by`.
    pub async fn inward(&mut self) -> Result<String> {
        Ok(self.data().await?.inward.clone())
    }

    /// Description from the outward side, e.g. `blocks`.
    pub async fn outward(&mut self) -> Result<String> {
        Ok(self.data().await?.outward.clone())
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn set_inward(&mut self, inward: &str) -> &mut Self {
        self.inward = Some(inward.to_string());
        self
    }

    pub fn set_outward(&mut self, outward: &str) -> &mut Self {
        self.outward = Some(outward.to_string());
        self
    }

    /// Send the pending changes, creating the link type when it is new.
    pub async fn save(&mut self) -> Result<()> {
        let has_changes = self.name.is_some() || self.inward.is_some() || self.outward.is_some();
        if self.id != 0 && !has_changes {
            return Ok(());
        }

        let section = self.client.issue_link_type();
        let data = if self.id == 0 {
            section
                .create(
                    self.name.as_deref().unwrap_or_default(),
                    self.inward.as_deref().unwrap_or_default(),
                    self.outward.as_deref().unwrap_or_default(),
                )
                .await?
        } else {
            section
                .update(
                    self.id,
                    self.name.as_deref(),
                    self.inward.as_deref(),
                    self.outward.as_deref(),
                )
                .await?
        };

        self.id = data.id;
        self.data = Some(data);
        self.name = None;
        self.inward = None;
        self.outward = None;
        Ok(())
    }

    pub async fn delete(&self) -> Result<()> {
        if self.id == 0 {
            return Ok(());
        }
        self.client.issue_link_type().delete(self.id).await?;
        Ok(())
    }

    /// Whether this type matches a type id (numeric `wanted`) or a type name.
    fn matches(&self, wanted: &str, case_sensitive: bool) -> bool {
        if is_numeric(wanted) {
            return wanted.parse() == Ok(self.id);
        }
        self.data
            .as_ref()
            .is_some_and(|d| names_match(&d.name, wanted, case_sensitive))
    }
}

/// Which end of a link an issue is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Inward,
    Outward,
}

/// A link between two issues.
///
/// Links listed inside an issue carry only the far side; the owning issue
/// fills in the other.
#[derive(Debug, Clone)]
pub struct Link {
    client: JiraClient,
    id: u64,
    data: Option<IssueLinkData>,
    owner: Option<(Side, String)>,
}

impl Link {
    pub fn new(id: u64, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id,
            data: None,
            owner: None,
        }
    }

    pub fn from_data(data: IssueLinkData, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            id: data.id,
            data: Some(data),
            owner: None,
        }
    }

    /// Wrap an entry of the `issuelinks` field of `owner_key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Link`] when the entry has both sides set; such
    /// payloads do not come from an issue field.
    pub fn from_issue_field(
        data: IssueLinkData,
        owner_key: &str,
        client: &JiraClient,
    ) -> Result<Self> {
        let side = match (&data.inward_issue, &data.outward_issue) {
            (Some(_), Some(_)) => {
                return Err(Error::Link(
                    "Both inward and outward issues are set in an issue link field entry; use Link::from_data instead"
                        .to_string(),
                ))
            }
            (Some(_), None) => Side::Outward,
            _ => Side::Inward,
        };
        let mut link = Self::from_data(data, client);
        link.owner = Some((side, owner_key.to_string()));
        Ok(link)
    }

    /// Load a link by id.
    pub async fn get(id: u64, client: &JiraClient) -> Result<Self> {
        let mut link = Self::new(id, client);
        link.data().await?;
        Ok(link)
    }

    /// Link two issues and load the new link.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Link`] when the new link cannot be found afterwards.
    pub async fn create(
        link_type: &str,
        outward_issue: &str,
        inward_issue: &str,
        comment: &str,
        visibility: Option<&Visibility>,
        client: &JiraClient,
    ) -> Result<Self> {
        client
            .issue_link()
            .create(link_type, outward_issue, inward_issue, comment, visibility)
            .await?;

        // The inward issue may have been moved and renamed since.
        let inward_key = client.issue().get(inward_issue, &["key"], &[], &[]).await?.key;

        let links = client
            .issue_link()
            .list_for_issue(outward_issue, link_type, true)
            .await?;
        let created = links.iter().find(|link| {
            link.inward_issue
                .as_ref()
                .is_some_and(|issue| issue.key == inward_key)
        });

        match created {
            Some(link) => Self::get(link.id, client).await,
            None => Err(Error::Link(
                "Failed to create new link or load its info from API after creation".to_string(),
            )),
        }
    }

    async fn data(&mut self) -> Result<&IssueLinkData> {
        let data = match self.data.take() {
            Some(data) => data,
            None => self.client.issue_link().get(self.id).await?,
        };
        Ok(self.data.insert(data))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn link_type(&mut self) -> Result<LinkType> {
        let client = self.client.clone();
        Ok(LinkType::from_data(
            self.data().await?.link_type.clone(),
            &client,
        ))
    }

    fn owner_key(&self, side: Side) -> Option<&str> {
        match &self.owner {
            Some((owner_side, key)) if *owner_side == side => Some(key.as_str()),
            _ => None,
        }
    }

    async fn side_data(&mut self, side: Side) -> Result<Option<IssueData>> {
        let data = self.data().await?;
        Ok(match side {
            Side::Inward => data.inward_issue.clone(),
            Side::Outward => data.outward_issue.clone(),
        })
    }

    async fn side_key(&mut self, side: Side) -> Result<String> {
        if let Some(key) = self.owner_key(side) {
            return Ok(key.to_string());
        }
        Ok(self
            .side_data(side)
            .await?
            .map(|issue| issue.key)
            .unwrap_or_default())
    }

    async fn side_issue(&mut self, side: Side) -> Result<Issue> {
        if let Some(key) = self.owner_key(side) {
            return Issue::new(key, &self.client);
        }
        match self.side_data(side).await? {
            Some(data) => Issue::from_data(data, LINKED_ISSUE_FIELDS, &[], &self.client),
            None => Err(Error::Link(format!("Link {} has no {:?} issue", self.id, side))),
        }
    }

    pub async fn inward_key(&mut self) -> Result<String> {
        self.side_key(Side::Inward).await
    }

    pub async fn outward_key(&mut self) -> Result<String> {
        self.side_key(Side::Outward).await
    }

    /// The inward issue, with summary, status, priority and type preloaded
    /// when it is the far side.
    pub async fn inward_issue(&mut self) -> Result<Issue> {
        self.side_issue(Side::Inward).await
    }

    pub async fn outward_issue(&mut self) -> Result<Issue> {
        self.side_issue(Side::Outward).await
    }

    pub async fn delete(&self) -> Result<()> {
        self.client.issue_link().delete(self.id).await?;
        Ok(())
    }
}

/// The links of one issue.
#[derive(Debug, Clone)]
pub struct LinksList {
    client: JiraClient,
    issue_key: String,
    links: Option<Vec<Link>>,
}

impl LinksList {
    /// Links of an issue, listed on first access.
    pub fn new(issue_key: &str, client: &JiraClient) -> Self {
        Self {
            client: client.clone(),
            issue_key: issue_key.to_string(),
            links: None,
        }
    }

    /// Wrap the `issuelinks` field of an issue.
    pub(crate) fn from_value(
        value: serde_json::Value,
        issue_key: &str,
        client: &JiraClient,
    ) -> Result<Self> {
        let data: Vec<IssueLinkData> = if value.is_null() {
            Vec::new()
        } else {
            crate::api::decode(value)?
        };
        let mut list = Self::new(issue_key, client);
        list.links = Some(Self::wrap(data, issue_key, client)?);
        Ok(list)
    }

    fn wrap(data: Vec<IssueLinkData>, issue_key: &str, client: &JiraClient) -> Result<Vec<Link>> {
        data.into_iter()
            .map(|link| Link::from_issue_field(link, issue_key, client))
            .collect()
    }

    pub fn issue_key(&self) -> &str {
        &self.issue_key
    }

    /// Forget the loaded links; the next access lists them again.
    pub fn drop_cache(&mut self) {
        self.links = None;
    }

    /// Every link of the issue.
    pub async fn links(&mut self) -> Result<&mut Vec<Link>> {
        let links = match self.links.take() {
            Some(links) => links,
            None => {
                let data = self
                    .client
                    .issue_link()
                    .list_for_issue(&self.issue_key, "", true)
                    .await?;
                Self::wrap(data, &self.issue_key, &self.client)?
            }
        };
        Ok(self.links.insert(links))
    }

    /// Links of one type, given by id (numeric) or name.
    pub async fn links_of_type(&mut self, link_type: &str, case_sensitive: bool) -> Result<Vec<Link>> {
        Ok(self
            .links()
            .await?
            .iter()
            .filter(|link| {
                link.data
                    .as_ref()
                    .is_some_and(|d| type_matches(&d.link_type, link_type, case_sensitive))
            })
            .cloned()
            .collect())
    }

    /// Links where this issue is the outward side, i.e. links pointing in.
    pub async fn inward(&mut self) -> Result<Vec<Link>> {
        self.links_on_side(Side::Outward).await
    }

    /// Links where this issue is the inward side, i.e. links pointing out.
    pub async fn outward(&mut self) -> Result<Vec<Link>> {
        self.links_on_side(Side::Inward).await
    }

    async fn links_on_side(&mut self, own_side: Side) -> Result<Vec<Link>> {
        let mut found = Vec::new();
        let issue_key = self.issue_key.clone();
        for link in self.links().await?.iter_mut() {
            if link.side_key(own_side).await? == issue_key {
                found.push(link.clone());
            }
        }
        Ok(found)
    }

    /// Link another issue as the inward side; this issue is the outward one.
    pub async fn add_inward(
        &mut self,
        issue_key: &str,
        link_type: &str,
        comment: &str,
        visibility: Option<&Visibility>,
    ) -> Result<()> {
        self.client
            .issue_link()
            .create(link_type, &self.issue_key, issue_key, comment, visibility)
            .await?;
        self.drop_cache();
        Ok(())
    }

    /// Link another issue as the outward side; this issue is the inward one.
    pub async fn add_outward(
        &mut self,
        issue_key: &str,
        link_type: &str,
        comment: &str,
        visibility: Option<&Visibility>,
    ) -> Result<()> {
        self.client
            .issue_link()
            .create(link_type, issue_key, &self.issue_key, comment, visibility)
            .await?;
        self.drop_cache();
        Ok(())
    }

    /// Delete links to `issue_key` on either side. An empty `link_type`
    /// matches every type.
    pub async fn remove_link(
        &mut self,
        issue_key: &str,
        link_type: &str,
        case_sensitive: bool,
    ) -> Result<usize> {
        self.remove_where(issue_key, None, link_type, case_sensitive)
            .await
    }

    /// Delete links where `issue_key` is the inward side.
    pub async fn remove_link_inward(
        &mut self,
        issue_key: &str,
        link_type: &str,
        case_sensitive: bool,
    ) -> Result<usize> {
        self.remove_where(issue_key, Some(Side::Inward), link_type, case_sensitive)
            .await
    }

    /// Delete links where `issue_key` is the outward side.
    pub async fn remove_link_outward(
        &mut self,
        issue_key: &str,
        link_type: &str,
        case_sensitive: bool,
    ) -> Result<usize> {
        self.remove_where(issue_key, Some(Side::Outward), link_type, case_sensitive)
            .await
    }

    async fn remove_where(
        &mut self,
        issue_key: &str,
        side: Option<Side>,
        link_type: &str,
        case_sensitive: bool,
    ) -> Result<usize> {
        let links = self.links().await?;
        let mut removed = Vec::new();
        for link in links.iter_mut() {
            let on_side = match side {
                Some(side) => link.side_key(side).await? == issue_key,
                None => {
                    link.side_key(Side::Inward).await? == issue_key
                        || link.side_key(Side::Outward).await? == issue_key
                }
            };
            if !on_side {
                continue;
            }
            let of_type = link_type.is_empty() || {
                let kind = link.data().await?.link_type.clone();
                type_matches(&kind, link_type, case_sensitive)
            };
            if of_type {
                link.delete().await?;
                removed.push(link.id());
            }
        }

        links.retain(|link| !removed.contains(&link.id()));
        if !removed.is_empty() {
            info!(issue_key = %self.issue_key, count = removed.len(), "Links removed");
        } else {
            debug!(issue_key = %self.issue_key, "No links matched for removal");
        }
        Ok(removed.len())
    }
}

fn type_matches(kind: &LinkTypeData, wanted: &str, case_sensitive: bool) -> bool {
    if is_numeric(wanted) {
        return wanted.parse() == Ok(kind.id);
    }
    names_match(&kind.name, wanted, case_sensitive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> JiraClient {
        JiraClient::new("https://jira.example.com").unwrap()
    }

    fn field_links() -> serde_json::Value {
        json!([
            {
                "id": "100",
                "type": {"id": "10000", "name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                "inwardIssue": {"id": "2", "key": "PRJ-2", "fields": {"summary": "Blocker"}}
            },
            {
                "id": "101",
                "type": {"id": "10001", "name": "Relates", "inward": "relates to", "outward": "relates to"},
                "outwardIssue": {"id": "3", "key": "PRJ-3", "fields": {"summary": "Related"}}
            }
        ])
    }

    #[tokio::test]
    async fn test_owner_fills_missing_side() {
        let mut list = LinksList::from_value(field_links(), "PRJ-1", &client()).unwrap();
        let links = list.links().await.unwrap();
        assert_eq!(links.len(), 2);

        let blocks = &mut links[0];
        assert_eq!(blocks.inward_key().await.unwrap(), "PRJ-2");
        assert_eq!(blocks.outward_key().await.unwrap(), "PRJ-1");
        let mut blocker = blocks.inward_issue().await.unwrap();
        assert_eq!(blocker.summary().await.unwrap(), "Blocker");
    }

    #[tokio::test]
    async fn test_inward_and_outward() {
        let mut list = LinksList::from_value(field_links(), "PRJ-1", &client()).unwrap();
        let inward: Vec<u64> = list.inward().await.unwrap().iter().map(Link::id).collect();
        let outward: Vec<u64> = list.outward().await.unwrap().iter().map(Link::id).collect();
        assert_eq!(inward, vec![100]);
        assert_eq!(outward, vec![101]);
    }

    #[tokio::test]
    async fn test_links_of_type() {
        let mut list = LinksList::from_value(field_links(), "PRJ-1", &client()).unwrap();
        assert_eq!(list.links_of_type("blocks", true).await.unwrap().len(), 0);
        assert_eq!(list.links_of_type("blocks", false).await.unwrap().len(), 1);
        assert_eq!(list.links_of_type("10001", true).await.unwrap()[0].id(), 101);
    }

    #[test]
    fn test_field_entry_with_both_sides_is_rejected() {
        let data: IssueLinkData = serde_json::from_value(json!({
            "id": 1,
            "type": {"id": 1, "name": "Blocks"},
            "inwardIssue": {"id": 2, "key": "PRJ-2"},
            "outwardIssue": {"id": 3, "key": "PRJ-3"}
        }))
        .unwrap();
        let err = Link::from_issue_field(data, "PRJ-1", &client()).unwrap_err();
        assert!(matches!(err, Error::Link(_)));
    }

    #[test]
    fn test_link_type_matches() {
        let link_type = LinkType::from_data(
            LinkTypeData {
                id: 10000,
                name: "Blocks".to_string(),
                ..Default::default()
            },
            &client(),
        );
        assert!(link_type.matches("10000", true));
        assert!(link_type.matches("Blocks", true));
        assert!(!link_type.matches("blocks", true));
        assert!(link_type.matches("blocks", false));
    }
}
