//! Cached catalogs: issue types, priorities, resolutions, statuses, status
//! categories, link types and security levels.
//!
//! Each catalog is fetched once per client and served from memory afterwards
//! unless a reload is requested.

use std::marker::PhantomData;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

use super::{decode, JiraClient};
use crate::api::cache::{lock, Catalog, Caches};
use crate::api::error::Result;
use crate::api::types::{
    IssueTypeData, LinkTypeData, PriorityData, ResolutionData, SecurityLevelData,
    StatusCategoryData, StatusData,
};

/// A JIRA object kept in a per-client catalog.
pub trait CatalogItem: DeserializeOwned + Clone {
    /// API method of the resource, e.g. `priority`.
    const PATH: &'static str;

    /// Whether `GET <PATH>` lists every item.
    const LISTABLE: bool = true;

    /// Name of the field wrapping the list in the `GET <PATH>` answer.
    const LIST_FIELD: Option<&'static str> = None;

    fn id(&self) -> u64;

    fn name(&self) -> &str;

    #[doc(hidden)]
    fn catalog(caches: &Caches) -> &Mutex<Catalog<Self>>;
}

macro_rules! catalog_item {
    ($ty:ty, $path:literal, $cache:ident) => {
        impl CatalogItem for $ty {
            const PATH: &'static str = $path;

            fn id(&self) -> u64 {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn catalog(caches: &Caches) -> &Mutex<Catalog<Self>> {
                &caches.$cache
            }
        }
    };
}

catalog_item!(IssueTypeData, "issuetype", issue_types);
catalog_item!(PriorityData, "priority", priorities);
catalog_item!(ResolutionData, "resolution", resolutions);
catalog_item!(StatusData, "status", statuses);
catalog_item!(StatusCategoryData, "statuscategory", status_categories);

impl CatalogItem for LinkTypeData {
    const PATH: &'static str = "issueLinkType";
    const LIST_FIELD: Option<&'static str> = Some("issueLinkTypes");

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn catalog(caches: &Caches) -> &Mutex<Catalog<Self>> {
        &caches.link_types
    }
}

impl CatalogItem for SecurityLevelData {
    const PATH: &'static str = "securitylevel";
    const LISTABLE: bool = false;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn catalog(caches: &Caches) -> &Mutex<Catalog<Self>> {
        &caches.security_levels
    }
}

/// Endpoints of one cached catalog.
#[derive(Debug)]
pub struct CatalogSection<'a, T> {
    client: &'a JiraClient,
    _item: PhantomData<T>,
}

impl<T> Clone for CatalogSection<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CatalogSection<'_, T> {}

impl<'a, T: CatalogItem> CatalogSection<'a, T> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self {
            client,
            _item: PhantomData,
        }
    }

    fn cache(&self) -> &Mutex<Catalog<T>> {
        T::catalog(self.client.caches())
    }

    /// List every item, loading the catalog on first use.
    ///
    /// Security levels cannot be listed; for them this returns what was
    /// fetched by id so far.
    pub async fn list(&self, reload: bool) -> Result<Vec<T>> {
        {
            let cache = lock(self.cache());
            if (cache.complete || !T::LISTABLE) && !reload {
                return Ok(cache.all());
            }
        }
        if !T::LISTABLE {
            return Ok(lock(self.cache()).all());
        }

        debug!(path = T::PATH, "Loading catalog");
        let mut value = self.client.raw().get(T::PATH, &[]).await?;
        if let Some(field) = T::LIST_FIELD {
            value = value.get(field).cloned().unwrap_or(Value::Array(Vec::new()));
        }
        let items: Vec<T> = decode(value)?;

        lock(self.cache()).fill(items.iter().map(|item| (item.id(), item.clone())));
        Ok(items)
    }

    /// Get one item by id.
    pub async fn get(&self, id: u64, reload: bool) -> Result<T> {
        if !reload {
            if let Some(item) = lock(self.cache()).get(id) {
                return Ok(item);
            }
        }

        let item: T = decode(
            self.client
                .raw()
                .get(&format!("{}/{}", T::PATH, id), &[])
                .await?,
        )?;
        lock(self.cache()).insert(id, item.clone());
        Ok(item)
    }

    /// Find an item by its display name.
    pub async fn search_by_name(
        &self,
        name: &str,
        case_sensitive: bool,
        reload: bool,
    ) -> Result<Option<T>> {
        let items = self.list(reload).await?;
        Ok(items
            .into_iter()
            .find(|item| names_match(item.name(), name, case_sensitive)))
    }
}

impl CatalogSection<'_, LinkTypeData> {
    /// Create a new link type.
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str, inward: &str, outward: &str) -> Result<LinkTypeData> {
        let body = json!({ "name": name, "inward": inward, "outward": outward });
        let created: LinkTypeData = decode(self.client.raw().post(LinkTypeData::PATH, &body).await?)?;
        lock(self.cache()).insert(created.id, created.clone());
        info!(link_type_id = created.id, "Link type created");
        Ok(created)
    }

    /// Update a link type. `None` leaves a property unchanged.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: u64,
        name: Option<&str>,
        inward: Option<&str>,
        outward: Option<&str>,
    ) -> Result<LinkTypeData> {
        let mut body = Map::new();
        for (key, value) in [("name", name), ("inward", inward), ("outward", outward)] {
            if let Some(value) = value {
                body.insert(key.to_string(), json!(value));
            }
        }

        let updated: LinkTypeData = decode(
            self.client
                .raw()
                .put(&format!("{}/{}", LinkTypeData::PATH, id), &Value::Object(body))
                .await?,
        )?;
        lock(self.cache()).insert(updated.id, updated.clone());
        info!(link_type_id = id, "Link type updated");
        Ok(updated)
    }

    /// Delete a link type.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<()> {
        self.client
            .raw()
            .delete(&format!("{}/{}", LinkTypeData::PATH, id), &[])
            .await?;
        lock(self.cache()).items.remove(&id);
        info!(link_type_id = id, "Link type deleted");
        Ok(())
    }
}

pub(crate) fn names_match(candidate: &str, wanted: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        candidate == wanted
    } else {
        candidate.to_lowercase() == wanted.to_lowercase()
    }
}
