//! jira-rest - an object model over the JIRA REST API.
//!
//! The crate has two layers:
//! - [`api`]: a raw HTTP client that builds URLs, authenticates, classifies
//!   failures and groups the endpoints by resource
//! - the object model ([`Issue`], [`User`], [`Version`], ...) that loads
//!   data lazily, caches it and sends collected edits on save
//!
//! ```no_run
//! use jira_rest::{Issue, JiraClient};
//!
//! # async fn run() -> jira_rest::Result<()> {
//! let client = JiraClient::with_credentials("https://jira.example.com", "jdoe", "secret")?;
//! let mut issue = Issue::new("PRJ-1", &client)?;
//! issue.add_comment("Deployed to staging", None).await?;
//! issue.step("Resolve", false, true).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod component;
pub mod config;
pub mod custom_fields;
pub mod error;
pub mod group;
pub mod issue;
pub mod logging;
pub mod user;
pub mod users_list;
pub mod version;

pub use api::{ApiError, JiraClient, RawClient};
pub use component::{AssigneeType, Component};
pub use error::{Error, Result};
pub use group::Group;
pub use issue::{
    Attachments, Comment, CreateRequest, File, History, Issue, Link, LinkType, LinksList,
    WatchersList,
};
pub use user::User;
pub use users_list::UsersList;
pub use version::Version;
