//! JIRA REST API client and types.
//!
//! [`RawClient`] talks HTTP and classifies failures; [`JiraClient`] groups the
//! endpoints by resource and keeps the per-client caches.

mod auth;
mod cache;
mod client;
pub mod error;
mod section;
pub mod types;

pub use auth::{delete_token, get_token, has_token, store_token, Auth, KEYRING_SERVICE};
pub use client::{Query, RawClient, DEFAULT_API_PREFIX, DEFAULT_TIMEOUT_SECS};
pub use error::{ApiError, Result};
pub use section::*;

pub(crate) use section::{decode, is_numeric, names_match};
