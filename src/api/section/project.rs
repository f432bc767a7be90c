//! `project` endpoints.

use std::cmp::Ordering;

use super::{decode, join, segment, JiraClient};
use crate::api::error::Result;
use crate::api::types::{ComponentData, ProjectData, ProjectIssueTypeStatuses, VersionData};

/// Project endpoints. Projects are referenced by key or numeric id.
#[derive(Debug, Clone, Copy)]
pub struct ProjectSection<'a> {
    client: &'a JiraClient,
}

impl<'a> ProjectSection<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// Get a project.
    pub async fn get(&self, project: &str, expand: &[&str]) -> Result<ProjectData> {
        let mut query = Vec::new();
        if !expand.is_empty() {
            query.push(("expand", join(expand)));
        }
        decode(
            self.client
                .raw()
                .get(&format!("project/{}", segment(project)), &query)
                .await?,
        )
    }

    /// List components of a project.
    pub async fn components(&self, project: &str) -> Result<Vec<ComponentData>> {
        decode(
            self.client
                .raw()
                .get(&format!("project/{}/components", segment(project)), &[])
                .await?,
        )
    }

    /// List versions of a project.
    pub async fn versions(&self, project: &str) -> Result<Vec<VersionData>> {
        decode(
            self.client
                .raw()
                .get(&format!("project/{}/versions", segment(project)), &[])
                .await?,
        )
    }

    /// The version with the highest name, compared as version numbers.
    ///
    /// On equal names the last listed version wins.
    pub async fn latest_version(&self, project: &str) -> Result<Option<VersionData>> {
        let mut versions = self.versions(project).await?;
        let Some(mut latest) = versions.pop() else {
            return Ok(None);
        };
        for version in versions {
            if compare_versions(&version.name, &latest.name) == Ordering::Greater {
                latest = version;
            }
        }
        Ok(Some(latest))
    }

    /// List statuses per issue type of a project.
    pub async fn statuses(&self, project: &str) -> Result<Vec<ProjectIssueTypeStatuses>> {
        decode(
            self.client
                .raw()
                .get(&format!("project/{}/statuses", segment(project)), &[])
                .await?,
        )
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum VersionPart<'s> {
    // Pre-release markers sort below numbers.
    Text(&'s str),
    Number(u64),
}

fn version_parts(version: &str) -> Vec<VersionPart<'_>> {
    let mut parts = Vec::new();
    for chunk in version.split(|c: char| matches!(c, '.' | '-' | '_' | '+')) {
        let mut rest = chunk;
        while !rest.is_empty() {
            let digits = rest.chars().take_while(char::is_ascii_digit).count();
            if digits > 0 {
                parts.push(VersionPart::Number(rest[..digits].parse().unwrap_or(u64::MAX)));
                rest = &rest[digits..];
            } else {
                let len = rest
                    .char_indices()
                    .find(|(_, c)| c.is_ascii_digit())
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                parts.push(VersionPart::Text(&rest[..len]));
                rest = &rest[len..];
            }
        }
    }
    parts
}

/// Compare two version strings part by part: numbers numerically, text
/// lexically, text before numbers.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = version_parts(a);
    let b = version_parts(b);
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_versions_numeric() {
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("2.0.0", "2.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.2", "1.2.1"), Ordering::Less);
    }

    #[test]
    fn test_compare_versions_prerelease() {
        assert_eq!(compare_versions("1.0-beta", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0rc1", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_compare_versions_text() {
        assert_eq!(compare_versions("release-b", "release-a"), Ordering::Greater);
    }
}
