//! Stored entities. Distinct from the brainly-types wire shapes so the store
//! stays independent of the HTTP contract.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use brainly_types::models::ContentType;

use crate::{StoreError, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    /// Argon2 PHC string.
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub id: Uuid,
    pub title: String,
    pub link: String,
    pub kind: ContentType,
    pub tags: Vec<Uuid>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A content row joined with its owner's username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedContent {
    pub content: ContentRecord,
    pub owner_username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinkRecord {
    pub hash: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContent {
    pub title: String,
    pub link: String,
    pub kind: ContentType,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl NewContent {
    /// Applies the content schema to loosely typed input: every field is
    /// required and `kind` must name a known content type.
    pub fn parse(
        owner_id: Uuid,
        title: Option<String>,
        link: Option<String>,
        kind: Option<String>,
    ) -> StoreResult<Self> {
        let title = required("title", title)?;
        let link = required("link", link)?;
        let kind = required("type", kind)?
            .parse::<ContentType>()
            .map_err(|e| StoreError::Validation(e.to_string()))?;

        Ok(Self {
            title,
            link,
            kind,
            owner_id,
            created_at: Utc::now(),
        })
    }

    pub(crate) fn check(&self) -> StoreResult<()> {
        if self.title.is_empty() {
            return Err(StoreError::Validation("title is required".into()));
        }
        if self.link.is_empty() {
            return Err(StoreError::Validation("link is required".into()));
        }
        Ok(())
    }
}

fn required(field: &str, value: Option<String>) -> StoreResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(StoreError::Validation(format!("{} is required", field))),
    }
}
