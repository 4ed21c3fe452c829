use std::sync::{Mutex, MutexGuard};

use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::models::{ContentRecord, NewContent, OwnedContent, ShareLinkRecord, UserRecord};
use crate::repo::{ContentRepository, LinkRepository, UserRepository};
use crate::{StoreError, StoreResult};

/// In-process store with the same uniqueness and ownership rules as the
/// SQLite schema. Used by tests and by anything that wants a throwaway
/// backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    contents: Vec<ContentRecord>,
    links: Vec<ShareLinkRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }
}

impl UserRepository for MemoryStore {
    fn insert_user(&self, username: &str, password_hash: &str) -> StoreResult<UserRecord> {
        let mut t = self.tables()?;
        if t.users.iter().any(|u| u.username == username) {
            return Err(StoreError::Conflict(format!("username {} taken", username)));
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password: password_hash.to_string(),
            created_at: Utc::now().trunc_subsecs(6),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(self.tables()?.user(id).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let t = self.tables()?;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }
}

impl ContentRepository for MemoryStore {
    fn insert_content(&self, content: NewContent) -> StoreResult<ContentRecord> {
        content.check()?;

        let mut t = self.tables()?;
        if t.user(content.owner_id).is_none() {
            return Err(StoreError::Validation(format!(
                "owner {} does not exist",
                content.owner_id
            )));
        }

        let record = ContentRecord {
            id: Uuid::new_v4(),
            title: content.title,
            link: content.link,
            kind: content.kind,
            tags: Vec::new(),
            owner_id: content.owner_id,
            created_at: content.created_at.trunc_subsecs(6),
        };
        t.contents.push(record.clone());
        Ok(record)
    }

    fn find_content_by_id(&self, id: Uuid) -> StoreResult<Option<ContentRecord>> {
        let t = self.tables()?;
        Ok(t.contents.iter().find(|c| c.id == id).cloned())
    }

    fn find_contents_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<OwnedContent>> {
        let t = self.tables()?;
        let Some(owner) = t.user(owner_id) else {
            return Ok(Vec::new());
        };

        Ok(t.contents
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .map(|c| OwnedContent {
                content: c.clone(),
                owner_username: owner.username.clone(),
            })
            .collect())
    }

    fn delete_content(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables()?;
        let before = t.contents.len();
        t.contents.retain(|c| !(c.id == id && c.owner_id == owner_id));
        Ok(t.contents.len() < before)
    }
}

impl LinkRepository for MemoryStore {
    fn insert_link_if_absent(&self, owner_id: Uuid, hash: &str) -> StoreResult<ShareLinkRecord> {
        let mut t = self.tables()?;
        if let Some(existing) = t.links.iter().find(|l| l.owner_id == owner_id) {
            return Ok(existing.clone());
        }
        if t.links.iter().any(|l| l.hash == hash) {
            return Err(StoreError::Conflict(format!("hash {} taken", hash)));
        }
        if t.user(owner_id).is_none() {
            return Err(StoreError::Validation(format!(
                "owner {} does not exist",
                owner_id
            )));
        }

        let link = ShareLinkRecord {
            hash: hash.to_string(),
            owner_id,
            created_at: Utc::now().trunc_subsecs(6),
        };
        t.links.push(link.clone());
        Ok(link)
    }

    fn find_link_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<ShareLinkRecord>> {
        let t = self.tables()?;
        Ok(t.links.iter().find(|l| l.owner_id == owner_id).cloned())
    }

    fn find_link_by_hash(&self, hash: &str) -> StoreResult<Option<ShareLinkRecord>> {
        let t = self.tables()?;
        Ok(t.links.iter().find(|l| l.hash == hash).cloned())
    }

    fn delete_link_by_owner(&self, owner_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables()?;
        let before = t.links.len();
        t.links.retain(|l| l.owner_id != owner_id);
        Ok(t.links.len() < before)
    }
}
