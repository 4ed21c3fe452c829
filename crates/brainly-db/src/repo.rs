//! Repository interfaces, one per entity. Implemented by the SQLite
//! [`Database`](crate::Database) and by [`MemoryStore`](crate::MemoryStore).

use uuid::Uuid;

use crate::StoreResult;
use crate::models::{ContentRecord, NewContent, OwnedContent, ShareLinkRecord, UserRecord};

pub trait UserRepository {
    /// Fails with `StoreError::Conflict` when the username is taken.
    fn insert_user(&self, username: &str, password_hash: &str) -> StoreResult<UserRecord>;

    fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;
}

pub trait ContentRepository {
    /// Fails with `StoreError::Validation` when the owner does not exist or a
    /// required field is empty. Tags start empty.
    fn insert_content(&self, content: NewContent) -> StoreResult<ContentRecord>;

    fn find_content_by_id(&self, id: Uuid) -> StoreResult<Option<ContentRecord>>;

    /// All content of one owner in creation order, owner expanded to username.
    fn find_contents_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<OwnedContent>>;

    /// Deletes only when both the id and the owner match. Returns whether a
    /// row was removed.
    fn delete_content(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool>;
}

pub trait LinkRepository {
    /// Stores `hash` for `owner_id` unless the owner already has a link, and
    /// returns whichever link is stored afterwards. Atomic per store.
    ///
    /// Fails with `StoreError::Conflict` if `hash` already belongs to another
    /// owner.
    fn insert_link_if_absent(&self, owner_id: Uuid, hash: &str) -> StoreResult<ShareLinkRecord>;

    fn find_link_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<ShareLinkRecord>>;

    fn find_link_by_hash(&self, hash: &str) -> StoreResult<Option<ShareLinkRecord>>;

    /// Returns whether a link was removed.
    fn delete_link_by_owner(&self, owner_id: Uuid) -> StoreResult<bool>;
}

/// Everything the API layer needs from persistence.
pub trait Store: UserRepository + ContentRepository + LinkRepository + Send + Sync {}

impl<T> Store for T where T: UserRepository + ContentRepository + LinkRepository + Send + Sync {}
