use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use brainly_types::models::ContentType;

use crate::models::{ContentRecord, NewContent, OwnedContent, ShareLinkRecord, UserRecord};
use crate::repo::{ContentRepository, LinkRepository, UserRepository};
use crate::{Database, StoreError, StoreResult};

impl UserRepository for Database {
    fn insert_user(&self, username: &str, password_hash: &str) -> StoreResult<UserRecord> {
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password: password_hash.to_string(),
            created_at: now(),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (
                    user.id.to_string(),
                    &user.username,
                    &user.password,
                    encode_time(user.created_at),
                ),
            )
            .map_err(StoreError::classify)?;
            Ok(())
        })?;

        Ok(user)
    }

    fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }
}

impl ContentRepository for Database {
    fn insert_content(&self, content: NewContent) -> StoreResult<ContentRecord> {
        content.check()?;

        let record = ContentRecord {
            id: Uuid::new_v4(),
            title: content.title,
            link: content.link,
            kind: content.kind,
            tags: Vec::new(),
            owner_id: content.owner_id,
            created_at: content.created_at.trunc_subsecs(6),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO contents (id, title, link, type, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    record.id.to_string(),
                    &record.title,
                    &record.link,
                    record.kind.as_str(),
                    record.owner_id.to_string(),
                    encode_time(record.created_at),
                ),
            )
            .map_err(StoreError::classify)?;
            Ok(())
        })?;

        Ok(record)
    }

    fn find_content_by_id(&self, id: Uuid) -> StoreResult<Option<ContentRecord>> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT id, title, link, type, user_id, created_at FROM contents WHERE id = ?1",
                    [id.to_string()],
                    content_from_row,
                )
                .optional()?;

            let Some(mut record) = record else {
                return Ok(None);
            };

            let mut stmt =
                conn.prepare("SELECT tag_id FROM content_tags WHERE content_id = ?1 ORDER BY rowid")?;
            record.tags = stmt
                .query_map([id.to_string()], |row| uuid_at(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Some(record))
        })
    }

    fn find_contents_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<OwnedContent>> {
        self.with_conn(|conn| {
            let owner = owner_id.to_string();

            // JOIN users so the owner's username comes back with each row
            let mut stmt = conn.prepare(
                "SELECT c.id, c.title, c.link, c.type, c.user_id, c.created_at, u.username
                 FROM contents c
                 JOIN users u ON c.user_id = u.id
                 WHERE c.user_id = ?1
                 ORDER BY c.rowid",
            )?;
            let mut rows = stmt
                .query_map([&owner], |row| {
                    Ok(OwnedContent {
                        content: content_from_row(row)?,
                        owner_username: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            // Batch-fetch tag references for all of the owner's content
            let mut stmt = conn.prepare(
                "SELECT ct.content_id, ct.tag_id
                 FROM content_tags ct
                 JOIN contents c ON c.id = ct.content_id
                 WHERE c.user_id = ?1
                 ORDER BY ct.rowid",
            )?;
            let mut tags: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
            for pair in stmt.query_map([&owner], |row| Ok((uuid_at(row, 0)?, uuid_at(row, 1)?)))? {
                let (content_id, tag_id) = pair?;
                tags.entry(content_id).or_default().push(tag_id);
            }

            for row in &mut rows {
                if let Some(t) = tags.remove(&row.content.id) {
                    row.content.tags = t;
                }
            }

            Ok(rows)
        })
    }

    fn delete_content(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM contents WHERE id = ?1 AND user_id = ?2",
                (id.to_string(), owner_id.to_string()),
            )?;
            Ok(removed > 0)
        })
    }
}

impl LinkRepository for Database {
    fn insert_link_if_absent(&self, owner_id: Uuid, hash: &str) -> StoreResult<ShareLinkRecord> {
        let owner = owner_id.to_string();

        self.with_conn(|conn| {
            // UNIQUE(user_id) makes the second of two racing enables a no-op
            conn.execute(
                "INSERT INTO links (hash, user_id, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO NOTHING",
                (hash, &owner, encode_time(now())),
            )
            .map_err(StoreError::classify)?;

            query_link(conn, "user_id", &owner)?.ok_or_else(|| {
                StoreError::Corrupt(format!("link for {} vanished after insert", owner))
            })
        })
    }

    fn find_link_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<ShareLinkRecord>> {
        self.with_conn(|conn| query_link(conn, "user_id", &owner_id.to_string()))
    }

    fn find_link_by_hash(&self, hash: &str) -> StoreResult<Option<ShareLinkRecord>> {
        self.with_conn(|conn| query_link(conn, "hash", hash))
    }

    fn delete_link_by_owner(&self, owner_id: Uuid) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let removed =
                conn.execute("DELETE FROM links WHERE user_id = ?1", [owner_id.to_string()])?;
            Ok(removed > 0)
        })
    }
}

/// `column` is always a literal chosen by this module.
fn query_user(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<UserRecord>> {
    let sql = format!(
        "SELECT id, username, password, created_at FROM users WHERE {} = ?1",
        column
    );

    let row = conn
        .query_row(&sql, [value], |row| {
            Ok(UserRecord {
                id: uuid_at(row, 0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: time_at(row, 3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_link(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<ShareLinkRecord>> {
    let sql = format!(
        "SELECT hash, user_id, created_at FROM links WHERE {} = ?1",
        column
    );

    let row = conn
        .query_row(&sql, [value], |row| {
            Ok(ShareLinkRecord {
                hash: row.get(0)?,
                owner_id: uuid_at(row, 1)?,
                created_at: time_at(row, 2)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Expects `id, title, link, type, user_id, created_at` as the first columns.
fn content_from_row(row: &Row<'_>) -> rusqlite::Result<ContentRecord> {
    let kind: String = row.get(3)?;
    let kind = kind
        .parse::<ContentType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(ContentRecord {
        id: uuid_at(row, 0)?,
        title: row.get(1)?,
        link: row.get(2)?,
        kind,
        tags: Vec::new(),
        owner_id: uuid_at(row, 4)?,
        created_at: time_at(row, 5)?,
    })
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Microsecond precision, so values survive a round trip through TEXT.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}
