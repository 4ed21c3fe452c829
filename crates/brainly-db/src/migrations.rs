use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            -- Referenced by contents, never written by the API.
            CREATE TABLE tags (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL UNIQUE
            );

            CREATE TABLE contents (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL CHECK (length(title) > 0),
                link        TEXT NOT NULL CHECK (length(link) > 0),
                type        TEXT NOT NULL
                    CHECK (type IN ('Youtube', 'Twitter', 'Notion', 'Instagram', 'Facebook')),
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_contents_user ON contents(user_id);

            CREATE TABLE content_tags (
                content_id  TEXT NOT NULL REFERENCES contents(id) ON DELETE CASCADE,
                tag_id      TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (content_id, tag_id)
            );

            CREATE TABLE links (
                hash        TEXT NOT NULL UNIQUE,
                user_id     TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
