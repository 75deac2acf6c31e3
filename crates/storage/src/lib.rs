//! Client-local persistence.
//!
//! The only durable state the conversation core owns is the per-conversation
//! meeting session record. Everything else (conversations, timelines,
//! presence) is rebuilt from the server on demand.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

use shared::domain::ConversationId;

/// A short-lived record associating a conversation with an external
/// video-call room. Expiry is lazy: reads purge stale rows first, so a
/// record past `expires_at` is never observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingSessionRecord {
    pub conversation_id: ConversationId,
    pub url: String,
    pub link_posted: bool,
    pub expires_at: DateTime<Utc>,
}

impl MeetingSessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        let storage = Self { pool };
        storage.ensure_meeting_sessions_table().await?;
        Ok(storage)
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_meeting_sessions_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meeting_sessions (
                conversation_id TEXT PRIMARY KEY,
                url             TEXT NOT NULL,
                link_posted     INTEGER NOT NULL DEFAULT 0,
                expires_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure meeting_sessions table exists")?;
        Ok(())
    }

    pub async fn upsert_meeting_session(&self, record: &MeetingSessionRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO meeting_sessions (conversation_id, url, link_posted, expires_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(conversation_id) DO UPDATE SET
                 url = excluded.url,
                 link_posted = excluded.link_posted,
                 expires_at = excluded.expires_at",
        )
        .bind(&record.conversation_id.0)
        .bind(&record.url)
        .bind(record.link_posted)
        .bind(record.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("failed to upsert meeting session")?;
        Ok(())
    }

    /// Fetch the active session for a conversation, purging expired rows
    /// first so callers never see a stale record.
    pub async fn meeting_session(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<MeetingSessionRecord>> {
        self.purge_expired_meeting_sessions().await?;

        let row = sqlx::query(
            "SELECT conversation_id, url, link_posted, expires_at
             FROM meeting_sessions WHERE conversation_id = ?",
        )
        .bind(&conversation_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(meeting_session_from_row).transpose()
    }

    /// Returns whether a record existed.
    pub async fn delete_meeting_session(&self, conversation_id: &ConversationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM meeting_sessions WHERE conversation_id = ?")
            .bind(&conversation_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired_meeting_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM meeting_sessions WHERE expires_at <= ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("failed to purge expired meeting sessions")?;
        Ok(result.rows_affected())
    }
}

fn meeting_session_from_row(row: sqlx::sqlite::SqliteRow) -> Result<MeetingSessionRecord> {
    let expires_at: String = row.try_get("expires_at")?;
    let expires_at = DateTime::parse_from_rfc3339(&expires_at)
        .context("invalid expires_at stored for meeting session")?
        .with_timezone(&Utc);
    Ok(MeetingSessionRecord {
        conversation_id: ConversationId::new(row.try_get::<String, _>("conversation_id")?),
        url: row.try_get("url")?,
        link_posted: row.try_get("link_posted")?,
        expires_at,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }
    let path = PathBuf::from(path);
    if let Some(parent) = path.parent().filter(|p| *p != Path::new("")) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create database directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn memory_storage() -> Storage {
        Storage::new("sqlite::memory:").await.expect("storage")
    }

    fn record(conversation: &str, ttl_minutes: i64) -> MeetingSessionRecord {
        MeetingSessionRecord {
            conversation_id: ConversationId::new(conversation),
            url: format!("https://meet.example.com/{conversation}"),
            link_posted: false,
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
        }
    }

    #[tokio::test]
    async fn upsert_then_fetch_round_trips() {
        let storage = memory_storage().await;
        let mut stored = record("c1", 120);
        storage.upsert_meeting_session(&stored).await.expect("upsert");

        let fetched = storage
            .meeting_session(&stored.conversation_id)
            .await
            .expect("fetch")
            .expect("record present");
        assert_eq!(fetched.url, stored.url);
        assert!(!fetched.link_posted);

        stored.link_posted = true;
        storage.upsert_meeting_session(&stored).await.expect("update");
        let fetched = storage
            .meeting_session(&stored.conversation_id)
            .await
            .expect("fetch")
            .expect("record present");
        assert!(fetched.link_posted);
    }

    #[tokio::test]
    async fn expired_records_are_purged_on_read() {
        let storage = memory_storage().await;
        let stale = record("c2", -5);
        storage.upsert_meeting_session(&stale).await.expect("upsert");

        let fetched = storage
            .meeting_session(&stale.conversation_id)
            .await
            .expect("fetch");
        assert!(fetched.is_none());

        // The purge removed the row, not just hid it.
        let purged = storage
            .purge_expired_meeting_sessions()
            .await
            .expect("purge");
        assert_eq!(purged, 0);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_record_existed() {
        let storage = memory_storage().await;
        let stored = record("c3", 60);
        storage.upsert_meeting_session(&stored).await.expect("upsert");

        assert!(storage
            .delete_meeting_session(&stored.conversation_id)
            .await
            .expect("delete"));
        assert!(!storage
            .delete_meeting_session(&stored.conversation_id)
            .await
            .expect("second delete"));
    }

    #[tokio::test]
    async fn sessions_are_isolated_by_conversation() {
        let storage = memory_storage().await;
        storage.upsert_meeting_session(&record("c4", 60)).await.expect("a");
        storage.upsert_meeting_session(&record("c5", 60)).await.expect("b");

        let fetched = storage
            .meeting_session(&ConversationId::new("c4"))
            .await
            .expect("fetch")
            .expect("record present");
        assert!(fetched.url.ends_with("/c4"));
    }
}
