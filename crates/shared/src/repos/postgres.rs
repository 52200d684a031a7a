use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{SessionStore, StoreError, StoreFuture};
use crate::models::{ChatMessage, ChatRole, NewRecording, Recording};

/// Postgres-backed session store. Owners are opaque identity subjects from
/// the auth layer; no separate user table is kept.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl SessionStore for Store {
    fn load_thread_messages<'a>(
        &'a self,
        owner: &'a str,
        thread_id: Uuid,
    ) -> StoreFuture<'a, Vec<ChatMessage>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT role, content, created_at
                 FROM messages
                 WHERE user_id = $1
                   AND thread_id = $2
                 ORDER BY created_at ASC",
            )
            .bind(owner)
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter()
                .map(|row| {
                    let role_raw: String = row.try_get("role")?;
                    Ok(ChatMessage {
                        role: role_from_db(&role_raw)?,
                        content: row.try_get("content")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .collect()
        })
    }

    fn append_thread_message<'a>(
        &'a self,
        owner: &'a str,
        thread_id: Uuid,
        recording_id: Option<Uuid>,
        role: ChatRole,
        content: &'a str,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO messages (user_id, thread_id, recording_id, role, content)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(owner)
            .bind(thread_id)
            .bind(recording_id)
            .bind(role.as_str())
            .bind(content)
            .execute(&self.pool)
            .await?;

            Ok(())
        })
    }

    fn save_recording<'a>(
        &'a self,
        owner: &'a str,
        recording: &'a NewRecording,
    ) -> StoreFuture<'a, Uuid> {
        Box::pin(async move {
            let row = sqlx::query(
                "INSERT INTO recordings (user_id, audio_url, transcription, duration)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id",
            )
            .bind(owner)
            .bind(&recording.audio_url)
            .bind(&recording.transcription)
            .bind(recording.duration_seconds)
            .fetch_one(&self.pool)
            .await?;

            Ok(row.try_get("id")?)
        })
    }

    fn list_recordings<'a>(
        &'a self,
        owner: &'a str,
        limit: i64,
    ) -> StoreFuture<'a, Vec<Recording>> {
        Box::pin(async move {
            let rows = sqlx::query(
                "SELECT id, audio_url, transcription, duration, created_at
                 FROM recordings
                 WHERE user_id = $1
                 ORDER BY created_at DESC
                 LIMIT $2",
            )
            .bind(owner)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter()
                .map(|row| {
                    Ok(Recording {
                        id: row.try_get("id")?,
                        audio_url: row.try_get("audio_url")?,
                        transcription: row.try_get("transcription")?,
                        duration_seconds: row.try_get("duration")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .collect()
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }
}

fn role_from_db(value: &str) -> Result<ChatRole, StoreError> {
    match value {
        "user" => Ok(ChatRole::User),
        "assistant" => Ok(ChatRole::Assistant),
        _ => Err(StoreError::InvalidData(format!(
            "unknown message role persisted: {value}"
        ))),
    }
}
