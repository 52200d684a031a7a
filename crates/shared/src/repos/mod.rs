pub mod postgres;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{ChatMessage, ChatRole, NewRecording, Recording};

pub use postgres::Store;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid stored data: {0}")]
    InvalidData(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Persistence seam for conversation threads and transcribed recordings.
/// Thread history is scoped to the `(owner, thread_id)` pair; an owner can
/// never observe another owner's messages through this interface.
pub trait SessionStore: Send + Sync {
    fn load_thread_messages<'a>(
        &'a self,
        owner: &'a str,
        thread_id: Uuid,
    ) -> StoreFuture<'a, Vec<ChatMessage>>;

    fn append_thread_message<'a>(
        &'a self,
        owner: &'a str,
        thread_id: Uuid,
        recording_id: Option<Uuid>,
        role: ChatRole,
        content: &'a str,
    ) -> StoreFuture<'a, ()>;

    fn save_recording<'a>(
        &'a self,
        owner: &'a str,
        recording: &'a NewRecording,
    ) -> StoreFuture<'a, Uuid>;

    fn list_recordings<'a>(&'a self, owner: &'a str, limit: i64)
    -> StoreFuture<'a, Vec<Recording>>;

    fn ping(&self) -> StoreFuture<'_, ()>;
}
