use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{ChatMessage, ChatRole, NewRecording, Recording};
use crate::repos::{SessionStore, StoreError, StoreFuture};

/// In-process stand-in for the Postgres store, keyed the same way.
#[derive(Default)]
pub(crate) struct InMemoryStore {
    messages: Mutex<HashMap<(String, Uuid), Vec<ChatMessage>>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl InMemoryStore {
    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) fn thread_messages(&self, owner: &str, thread_id: Uuid) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .expect("messages lock")
            .get(&(owner.to_string(), thread_id))
            .cloned()
            .unwrap_or_default()
    }
}

impl SessionStore for InMemoryStore {
    fn load_thread_messages<'a>(
        &'a self,
        owner: &'a str,
        thread_id: Uuid,
    ) -> StoreFuture<'a, Vec<ChatMessage>> {
        Box::pin(async move { Ok(self.thread_messages(owner, thread_id)) })
    }

    fn append_thread_message<'a>(
        &'a self,
        owner: &'a str,
        thread_id: Uuid,
        _recording_id: Option<Uuid>,
        role: ChatRole,
        content: &'a str,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StoreError::Unavailable("writes disabled".to_string()));
            }
            self.messages
                .lock()
                .expect("messages lock")
                .entry((owner.to_string(), thread_id))
                .or_default()
                .push(ChatMessage {
                    role,
                    content: content.to_string(),
                    created_at: Utc::now(),
                });
            Ok(())
        })
    }

    fn save_recording<'a>(
        &'a self,
        _owner: &'a str,
        _recording: &'a NewRecording,
    ) -> StoreFuture<'a, Uuid> {
        Box::pin(async move { Ok(Uuid::new_v4()) })
    }

    fn list_recordings<'a>(
        &'a self,
        _owner: &'a str,
        _limit: i64,
    ) -> StoreFuture<'a, Vec<Recording>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }
}
