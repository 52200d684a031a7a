use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use shared::models::{ChatMessage, ChatRole, NewRecording, Recording};
use shared::repos::{SessionStore, StoreError, StoreFuture};
use uuid::Uuid;

/// In-process session store with the same `(owner, thread)` keying as the
/// Postgres store, so API tests run without a database.
#[derive(Default)]
pub struct InMemoryStore {
    messages: Mutex<HashMap<(String, Uuid), Vec<ChatMessage>>>,
    recordings: Mutex<HashMap<String, Vec<Recording>>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn thread_messages(&self, owner: &str, thread_id: Uuid) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .expect("messages lock")
            .get(&(owner.to_string(), thread_id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn message_count(&self) -> usize {
        self.messages
            .lock()
            .expect("messages lock")
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn recordings_for(&self, owner: &str) -> Vec<Recording> {
        self.recordings
            .lock()
            .expect("recordings lock")
            .get(owner)
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
        Box::pin(async move {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("reads disabled".to_string()));
            }
            Ok(self.thread_messages(owner, thread_id))
        })
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
            if self.fail_writes.load(Ordering::SeqCst) {
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
        owner: &'a str,
        recording: &'a NewRecording,
    ) -> StoreFuture<'a, Uuid> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("writes disabled".to_string()));
            }
            let id = Uuid::new_v4();
            self.recordings
                .lock()
                .expect("recordings lock")
                .entry(owner.to_string())
                .or_default()
                .push(Recording {
                    id,
                    audio_url: recording.audio_url.clone(),
                    transcription: recording.transcription.clone(),
                    duration_seconds: recording.duration_seconds,
                    created_at: Utc::now(),
                });
            Ok(id)
        })
    }

    fn list_recordings<'a>(
        &'a self,
        owner: &'a str,
        limit: i64,
    ) -> StoreFuture<'a, Vec<Recording>> {
        Box::pin(async move {
            // Newest first, matching the Postgres store's ordering.
            let mut recordings = self.recordings_for(owner);
            recordings.reverse();
            recordings.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(recordings)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("reads disabled".to_string()));
            }
            Ok(())
        })
    }
}
