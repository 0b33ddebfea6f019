//! Per-thread conversation checkpoints, held in process memory.

use std::collections::HashMap;
use std::sync::Arc;

use knowbridge_core::message::Message;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Maps thread ids to their message history.
///
/// Each thread has its own lock: turns on the same thread run one after
/// another, turns on different threads do not wait for each other.
/// Nothing is evicted and nothing survives a restart.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    threads: RwLock<HashMap<String, Arc<Mutex<Vec<Message>>>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, thread_id: &str) -> Arc<Mutex<Vec<Message>>> {
        if let Some(slot) = self.threads.read().await.get(thread_id) {
            return slot.clone();
        }
        self.threads
            .write()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .clone()
    }

    /// Take exclusive hold of a thread's history for the duration of a turn.
    /// A thread seen for the first time starts empty.
    pub async fn lock(&self, thread_id: &str) -> OwnedMutexGuard<Vec<Message>> {
        self.slot(thread_id).await.lock_owned().await
    }

    /// Copy of a thread's history; empty for unknown threads.
    pub async fn history(&self, thread_id: &str) -> Vec<Message> {
        let slot = self.threads.read().await.get(thread_id).cloned();
        match slot {
            Some(slot) => slot.lock().await.clone(),
            None => Vec::new(),
        }
    }
}
