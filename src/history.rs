//! Bounded conversation history
//!
//! Per-room append-only log with FIFO eviction at a fixed capacity. The
//! orchestrator writes one entry per turn side (user, assistant); the store
//! owns eviction, so writers never reason about capacity.
//!
//! Room ids follow the `ai:{user_id}` convention so the assistant's rooms
//! never collide with any human-to-human conversation keyed by the same ids.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::RwLock;

/// Which side of the conversation produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// One persisted conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub room_id: String,
    pub timestamp: DateTime<Utc>,
    pub sender_id: i64,
    pub sender: Sender,
    pub message: String,
}

/// Errors from the history store
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store failed: {0}")]
    Storage(String),
}

/// Room id for a user's assistant conversation
pub fn room_for_user(user_id: i64) -> String {
    format!("ai:{}", user_id)
}

/// Append-plus-eviction contract for conversation history
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one entry, evicting oldest-first past the capacity
    async fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError>;

    /// All entries for a room in insertion order
    async fn entries(&self, room_id: &str) -> Result<Vec<HistoryEntry>, HistoryError>;
}

/// In-process history store
///
/// Rooms map to insertion-ordered deques; eviction pops from the front after
/// every append that pushes a room past capacity.
pub struct InMemoryHistory {
    capacity: usize,
    rooms: RwLock<HashMap<String, VecDeque<HistoryEntry>>>,
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(entry.room_id.clone()).or_default();
        room.push_back(entry);
        while room.len() > self.capacity {
            room.pop_front();
        }
        Ok(())
    }

    async fn entries(&self, room_id: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        let rooms = self.rooms.read().await;
        Ok(rooms
            .get(room_id)
            .map(|room| room.iter().cloned().collect())
            .unwrap_or_default())
    }
}
