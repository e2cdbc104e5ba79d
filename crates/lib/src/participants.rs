//! Participant registry: sender id -> lightweight user record.
//!
//! Records are created on first sight and refreshed on every event; they are
//! never removed here. The last-seen room is last-write-wins across rooms.

use crate::room::{MembersType, RoomAddress};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A chat user as the bot runtime sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: String,
    /// Display name captured when the record was created.
    pub name: String,
    /// Room of the most recent event from this user.
    pub room: RoomAddress,
    pub room_kind: MembersType,
}

/// In-memory user store shared between the adapter and the bot runtime.
pub struct ParticipantRegistry {
    inner: Arc<RwLock<HashMap<String, Participant>>>,
}

impl Default for ParticipantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create or refresh the record for `id` under one write lock; returns the updated record.
    /// `name` is only used when the record is new.
    pub fn upsert(
        &self,
        id: &str,
        name: &str,
        room: &RoomAddress,
        room_kind: MembersType,
    ) -> Participant {
        let mut g = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let participant = g.entry(id.to_string()).or_insert_with(|| Participant {
            id: id.to_string(),
            name: name.to_string(),
            room: room.clone(),
            room_kind: room_kind.clone(),
        });
        participant.room = room.clone();
        participant.room_kind = room_kind;
        participant.clone()
    }

    pub fn get(&self, id: &str) -> Option<Participant> {
        let g = self.inner.read().unwrap_or_else(|e| e.into_inner());
        g.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
