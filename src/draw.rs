//! draw.rs: per-room append-only log of whiteboard commands.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawCommand {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub kind: String, // e.g. "line", "dot"
}

#[derive(Debug, Default)]
pub struct DrawBoard {
    rooms: RwLock<HashMap<String, Vec<DrawCommand>>>,
}

impl DrawBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to a room, creating it on first use.
    pub fn push(&self, room_id: &str, cmd: DrawCommand) {
        let mut rooms = self.rooms.write().expect("draw board poisoned");
        rooms.entry(room_id.to_string()).or_default().push(cmd);
    }

    pub fn commands(&self, room_id: &str) -> Result<Vec<DrawCommand>> {
        self.rooms
            .read()
            .expect("draw board poisoned")
            .get(room_id)
            .cloned()
            .ok_or_else(|| ServiceError::room_not_found(room_id))
    }
}
