//! Messages exchanged between editor instances sharing a collaboration channel.

use serde::{Deserialize, Serialize};

use crate::{HistoryEntry, SceneSnapshot};

/// Cross-tab wire message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncMessage {
    /// Full scene plus the sender's history log
    SceneUpdate {
        objects: SceneSnapshot,
        log: Vec<HistoryEntry>,
        /// Scene before the oldest entry of `log`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        baseline: Option<SceneSnapshot>,
    },
    /// Pointer position in percent of the sender's viewport
    CursorUpdate {
        #[serde(rename = "userId")]
        user_id: String,
        user: String,
        x: f64,
        y: f64,
    },
    /// Presence keep-alive
    Heartbeat {
        #[serde(rename = "userId")]
        user_id: String,
        user: String,
    },
}

impl SyncMessage {
    /// Sender id, for messages that carry one
    pub fn user_id(&self) -> Option<&str> {
        match self {
            SyncMessage::SceneUpdate { .. } => None,
            SyncMessage::CursorUpdate { user_id, .. } | SyncMessage::Heartbeat { user_id, .. } => {
                Some(user_id)
            }
        }
    }
}
