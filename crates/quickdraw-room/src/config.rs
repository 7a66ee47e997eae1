//! Room configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every room a registry creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Capacity of each room actor's command queue. Senders wait when it
    /// is full, which bounds the work one room can have outstanding.
    pub command_buffer: usize,

    /// Longest accepted display name, in characters, after trimming.
    pub max_name_chars: usize,

    /// Random draws tried before the registry falls back to scanning the
    /// code space for a free code.
    pub random_code_attempts: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            max_name_chars: 20,
            random_code_attempts: 64,
        }
    }
}
