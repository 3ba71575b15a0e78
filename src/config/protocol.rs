//! Wire protocol configuration types.

use super::defaults::default_room_code_length;
use serde::{Deserialize, Serialize};

/// Protocol configuration for validation.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    /// Length of generated room codes
    #[serde(default = "default_room_code_length")]
    pub room_code_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            room_code_length: default_room_code_length(),
        }
    }
}
