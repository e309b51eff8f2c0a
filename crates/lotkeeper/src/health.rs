//! Health status reported by the transport.

use serde::{Deserialize, Serialize};

use crate::lot::LotUsage;

/// Whether the lot can take another vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Health {
    /// At least one category has a free slot
    Ready,
    /// Every configured category is at capacity
    Full,
}

impl Health {
    pub fn from_usage(usage: &[LotUsage]) -> Self {
        if usage.iter().any(|lot| !lot.is_full()) {
            Health::Ready
        } else {
            Health::Full
        }
    }
}
