//! Slot storage.
//!
//! One contiguous sequence of slots per category, scanned in ascending slot
//! number for allocation. Slots are created once and only toggle between
//! available and occupied afterwards.

mod pool;
mod slot;

pub use pool::{LotUsage, SlotPool};
pub use slot::{Occupancy, Slot, SlotId, SlotIdParseError, SlotStatus};
