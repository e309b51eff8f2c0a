//! Per-category slot sequences.
//!
//! No locking here. Every method assumes the caller already holds exclusive
//! access (see [`OccupancyManager`](crate::manager::OccupancyManager)).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::slot::{Occupancy, Slot, SlotId};
use crate::category::Category;
use crate::vehicle::Vehicle;

/// Capacity and occupancy of one category at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LotUsage {
    pub category: Category,
    pub capacity: u32,
    pub occupied: u32,
}

impl LotUsage {
    pub fn available(&self) -> u32 {
        self.capacity - self.occupied
    }

    pub fn is_full(&self) -> bool {
        self.occupied >= self.capacity
    }
}

/// Slots for one category, in ascending sequence order.
#[derive(Debug)]
struct Lane {
    slots: Vec<Slot>,
    occupied: u32,
}

impl Lane {
    fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }
}

/// Ordered slot sequences keyed by category.
#[derive(Debug, Default)]
pub struct SlotPool {
    lanes: BTreeMap<Category, Lane>,
}

impl SlotPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `capacity` available slots numbered `1..=capacity`.
    ///
    /// A category can be initialized once; a second call is a bug in the
    /// caller and leaves the existing lane untouched.
    pub fn initialize(&mut self, category: Category, capacity: u32) {
        if self.lanes.contains_key(&category) {
            debug_assert!(false, "category initialized twice");
            tracing::error!(%category, "Bug: category initialized twice, keeping existing slots");
            return;
        }

        let slots = (1..=capacity)
            .map(|n| Slot::available(SlotId::new(category, n)))
            .collect();
        self.lanes.insert(category, Lane { slots, occupied: 0 });
    }

    pub fn contains(&self, category: Category) -> bool {
        self.lanes.contains_key(&category)
    }

    pub fn capacity(&self, category: Category) -> Option<u32> {
        self.lanes.get(&category).map(Lane::capacity)
    }

    pub fn occupied_count(&self, category: Category) -> Option<u32> {
        self.lanes.get(&category).map(|lane| lane.occupied)
    }

    /// First available slot by ascending number.
    ///
    /// `None` both for an unknown category and for a full one.
    pub fn find_first_available(&self, category: Category) -> Option<SlotId> {
        self.lanes
            .get(&category)?
            .slots
            .iter()
            .find(|slot| slot.is_available())
            .map(Slot::id)
    }

    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        let index = id.number().checked_sub(1)? as usize;
        self.lanes.get(&id.category())?.slots.get(index)
    }

    /// Mark `id` occupied by `vehicle` from `now`.
    ///
    /// Returns `false` without changing anything if the slot does not exist
    /// or is already occupied.
    pub fn set_occupied(&mut self, id: SlotId, vehicle: Vehicle, now: DateTime<Utc>) -> bool {
        let Some(lane) = self.lanes.get_mut(&id.category()) else {
            return false;
        };
        let Some(slot) = slot_mut(&mut lane.slots, id) else {
            return false;
        };
        if !slot.is_available() {
            return false;
        }

        slot.occupy(Occupancy {
            vehicle,
            since: now,
        });
        lane.occupied += 1;
        debug_assert!(lane.occupied <= lane.capacity());
        true
    }

    /// Mark `id` available, handing back what it held.
    ///
    /// `None` if the slot does not exist or was not occupied.
    pub fn set_available(&mut self, id: SlotId) -> Option<Occupancy> {
        let lane = self.lanes.get_mut(&id.category())?;
        let occupancy = slot_mut(&mut lane.slots, id)?.vacate()?;
        lane.occupied -= 1;
        Some(occupancy)
    }

    /// Occupied slots, by category then slot number.
    pub fn occupied(&self) -> impl Iterator<Item = (SlotId, &Occupancy)> {
        self.lanes
            .values()
            .flat_map(|lane| lane.slots.iter())
            .filter_map(|slot| slot.occupancy().map(|o| (slot.id(), o)))
    }

    pub fn usage(&self) -> impl Iterator<Item = LotUsage> + '_ {
        self.lanes.iter().map(|(category, lane)| LotUsage {
            category: *category,
            capacity: lane.capacity(),
            occupied: lane.occupied,
        })
    }
}

fn slot_mut(slots: &mut [Slot], id: SlotId) -> Option<&mut Slot> {
    let index = id.number().checked_sub(1)? as usize;
    slots.get_mut(index)
}
