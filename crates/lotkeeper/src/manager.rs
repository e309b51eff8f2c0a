//! OccupancyManager: the only mutation surface over the slot pool.
//!
//! A single mutex covers every category. `park`, `release` and the read-only
//! views each run as one critical section, so a slot found available is
//! occupied before any other caller can look at it. The sections do no I/O
//! and take no other lock.
//!
//! The lock could be split per category without changing any guarantee
//! here, since no operation touches two categories at once.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::category::Category;
use crate::clock::{Clock, SystemClock};
use crate::lot::{LotUsage, SlotId, SlotPool};
use crate::vehicle::Vehicle;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParkError {
    #[error("no {0} slots are configured")]
    UnknownCategory(Category),
    #[error("all {0} slots are occupied")]
    Full(Category),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReleaseError {
    #[error("slot {0} does not exist")]
    NotFound(SlotId),
    #[error("slot {0} is not occupied")]
    NotOccupied(SlotId),
}

/// What `release` hands back: the vehicle and when it entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Released {
    pub slot_id: SlotId,
    pub vehicle: Vehicle,
    pub entered_at: DateTime<Utc>,
}

/// A successful `park`: where the vehicle went and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Parked {
    pub slot_id: SlotId,
    pub entered_at: DateTime<Utc>,
}

/// One row of the current occupancy listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupiedSlot {
    pub slot_id: SlotId,
    pub vehicle: Vehicle,
    pub entered_at: DateTime<Utc>,
}

/// Shared, thread-safe owner of the slot pool.
///
/// Built once from a capacity map; the set of slots never changes afterwards.
pub struct OccupancyManager {
    pool: Mutex<SlotPool>,
    clock: Arc<dyn Clock>,
}

impl OccupancyManager {
    pub fn new(capacities: &BTreeMap<Category, u32>) -> Self {
        Self::with_clock(capacities, Arc::new(SystemClock))
    }

    pub fn with_clock(capacities: &BTreeMap<Category, u32>, clock: Arc<dyn Clock>) -> Self {
        let mut pool = SlotPool::new();
        for (category, capacity) in capacities {
            pool.initialize(*category, *capacity);
        }
        Self {
            pool: Mutex::new(pool),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Lock the pool. A poisoned lock is recovered: transitions are single
    /// assignments, so the pool is consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, SlotPool> {
        match self.pool.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Slot pool mutex poisoned - continuing with recovered state");
                poisoned.into_inner()
            }
        }
    }

    /// Put `vehicle` in the first available slot of its category.
    pub fn park(&self, vehicle: Vehicle) -> Result<SlotId, ParkError> {
        self.park_with_entry(vehicle).map(|parked| parked.slot_id)
    }

    /// Like [`park`](Self::park), also reporting the recorded entry time.
    pub fn park_with_entry(&self, vehicle: Vehicle) -> Result<Parked, ParkError> {
        let category = vehicle.category;
        let now = self.clock.now();
        let mut pool = self.lock();

        if !pool.contains(category) {
            return Err(ParkError::UnknownCategory(category));
        }
        let slot_id = pool
            .find_first_available(category)
            .ok_or(ParkError::Full(category))?;

        let vehicle_id = vehicle.id.clone();
        if !pool.set_occupied(slot_id, vehicle, now) {
            // Unreachable while the lock is held across find and set.
            debug_assert!(false, "slot found available but could not be occupied");
            tracing::error!(slot = %slot_id, "Bug: available slot refused occupancy");
            return Err(ParkError::Full(category));
        }

        tracing::debug!(slot = %slot_id, vehicle = %vehicle_id, %category, "Vehicle parked");
        Ok(Parked {
            slot_id,
            entered_at: now,
        })
    }

    /// Free `slot_id`, returning its vehicle and entry time.
    pub fn release(&self, slot_id: SlotId) -> Result<Released, ReleaseError> {
        let mut pool = self.lock();

        let slot = pool.slot(slot_id).ok_or(ReleaseError::NotFound(slot_id))?;
        if slot.is_available() {
            return Err(ReleaseError::NotOccupied(slot_id));
        }
        let occupancy = pool
            .set_available(slot_id)
            .ok_or(ReleaseError::NotOccupied(slot_id))?;

        tracing::debug!(slot = %slot_id, vehicle = %occupancy.vehicle.id, "Slot released");
        Ok(Released {
            slot_id,
            vehicle: occupancy.vehicle,
            entered_at: occupancy.since,
        })
    }

    pub fn list_occupied(&self) -> Vec<OccupiedSlot> {
        self.lock()
            .occupied()
            .map(|(slot_id, occupancy)| OccupiedSlot {
                slot_id,
                vehicle: occupancy.vehicle.clone(),
                entered_at: occupancy.since,
            })
            .collect()
    }

    pub fn usage(&self) -> Vec<LotUsage> {
        self.lock().usage().collect()
    }

    pub fn capacity(&self, category: Category) -> Option<u32> {
        self.lock().capacity(category)
    }

    pub fn occupied_count(&self, category: Category) -> Option<u32> {
        self.lock().occupied_count(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::lot::SlotStatus;
    use crate::vehicle::VehicleId;
    use chrono::TimeDelta;
    use std::collections::HashSet;
    use std::sync::Barrier;

    fn capacities(entries: &[(Category, u32)]) -> BTreeMap<Category, u32> {
        entries.iter().copied().collect()
    }

    fn vehicle(id: &str, category: Category) -> Vehicle {
        Vehicle::new(VehicleId::new(id), category, format!("{id}-PLATE"))
    }

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn park_assigns_first_slot() {
        let manager = OccupancyManager::new(&capacities(&[(Category::Car, 2)]));
        let slot = manager.park(vehicle("a", Category::Car)).unwrap();
        assert_eq!(slot.to_string(), "CAR_SLOT_1");
        assert_eq!(manager.occupied_count(Category::Car), Some(1));
    }

    #[test]
    fn park_unknown_category_leaves_state_unchanged() {
        let manager = OccupancyManager::new(&capacities(&[(Category::Car, 1)]));
        assert_eq!(
            manager.park(vehicle("t", Category::Truck)),
            Err(ParkError::UnknownCategory(Category::Truck))
        );
        assert!(manager.list_occupied().is_empty());
        assert_eq!(manager.occupied_count(Category::Car), Some(0));
    }

    #[test]
    fn park_full_leaves_state_unchanged() {
        let manager = OccupancyManager::new(&capacities(&[(Category::Car, 1)]));
        manager.park(vehicle("a", Category::Car)).unwrap();
        let before = manager.list_occupied();

        assert_eq!(
            manager.park(vehicle("b", Category::Car)),
            Err(ParkError::Full(Category::Car))
        );
        assert_eq!(manager.list_occupied(), before);
    }

    #[test]
    fn park_with_entry_reports_clock_time() {
        let clock = Arc::new(ManualClock::new(start()));
        let manager = OccupancyManager::with_clock(
            &capacities(&[(Category::Truck, 1)]),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        let parked = manager.park_with_entry(vehicle("t", Category::Truck)).unwrap();
        assert_eq!(parked.slot_id, SlotId::new(Category::Truck, 1));
        assert_eq!(parked.entered_at, start());
    }

    /// Records whether the pool mutex was free each time the time is read.
    struct LockCheckingClock {
        manager: std::sync::OnceLock<std::sync::Weak<OccupancyManager>>,
        read_while_locked: std::sync::atomic::AtomicBool,
    }

    impl Clock for LockCheckingClock {
        fn now(&self) -> DateTime<Utc> {
            if let Some(manager) = self.manager.get().and_then(|m| m.upgrade())
                && manager.pool.try_lock().is_err()
            {
                self.read_while_locked
                    .store(true, std::sync::atomic::Ordering::SeqCst);
            }
            start()
        }
    }

    #[test]
    fn clock_is_read_outside_the_pool_lock() {
        let clock = Arc::new(LockCheckingClock {
            manager: std::sync::OnceLock::new(),
            read_while_locked: std::sync::atomic::AtomicBool::new(false),
        });
        let manager = Arc::new(OccupancyManager::with_clock(
            &capacities(&[(Category::Car, 1)]),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        clock.manager.set(Arc::downgrade(&manager)).unwrap();

        let parked = manager.park_with_entry(vehicle("a", Category::Car)).unwrap();
        assert_eq!(parked.entered_at, start());
        assert!(
            !clock
                .read_while_locked
                .load(std::sync::atomic::Ordering::SeqCst)
        );
    }

    #[test]
    fn categories_are_independent() {
        let manager = OccupancyManager::new(&capacities(&[
            (Category::Car, 1),
            (Category::Motorcycle, 1),
        ]));
        manager.park(vehicle("a", Category::Car)).unwrap();

        let slot = manager.park(vehicle("m", Category::Motorcycle)).unwrap();
        assert_eq!(slot.to_string(), "MOTORCYCLE_SLOT_1");
    }

    #[test]
    fn release_unknown_slot_is_not_found() {
        let manager = OccupancyManager::new(&capacities(&[(Category::Car, 1)]));
        manager.park(vehicle("a", Category::Car)).unwrap();
        let before = manager.list_occupied();

        let beyond = SlotId::new(Category::Car, 2);
        assert_eq!(manager.release(beyond), Err(ReleaseError::NotFound(beyond)));
        let other = SlotId::new(Category::Truck, 1);
        assert_eq!(manager.release(other), Err(ReleaseError::NotFound(other)));
        assert_eq!(manager.list_occupied(), before);
    }

    #[test]
    fn release_available_slot_is_not_occupied() {
        let manager = OccupancyManager::new(&capacities(&[(Category::Car, 2)]));
        manager.park(vehicle("a", Category::Car)).unwrap();
        let before = manager.list_occupied();

        let free = SlotId::new(Category::Car, 2);
        assert_eq!(manager.release(free), Err(ReleaseError::NotOccupied(free)));
        assert_eq!(manager.list_occupied(), before);
    }

    #[test]
    fn release_twice_fails_second_time() {
        let manager = OccupancyManager::new(&capacities(&[(Category::Car, 1)]));
        let slot = manager.park(vehicle("a", Category::Car)).unwrap();
        manager.release(slot).unwrap();
        assert_eq!(manager.release(slot), Err(ReleaseError::NotOccupied(slot)));
        assert_eq!(manager.occupied_count(Category::Car), Some(0));
    }

    #[test]
    fn released_slot_is_reused() {
        let manager = OccupancyManager::new(&capacities(&[(Category::Car, 3)]));
        let first = manager.park(vehicle("a", Category::Car)).unwrap();
        manager.park(vehicle("b", Category::Car)).unwrap();
        manager.release(first).unwrap();

        assert_eq!(manager.park(vehicle("c", Category::Car)).unwrap(), first);
    }

    #[test]
    fn end_to_end_single_car_slot() {
        let clock = Arc::new(ManualClock::new(start()));
        let manager = OccupancyManager::with_clock(
            &capacities(&[(Category::Car, 1)]),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        let a = vehicle("A", Category::Car);
        let b = vehicle("B", Category::Car);

        let slot = manager.park(a.clone()).unwrap();
        assert_eq!(slot.to_string(), "CAR_SLOT_1");

        clock.advance(TimeDelta::minutes(5));
        assert_eq!(manager.park(b.clone()), Err(ParkError::Full(Category::Car)));

        clock.advance(TimeDelta::minutes(30));
        let released = manager.release(slot).unwrap();
        assert_eq!(
            released,
            Released {
                slot_id: slot,
                vehicle: a,
                entered_at: start(),
            }
        );

        assert_eq!(manager.park(b).unwrap(), slot);
        let listing = manager.list_occupied();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].vehicle.id, VehicleId::new("B"));
        assert_eq!(listing[0].entered_at, start() + TimeDelta::minutes(35));
    }

    #[test]
    fn list_occupied_holds_vehicle_and_entry() {
        let clock = Arc::new(ManualClock::new(start()));
        let manager = OccupancyManager::with_clock(
            &capacities(&[(Category::Car, 2), (Category::Truck, 1)]),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        manager.park(vehicle("t", Category::Truck)).unwrap();
        clock.advance(TimeDelta::seconds(10));
        manager.park(vehicle("c", Category::Car)).unwrap();

        let listing = manager.list_occupied();
        assert_eq!(
            listing
                .iter()
                .map(|o| (o.slot_id.to_string(), o.entered_at))
                .collect::<Vec<_>>(),
            [
                ("CAR_SLOT_1".to_string(), start() + TimeDelta::seconds(10)),
                ("TRUCK_SLOT_1".to_string(), start()),
            ]
        );
    }

    #[test]
    fn concurrent_parks_fill_exactly_capacity() {
        const CAPACITY: u32 = 8;
        const CALLERS: usize = 64;

        let manager = OccupancyManager::new(&capacities(&[(Category::Car, CAPACITY)]));
        let barrier = Barrier::new(CALLERS);

        let results: Vec<Result<SlotId, ParkError>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|i| {
                    let manager = &manager;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        manager.park(vehicle(&format!("v{i}"), Category::Car))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let granted: Vec<SlotId> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
        let full = results
            .iter()
            .filter(|r| **r == Err(ParkError::Full(Category::Car)))
            .count();

        assert_eq!(granted.len(), CAPACITY as usize);
        assert_eq!(full, CALLERS - CAPACITY as usize);
        let distinct: HashSet<SlotId> = granted.iter().copied().collect();
        assert_eq!(distinct.len(), granted.len(), "slot assigned twice");
        assert_eq!(manager.occupied_count(Category::Car), Some(CAPACITY));
    }

    #[test]
    fn concurrent_churn_keeps_invariants() {
        const CAPACITY: u32 = 4;
        const WORKERS: usize = 16;
        const ROUNDS: usize = 200;

        let manager = OccupancyManager::new(&capacities(&[
            (Category::Car, CAPACITY),
            (Category::Motorcycle, CAPACITY),
        ]));

        std::thread::scope(|s| {
            for w in 0..WORKERS {
                let manager = &manager;
                s.spawn(move || {
                    let category = if w % 2 == 0 {
                        Category::Car
                    } else {
                        Category::Motorcycle
                    };
                    for r in 0..ROUNDS {
                        if let Ok(slot) = manager.park(vehicle(&format!("w{w}-{r}"), category)) {
                            for usage in manager.usage() {
                                assert!(usage.occupied <= usage.capacity);
                            }
                            manager.release(slot).unwrap();
                        }
                    }
                });
            }
        });

        for usage in manager.usage() {
            assert_eq!(usage.occupied, 0);
        }
        let pool = manager.lock();
        for category in [Category::Car, Category::Motorcycle] {
            for n in 1..=CAPACITY {
                let slot = pool.slot(SlotId::new(category, n)).unwrap();
                assert_eq!(slot.status(), SlotStatus::Available);
                assert!(slot.occupancy().is_none());
            }
        }
    }
}
