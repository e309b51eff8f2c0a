//! Slot identity and per-slot occupancy state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::{Category, CategoryParseError};
use crate::vehicle::Vehicle;

const SEPARATOR: &str = "_SLOT_";

/// Identity of a slot: category plus 1-based sequence number.
///
/// Rendered as `CAR_SLOT_1`. Stable for the lifetime of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotId {
    category: Category,
    number: u32,
}

impl SlotId {
    pub fn new(category: Category, number: u32) -> Self {
        Self { category, number }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.category, SEPARATOR, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotIdParseError {
    #[error("malformed slot id '{0}', expected <CATEGORY>_SLOT_<n>")]
    Malformed(String),
    #[error(transparent)]
    Category(#[from] CategoryParseError),
    #[error("invalid slot number '{0}'")]
    Number(String),
}

impl FromStr for SlotId {
    type Err = SlotIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (category, number) = s
            .split_once(SEPARATOR)
            .ok_or_else(|| SlotIdParseError::Malformed(s.to_string()))?;
        let category = category.parse::<Category>()?;
        let number = number
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| SlotIdParseError::Number(number.to_string()))?;
        Ok(Self::new(category, number))
    }
}

impl TryFrom<String> for SlotId {
    type Error = SlotIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotId> for String {
    fn from(id: SlotId) -> Self {
        id.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Occupied,
}

/// What an occupied slot holds: the vehicle and when it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    pub vehicle: Vehicle,
    pub since: DateTime<Utc>,
}

/// A single unit of capacity.
///
/// Status is derived from whether an occupancy is present, so a slot can
/// never be occupied without an occupant and entry time, or vice versa.
#[derive(Debug, Clone)]
pub struct Slot {
    id: SlotId,
    occupancy: Option<Occupancy>,
}

impl Slot {
    pub(crate) fn available(id: SlotId) -> Self {
        Self {
            id,
            occupancy: None,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn status(&self) -> SlotStatus {
        match self.occupancy {
            Some(_) => SlotStatus::Occupied,
            None => SlotStatus::Available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.occupancy.is_none()
    }

    pub fn occupancy(&self) -> Option<&Occupancy> {
        self.occupancy.as_ref()
    }

    /// Returns the previous occupancy if the slot was not available (bug in caller).
    pub(crate) fn occupy(&mut self, occupancy: Occupancy) -> Option<Occupancy> {
        self.occupancy.replace(occupancy)
    }

    pub(crate) fn vacate(&mut self) -> Option<Occupancy> {
        self.occupancy.take()
    }
}
