//! Vehicle categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification of a vehicle. Each category has its own capacity and
/// slot sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Car,
    Motorcycle,
    Truck,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Car, Category::Motorcycle, Category::Truck];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Car => "CAR",
            Self::Motorcycle => "MOTORCYCLE",
            Self::Truck => "TRUCK",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vehicle category '{0}', expected one of CAR, MOTORCYCLE, TRUCK")]
pub struct CategoryParseError(pub String);

impl FromStr for Category {
    type Err = CategoryParseError;

    /// Case-insensitive: `car`, `Car` and `CAR` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CategoryParseError(s.to_string()))
    }
}
