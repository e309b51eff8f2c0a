//! Lot configuration: capacity per category and the hourly rate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::fee::DEFAULT_HOURLY_RATE;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LotConfigError {
    #[error("hourly rate must be a finite, non-negative number (got {0})")]
    InvalidRate(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotConfig {
    #[serde(default = "default_capacities")]
    pub capacities: BTreeMap<Category, u32>,
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: f64,
}

fn default_capacities() -> BTreeMap<Category, u32> {
    BTreeMap::from([
        (Category::Car, 5),
        (Category::Motorcycle, 3),
        (Category::Truck, 2),
    ])
}

fn default_hourly_rate() -> f64 {
    DEFAULT_HOURLY_RATE
}

impl Default for LotConfig {
    fn default() -> Self {
        Self {
            capacities: default_capacities(),
            hourly_rate: default_hourly_rate(),
        }
    }
}

impl LotConfig {
    pub fn validate(&self) -> Result<(), LotConfigError> {
        if !self.hourly_rate.is_finite() || self.hourly_rate < 0.0 {
            return Err(LotConfigError::InvalidRate(self.hourly_rate));
        }
        Ok(())
    }
}
