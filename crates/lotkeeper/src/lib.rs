//! lotkeeper: concurrent slot allocation and occupancy tracking for parking lots.

mod category;
mod clock;
mod config;
mod fee;
mod health;
mod vehicle;
mod version;

pub mod lot;
pub mod manager;
pub mod service;
pub mod transport;

pub use category::{Category, CategoryParseError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LotConfig, LotConfigError};
pub use fee::{DEFAULT_HOURLY_RATE, FeeError, compute_fee};
pub use health::Health;
pub use lot::{LotUsage, SlotId, SlotIdParseError, SlotStatus};
pub use manager::{OccupancyManager, OccupiedSlot, ParkError, Parked, ReleaseError, Released};
pub use service::{ExitError, ExitReceipt, HealthSnapshot, ParkingService};
pub use vehicle::{Vehicle, VehicleId};
pub use version::{LOTKEEPER_VERSION, VersionInfo};
