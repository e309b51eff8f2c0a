//! ParkingService: transport-agnostic facade over the occupancy manager.
//!
//! This service owns:
//! - The shared OccupancyManager (slot allocation and release)
//! - The hourly rate used to price exits
//! - Shutdown coordination for transports
//!
//! Transports (HTTP today) delegate to this service and only translate
//! results into their own wire format.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::config::{LotConfig, LotConfigError};
use crate::fee::{FeeError, compute_fee};
use crate::health::Health;
use crate::lot::{LotUsage, SlotId};
use crate::manager::{OccupancyManager, OccupiedSlot, ParkError, Parked, ReleaseError, Released};
use crate::vehicle::Vehicle;
use crate::version::VersionInfo;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExitError {
    #[error(transparent)]
    Release(#[from] ReleaseError),
    /// The slot was freed but the stay could not be priced. The released
    /// occupancy is handed back so the vehicle is not lost.
    #[error("slot {} was released but not priced: {source}", released.slot_id)]
    Fee {
        released: Released,
        #[source]
        source: FeeError,
    },
}

/// Result of a vehicle leaving: the released occupancy priced at exit time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExitReceipt {
    pub slot_id: SlotId,
    pub vehicle: Vehicle,
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
    pub fee: f64,
}

/// Snapshot of lot health for transports to report.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub state: Health,
    pub lots: Vec<LotUsage>,
    pub version: VersionInfo,
}

pub struct ParkingService {
    manager: Arc<OccupancyManager>,
    hourly_rate: f64,

    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,

    version: VersionInfo,
}

impl ParkingService {
    pub fn new(manager: Arc<OccupancyManager>, hourly_rate: f64) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            manager,
            hourly_rate,
            shutdown_tx,
            shutdown_rx,
            version: VersionInfo::new(),
        }
    }

    /// Validate `config` and build a service with a fresh manager on the system clock.
    pub fn from_config(config: &LotConfig) -> Result<Self, LotConfigError> {
        config.validate()?;
        let manager = Arc::new(OccupancyManager::new(&config.capacities));
        Ok(Self::new(manager, config.hourly_rate))
    }

    pub fn manager(&self) -> &Arc<OccupancyManager> {
        &self.manager
    }

    pub fn hourly_rate(&self) -> f64 {
        self.hourly_rate
    }

    pub fn park(&self, vehicle: Vehicle) -> Result<Parked, ParkError> {
        self.manager.park_with_entry(vehicle)
    }

    /// Release `slot_id` and price the stay up to now.
    ///
    /// The slot is freed even if pricing fails (the clock reads earlier than
    /// the recorded entry); the error then carries the released occupancy.
    pub fn exit(&self, slot_id: SlotId) -> Result<ExitReceipt, ExitError> {
        let released = self.manager.release(slot_id)?;
        let exited_at = self.manager.clock().now();

        let fee = match compute_fee(released.entered_at, exited_at, self.hourly_rate) {
            Ok(fee) => fee,
            Err(source) => {
                tracing::error!(slot = %slot_id, vehicle = %released.vehicle.id, error = %source, "Failed to price exit");
                return Err(ExitError::Fee { released, source });
            }
        };

        tracing::info!(slot = %slot_id, vehicle = %released.vehicle.id, fee, "Vehicle exited");
        Ok(ExitReceipt {
            slot_id,
            vehicle: released.vehicle,
            entered_at: released.entered_at,
            exited_at,
            fee,
        })
    }

    pub fn list_occupied(&self) -> Vec<OccupiedSlot> {
        self.manager.list_occupied()
    }

    pub fn health(&self) -> HealthSnapshot {
        let lots = self.manager.usage();
        HealthSnapshot {
            state: Health::from_usage(&lots),
            lots,
            version: self.version.clone(),
        }
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }
}
