//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::fee::FeeError;
use crate::health::Health;
use crate::lot::{LotUsage, SlotId};
use crate::manager::{ParkError, ReleaseError};
use crate::service::{ExitError, HealthSnapshot, ParkingService};
use crate::vehicle::{Vehicle, VehicleId};
use crate::version::VersionInfo;

#[derive(Debug, Serialize)]
pub struct LotStatus {
    pub category: Category,
    pub capacity: u32,
    pub occupied: u32,
    pub available: u32,
}

impl From<LotUsage> for LotStatus {
    fn from(usage: LotUsage) -> Self {
        Self {
            category: usage.category,
            capacity: usage.capacity,
            occupied: usage.occupied,
            available: usage.available(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: Health,
    pub lots: Vec<LotStatus>,
    pub version: VersionInfo,
}

impl From<HealthSnapshot> for HealthCheckResponse {
    fn from(snapshot: HealthSnapshot) -> Self {
        Self {
            status: snapshot.state,
            lots: snapshot.lots.into_iter().map(LotStatus::from).collect(),
            version: snapshot.version,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ParkRequest {
    pub id: Option<String>,
    pub category: Category,
    pub license_plate: String,
    pub owner: Option<String>,
}

impl ParkRequest {
    fn into_vehicle(self) -> Vehicle {
        let id = self.id.map(VehicleId::new).unwrap_or_else(VehicleId::generate);
        Vehicle {
            id,
            category: self.category,
            license_plate: self.license_plate,
            owner: self.owner,
        }
    }
}

fn error_body(kind: &str, error: impl ToString) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "error": error.to_string(),
        "kind": kind,
    }))
}

async fn health_check(State(service): State<Arc<ParkingService>>) -> Json<HealthCheckResponse> {
    Json(service.health().into())
}

async fn list_slots(State(service): State<Arc<ParkingService>>) -> impl IntoResponse {
    Json(service.list_occupied())
}

async fn park(
    State(service): State<Arc<ParkingService>>,
    Json(request): Json<ParkRequest>,
) -> impl IntoResponse {
    let vehicle = request.into_vehicle();
    let response_vehicle = vehicle.clone();

    match service.park(vehicle) {
        Ok(parked) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "slot_id": parked.slot_id,
                "vehicle": response_vehicle,
                "entered_at": parked.entered_at,
            })),
        ),
        Err(e @ ParkError::Full(_)) => {
            tracing::warn!(vehicle = %response_vehicle.id, error = %e, "Park rejected");
            (StatusCode::CONFLICT, error_body("full", e))
        }
        Err(e @ ParkError::UnknownCategory(_)) => {
            tracing::warn!(vehicle = %response_vehicle.id, error = %e, "Park rejected");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                error_body("unknown_category", e),
            )
        }
    }
}

async fn release(
    State(service): State<Arc<ParkingService>>,
    Path(slot_id): Path<String>,
) -> Response {
    // An id that doesn't parse can never have been issued.
    let Ok(slot_id) = slot_id.parse::<SlotId>() else {
        return (
            StatusCode::NOT_FOUND,
            error_body("not_found", format!("slot {slot_id} does not exist")),
        )
            .into_response();
    };

    match service.exit(slot_id) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(ExitError::Release(e @ ReleaseError::NotFound(_))) => {
            tracing::warn!(error = %e, "Release rejected");
            (StatusCode::NOT_FOUND, error_body("not_found", e)).into_response()
        }
        Err(ExitError::Release(e @ ReleaseError::NotOccupied(_))) => {
            tracing::warn!(error = %e, "Release rejected");
            (StatusCode::CONFLICT, error_body("not_occupied", e)).into_response()
        }
        // The slot is already free; hand the occupant back so it isn't lost.
        Err(ExitError::Fee {
            released,
            source: e @ FeeError::InvalidInterval { .. },
        }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "error": e.to_string(),
                "kind": "invalid_interval",
                "slot_id": released.slot_id,
                "vehicle": released.vehicle,
                "entered_at": released.entered_at,
            })),
        )
            .into_response(),
    }
}

async fn shutdown(State(service): State<Arc<ParkingService>>) -> impl IntoResponse {
    tracing::info!("Shutdown requested via HTTP");
    service.trigger_shutdown();
    (StatusCode::OK, Json(serde_json::json!({})))
}

pub fn routes(service: Arc<ParkingService>) -> Router {
    Router::new()
        .route("/health-check", get(health_check))
        .route("/slots", get(list_slots).post(park))
        .route("/slots/{slot_id}/release", post(release))
        .route("/shutdown", post(shutdown))
        .with_state(service)
}
