//! Occupant records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Caller-supplied identity of a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identity (UUID v4) for callers that don't track their own.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The entity being assigned a slot.
///
/// Owned by the caller until `park`, held by the slot while parked, and
/// handed back by `release`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub category: Category,
    pub license_plate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Vehicle {
    pub fn new(id: VehicleId, category: Category, license_plate: impl Into<String>) -> Self {
        Self {
            id,
            category,
            license_plate: license_plate.into(),
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(VehicleId::generate(), VehicleId::generate());
    }

    #[test]
    fn vehicle_serializes_minimal() {
        let vehicle = Vehicle::new(VehicleId::new("v-1"), Category::Car, "ABC-123");
        insta::assert_json_snapshot!(vehicle, @r#"
        {
          "id": "v-1",
          "category": "CAR",
          "license_plate": "ABC-123"
        }
        "#);
    }

    #[test]
    fn vehicle_serializes_with_owner() {
        let vehicle =
            Vehicle::new(VehicleId::new("v-2"), Category::Truck, "HAUL-9").with_owner("Dana");
        insta::assert_json_snapshot!(vehicle, @r#"
        {
          "id": "v-2",
          "category": "TRUCK",
          "license_plate": "HAUL-9",
          "owner": "Dana"
        }
        "#);
    }

    #[test]
    fn vehicle_deserializes_without_owner() {
        let vehicle: Vehicle = serde_json::from_str(
            r#"{"id":"v-3","category":"MOTORCYCLE","license_plate":"MOTO-1"}"#,
        )
        .unwrap();
        assert_eq!(vehicle.category, Category::Motorcycle);
        assert!(vehicle.owner.is_none());
    }
}
