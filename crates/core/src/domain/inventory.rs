use serde::{Deserialize, Serialize};

use crate::domain::blood_type::BloodType;

/// Units below this are flagged critical on the admin inventory table.
pub const CRITICAL_THRESHOLD: u32 = 20;
/// Units below this (and at or above critical) are flagged low.
pub const LOW_THRESHOLD: u32 = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Critical,
    Low,
    Adequate,
}

impl StockLevel {
    pub fn for_units(units: u32) -> Self {
        if units < CRITICAL_THRESHOLD {
            Self::Critical
        } else if units < LOW_THRESHOLD {
            Self::Low
        } else {
            Self::Adequate
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub blood_type: BloodType,
    pub units_available: u32,
    pub stock_level: StockLevel,
}

impl InventoryRecord {
    pub fn new(blood_type: BloodType, units_available: u32) -> Self {
        Self { blood_type, units_available, stock_level: StockLevel::for_units(units_available) }
    }
}
