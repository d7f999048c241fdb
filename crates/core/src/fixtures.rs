use serde::{Deserialize, Serialize};

use crate::domain::blood_type::BloodType;
use crate::requests::NewBloodRequest;

/// Initial ledger contents chosen at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedProfile {
    /// Demo stock and two pending requests, matching the dashboard mock data.
    #[default]
    Demo,
    /// Every blood type at zero, no requests.
    Empty,
}

impl std::str::FromStr for SeedProfile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "empty" => Ok(Self::Empty),
            other => Err(format!("unsupported inventory seed `{other}` (expected demo|empty)")),
        }
    }
}

impl SeedProfile {
    pub fn inventory(self) -> Vec<(BloodType, u32)> {
        match self {
            Self::Demo => vec![
                (BloodType::APositive, 45),
                (BloodType::ANegative, 23),
                (BloodType::BPositive, 38),
                (BloodType::BNegative, 15),
                (BloodType::AbPositive, 12),
                (BloodType::AbNegative, 8),
                (BloodType::OPositive, 67),
                (BloodType::ONegative, 31),
            ],
            Self::Empty => BloodType::ALL.iter().map(|blood_type| (*blood_type, 0)).collect(),
        }
    }

    pub fn requests(self) -> Vec<NewBloodRequest> {
        match self {
            Self::Demo => vec![
                NewBloodRequest {
                    requester_id: "recipient-jane-smith".to_string(),
                    blood_type: BloodType::BPositive,
                    units_requested: 2,
                    notes: "Emergency surgery".to_string(),
                },
                NewBloodRequest {
                    requester_id: "recipient-alice-brown".to_string(),
                    blood_type: BloodType::ONegative,
                    units_requested: 3,
                    notes: "Regular treatment".to_string(),
                },
            ],
            Self::Empty => Vec::new(),
        }
    }
}
