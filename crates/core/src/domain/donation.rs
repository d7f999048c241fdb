use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::blood_type::BloodType;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonationId(pub String);

impl DonationId {
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string();
        Self(format!("DON-{}", &raw[..12]))
    }
}

impl fmt::Display for DonationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl DonationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for DonationStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(DomainError::InvalidDonationStatus(other.to_string())),
        }
    }
}

/// A donor appointment. Only completing it adds units to inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: DonationId,
    pub donor_id: String,
    pub blood_type: BloodType,
    pub units: u32,
    pub location: String,
    pub scheduled_for: NaiveDate,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Donation {
    pub(crate) fn close(
        &mut self,
        next: DonationStatus,
        closed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status != DonationStatus::Scheduled || next == DonationStatus::Scheduled {
            return Err(DomainError::DonationClosed { id: self.id.clone(), status: self.status });
        }

        self.status = next;
        self.closed_at = Some(closed_at);
        Ok(())
    }
}
