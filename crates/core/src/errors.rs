use thiserror::Error;

use crate::domain::blood_type::BloodType;
use crate::domain::donation::{DonationId, DonationStatus};
use crate::domain::request::{RequestId, RequestStatus};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("units requested must be a positive integer, got {units}")]
    InvalidUnits { units: i64 },
    #[error("inventory value must be between 0 and 4294967295, got {value}")]
    InvalidValue { value: i64 },
    #[error("insufficient {blood_type} stock: {available} available, {requested} requested")]
    InsufficientStock { blood_type: BloodType, available: u32, requested: u64 },
    #[error("{blood_type} stock of {available} cannot change by {delta} (limit 4294967295)")]
    CapacityExceeded { blood_type: BloodType, available: u32, delta: i64 },
    #[error("blood request `{0}` was not found")]
    NotFound(RequestId),
    #[error("blood request `{id}` was already decided ({status:?})")]
    AlreadyDecided { id: RequestId, status: RequestStatus },
    #[error("unsupported request status `{0}` (expected pending|approved|declined)")]
    InvalidStatus(String),
    #[error("donation `{0}` was not found")]
    DonationNotFound(DonationId),
    #[error("donation `{id}` is no longer scheduled ({status:?})")]
    DonationClosed { id: DonationId, status: DonationStatus },
    #[error("unsupported donation status `{0}` (expected scheduled|completed|cancelled)")]
    InvalidDonationStatus(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUnits { .. } => "invalid_units",
            Self::InvalidValue { .. } => "invalid_value",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::NotFound(_) => "not_found",
            Self::AlreadyDecided { .. } => "already_decided",
            Self::InvalidStatus(_) => "invalid_status",
            Self::DonationNotFound(_) => "donation_not_found",
            Self::DonationClosed { .. } => "donation_closed",
            Self::InvalidDonationStatus(_) => "invalid_donation_status",
            Self::InvariantViolation(_) => "invariant_violation",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { code: &'static str, message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { code: &'static str, message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { code: &'static str, message: String, correlation_id: String },
    #[error("unprocessable: {message}")]
    Unprocessable { code: &'static str, message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { code: &'static str, message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { code, .. }
            | Self::NotFound { code, .. }
            | Self::Conflict { code, .. }
            | Self::Unprocessable { code, .. }
            | Self::Internal { code, .. } => code,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::Unprocessable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self.code() {
            "invalid_units" => "Units requested must be at least one.",
            "invalid_value" => "Inventory units must be zero or a positive whole number in range.",
            "insufficient_stock" => "Not enough stock of this blood type to approve the request.",
            "capacity_exceeded" => "That change would exceed the inventory counter limit.",
            "not_found" => "The blood request could not be found.",
            "already_decided" => "This request has already been decided.",
            "invalid_status" => "Unknown request status filter.",
            "donation_not_found" => "The donation could not be found.",
            "donation_closed" => "This donation has already been completed or cancelled.",
            "invalid_donation_status" => "Unknown donation status filter.",
            "invalid_date" => "Dates must use the YYYY-MM-DD format.",
            "invalid_blood_type" => "Unknown blood type.",
            "invalid_outcome" => "Decision outcome must be approve or decline.",
            "invalid_body" => "The request body is missing fields or is not valid JSON.",
            _ => match self {
                Self::BadRequest { .. } | Self::Unprocessable { .. } => {
                    "The request could not be processed. Check inputs and try again."
                }
                Self::NotFound { .. } => "The requested resource could not be found.",
                Self::Conflict { .. } => "The request conflicts with the current state.",
                Self::Internal { .. } => "An unexpected internal error occurred.",
            },
        }
    }

    pub fn bad_request(
        code: &'static str,
        message: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self::BadRequest { code, message: message.into(), correlation_id: correlation_id.into() }
    }
}

impl DomainError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let code = self.code();
        let message = self.to_string();
        match self {
            Self::InvalidStatus(_) | Self::InvalidDonationStatus(_) => {
                InterfaceError::BadRequest { code, message, correlation_id }
            }
            Self::InvalidUnits { .. }
            | Self::InvalidValue { .. }
            | Self::CapacityExceeded { .. } => {
                InterfaceError::Unprocessable { code, message, correlation_id }
            }
            Self::NotFound(_) | Self::DonationNotFound(_) => {
                InterfaceError::NotFound { code, message, correlation_id }
            }
            Self::InsufficientStock { .. }
            | Self::AlreadyDecided { .. }
            | Self::DonationClosed { .. } => {
                InterfaceError::Conflict { code, message, correlation_id }
            }
            Self::InvariantViolation(_) => {
                InterfaceError::Internal { code, message, correlation_id }
            }
        }
    }
}
