pub mod audit;
pub mod bank;
pub mod config;
pub mod domain;
pub mod donations;
pub mod errors;
pub mod fixtures;
pub mod inventory;
pub mod requests;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use bank::{BloodBank, LedgerSummary, StockLevelCounts};
pub use domain::blood_type::{BloodType, ParseBloodTypeError};
pub use domain::donation::{Donation, DonationId, DonationStatus};
pub use domain::inventory::{InventoryRecord, StockLevel};
pub use domain::request::{BloodRequest, Decision, RequestId, RequestStatus};
pub use donations::{DonationFilter, DonationLedger, NewDonation};
pub use errors::{DomainError, InterfaceError};
pub use fixtures::SeedProfile;
pub use inventory::{InventoryStore, StockGuard};
pub use requests::{NewBloodRequest, RequestCounts, RequestFilter, RequestManager};
