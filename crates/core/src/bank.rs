use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::blood_type::BloodType;
use crate::domain::inventory::{InventoryRecord, StockLevel};
use crate::donations::DonationLedger;
use crate::errors::DomainError;
use crate::fixtures::SeedProfile;
use crate::inventory::InventoryStore;
use crate::requests::{RequestCounts, RequestManager};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevelCounts {
    pub critical: usize,
    pub low: usize,
    pub adequate: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub total_units: u64,
    pub stock_levels: StockLevelCounts,
    pub requests: RequestCounts,
}

/// Process-wide ledger: the inventory store, the request manager and
/// donation ledger sharing it, and the audit trail they all write to.
pub struct BloodBank {
    inventory: Arc<InventoryStore>,
    requests: RequestManager,
    donations: DonationLedger,
    audit: Arc<dyn AuditSink>,
}

impl BloodBank {
    pub fn new(inventory: InventoryStore, audit: Arc<dyn AuditSink>) -> Self {
        let inventory = Arc::new(inventory);
        let requests = RequestManager::new(Arc::clone(&inventory), Arc::clone(&audit));
        let donations = DonationLedger::new(Arc::clone(&inventory), Arc::clone(&audit));
        Self { inventory, requests, donations, audit }
    }

    /// Builds a ledger holding the profile's stock and pending requests.
    pub fn seeded(profile: SeedProfile, audit: Arc<dyn AuditSink>) -> Result<Self, DomainError> {
        let bank = Self::new(InventoryStore::with_units(profile.inventory()), audit);
        let context = AuditContext::system();
        for request in profile.requests() {
            bank.requests.submit(request, &context)?;
        }

        info!(
            event_name = "system.ledger.seeded",
            correlation_id = "bootstrap",
            seed = ?profile,
            total_units = bank.inventory.total_units(),
            pending_requests = bank.requests.counts().pending,
            "blood ledger initialized"
        );
        bank.audit.emit(
            AuditEvent::new(&context, "ledger.seeded", AuditCategory::System, AuditOutcome::Success)
                .with_metadata("seed", format!("{profile:?}")),
        );
        Ok(bank)
    }

    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    pub fn requests(&self) -> &RequestManager {
        &self.requests
    }

    pub fn donations(&self) -> &DonationLedger {
        &self.donations
    }

    /// Administrative override of one blood type's count.
    pub fn set_units(
        &self,
        blood_type: BloodType,
        value: i64,
        context: &AuditContext,
    ) -> Result<InventoryRecord, DomainError> {
        let mut stock = self.inventory.lock(blood_type);
        let previous = stock.units();
        let result = stock.set(value).map(|_| stock.record());
        drop(stock);

        self.record_inventory_change(
            "inventory.set",
            blood_type,
            previous,
            value,
            &result,
            context,
        );
        result
    }

    /// Relative change, e.g. a recorded donation (positive) or a write-off.
    pub fn adjust_units(
        &self,
        blood_type: BloodType,
        delta: i64,
        context: &AuditContext,
    ) -> Result<InventoryRecord, DomainError> {
        let mut stock = self.inventory.lock(blood_type);
        let previous = stock.units();
        let result = stock.adjust(delta).map(|_| stock.record());
        drop(stock);

        self.record_inventory_change(
            "inventory.adjust",
            blood_type,
            previous,
            delta,
            &result,
            context,
        );
        result
    }

    pub fn summary(&self) -> LedgerSummary {
        let snapshot = self.inventory.snapshot();
        let stock_levels =
            snapshot.iter().fold(StockLevelCounts::default(), |mut counts, record| {
                match record.stock_level {
                    StockLevel::Critical => counts.critical += 1,
                    StockLevel::Low => counts.low += 1,
                    StockLevel::Adequate => counts.adequate += 1,
                }
                counts
            });

        LedgerSummary {
            total_units: snapshot.iter().map(|record| u64::from(record.units_available)).sum(),
            stock_levels,
            requests: self.requests.counts(),
        }
    }

    fn record_inventory_change(
        &self,
        event_type: &str,
        blood_type: BloodType,
        previous: u32,
        input: i64,
        result: &Result<InventoryRecord, DomainError>,
        context: &AuditContext,
    ) {
        let event = match result {
            Ok(record) => {
                info!(
                    event_name = event_type,
                    correlation_id = %context.correlation_id,
                    blood_type = %blood_type,
                    previous_units = previous,
                    units_available = record.units_available,
                    "inventory updated"
                );
                AuditEvent::new(
                    context,
                    event_type,
                    AuditCategory::Inventory,
                    AuditOutcome::Success,
                )
                .with_metadata("units_available", record.units_available.to_string())
            }
            Err(error) => {
                warn!(
                    event_name = event_type,
                    correlation_id = %context.correlation_id,
                    blood_type = %blood_type,
                    input,
                    error = %error,
                    "inventory update rejected"
                );
                let outcome = match error {
                    DomainError::InvariantViolation(_) => AuditOutcome::Failed,
                    _ => AuditOutcome::Rejected,
                };
                AuditEvent::new(context, event_type, AuditCategory::Inventory, outcome)
                    .with_metadata("error", error.code())
            }
        };

        self.audit.emit(
            event
                .for_blood_type(blood_type)
                .with_metadata("previous_units", previous.to_string())
                .with_metadata("input", input.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::BloodBank;
    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink, NoopAuditSink};
    use crate::domain::blood_type::BloodType;
    use crate::domain::request::Decision;
    use crate::errors::DomainError;
    use crate::fixtures::SeedProfile;
    use crate::requests::RequestFilter;

    fn admin() -> AuditContext {
        AuditContext::new("test", "admin-1")
    }

    #[test]
    fn demo_seed_matches_dashboard_figures() {
        let bank = BloodBank::seeded(SeedProfile::Demo, Arc::new(NoopAuditSink))
            .expect("seeded ledger");
        let summary = bank.summary();

        assert_eq!(summary.total_units, 239);
        assert_eq!(summary.requests.pending, 2);
        assert_eq!(summary.stock_levels.critical, 3);
        assert_eq!(summary.stock_levels.low, 3);
        assert_eq!(summary.stock_levels.adequate, 2);
    }

    #[test]
    fn empty_seed_starts_zeroed() {
        let bank = BloodBank::seeded(SeedProfile::Empty, Arc::new(NoopAuditSink))
            .expect("seeded ledger");

        assert_eq!(bank.summary().total_units, 0);
        assert!(bank.requests().list(&RequestFilter::default()).is_empty());
    }

    #[test]
    fn set_units_rejects_negative_and_keeps_previous_value() {
        let sink = InMemoryAuditSink::default();
        let bank = BloodBank::seeded(SeedProfile::Demo, Arc::new(sink.clone())).expect("seeded");

        let error = bank.set_units(BloodType::AbNegative, -1, &admin()).expect_err("negative");

        assert_eq!(error, DomainError::InvalidValue { value: -1 });
        assert_eq!(bank.inventory().get_units(BloodType::AbNegative), 8);
        let last = sink.events().pop().expect("audit event");
        assert_eq!(last.event_type, "inventory.set");
        assert_eq!(last.outcome, AuditOutcome::Rejected);
    }

    #[test]
    fn restock_unblocks_a_pending_approval() {
        let bank = BloodBank::new(
            crate::inventory::InventoryStore::with_units([(BloodType::ONegative, 1)]),
            Arc::new(NoopAuditSink),
        );
        let request = bank
            .requests()
            .submit(
                crate::requests::NewBloodRequest {
                    requester_id: "recipient-1".to_string(),
                    blood_type: BloodType::ONegative,
                    units_requested: 3,
                    notes: String::new(),
                },
                &admin(),
            )
            .expect("submit");

        let error = bank.requests().decide(&request.id, Decision::Approve, &admin());
        assert!(matches!(error, Err(DomainError::InsufficientStock { .. })));

        let record = bank.adjust_units(BloodType::ONegative, 4, &admin()).expect("restock");
        assert_eq!(record.units_available, 5);

        bank.requests().decide(&request.id, Decision::Approve, &admin()).expect("retry approve");
        assert_eq!(bank.inventory().get_units(BloodType::ONegative), 2);
    }

    #[test]
    fn completed_donation_covers_a_pending_request() {
        let bank = BloodBank::new(
            crate::inventory::InventoryStore::with_units([(BloodType::ANegative, 0)]),
            Arc::new(NoopAuditSink),
        );
        let request = bank
            .requests()
            .submit(
                crate::requests::NewBloodRequest {
                    requester_id: "recipient-1".to_string(),
                    blood_type: BloodType::ANegative,
                    units_requested: 1,
                    notes: String::new(),
                },
                &admin(),
            )
            .expect("submit");
        let donation = bank
            .donations()
            .schedule(
                crate::donations::NewDonation {
                    donor_id: "donor-1".to_string(),
                    blood_type: BloodType::ANegative,
                    units: 1,
                    location: "Community Center".to_string(),
                    scheduled_for: chrono::NaiveDate::from_ymd_opt(2025, 2, 3).expect("date"),
                },
                &admin(),
            )
            .expect("schedule");

        bank.donations().complete(&donation.id, &admin()).expect("complete");
        bank.requests().decide(&request.id, Decision::Approve, &admin()).expect("approve");

        assert_eq!(bank.inventory().get_units(BloodType::ANegative), 0);
        assert_eq!(bank.summary().requests.approved, 1);
    }

    #[test]
    fn oversized_set_is_rejected_as_invalid_value() {
        let sink = InMemoryAuditSink::default();
        let bank = BloodBank::seeded(SeedProfile::Demo, Arc::new(sink.clone())).expect("seeded");

        let error =
            bank.set_units(BloodType::OPositive, 5_000_000_000, &admin()).expect_err("too big");

        assert_eq!(error, DomainError::InvalidValue { value: 5_000_000_000 });
        assert_eq!(bank.inventory().get_units(BloodType::OPositive), 67);
        let last = sink.events().pop().expect("audit event");
        assert_eq!(last.outcome, AuditOutcome::Rejected);
    }
}
