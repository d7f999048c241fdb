use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::blood_type::BloodType;
use crate::domain::donation::{Donation, DonationId, DonationStatus};
use crate::errors::DomainError;
use crate::inventory::InventoryStore;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDonation {
    pub donor_id: String,
    pub blood_type: BloodType,
    pub units: i64,
    #[serde(default)]
    pub location: String,
    pub scheduled_for: NaiveDate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationFilter {
    pub donor_id: Option<String>,
    pub status: Option<DonationStatus>,
}

impl DonationFilter {
    pub fn donor(donor_id: impl Into<String>) -> Self {
        Self { donor_id: Some(donor_id.into()), status: None }
    }

    fn matches(&self, donation: &Donation) -> bool {
        self.status.map_or(true, |status| donation.status == status)
            && self.donor_id.as_deref().map_or(true, |id| donation.donor_id == id)
    }
}

#[derive(Default)]
struct DonationTable {
    records: Vec<Donation>,
    index: HashMap<DonationId, usize>,
}

impl DonationTable {
    fn get(&self, id: &DonationId) -> Option<&Donation> {
        self.index.get(id).map(|position| &self.records[*position])
    }

    fn get_mut(&mut self, id: &DonationId) -> Option<&mut Donation> {
        self.index.get(id).map(|position| &mut self.records[*position])
    }
}

/// Donor appointments and their effect on stock.
///
/// Completing a donation restocks its blood type under that type's lock,
/// taken before the donation table, matching the request manager's order.
pub struct DonationLedger {
    inventory: Arc<InventoryStore>,
    table: Mutex<DonationTable>,
    audit: Arc<dyn AuditSink>,
}

impl DonationLedger {
    pub fn new(inventory: Arc<InventoryStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { inventory, table: Mutex::new(DonationTable::default()), audit }
    }

    fn table(&self) -> MutexGuard<'_, DonationTable> {
        match self.table.lock() {
            Ok(table) => table,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn schedule(
        &self,
        input: NewDonation,
        context: &AuditContext,
    ) -> Result<Donation, DomainError> {
        let units = match u32::try_from(input.units) {
            Ok(units) if units > 0 => units,
            _ => {
                let error = DomainError::InvalidUnits { units: input.units };
                self.audit.emit(
                    AuditEvent::new(
                        context,
                        "donation.schedule_rejected",
                        AuditCategory::Donation,
                        AuditOutcome::Rejected,
                    )
                    .for_blood_type(input.blood_type)
                    .with_metadata("donor_id", input.donor_id)
                    .with_metadata("error", error.code()),
                );
                return Err(error);
            }
        };

        let donation = Donation {
            id: DonationId::generate(),
            donor_id: input.donor_id,
            blood_type: input.blood_type,
            units,
            location: input.location.trim().to_string(),
            scheduled_for: input.scheduled_for,
            status: DonationStatus::Scheduled,
            created_at: Utc::now(),
            closed_at: None,
        };
        {
            let mut table = self.table();
            let position = table.records.len();
            table.index.insert(donation.id.clone(), position);
            table.records.push(donation.clone());
        }

        info!(
            event_name = "donation.scheduled",
            correlation_id = %context.correlation_id,
            donation_id = %donation.id,
            blood_type = %donation.blood_type,
            scheduled_for = %donation.scheduled_for,
            "donation scheduled"
        );
        self.audit.emit(
            AuditEvent::new(
                context,
                "donation.scheduled",
                AuditCategory::Donation,
                AuditOutcome::Success,
            )
            .for_donation(donation.id.clone())
            .for_blood_type(donation.blood_type)
            .with_metadata("donor_id", donation.donor_id.clone())
            .with_metadata("units", donation.units.to_string())
            .with_metadata("scheduled_for", donation.scheduled_for.to_string()),
        );

        Ok(donation)
    }

    /// Marks a scheduled donation as collected and adds its units to stock.
    pub fn complete(
        &self,
        id: &DonationId,
        context: &AuditContext,
    ) -> Result<Donation, DomainError> {
        let result = self.try_complete(id);
        self.record_close("donation.completed", id, &result, context);
        result
    }

    pub fn cancel(&self, id: &DonationId, context: &AuditContext) -> Result<Donation, DomainError> {
        let result = {
            let mut table = self.table();
            table
                .get_mut(id)
                .ok_or_else(|| DomainError::DonationNotFound(id.clone()))
                .and_then(|donation| {
                    donation.close(DonationStatus::Cancelled, Utc::now())?;
                    Ok(donation.clone())
                })
        };
        self.record_close("donation.cancelled", id, &result, context);
        result
    }

    fn try_complete(&self, id: &DonationId) -> Result<Donation, DomainError> {
        let (blood_type, units) = {
            let table = self.table();
            let donation = table.get(id).ok_or_else(|| DomainError::DonationNotFound(id.clone()))?;
            ensure_scheduled(donation)?;
            (donation.blood_type, donation.units)
        };

        let mut stock = self.inventory.lock(blood_type);
        let mut table = self.table();
        let donation =
            table.get_mut(id).ok_or_else(|| DomainError::DonationNotFound(id.clone()))?;
        ensure_scheduled(donation)?;

        let delta = i64::from(units);
        stock.adjust(delta)?;
        if let Err(error) = donation.close(DonationStatus::Completed, Utc::now()) {
            stock.adjust(-delta)?;
            return Err(error);
        }
        Ok(donation.clone())
    }

    fn record_close(
        &self,
        event_type: &str,
        id: &DonationId,
        result: &Result<Donation, DomainError>,
        context: &AuditContext,
    ) {
        match result {
            Ok(donation) => {
                info!(
                    event_name = event_type,
                    correlation_id = %context.correlation_id,
                    donation_id = %donation.id,
                    blood_type = %donation.blood_type,
                    units = donation.units,
                    "donation closed"
                );
                let mut event = AuditEvent::new(
                    context,
                    event_type,
                    AuditCategory::Donation,
                    AuditOutcome::Success,
                )
                .for_donation(donation.id.clone())
                .for_blood_type(donation.blood_type);
                if donation.status == DonationStatus::Completed {
                    event = event.with_metadata("units_added", donation.units.to_string());
                }
                self.audit.emit(event);
            }
            Err(error) => {
                warn!(
                    event_name = event_type,
                    correlation_id = %context.correlation_id,
                    donation_id = %id,
                    error = %error,
                    "donation update rejected"
                );
                self.audit.emit(
                    AuditEvent::new(
                        context,
                        event_type,
                        AuditCategory::Donation,
                        AuditOutcome::Rejected,
                    )
                    .for_donation(id.clone())
                    .with_metadata("error", error.code()),
                );
            }
        }
    }

    pub fn get(&self, id: &DonationId) -> Result<Donation, DomainError> {
        self.table().get(id).cloned().ok_or_else(|| DomainError::DonationNotFound(id.clone()))
    }

    /// Matching donations, most recent appointment first.
    pub fn list(&self, filter: &DonationFilter) -> Vec<Donation> {
        let mut donations: Vec<_> = self
            .table()
            .records
            .iter()
            .filter(|donation| filter.matches(donation))
            .cloned()
            .collect();
        donations.sort_by(|left, right| right.scheduled_for.cmp(&left.scheduled_for));
        donations
    }

    /// Units the donor has actually given.
    pub fn units_donated(&self, donor_id: &str) -> u64 {
        self.table()
            .records
            .iter()
            .filter(|donation| {
                donation.donor_id == donor_id && donation.status == DonationStatus::Completed
            })
            .map(|donation| u64::from(donation.units))
            .sum()
    }
}

fn ensure_scheduled(donation: &Donation) -> Result<(), DomainError> {
    if donation.status != DonationStatus::Scheduled {
        let (id, status) = (donation.id.clone(), donation.status);
        return Err(DomainError::DonationClosed { id, status });
    }
    Ok(())
}
