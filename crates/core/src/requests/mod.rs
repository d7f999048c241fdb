use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::blood_type::BloodType;
use crate::domain::request::{BloodRequest, Decision, RequestId, RequestStatus};
use crate::errors::DomainError;
use crate::inventory::InventoryStore;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBloodRequest {
    pub requester_id: String,
    pub blood_type: BloodType,
    pub units_requested: i64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub requester_id: Option<String>,
}

impl RequestFilter {
    pub fn status(status: RequestStatus) -> Self {
        Self { status: Some(status), requester_id: None }
    }

    fn matches(&self, request: &BloodRequest) -> bool {
        self.status.map_or(true, |status| request.status == status)
            && self.requester_id.as_deref().map_or(true, |id| request.requester_id == id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    pub pending: usize,
    pub approved: usize,
    pub declined: usize,
}

#[derive(Default)]
struct RequestTable {
    /// Submission order, which is also `created_at` order.
    records: Vec<BloodRequest>,
    index: HashMap<RequestId, usize>,
}

impl RequestTable {
    fn get(&self, id: &RequestId) -> Option<&BloodRequest> {
        self.index.get(id).map(|position| &self.records[*position])
    }

    fn get_mut(&mut self, id: &RequestId) -> Option<&mut BloodRequest> {
        self.index.get(id).map(|position| &mut self.records[*position])
    }

    fn next_created_at(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.records.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        }
    }
}

/// Owns blood request records and their approval state machine.
///
/// Lock order is always blood type (via [`InventoryStore::lock`]) before the
/// request table. The table lock is never held while waiting on a blood type.
pub struct RequestManager {
    inventory: Arc<InventoryStore>,
    table: Mutex<RequestTable>,
    audit: Arc<dyn AuditSink>,
}

impl RequestManager {
    pub fn new(inventory: Arc<InventoryStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { inventory, table: Mutex::new(RequestTable::default()), audit }
    }

    pub fn inventory(&self) -> &Arc<InventoryStore> {
        &self.inventory
    }

    fn table(&self) -> MutexGuard<'_, RequestTable> {
        match self.table.lock() {
            Ok(table) => table,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn submit(
        &self,
        input: NewBloodRequest,
        context: &AuditContext,
    ) -> Result<BloodRequest, DomainError> {
        let units_requested = match u32::try_from(input.units_requested) {
            Ok(units) if units > 0 => units,
            _ => {
                let error = DomainError::InvalidUnits { units: input.units_requested };
                self.audit.emit(
                    AuditEvent::new(
                        context,
                        "request.submit_rejected",
                        AuditCategory::Request,
                        AuditOutcome::Rejected,
                    )
                    .for_blood_type(input.blood_type)
                    .with_metadata("error", error.to_string()),
                );
                return Err(error);
            }
        };

        let request = {
            let mut table = self.table();
            let request = BloodRequest {
                id: RequestId::generate(),
                requester_id: input.requester_id,
                blood_type: input.blood_type,
                units_requested,
                status: RequestStatus::Pending,
                notes: input.notes,
                created_at: table.next_created_at(),
                decided_at: None,
            };
            let position = table.records.len();
            table.index.insert(request.id.clone(), position);
            table.records.push(request.clone());
            request
        };

        info!(
            event_name = "request.submitted",
            correlation_id = %context.correlation_id,
            request_id = %request.id,
            blood_type = %request.blood_type,
            units_requested = request.units_requested,
            "blood request submitted"
        );
        self.audit.emit(
            AuditEvent::new(
                context,
                "request.submitted",
                AuditCategory::Request,
                AuditOutcome::Success,
            )
            .for_request(request.id.clone())
            .for_blood_type(request.blood_type)
            .with_metadata("requester_id", request.requester_id.clone())
            .with_metadata("units_requested", request.units_requested.to_string()),
        );

        Ok(request)
    }

    /// Decides a pending request.
    ///
    /// Approval runs inside the blood type's critical section: the stock
    /// decrement and the status write become visible together or not at all.
    pub fn decide(
        &self,
        id: &RequestId,
        decision: Decision,
        context: &AuditContext,
    ) -> Result<BloodRequest, DomainError> {
        let result = self.try_decide(id, decision);

        match &result {
            Ok(request) => {
                info!(
                    event_name = "request.decided",
                    correlation_id = %context.correlation_id,
                    request_id = %request.id,
                    blood_type = %request.blood_type,
                    status = request.status.as_str(),
                    "blood request decided"
                );
                let mut event = AuditEvent::new(
                    context,
                    format!("request.{}", request.status.as_str()),
                    AuditCategory::Request,
                    AuditOutcome::Success,
                )
                .for_request(request.id.clone())
                .for_blood_type(request.blood_type);
                if decision == Decision::Approve {
                    event = event
                        .with_metadata("units_allocated", request.units_requested.to_string());
                }
                self.audit.emit(event);
            }
            Err(error) => {
                warn!(
                    event_name = "request.decision_rejected",
                    correlation_id = %context.correlation_id,
                    request_id = %id,
                    decision = ?decision,
                    error = %error,
                    "blood request decision rejected"
                );
                let outcome = match error {
                    DomainError::InvariantViolation(_) => AuditOutcome::Failed,
                    _ => AuditOutcome::Rejected,
                };
                self.audit.emit(
                    AuditEvent::new(
                        context,
                        "request.decision_rejected",
                        AuditCategory::Request,
                        outcome,
                    )
                    .for_request(id.clone())
                    .with_metadata("decision", format!("{decision:?}"))
                    .with_metadata("error", error.code()),
                );
            }
        }

        result
    }

    fn try_decide(&self, id: &RequestId, decision: Decision) -> Result<BloodRequest, DomainError> {
        let (blood_type, units_requested) = {
            let table = self.table();
            let request = table.get(id).ok_or_else(|| DomainError::NotFound(id.clone()))?;
            ensure_pending(request)?;
            (request.blood_type, request.units_requested)
        };

        match decision {
            Decision::Decline => {
                let mut table = self.table();
                let request = table.get_mut(id).ok_or_else(|| DomainError::NotFound(id.clone()))?;
                request.transition_to(RequestStatus::Declined, Utc::now())?;
                Ok(request.clone())
            }
            Decision::Approve => {
                let mut stock = self.inventory.lock(blood_type);
                let mut table = self.table();
                let request = table.get_mut(id).ok_or_else(|| DomainError::NotFound(id.clone()))?;
                // Another caller may have decided it between the two table locks.
                ensure_pending(request)?;

                let delta = i64::from(units_requested);
                stock.adjust(-delta)?;
                if let Err(error) = request.transition_to(RequestStatus::Approved, Utc::now()) {
                    stock.adjust(delta)?;
                    return Err(error);
                }
                Ok(request.clone())
            }
        }
    }

    pub fn get(&self, id: &RequestId) -> Result<BloodRequest, DomainError> {
        self.table().get(id).cloned().ok_or_else(|| DomainError::NotFound(id.clone()))
    }

    /// Matching requests ordered by `created_at` ascending.
    pub fn list(&self, filter: &RequestFilter) -> Vec<BloodRequest> {
        self.table().records.iter().filter(|request| filter.matches(request)).cloned().collect()
    }

    pub fn counts(&self) -> RequestCounts {
        self.table().records.iter().fold(RequestCounts::default(), |mut counts, request| {
            match request.status {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::Approved => counts.approved += 1,
                RequestStatus::Declined => counts.declined += 1,
            }
            counts
        })
    }
}

fn ensure_pending(request: &BloodRequest) -> Result<(), DomainError> {
    if request.status.is_terminal() {
        return Err(DomainError::AlreadyDecided { id: request.id.clone(), status: request.status });
    }
    Ok(())
}
