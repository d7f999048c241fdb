use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::blood_type::BloodType;
use crate::domain::donation::DonationId;
use crate::domain::request::RequestId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Request,
    Donation,
    Inventory,
    System,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

/// Who is acting and under which correlation id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub correlation_id: String,
    pub actor: String,
}

impl AuditContext {
    pub fn new(correlation_id: impl Into<String>, actor: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into(), actor: actor.into() }
    }

    pub fn system() -> Self {
        Self::new("system", "ledger")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_id: String,
    pub request_id: Option<RequestId>,
    pub donation_id: Option<DonationId>,
    pub blood_type: Option<BloodType>,
    pub correlation_id: String,
    pub event_type: String,
    pub category: AuditCategory,
    pub actor: String,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        context: &AuditContext,
        event_type: impl Into<String>,
        category: AuditCategory,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            request_id: None,
            donation_id: None,
            blood_type: None,
            correlation_id: context.correlation_id.clone(),
            event_type: event_type.into(),
            category,
            actor: context.actor.clone(),
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn for_request(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn for_donation(mut self, donation_id: DonationId) -> Self {
        self.donation_id = Some(donation_id);
        self
    }

    pub fn for_blood_type(mut self, blood_type: BloodType) -> Self {
        self.blood_type = Some(blood_type);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Drops every event. Used when no trail is wanted (CLI smoke runs).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use crate::audit::{
        AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
    };
    use crate::domain::blood_type::BloodType;
    use crate::domain::donation::DonationId;
    use crate::domain::request::RequestId;

    #[test]
    fn in_memory_sink_records_events_with_correlation_fields() {
        let sink = InMemoryAuditSink::default();
        sink.emit(
            AuditEvent::new(
                &AuditContext::new("req-123", "admin-1"),
                "request.approved",
                AuditCategory::Request,
                AuditOutcome::Success,
            )
            .for_request(RequestId("REQ-0042".to_owned()))
            .for_blood_type(BloodType::ONegative)
            .with_metadata("units", "3"),
        );

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].correlation_id, "req-123");
        assert_eq!(events[0].actor, "admin-1");
        assert_eq!(events[0].request_id.as_ref().map(|id| id.0.as_str()), Some("REQ-0042"));
        assert_eq!(events[0].blood_type, Some(BloodType::ONegative));
        assert_eq!(events[0].metadata.get("units").map(String::as_str), Some("3"));
    }

    #[test]
    fn clones_share_the_same_trail() {
        let sink = InMemoryAuditSink::default();
        let clone = sink.clone();
        clone.emit(AuditEvent::new(
            &AuditContext::system(),
            "inventory.seeded",
            AuditCategory::System,
            AuditOutcome::Success,
        ));

        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn events_serialize_with_camel_case_keys() {
        let event = AuditEvent::new(
            &AuditContext::new("req-7", "donor-1"),
            "donation.completed",
            AuditCategory::Donation,
            AuditOutcome::Success,
        )
        .for_donation(DonationId("DON-7".to_owned()));

        let value = serde_json::to_value(&event).expect("serialize");

        assert_eq!(value["eventType"], "donation.completed");
        assert_eq!(value["donationId"], "DON-7");
        assert_eq!(value["category"], "donation");
        assert!(value["occurredAt"].is_string());
        assert!(value.get("event_type").is_none());
    }
}
