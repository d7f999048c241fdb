//! JSON routes over the blood ledger.
//!
//! - `POST /requests`                     submit a blood request
//! - `GET  /requests`                     list, optional `status` and `requesterId`
//! - `GET  /requests/{id}`                fetch one request
//! - `POST /requests/{id}/decide`         approve or decline a pending request
//! - `GET  /inventory`                    all eight inventory records
//! - `PUT  /inventory/{bloodType}`        administrative override
//! - `POST /inventory/{bloodType}/adjust` relative change, e.g. a donation
//! - `POST /donations`                    schedule a donation
//! - `GET  /donations`                    history, optional `donorId` and `status`
//! - `GET  /donations/{id}`               fetch one donation
//! - `POST /donations/{id}/complete`      collect a donation and restock
//! - `POST /donations/{id}/cancel`        cancel a scheduled donation
//! - `GET  /summary`                      dashboard totals
//! - `GET  /audit`                        audit trail

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use bloodlink_core::{
    AuditContext, AuditEvent, BloodBank, BloodRequest, BloodType, Decision, DomainError, Donation,
    DonationFilter, DonationId, DonationStatus, InMemoryAuditSink, InterfaceError,
    InventoryRecord, LedgerSummary, NewBloodRequest, NewDonation, RequestFilter, RequestId,
    RequestStatus,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

const ADMIN_ACTOR: &str = "admin";

#[derive(Clone)]
pub struct ApiState {
    bank: Arc<BloodBank>,
    audit: InMemoryAuditSink,
}

impl ApiState {
    pub fn new(bank: Arc<BloodBank>, audit: InMemoryAuditSink) -> Self {
        Self { bank, audit }
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    pub requester_id: String,
    pub blood_type: String,
    pub units_requested: i64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct DecideBody {
    pub outcome: String,
}

#[derive(Debug, Deserialize)]
pub struct SetInventoryBody {
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustInventoryBody {
    pub delta: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
    #[serde(rename = "requesterId")]
    pub requester_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDonationBody {
    pub donor_id: String,
    pub blood_type: String,
    pub units: i64,
    #[serde(default)]
    pub location: String,
    pub scheduled_for: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListDonationsQuery {
    #[serde(rename = "donorId")]
    pub donor_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] InterfaceError);

impl ApiError {
    fn domain(error: DomainError, correlation_id: &str) -> Self {
        Self(error.into_interface(correlation_id))
    }

    fn bad_request(code: &'static str, message: impl Into<String>, correlation_id: &str) -> Self {
        Self(InterfaceError::bad_request(code, message, correlation_id))
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %self.0.correlation_id(),
                code = self.0.code(),
                error = %self.0,
                "request failed with internal error"
            );
        } else {
            debug!(
                event_name = "api.request.rejected",
                correlation_id = %self.0.correlation_id(),
                code = self.0.code(),
                status = status.as_u16(),
                "request rejected"
            );
        }

        let body = ErrorBody { error: self.0.code(), message: self.0.user_message() };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/requests", post(create_request).get(list_requests))
        .route("/requests/{id}", get(get_request))
        .route("/requests/{id}/decide", post(decide_request))
        .route("/inventory", get(list_inventory))
        .route("/inventory/{blood_type}", put(set_inventory))
        .route("/inventory/{blood_type}/adjust", post(adjust_inventory))
        .route("/donations", post(schedule_donation).get(list_donations))
        .route("/donations/{id}", get(get_donation))
        .route("/donations/{id}/complete", post(complete_donation))
        .route("/donations/{id}/cancel", post(cancel_donation))
        .route("/summary", get(summary))
        .route("/audit", get(audit_trail))
        .with_state(state)
}

fn correlation_id() -> String {
    format!("api-{}", &Uuid::new_v4().simple().to_string()[..12])
}

fn json_body<T>(
    body: Result<Json<T>, JsonRejection>,
    correlation_id: &str,
) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        ApiError::bad_request("invalid_body", rejection.body_text(), correlation_id)
    })
}

fn parse_blood_type(raw: &str, correlation_id: &str) -> Result<BloodType, ApiError> {
    raw.parse::<BloodType>().map_err(|error| {
        ApiError::bad_request("invalid_blood_type", error.to_string(), correlation_id)
    })
}

fn parse_decision(raw: &str, correlation_id: &str) -> Result<Decision, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "approve" => Ok(Decision::Approve),
        "decline" => Ok(Decision::Decline),
        other => Err(ApiError::bad_request(
            "invalid_outcome",
            format!("unsupported decision outcome `{other}` (expected approve|decline)"),
            correlation_id,
        )),
    }
}

fn parse_date(raw: &str, correlation_id: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|error| {
        let message = format!("invalid date `{raw}`: {error}");
        ApiError::bad_request("invalid_date", message, correlation_id)
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_request(
    State(state): State<ApiState>,
    body: Result<Json<CreateRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<BloodRequest>), ApiError> {
    let correlation_id = correlation_id();
    let body = json_body(body, &correlation_id)?;
    let blood_type = parse_blood_type(&body.blood_type, &correlation_id)?;
    let context = AuditContext::new(&correlation_id, body.requester_id.as_str());

    let request = state
        .bank
        .requests()
        .submit(
            NewBloodRequest {
                requester_id: body.requester_id,
                blood_type,
                units_requested: body.units_requested,
                notes: body.notes,
            },
            &context,
        )
        .map_err(|error| ApiError::domain(error, &correlation_id))?;

    Ok((StatusCode::CREATED, Json(request)))
}

async fn list_requests(
    State(state): State<ApiState>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<BloodRequest>>, ApiError> {
    let correlation_id = correlation_id();
    let status = query
        .status
        .as_deref()
        .map(str::parse::<RequestStatus>)
        .transpose()
        .map_err(|error| ApiError::domain(error, &correlation_id))?;

    let filter = RequestFilter { status, requester_id: query.requester_id };
    Ok(Json(state.bank.requests().list(&filter)))
}

async fn get_request(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<BloodRequest>, ApiError> {
    let correlation_id = correlation_id();
    state
        .bank
        .requests()
        .get(&RequestId(id))
        .map(Json)
        .map_err(|error| ApiError::domain(error, &correlation_id))
}

async fn decide_request(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Result<Json<DecideBody>, JsonRejection>,
) -> Result<Json<BloodRequest>, ApiError> {
    let correlation_id = correlation_id();
    let body = json_body(body, &correlation_id)?;
    let decision = parse_decision(&body.outcome, &correlation_id)?;
    let context = AuditContext::new(&correlation_id, ADMIN_ACTOR);

    state
        .bank
        .requests()
        .decide(&RequestId(id), decision, &context)
        .map(Json)
        .map_err(|error| ApiError::domain(error, &correlation_id))
}

async fn list_inventory(State(state): State<ApiState>) -> Json<Vec<InventoryRecord>> {
    Json(state.bank.inventory().snapshot())
}

async fn set_inventory(
    State(state): State<ApiState>,
    Path(raw_blood_type): Path<String>,
    body: Result<Json<SetInventoryBody>, JsonRejection>,
) -> Result<Json<InventoryRecord>, ApiError> {
    let correlation_id = correlation_id();
    let blood_type = parse_blood_type(&raw_blood_type, &correlation_id)?;
    let body = json_body(body, &correlation_id)?;
    let context = AuditContext::new(&correlation_id, ADMIN_ACTOR);

    state
        .bank
        .set_units(blood_type, body.value, &context)
        .map(Json)
        .map_err(|error| ApiError::domain(error, &correlation_id))
}

async fn adjust_inventory(
    State(state): State<ApiState>,
    Path(raw_blood_type): Path<String>,
    body: Result<Json<AdjustInventoryBody>, JsonRejection>,
) -> Result<Json<InventoryRecord>, ApiError> {
    let correlation_id = correlation_id();
    let blood_type = parse_blood_type(&raw_blood_type, &correlation_id)?;
    let body = json_body(body, &correlation_id)?;
    let context = AuditContext::new(&correlation_id, ADMIN_ACTOR);

    state
        .bank
        .adjust_units(blood_type, body.delta, &context)
        .map(Json)
        .map_err(|error| ApiError::domain(error, &correlation_id))
}

async fn schedule_donation(
    State(state): State<ApiState>,
    body: Result<Json<ScheduleDonationBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Donation>), ApiError> {
    let correlation_id = correlation_id();
    let body = json_body(body, &correlation_id)?;
    let blood_type = parse_blood_type(&body.blood_type, &correlation_id)?;
    let scheduled_for = parse_date(&body.scheduled_for, &correlation_id)?;
    let context = AuditContext::new(&correlation_id, body.donor_id.as_str());

    let donation = state
        .bank
        .donations()
        .schedule(
            NewDonation {
                donor_id: body.donor_id,
                blood_type,
                units: body.units,
                location: body.location,
                scheduled_for,
            },
            &context,
        )
        .map_err(|error| ApiError::domain(error, &correlation_id))?;

    Ok((StatusCode::CREATED, Json(donation)))
}

async fn list_donations(
    State(state): State<ApiState>,
    Query(query): Query<ListDonationsQuery>,
) -> Result<Json<Vec<Donation>>, ApiError> {
    let correlation_id = correlation_id();
    let status = query
        .status
        .as_deref()
        .map(str::parse::<DonationStatus>)
        .transpose()
        .map_err(|error| ApiError::domain(error, &correlation_id))?;

    let filter = DonationFilter { donor_id: query.donor_id, status };
    Ok(Json(state.bank.donations().list(&filter)))
}

async fn get_donation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Donation>, ApiError> {
    let correlation_id = correlation_id();
    state
        .bank
        .donations()
        .get(&DonationId(id))
        .map(Json)
        .map_err(|error| ApiError::domain(error, &correlation_id))
}

async fn complete_donation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Donation>, ApiError> {
    let correlation_id = correlation_id();
    let context = AuditContext::new(&correlation_id, ADMIN_ACTOR);
    state
        .bank
        .donations()
        .complete(&DonationId(id), &context)
        .map(Json)
        .map_err(|error| ApiError::domain(error, &correlation_id))
}

async fn cancel_donation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Donation>, ApiError> {
    let correlation_id = correlation_id();
    let context = AuditContext::new(&correlation_id, ADMIN_ACTOR);
    state
        .bank
        .donations()
        .cancel(&DonationId(id), &context)
        .map(Json)
        .map_err(|error| ApiError::domain(error, &correlation_id))
}

async fn summary(State(state): State<ApiState>) -> Json<LedgerSummary> {
    Json(state.bank.summary())
}

async fn audit_trail(State(state): State<ApiState>) -> Json<Vec<AuditEvent>> {
    Json(state.audit.events())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use bloodlink_core::{BloodBank, BloodType, InMemoryAuditSink, InventoryStore};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::{router, ApiState};

    fn app(stock: impl IntoIterator<Item = (BloodType, u32)>) -> (Router, InMemoryAuditSink) {
        let audit = InMemoryAuditSink::default();
        let bank = BloodBank::new(InventoryStore::with_units(stock), Arc::new(audit.clone()));
        (router(ApiState::new(Arc::new(bank), audit.clone())), audit)
    }

    const NO_STOCK: [(BloodType, u32); 0] = [];

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    async fn submit(app: &Router, blood_type: &str, units: i64) -> (StatusCode, Value) {
        send(
            app,
            "POST",
            "/requests",
            Some(json!({
                "requesterId": "recipient-1",
                "bloodType": blood_type,
                "unitsRequested": units,
                "notes": "ward 3"
            })),
        )
        .await
    }

    async fn decide(app: &Router, id: &str, outcome: &str) -> (StatusCode, Value) {
        send(app, "POST", &format!("/requests/{id}/decide"), Some(json!({ "outcome": outcome })))
            .await
    }

    fn units_of(inventory: &Value, blood_type: &str) -> Option<u64> {
        inventory.as_array()?.iter().find(|record| record["bloodType"] == blood_type)?
            ["unitsAvailable"]
            .as_u64()
    }

    #[tokio::test]
    async fn second_approval_conflicts_when_stock_only_covers_one() {
        let (app, _) = app([(BloodType::ONegative, 5)]);

        let (status, first) = submit(&app, "O-", 3).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["status"], "pending");
        let (_, second) = submit(&app, "O-", 3).await;

        let first_id = first["id"].as_str().expect("id");
        let second_id = second["id"].as_str().expect("id");

        let (status, approved) = decide(&app, first_id, "approve").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["status"], "approved");
        assert!(approved["decidedAt"].is_string());

        let (_, inventory) = send(&app, "GET", "/inventory", None).await;
        assert_eq!(units_of(&inventory, "O-"), Some(2));

        let (status, error) = decide(&app, second_id, "approve").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"], "insufficient_stock");

        let (_, inventory) = send(&app, "GET", "/inventory", None).await;
        assert_eq!(units_of(&inventory, "O-"), Some(2));
        let (status, still_pending) =
            send(&app, "GET", &format!("/requests/{second_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(still_pending["status"], "pending");
    }

    #[tokio::test]
    async fn deciding_twice_is_a_conflict_with_its_own_message() {
        let (app, _) = app([(BloodType::APositive, 10)]);
        let (_, request) = submit(&app, "A+", 4).await;
        let id = request["id"].as_str().expect("id");

        let (status, _) = decide(&app, id, "approve").await;
        assert_eq!(status, StatusCode::OK);
        let (status, error) = decide(&app, id, "decline").await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"], "already_decided");
        assert_eq!(error["message"], "This request has already been decided.");
        let (_, inventory) = send(&app, "GET", "/inventory", None).await;
        assert_eq!(units_of(&inventory, "A+"), Some(6));
    }

    #[tokio::test]
    async fn declining_leaves_stock_untouched() {
        let (app, _) = app([(BloodType::BPositive, 2)]);
        let (_, request) = submit(&app, "B+", 2).await;

        let (status, declined) =
            decide(&app, request["id"].as_str().expect("id"), "decline").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(declined["status"], "declined");
        let (_, inventory) = send(&app, "GET", "/inventory", None).await;
        assert_eq!(units_of(&inventory, "B+"), Some(2));
    }

    #[tokio::test]
    async fn submit_rejects_non_positive_units_without_creating_a_record() {
        let (app, _) = app(NO_STOCK);

        let (status, error) = submit(&app, "A-", 0).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error["error"], "invalid_units");

        let (status, _) = submit(&app, "A-", -2).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, requests) = send(&app, "GET", "/requests", None).await;
        assert_eq!(requests.as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn unknown_blood_type_is_a_bad_request() {
        let (app, _) = app(NO_STOCK);

        let (status, error) = submit(&app, "C+", 1).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_blood_type");

        let (status, error) =
            send(&app, "PUT", "/inventory/XY", Some(json!({ "value": 3 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_blood_type");
    }

    #[tokio::test]
    async fn set_inventory_rejects_negative_values() {
        let (app, _) = app([(BloodType::AbNegative, 8)]);

        let (status, error) =
            send(&app, "PUT", "/inventory/AB-", Some(json!({ "value": -1 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error["error"], "invalid_value");

        let (status, record) =
            send(&app, "PUT", "/inventory/ab-", Some(json!({ "value": 12 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["bloodType"], "AB-");
        assert_eq!(record["unitsAvailable"], 12);
        assert_eq!(record["stockLevel"], "critical");
    }

    #[tokio::test]
    async fn adjust_records_donations_and_refuses_to_go_negative() {
        let (app, _) = app([(BloodType::OPositive, 3)]);

        let (status, record) =
            send(&app, "POST", "/inventory/O+/adjust", Some(json!({ "delta": 40 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["unitsAvailable"], 43);
        assert_eq!(record["stockLevel"], "adequate");

        let (status, error) =
            send(&app, "POST", "/inventory/O+/adjust", Some(json!({ "delta": -50 }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"], "insufficient_stock");
    }

    #[tokio::test]
    async fn unknown_request_id_is_not_found() {
        let (app, _) = app(NO_STOCK);

        let (status, error) = decide(&app, "REQ-missing", "approve").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["error"], "not_found");

        let (status, _) = send(&app, "GET", "/requests/REQ-missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_outcome_and_malformed_body_are_bad_requests() {
        let (app, _) = app([(BloodType::ANegative, 4)]);
        let (_, request) = submit(&app, "A-", 1).await;
        let id = request["id"].as_str().expect("id");

        let (status, error) = decide(&app, id, "maybe").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_outcome");

        let (status, error) =
            send(&app, "POST", "/requests", Some(json!({ "bloodType": "A-" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_body");
    }

    #[tokio::test]
    async fn list_filters_by_status_and_requester() {
        let (app, _) = app([(BloodType::APositive, 10)]);
        let (_, first) = submit(&app, "A+", 1).await;
        submit(&app, "A+", 2).await;
        decide(&app, first["id"].as_str().expect("id"), "approve").await;

        let (_, approved) = send(&app, "GET", "/requests?status=approved", None).await;
        assert_eq!(approved.as_array().map(Vec::len), Some(1));
        assert_eq!(approved[0]["id"], first["id"]);

        let (_, mine) = send(&app, "GET", "/requests?requesterId=recipient-1", None).await;
        assert_eq!(mine.as_array().map(Vec::len), Some(2));
        assert_eq!(mine[0]["id"], first["id"]);

        let (status, error) = send(&app, "GET", "/requests?status=archived", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_status");
    }

    #[tokio::test]
    async fn summary_and_audit_reflect_ledger_activity() {
        let (app, audit) = app([(BloodType::ONegative, 31), (BloodType::OPositive, 67)]);
        let (_, request) = submit(&app, "O-", 3).await;
        decide(&app, request["id"].as_str().expect("id"), "approve").await;

        let (status, summary) = send(&app, "GET", "/summary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["totalUnits"], 95);
        assert_eq!(summary["requests"]["approved"], 1);
        assert_eq!(summary["stockLevels"]["critical"], 6);

        let (status, events) = send(&app, "GET", "/audit", None).await;
        assert_eq!(status, StatusCode::OK);
        let types: Vec<_> = events
            .as_array()
            .expect("events")
            .iter()
            .map(|event| event["eventType"].clone())
            .collect();
        assert_eq!(types, vec![json!("request.submitted"), json!("request.approved")]);
        assert_eq!(audit.events().len(), 2);
    }

    #[tokio::test]
    async fn oversized_inventory_values_are_unprocessable_not_internal() {
        let (app, _) = app([(BloodType::OPositive, 67)]);

        let (status, error) =
            send(&app, "PUT", "/inventory/O+", Some(json!({ "value": 5_000_000_000_i64 }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error["error"], "invalid_value");

        let (status, error) =
            send(&app, "POST", "/inventory/O+/adjust", Some(json!({ "delta": 5_000_000_000_i64 })))
                .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error["error"], "capacity_exceeded");

        let (_, inventory) = send(&app, "GET", "/inventory", None).await;
        assert_eq!(units_of(&inventory, "O+"), Some(67));
    }

    async fn schedule(app: &Router, donor_id: &str, date: &str) -> (StatusCode, Value) {
        send(
            app,
            "POST",
            "/donations",
            Some(json!({
                "donorId": donor_id,
                "bloodType": "A+",
                "units": 1,
                "location": "Central Hospital",
                "scheduledFor": date
            })),
        )
        .await
    }

    #[tokio::test]
    async fn completed_donation_restocks_and_shows_in_donor_history() {
        let (app, audit) = app([(BloodType::APositive, 45)]);

        let (status, donation) = schedule(&app, "donor-john-doe", "2025-01-15").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(donation["status"], "scheduled");
        assert_eq!(donation["scheduledFor"], "2025-01-15");
        schedule(&app, "donor-jane", "2025-01-20").await;

        let id = donation["id"].as_str().expect("id");
        let (status, completed) =
            send(&app, "POST", &format!("/donations/{id}/complete"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(completed["status"], "completed");

        let (_, inventory) = send(&app, "GET", "/inventory", None).await;
        assert_eq!(units_of(&inventory, "A+"), Some(46));

        let (status, error) = send(&app, "POST", &format!("/donations/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"], "donation_closed");

        let (_, history) = send(&app, "GET", "/donations?donorId=donor-john-doe", None).await;
        assert_eq!(history.as_array().map(Vec::len), Some(1));
        assert_eq!(history[0]["id"], donation["id"]);

        let (_, scheduled) = send(&app, "GET", "/donations?status=scheduled", None).await;
        assert_eq!(scheduled.as_array().map(Vec::len), Some(1));
        assert_eq!(scheduled[0]["donorId"], "donor-jane");

        assert!(audit.events().iter().any(|event| event.event_type == "donation.completed"));
    }

    #[tokio::test]
    async fn donation_input_errors_are_typed() {
        let (app, _) = app(NO_STOCK);

        let (status, error) = schedule(&app, "donor-1", "15/01/2025").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_date");

        let (status, error) = send(
            &app,
            "POST",
            "/donations",
            Some(json!({
                "donorId": "donor-1",
                "bloodType": "B+",
                "units": 0,
                "scheduledFor": "2025-03-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error["error"], "invalid_units");

        let (status, error) = send(&app, "POST", "/donations/DON-missing/complete", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["error"], "donation_not_found");

        let (status, error) = send(&app, "GET", "/donations?status=missed", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"], "invalid_donation_status");
    }
}
