use axum::{http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

pub const SERVICE_NAME: &str = "bloodlink-server";

/// `{status, timestamp}` is what dashboards already poll; `service` is extra.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub service: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BannerResponse {
    pub message: &'static str,
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health)).route("/api", get(banner))
}

pub async fn health() -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
    };
    (StatusCode::OK, Json(payload))
}

pub async fn banner() -> Json<BannerResponse> {
    Json(BannerResponse { message: "BloodLink Local API" })
}
