use axum::Json;
use ftalk_shared::types::api::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("ftalk-matching", env!("CARGO_PKG_VERSION")))
}
