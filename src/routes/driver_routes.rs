use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::driver_controller::DriverController;
use crate::models::driver::{
    CreateDriverRequest, DriverPreference, DriverResponse, UpdatePreferencesRequest,
};
use crate::models::health::HealthStateResponse;
use crate::models::metrics::DriverMetricsResponse;
use crate::routes::organization_id;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_driver_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_driver))
        .route("/:id", get(get_driver))
        .route("/:id", delete(deactivate_driver))
        .route("/:id/preferences", put(update_preferences))
        .route("/:id/health", get(get_health))
        .route("/:id/metrics", get(get_metrics))
}

async fn create_driver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateDriverRequest>,
) -> Result<Json<DriverResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = DriverController::new(&state);
    let response = controller.create(organization_id, request).await?;
    Ok(Json(response))
}

async fn get_driver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = DriverController::new(&state);
    let response = controller.get(organization_id, id).await?;
    Ok(Json(response))
}

async fn deactivate_driver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = DriverController::new(&state);
    controller.deactivate(organization_id, id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Conductor desactivado"
    })))
}

async fn update_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePreferencesRequest>,
) -> Result<Json<DriverPreference>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = DriverController::new(&state);
    let response = controller
        .update_preferences(organization_id, id, request)
        .await?;
    Ok(Json(response))
}

async fn get_health(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<HealthStateResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = DriverController::new(&state);
    let response = controller.get_health(organization_id, id).await?;
    Ok(Json(response))
}

async fn get_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverMetricsResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = DriverController::new(&state);
    let response = controller.get_metrics(organization_id, id).await?;
    Ok(Json(response))
}
