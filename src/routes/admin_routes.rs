use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::admin_controller::AdminController;
use crate::models::assignment::{AssignmentResponse, ReassignRequest};
use crate::models::bid::{BidWindowResponse, ForceEmergencyRequest};
use crate::models::health::HealthStateResponse;
use crate::models::route::{CreateRouteRequest, CreateWarehouseRequest, RouteResponse, Warehouse};
use crate::routes::organization_id;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/warehouse", post(create_warehouse))
        .route("/route", post(create_route))
        .route("/assignment/:id/reassign", post(reassign))
        .route("/assignment/:id/emergency-window", post(force_emergency_window))
        .route("/driver/:driver_id/reinstate", post(reinstate_driver))
}

async fn create_warehouse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateWarehouseRequest>,
) -> Result<Json<Warehouse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AdminController::new(&state);
    let response = controller.create_warehouse(organization_id, request).await?;
    Ok(Json(response))
}

async fn create_route(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateRouteRequest>,
) -> Result<Json<RouteResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AdminController::new(&state);
    let response = controller.create_route(organization_id, request).await?;
    Ok(Json(response))
}

async fn reassign(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<ReassignRequest>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AdminController::new(&state);
    let response = controller.reassign(organization_id, id, request).await?;
    Ok(Json(response))
}

async fn force_emergency_window(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<ForceEmergencyRequest>,
) -> Result<Json<BidWindowResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AdminController::new(&state);
    let response = controller
        .force_emergency_window(organization_id, id, request)
        .await?;
    Ok(Json(response))
}

async fn reinstate_driver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<HealthStateResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AdminController::new(&state);
    let response = controller
        .reinstate_driver(organization_id, driver_id)
        .await?;
    Ok(Json(response))
}
