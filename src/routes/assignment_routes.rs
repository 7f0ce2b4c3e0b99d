use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::assignment_controller::AssignmentController;
use crate::models::assignment::AssignmentResponse;
use crate::models::shift::{
    CompleteShiftRequest, EditShiftRequest, ShiftResponse, StartShiftRequest,
};
use crate::routes::organization_id;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_assignment_router() -> Router<AppState> {
    Router::new()
        .route("/:id/confirm", post(confirm_assignment))
        .route("/:id/arrive", post(arrive))
        .route("/:id/start", post(start_shift))
        .route("/:id/complete", post(complete_shift))
        .route("/:id/cancel", post(cancel_assignment))
        .route("/shift/:shift_id", put(edit_shift))
}

async fn confirm_assignment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AssignmentController::new(&state);
    let response = controller.confirm(organization_id, id).await?;
    Ok(Json(response))
}

async fn arrive(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ShiftResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AssignmentController::new(&state);
    let response = controller.arrive(organization_id, id).await?;
    Ok(Json(response))
}

async fn start_shift(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<StartShiftRequest>,
) -> Result<Json<ShiftResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AssignmentController::new(&state);
    let response = controller.start(organization_id, id, request).await?;
    Ok(Json(response))
}

async fn complete_shift(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteShiftRequest>,
) -> Result<Json<ShiftResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AssignmentController::new(&state);
    let response = controller.complete(organization_id, id, request).await?;
    Ok(Json(response))
}

async fn cancel_assignment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AssignmentController::new(&state);
    let response = controller.cancel(organization_id, id).await?;
    Ok(Json(response))
}

async fn edit_shift(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(shift_id): Path<Uuid>,
    Json(request): Json<EditShiftRequest>,
) -> Result<Json<ShiftResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = AssignmentController::new(&state);
    let response = controller
        .edit_shift(organization_id, shift_id, request)
        .await?;
    Ok(Json(response))
}
