use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};

use crate::controllers::trigger_controller::{
    DailyHealthSummary, ReferenceRequest, TriggerController, WeekRequest,
};
use crate::routes::organization_id;
use crate::services::bidding_service::BidCloseSummary;
use crate::services::scheduler_service::WeekGenerationSummary;
use crate::services::SweepSummary;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trigger_router() -> Router<AppState> {
    Router::new()
        .route("/generate-week", post(generate_week))
        .route("/confirmation-sweep", post(confirmation_sweep))
        .route("/no-show-sweep", post(no_show_sweep))
        .route("/close-bid-windows", post(close_bid_windows))
        .route("/daily-health", post(daily_health))
        .route("/weekly-health", post(weekly_health))
}

async fn generate_week(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<WeekRequest>,
) -> Result<Json<WeekGenerationSummary>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = TriggerController::new(&state);
    let summary = controller.generate_week(organization_id, request).await?;
    Ok(Json(summary))
}

async fn confirmation_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReferenceRequest>,
) -> Result<Json<SweepSummary>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = TriggerController::new(&state);
    let summary = controller
        .sweep_confirmation_deadlines(organization_id, request)
        .await?;
    Ok(Json(summary))
}

async fn no_show_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReferenceRequest>,
) -> Result<Json<SweepSummary>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = TriggerController::new(&state);
    let summary = controller.detect_no_shows(organization_id, request).await?;
    Ok(Json(summary))
}

async fn close_bid_windows(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReferenceRequest>,
) -> Result<Json<BidCloseSummary>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = TriggerController::new(&state);
    let summary = controller
        .close_bid_windows(organization_id, request)
        .await?;
    Ok(Json(summary))
}

async fn daily_health(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ReferenceRequest>,
) -> Result<Json<DailyHealthSummary>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = TriggerController::new(&state);
    let summary = controller
        .evaluate_daily_health(organization_id, request)
        .await?;
    Ok(Json(summary))
}

async fn weekly_health(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<WeekRequest>,
) -> Result<Json<SweepSummary>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = TriggerController::new(&state);
    let summary = controller
        .evaluate_weekly_health(organization_id, request)
        .await?;
    Ok(Json(summary))
}
