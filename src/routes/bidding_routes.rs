use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::bidding_controller::BiddingController;
use crate::models::assignment::AssignmentResponse;
use crate::models::bid::{BidResponse, ClaimRequest, PlaceBidRequest};
use crate::routes::organization_id;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_bidding_router() -> Router<AppState> {
    Router::new()
        .route("/:window_id/bids", post(place_bid))
        .route("/:window_id/claim", post(claim))
}

async fn place_bid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(window_id): Path<Uuid>,
    Json(request): Json<PlaceBidRequest>,
) -> Result<Json<BidResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = BiddingController::new(&state);
    let response = controller
        .place_bid(organization_id, window_id, request)
        .await?;
    Ok(Json(response))
}

async fn claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(window_id): Path<Uuid>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let organization_id = organization_id(&headers)?;
    let controller = BiddingController::new(&state);
    let response = controller.claim(organization_id, window_id, request).await?;
    Ok(Json(response))
}
