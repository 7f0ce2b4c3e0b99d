//! Controller del mercado de bidding

use chrono::Utc;
use uuid::Uuid;

use crate::models::assignment::AssignmentResponse;
use crate::models::bid::{BidResponse, ClaimRequest, PlaceBidRequest};
use crate::services::bidding_service::BiddingService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct BiddingController {
    bidding: BiddingService,
}

impl BiddingController {
    pub fn new(state: &AppState) -> Self {
        Self {
            bidding: BiddingService::new(
                state.pool.clone(),
                state.config.dispatch.clone(),
                state.notifier.clone(),
            ),
        }
    }

    /// Pujar en una ventana competitiva
    pub async fn place_bid(
        &self,
        organization_id: Uuid,
        window_id: Uuid,
        request: PlaceBidRequest,
    ) -> Result<BidResponse, AppError> {
        let bid = self
            .bidding
            .place_bid(organization_id, window_id, request.driver_id, Utc::now())
            .await?;
        Ok(bid.into())
    }

    /// Claim first-accept de una ventana instant/emergency
    pub async fn claim(
        &self,
        organization_id: Uuid,
        window_id: Uuid,
        request: ClaimRequest,
    ) -> Result<AssignmentResponse, AppError> {
        let assignment = self
            .bidding
            .claim(organization_id, window_id, request.driver_id, Utc::now())
            .await?;
        Ok(assignment.into())
    }
}
