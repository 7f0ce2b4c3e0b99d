//! Controller de overrides manuales de managers
//!
//! Reusa los mismos primitivos atómicos de assignment/ventana que los
//! caminos automáticos y nunca aplica penalizaciones de no-show ni de
//! auto-drop por sí mismo.

use chrono::Utc;
use uuid::Uuid;

use validator::Validate;

use crate::models::assignment::{AssignmentResponse, ReassignRequest};
use crate::models::bid::{BidWindowResponse, ForceEmergencyRequest};
use crate::models::health::HealthStateResponse;
use crate::models::route::{CreateRouteRequest, CreateWarehouseRequest, RouteResponse, Warehouse};
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::repositories::route_repository::RouteRepository;
use crate::services::bidding_service::BiddingService;
use crate::services::health_service::HealthService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct AdminController {
    assignments: AssignmentRepository,
    routes: RouteRepository,
    bidding: BiddingService,
    health: HealthService,
}

impl AdminController {
    pub fn new(state: &AppState) -> Self {
        Self {
            assignments: AssignmentRepository::new(state.pool.clone()),
            routes: RouteRepository::new(state.pool.clone()),
            bidding: BiddingService::new(
                state.pool.clone(),
                state.config.dispatch.clone(),
                state.notifier.clone(),
            ),
            health: HealthService::new(
                state.pool.clone(),
                state.config.dispatch.clone(),
                state.notifier.clone(),
            ),
        }
    }

    /// Alta de warehouse (datos de referencia estáticos)
    pub async fn create_warehouse(
        &self,
        organization_id: Uuid,
        request: CreateWarehouseRequest,
    ) -> Result<Warehouse, AppError> {
        request.validate()?;
        self.routes.create_warehouse(organization_id, request.name).await
    }

    /// Alta de ruta con su hora de inicio diaria
    pub async fn create_route(
        &self,
        organization_id: Uuid,
        request: CreateRouteRequest,
    ) -> Result<RouteResponse, AppError> {
        request.validate()?;
        let route = self
            .routes
            .create(
                organization_id,
                request.warehouse_id,
                request.name,
                request.start_time,
            )
            .await?;
        Ok(route.into())
    }

    /// Reasignar un assignment directamente a otro conductor
    pub async fn reassign(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        request: ReassignRequest,
    ) -> Result<AssignmentResponse, AppError> {
        let assignment = self
            .assignments
            .manual_reassign(organization_id, assignment_id, request.driver_id)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(
                    "reassignment rejected: assignment not reassignable or driver already booked that date"
                        .to_string(),
                )
            })?;

        tracing::info!(
            "🛠️ Reasignación manual del assignment {} a {}",
            assignment_id,
            request.driver_id
        );

        Ok(assignment.into())
    }

    /// Forzar una ventana de emergencia sobre un slot sin cobertura
    pub async fn force_emergency_window(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        request: ForceEmergencyRequest,
    ) -> Result<BidWindowResponse, AppError> {
        let window = self
            .bidding
            .force_emergency_window(
                organization_id,
                assignment_id,
                request.pay_bonus_percent,
                Utc::now(),
            )
            .await?;
        Ok(window.into())
    }

    /// Reinstalar a un conductor tras un hard-stop
    pub async fn reinstate_driver(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<HealthStateResponse, AppError> {
        let state = self
            .health
            .reinstate(organization_id, driver_id, Utc::now())
            .await?;
        Ok(state.into())
    }
}
