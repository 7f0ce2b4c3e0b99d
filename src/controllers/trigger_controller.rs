//! Controller de los triggers periódicos
//!
//! Cada operación del motor se expone como un callable idempotente que
//! recibe solo una fecha/semana de referencia; la cadencia de invocación
//! (cron) vive fuera del motor.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::services::bidding_service::{BidCloseSummary, BiddingService};
use crate::services::health_service::HealthService;
use crate::services::lifecycle_service::LifecycleService;
use crate::services::metrics_service::MetricsService;
use crate::services::no_show_service::NoShowService;
use crate::services::scheduler_service::{SchedulerService, WeekGenerationSummary};
use crate::services::SweepSummary;
use crate::state::AppState;
use crate::utils::errors::AppError;
use uuid::Uuid;

/// Request con la semana objetivo (lunes)
#[derive(Debug, Deserialize)]
pub struct WeekRequest {
    pub week_start: NaiveDate,
}

/// Request con el instante de referencia del sweep; default ahora
#[derive(Debug, Default, Deserialize)]
pub struct ReferenceRequest {
    pub reference: Option<DateTime<Utc>>,
}

/// Resumen combinado de la evaluación diaria
#[derive(Debug, Serialize)]
pub struct DailyHealthSummary {
    pub health: SweepSummary,
    pub flag_grace: SweepSummary,
}

pub struct TriggerController {
    scheduler: SchedulerService,
    lifecycle: LifecycleService,
    no_show: NoShowService,
    bidding: BiddingService,
    health: HealthService,
    metrics: MetricsService,
}

impl TriggerController {
    pub fn new(state: &AppState) -> Self {
        let pool = state.pool.clone();
        let config = state.config.dispatch.clone();
        let sink = state.notifier.clone();
        Self {
            scheduler: SchedulerService::new(pool.clone(), config.clone(), sink.clone()),
            lifecycle: LifecycleService::new(pool.clone(), config.clone(), sink.clone()),
            no_show: NoShowService::new(pool.clone(), config.clone(), sink.clone()),
            bidding: BiddingService::new(pool.clone(), config.clone(), sink.clone()),
            health: HealthService::new(pool.clone(), config.clone(), sink.clone()),
            metrics: MetricsService::new(pool, config, sink),
        }
    }

    pub async fn generate_week(
        &self,
        organization_id: Uuid,
        request: WeekRequest,
    ) -> Result<WeekGenerationSummary, AppError> {
        self.scheduler
            .generate_week(organization_id, request.week_start)
            .await
    }

    pub async fn sweep_confirmation_deadlines(
        &self,
        organization_id: Uuid,
        request: ReferenceRequest,
    ) -> Result<SweepSummary, AppError> {
        let now = request.reference.unwrap_or_else(Utc::now);
        self.lifecycle
            .sweep_confirmation_deadlines(organization_id, now)
            .await
    }

    pub async fn detect_no_shows(
        &self,
        organization_id: Uuid,
        request: ReferenceRequest,
    ) -> Result<SweepSummary, AppError> {
        let now = request.reference.unwrap_or_else(Utc::now);
        self.no_show.detect_no_shows(organization_id, now).await
    }

    pub async fn close_bid_windows(
        &self,
        organization_id: Uuid,
        request: ReferenceRequest,
    ) -> Result<BidCloseSummary, AppError> {
        let now = request.reference.unwrap_or_else(Utc::now);
        self.bidding.close_bid_windows(organization_id, now).await
    }

    pub async fn evaluate_daily_health(
        &self,
        organization_id: Uuid,
        request: ReferenceRequest,
    ) -> Result<DailyHealthSummary, AppError> {
        let now = request.reference.unwrap_or_else(Utc::now);
        let health = self
            .health
            .evaluate_daily(organization_id, now.date_naive(), now)
            .await?;
        let flag_grace = self.metrics.sweep_flag_grace(organization_id, now).await?;

        Ok(DailyHealthSummary { health, flag_grace })
    }

    pub async fn evaluate_weekly_health(
        &self,
        organization_id: Uuid,
        request: WeekRequest,
    ) -> Result<SweepSummary, AppError> {
        self.health
            .evaluate_weekly(organization_id, request.week_start, Utc::now())
            .await
    }
}
