//! Detector de no-shows
//!
//! Al llegar la hora exacta de inicio de cada ruta, todo assignment
//! confirmado sin llegada registrada se marca no-show: reset completo de
//! salud, alerta al manager y ventana de emergencia con bonus. El
//! marcador `no_show_at` hace que re-correr el detector sea un no-op
//! para lo ya procesado.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::models::assignment::AssignmentWithStart;
use crate::models::bid::BidTrigger;
use crate::models::health::HealthEventType;
use crate::models::notification::NotificationIntent;
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::services::bidding_service::BiddingService;
use crate::services::health_service::HealthService;
use crate::services::metrics_service::MetricsService;
use crate::services::notification_service::{NotificationService, NotificationSink};
use crate::services::SweepSummary;
use crate::utils::errors::AppError;
use crate::utils::time::shift_start;

pub struct NoShowService {
    assignments: AssignmentRepository,
    health: HealthService,
    metrics: MetricsService,
    bidding: BiddingService,
    notifications: NotificationService,
    config: DispatchConfig,
}

impl NoShowService {
    pub fn new(pool: PgPool, config: DispatchConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            assignments: AssignmentRepository::new(pool.clone()),
            health: HealthService::new(pool.clone(), config.clone(), sink.clone()),
            metrics: MetricsService::new(pool.clone(), config.clone(), sink.clone()),
            bidding: BiddingService::new(pool.clone(), config.clone(), sink.clone()),
            notifications: NotificationService::new(pool, sink),
            config,
        }
    }

    /// Detectar no-shows con corte en la hora de inicio de cada ruta.
    pub async fn detect_no_shows(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary, AppError> {
        let candidates = self
            .assignments
            .no_show_candidates(organization_id, now.date_naive())
            .await?;
        info!(
            "🔍 Detección de no-shows: {} confirmados sin llegada",
            candidates.len()
        );

        let mut summary = SweepSummary::default();
        for slot in candidates {
            // el corte es la hora exacta de inicio de la ruta
            if shift_start(slot.assignment.date, slot.start_time) > now {
                summary.skipped += 1;
                continue;
            }

            match self.process_one(organization_id, &slot, now).await {
                Ok(true) => summary.processed += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    error!(
                        "❌ No-show del assignment {} no procesado: {}",
                        slot.assignment.id, e
                    );
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn process_one(
        &self,
        organization_id: Uuid,
        slot: &AssignmentWithStart,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let assignment = &slot.assignment;
        let driver_id = match assignment.driver_id {
            Some(id) => id,
            None => return Ok(false),
        };

        let marked = self
            .assignments
            .mark_no_show(organization_id, assignment.id, now)
            .await?;
        let marked = match marked {
            Some(a) => a,
            // ya procesado por una corrida anterior, o llegó a último momento
            None => return Ok(false),
        };

        warn!(
            "🚷 No-show de {} en ruta {} ({})",
            driver_id, assignment.route_id, assignment.date
        );

        // reset completo de salud, no un delta de puntos
        self.health
            .apply_event(
                organization_id,
                driver_id,
                HealthEventType::NoShow,
                Some(assignment.date),
                &format!("no_show:{}", assignment.id),
                now,
            )
            .await?;

        self.notifications
            .emit(
                organization_id,
                organization_id,
                &format!("driver_no_show:{}", assignment.id),
                NotificationIntent::DriverNoShow {
                    assignment_id: assignment.id,
                    driver_id,
                    route_id: assignment.route_id,
                    date: assignment.date,
                },
            )
            .await;

        self.metrics.recompute(organization_id, driver_id).await?;

        let reopened = AssignmentWithStart {
            assignment: marked,
            start_time: slot.start_time,
        };
        self.bidding
            .open_window_for(
                organization_id,
                &reopened,
                BidTrigger::NoShow,
                Some(self.config.emergency_bonus_percent),
                now,
            )
            .await?;

        Ok(true)
    }
}
