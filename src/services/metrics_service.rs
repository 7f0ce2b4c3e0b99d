//! Métricas rodantes y reglas de flagging
//!
//! attendance = turnos completados / turnos asignados (cualquier
//! desenlace no completado cuenta como falta). completion = promedio del
//! ratio de entrega sobre turnos completados con paquetes cargados.
//! El flag excluye al conductor del scheduling y del fan-out de bidding;
//! tras 7 días de gracia reduce el cap semanal en 1 (piso 1).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::models::metrics::DriverMetrics;
use crate::models::notification::NotificationIntent;
use crate::repositories::driver_repository::DriverRepository;
use crate::repositories::metrics_repository::MetricsRepository;
use crate::services::notification_service::{NotificationService, NotificationSink};
use crate::services::SweepSummary;
use crate::utils::errors::{not_found_error, AppError};

/// Umbral de attendance para el flag según la vida del conductor:
/// más estricto antes de los 10 turnos.
pub fn flag_threshold(total_shifts: i64) -> f64 {
    if total_shifts < 10 {
        0.80
    } else {
        0.70
    }
}

/// ¿Corresponde flaguear al conductor?
pub fn flag_decision(total_shifts: i64, attendance_rate: f64) -> bool {
    total_shifts > 0 && attendance_rate < flag_threshold(total_shifts)
}

/// ¿Corresponde subir el cap a 6? (≥20 turnos y ≥95% de attendance)
pub fn reward_decision(total_shifts: i64, attendance_rate: f64) -> bool {
    total_shifts >= 20 && attendance_rate >= 0.95
}

pub struct MetricsService {
    metrics: MetricsRepository,
    drivers: DriverRepository,
    notifications: NotificationService,
    config: DispatchConfig,
}

impl MetricsService {
    pub fn new(pool: PgPool, config: DispatchConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            metrics: MetricsRepository::new(pool.clone()),
            drivers: DriverRepository::new(pool.clone()),
            notifications: NotificationService::new(pool, sink),
            config,
        }
    }

    /// Recomputar las métricas del conductor desde el historial y
    /// aplicar las reglas de flag/reward.
    pub async fn recompute(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<DriverMetrics, AppError> {
        let driver = self
            .drivers
            .find_by_id(organization_id, driver_id)
            .await?
            .ok_or_else(|| not_found_error("Driver", &driver_id.to_string()))?;

        let agg = self.metrics.aggregates(organization_id, driver_id).await?;
        let total = agg.completed_shifts + agg.missed_shifts;
        let attendance_rate = if total == 0 {
            1.0
        } else {
            agg.completed_shifts as f64 / total as f64
        };
        let completion_rate = agg.completion_rate.unwrap_or(1.0);

        let metrics = self
            .metrics
            .upsert(
                organization_id,
                driver_id,
                attendance_rate,
                completion_rate,
                agg.completed_shifts,
                total,
            )
            .await?;

        let now = Utc::now();
        let should_flag = flag_decision(total, attendance_rate);

        if should_flag && !driver.flagged {
            self.drivers
                .set_flagged(organization_id, driver_id, true, now)
                .await?;
            info!(
                "🚩 Conductor {} flagueado: attendance {:.0}% sobre {} turnos",
                driver_id,
                attendance_rate * 100.0,
                total
            );
            self.notifications
                .emit(
                    organization_id,
                    driver_id,
                    &format!("corrective_warning:{}:{}", driver_id, now.date_naive()),
                    NotificationIntent::CorrectiveWarning {
                        attendance_rate,
                        threshold: flag_threshold(total),
                    },
                )
                .await;
        } else if !should_flag && driver.flagged {
            self.drivers
                .set_flagged(organization_id, driver_id, false, now)
                .await?;
            info!("✅ Conductor {} sale del flag", driver_id);
        }

        if reward_decision(total, attendance_rate) && driver.weekly_cap < 6 {
            self.drivers
                .set_weekly_cap(organization_id, driver_id, 6)
                .await?;
            info!("🎖️ Cap semanal de {} sube a 6", driver_id);
        }

        Ok(metrics)
    }

    /// Reducción de cap para flags cuyo período de gracia venció.
    /// Idempotente: cada episodio de flag reduce el cap una sola vez.
    pub async fn sweep_flag_grace(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary, AppError> {
        let cutoff = now - Duration::days(self.config.flag_grace_days);
        let due = self.drivers.flagged_past_grace(organization_id, cutoff).await?;

        let mut summary = SweepSummary::default();
        for driver in due {
            match self
                .drivers
                .reduce_cap_for_flag(organization_id, driver.id, now)
                .await
            {
                Ok(true) => {
                    info!("⬇️ Cap semanal de {} reducido por flag", driver.id);
                    summary.processed += 1;
                }
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    tracing::error!("❌ Error reduciendo cap de {}: {}", driver.id, e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    pub async fn find(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<DriverMetrics>, AppError> {
        self.metrics.find(organization_id, driver_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_threshold_by_lifetime() {
        // antes de 10 turnos el umbral es 80%, después 70%
        assert!(flag_decision(5, 0.79));
        assert!(!flag_decision(5, 0.80));
        assert!(flag_decision(10, 0.69));
        assert!(!flag_decision(10, 0.75));
        assert!(!flag_decision(30, 0.70));
    }

    #[test]
    fn test_new_driver_never_flagged() {
        assert!(!flag_decision(0, 1.0));
    }

    #[test]
    fn test_reward_requires_volume_and_attendance() {
        assert!(reward_decision(20, 0.95));
        assert!(reward_decision(50, 0.99));
        assert!(!reward_decision(19, 1.0));
        assert!(!reward_decision(25, 0.94));
    }
}
