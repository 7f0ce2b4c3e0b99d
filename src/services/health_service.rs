//! Motor de salud del conductor
//!
//! Modelo aditivo de puntos con piso 0 y techo 100. Un no-show resetea
//! todo; dos cancelaciones tardías en 30 días disparan el hard-stop que
//! capa el score en 49 y saca al conductor del pool hasta que un manager
//! lo reinstale. Las estrellas avanzan por semanas calificadas
//! (attendance 100%, completion ≥95%, cero no-shows, cero late cancels).

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::models::health::{DriverHealthState, HealthEventType, MAX_STARS};
use crate::models::notification::NotificationIntent;
use crate::repositories::health_repository::HealthRepository;
use crate::repositories::metrics_repository::MetricsRepository;
use crate::services::notification_service::{NotificationService, NotificationSink};
use crate::services::SweepSummary;
use crate::utils::errors::{not_found_error, AppError};

/// Estadísticas de una semana de un conductor, insumo de la evaluación
/// de estrellas
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekStats {
    pub completions: i64,
    pub misses: i64,
    pub no_shows: i64,
    pub late_cancels: i64,
    /// None cuando la semana no tuvo turnos medibles
    pub completion_rate: Option<f64>,
}

impl WeekStats {
    /// Semana sin actividad: neutral, no avanza ni castiga
    pub fn is_empty(&self) -> bool {
        self.completions == 0 && self.misses == 0
    }
}

/// Una semana califica solo con attendance 100% (cero faltas y al menos
/// un turno), completion ≥ 95%, cero no-shows y cero cancelaciones
/// tardías.
pub fn week_qualifies(stats: &WeekStats) -> bool {
    stats.completions > 0
        && stats.misses == 0
        && stats.no_shows == 0
        && stats.late_cancels == 0
        && stats.completion_rate.unwrap_or(1.0) >= 0.95
}

pub struct HealthService {
    health: HealthRepository,
    metrics: MetricsRepository,
    notifications: NotificationService,
    config: DispatchConfig,
}

impl HealthService {
    pub fn new(pool: PgPool, config: DispatchConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            health: HealthRepository::new(pool.clone()),
            metrics: MetricsRepository::new(pool.clone()),
            notifications: NotificationService::new(pool, sink),
            config,
        }
    }

    /// ¿Hay condición de hard-stop en la ventana móvil? Cualquier
    /// no-show, o 2+ cancelaciones tardías.
    pub async fn hard_stop_active(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let since = now - Duration::days(self.config.hard_stop_window_days);

        let no_shows = self
            .health
            .count_events_since(organization_id, driver_id, HealthEventType::NoShow, since)
            .await?;
        if no_shows > 0 {
            return Ok(true);
        }

        let late_cancels = self
            .health
            .count_events_since(organization_id, driver_id, HealthEventType::LateCancel, since)
            .await?;

        Ok(late_cancels >= 2)
    }

    /// Aplicar un evento del ciclo de vida. El ledger deduplicado
    /// garantiza que cada evento aporte puntos exactamente una vez:
    /// devuelve false cuando ya estaba aplicado (sweep re-ejecutado).
    pub async fn apply_event(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        event_type: HealthEventType,
        shift_date: Option<NaiveDate>,
        dedup_key: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.health.get_or_create(organization_id, driver_id).await?;

        let fresh = self
            .health
            .insert_event(organization_id, driver_id, event_type, shift_date, dedup_key, now)
            .await?;
        if !fresh {
            return Ok(false);
        }

        if event_type == HealthEventType::NoShow {
            // no es un delta de puntos: reset completo
            self.health.full_reset(organization_id, driver_id, now).await?;
            info!("🔻 Reset completo de salud para {} por no-show", driver_id);
            self.notifications
                .emit(
                    organization_id,
                    driver_id,
                    &format!("streak_reset:{}", dedup_key),
                    NotificationIntent::StreakReset {
                        reason: "no_show".to_string(),
                    },
                )
                .await;
            return Ok(true);
        }

        let hard_stop = self.hard_stop_active(organization_id, driver_id, now).await?;
        self.health
            .apply_delta(organization_id, driver_id, event_type.points(), hard_stop, now)
            .await?;

        if hard_stop && event_type == HealthEventType::LateCancel {
            // segunda cancelación tardía de la ventana: hard-stop inmediato
            let changed = self
                .health
                .enforce_hard_stop(organization_id, driver_id, now)
                .await?;
            if changed {
                info!(
                    "🛑 Hard-stop para {} por cancelaciones tardías acumuladas",
                    driver_id
                );
                self.notifications
                    .emit(
                        organization_id,
                        driver_id,
                        &format!("streak_reset:{}", dedup_key),
                        NotificationIntent::StreakReset {
                            reason: "late_cancellations".to_string(),
                        },
                    )
                    .await;
            }
        }

        Ok(true)
    }

    /// Evaluación diaria: re-aplica la política de hard-stop sobre la
    /// ventana móvil y persiste el snapshot inmutable del día. Re-correr
    /// el mismo día no muta nada (snapshot único por fecha, enforcement
    /// condicionado al estado).
    pub async fn evaluate_daily(
        &self,
        organization_id: Uuid,
        as_of: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary, AppError> {
        let states = self.health.list_for_org(organization_id).await?;
        info!(
            "🩺 Evaluación diaria de salud: {} conductores en {}",
            states.len(),
            as_of
        );

        let mut summary = SweepSummary::default();
        for state in states {
            match self.evaluate_driver_daily(organization_id, &state, as_of, now).await {
                Ok(true) => summary.processed += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    error!("❌ Evaluación diaria de {} falló: {}", state.driver_id, e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn evaluate_driver_daily(
        &self,
        organization_id: Uuid,
        state: &DriverHealthState,
        as_of: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let driver_id = state.driver_id;
        let hard_stop = self.hard_stop_active(organization_id, driver_id, now).await?;

        if hard_stop {
            self.health.enforce_hard_stop(organization_id, driver_id, now).await?;
        }

        let since = now - Duration::days(self.config.hard_stop_window_days);
        let trailing_no_shows = self
            .health
            .count_events_since(organization_id, driver_id, HealthEventType::NoShow, since)
            .await?;
        let trailing_late_cancels = self
            .health
            .count_events_since(organization_id, driver_id, HealthEventType::LateCancel, since)
            .await?;

        let current = self
            .health
            .find(organization_id, driver_id)
            .await?
            .ok_or_else(|| not_found_error("DriverHealthState", &driver_id.to_string()))?;

        let factors = json!({
            "score": current.score,
            "stars": current.stars,
            "streak_weeks": current.streak_weeks,
            "pool_eligible": current.assignment_pool_eligible,
            "hard_stop_active": hard_stop,
            "trailing_no_shows": trailing_no_shows,
            "trailing_late_cancels": trailing_late_cancels,
        });

        let inserted = self
            .health
            .insert_snapshot(organization_id, driver_id, as_of, &current, hard_stop, factors)
            .await?;

        Ok(inserted)
    }

    /// Evaluación semanal de estrellas. `week_start` es el lunes de la
    /// semana evaluada (la semana anterior al disparo del lunes).
    pub async fn evaluate_weekly(
        &self,
        organization_id: Uuid,
        week_start: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary, AppError> {
        if week_start.weekday() != Weekday::Mon {
            return Err(AppError::BadRequest(
                "week_start must be a Monday".to_string(),
            ));
        }
        let week_end = week_start + Duration::days(6);

        let states = self.health.list_for_org(organization_id).await?;
        info!(
            "⭐ Evaluación semanal {} - {}: {} conductores",
            week_start,
            week_end,
            states.len()
        );

        let mut summary = SweepSummary::default();
        for state in states {
            match self
                .evaluate_driver_week(organization_id, &state, week_start, week_end, now)
                .await
            {
                Ok(true) => summary.processed += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    error!("❌ Evaluación semanal de {} falló: {}", state.driver_id, e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn evaluate_driver_week(
        &self,
        organization_id: Uuid,
        state: &DriverHealthState,
        week_start: NaiveDate,
        week_end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let driver_id = state.driver_id;

        // semana ya evaluada: cero mutaciones adicionales
        if state.last_weekly_eval_on.map_or(false, |d| d >= week_start) {
            return Ok(false);
        }

        let stats = WeekStats {
            completions: self
                .metrics
                .week_completions(organization_id, driver_id, week_start, week_end)
                .await?,
            misses: self
                .health
                .count_week_misses(organization_id, driver_id, week_start, week_end)
                .await?,
            no_shows: self
                .health
                .count_week_events(organization_id, driver_id, HealthEventType::NoShow, week_start, week_end)
                .await?,
            late_cancels: self
                .health
                .count_week_events(organization_id, driver_id, HealthEventType::LateCancel, week_start, week_end)
                .await?,
            completion_rate: self
                .metrics
                .week_completion_rate(organization_id, driver_id, week_start, week_end)
                .await?,
        };

        // un hard-stop vigente ya reseteó estrellas y racha; la semana
        // solo se marca evaluada
        if state.requires_manager_intervention || !week_qualifies(&stats) {
            self.health
                .mark_week_evaluated(organization_id, driver_id, week_start, now)
                .await?;
            return Ok(true);
        }

        let previous_stars = state.stars;
        let advanced = self
            .health
            .advance_streak(organization_id, driver_id, week_start, now)
            .await?;

        if let Some(new_state) = advanced {
            info!(
                "🌟 {} avanza racha: {} semanas, {} estrellas",
                driver_id, new_state.streak_weeks, new_state.stars
            );
            self.notifications
                .emit(
                    organization_id,
                    driver_id,
                    &format!("streak_advanced:{}:{}", driver_id, week_start),
                    NotificationIntent::StreakAdvanced {
                        stars: new_state.stars,
                        streak_weeks: new_state.streak_weeks,
                    },
                )
                .await;

            if new_state.stars == MAX_STARS && previous_stars < MAX_STARS {
                self.notifications
                    .emit(
                        organization_id,
                        driver_id,
                        &format!("bonus_eligible:{}:{}", driver_id, week_start),
                        NotificationIntent::BonusEligible {
                            stars: new_state.stars,
                        },
                    )
                    .await;
            }
        }

        Ok(true)
    }

    /// Reinstalación manual tras un hard-stop: levanta el bloqueo sin
    /// restaurar score ni estrellas. Acción logueada.
    pub async fn reinstate(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<DriverHealthState, AppError> {
        let reinstated = self.health.reinstate(organization_id, driver_id, now).await?;
        if !reinstated {
            return Err(AppError::Conflict(
                "driver has no pending manager intervention".to_string(),
            ));
        }

        info!("🔓 Conductor {} reinstalado manualmente", driver_id);

        self.health
            .find(organization_id, driver_id)
            .await?
            .ok_or_else(|| not_found_error("DriverHealthState", &driver_id.to_string()))
    }

    pub async fn state_for(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<DriverHealthState>, AppError> {
        self.health.find(organization_id, driver_id).await
    }

    pub async fn current_score(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<i32, AppError> {
        Ok(self
            .health
            .find(organization_id, driver_id)
            .await?
            .map(|s| s.score)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualifying_week() {
        let stats = WeekStats {
            completions: 4,
            misses: 0,
            no_shows: 0,
            late_cancels: 0,
            completion_rate: Some(0.96),
        };
        assert!(week_qualifies(&stats));
    }

    #[test]
    fn test_week_with_miss_does_not_qualify() {
        let stats = WeekStats {
            completions: 3,
            misses: 1,
            no_shows: 0,
            late_cancels: 0,
            completion_rate: Some(1.0),
        };
        assert!(!week_qualifies(&stats));
    }

    #[test]
    fn test_week_with_low_completion_does_not_qualify() {
        let stats = WeekStats {
            completions: 4,
            misses: 0,
            no_shows: 0,
            late_cancels: 0,
            completion_rate: Some(0.94),
        };
        assert!(!week_qualifies(&stats));
    }

    #[test]
    fn test_empty_week_is_neutral_not_qualifying() {
        let stats = WeekStats::default();
        assert!(stats.is_empty());
        assert!(!week_qualifies(&stats));
    }

    #[test]
    fn test_late_cancel_disqualifies_even_with_full_attendance() {
        let stats = WeekStats {
            completions: 5,
            misses: 0,
            no_shows: 0,
            late_cancels: 1,
            completion_rate: Some(0.99),
        };
        assert!(!week_qualifies(&stats));
    }
}
