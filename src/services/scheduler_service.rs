//! Generación del schedule semanal
//!
//! Para cada slot (ruta, fecha) de la semana objetivo arma el pool de
//! candidatos que prefieren ese día y esa ruta, los rankea por
//! desempates estrictos (completions en la ruta, completion rate,
//! attendance rate) y asigna al mejor bajo su cap semanal. Sin
//! candidato, el slot queda unfilled. Re-generar una semana ya generada
//! no duplica nada.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::models::assignment::{AssignedBy, AssignmentStatus};
use crate::models::notification::NotificationIntent;
use crate::models::route::Route;
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::repositories::driver_repository::{DriverRepository, ScheduleCandidate};
use crate::repositories::route_repository::RouteRepository;
use crate::services::notification_service::{NotificationService, NotificationSink};
use crate::utils::errors::AppError;
use crate::utils::time::weekday_index;

/// Ranking de candidatos por cadena estricta de desempates: más
/// completions en esta ruta, luego completion rate, luego attendance.
/// No es una mezcla ponderada.
pub fn rank_candidates(mut candidates: Vec<ScheduleCandidate>) -> Vec<ScheduleCandidate> {
    candidates.sort_by(|a, b| {
        b.route_completions
            .cmp(&a.route_completions)
            .then(
                b.completion_rate
                    .partial_cmp(&a.completion_rate)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                b.attendance_rate
                    .partial_cmp(&a.attendance_rate)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    candidates
}

/// Resumen de la generación de una semana
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct WeekGenerationSummary {
    pub filled: u64,
    pub unfilled: u64,
    pub skipped_existing: u64,
    pub failed: u64,
}

pub struct SchedulerService {
    drivers: DriverRepository,
    assignments: AssignmentRepository,
    routes: RouteRepository,
    notifications: NotificationService,
    config: DispatchConfig,
}

impl SchedulerService {
    pub fn new(pool: PgPool, config: DispatchConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            drivers: DriverRepository::new(pool.clone()),
            assignments: AssignmentRepository::new(pool.clone()),
            routes: RouteRepository::new(pool.clone()),
            notifications: NotificationService::new(pool, sink),
            config,
        }
    }

    /// Generar los assignments de la semana que empieza en `week_start`
    /// (lunes). Idempotente: la clave única por slot hace que una
    /// segunda corrida no cree ni notifique nada nuevo.
    pub async fn generate_week(
        &self,
        organization_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<WeekGenerationSummary, AppError> {
        if week_start.weekday() != Weekday::Mon {
            return Err(AppError::BadRequest(
                "week_start must be a Monday".to_string(),
            ));
        }

        // el horizonte de generación es fijo; no hay inserción retroactiva
        // de conductores nuevos en semanas ya generadas
        let horizon = crate::utils::time::week_start(Utc::now().date_naive())
            + Duration::weeks(self.config.schedule_lookahead_weeks);
        if week_start > horizon {
            return Err(AppError::BadRequest(format!(
                "week_start is beyond the {}-week scheduling lookahead",
                self.config.schedule_lookahead_weeks
            )));
        }

        let week_end = week_start + Duration::days(6);

        let routes = self.routes.list(organization_id).await?;
        info!(
            "🗓️ Generando semana {} para {} rutas",
            week_start,
            routes.len()
        );

        // caps ya usados en la semana (cubre re-corridas y slots de
        // semanas generadas a medias)
        let mut used_caps: HashMap<Uuid, i64> = self
            .assignments
            .week_driver_counts(organization_id, week_start, week_end)
            .await?
            .into_iter()
            .collect();

        let mut summary = WeekGenerationSummary::default();
        for offset in 0..7 {
            let date = week_start + Duration::days(offset);
            for route in &routes {
                match self
                    .fill_slot(organization_id, route, date, &mut used_caps)
                    .await
                {
                    Ok(outcome) => match outcome {
                        SlotOutcome::Filled => summary.filled += 1,
                        SlotOutcome::Unfilled => summary.unfilled += 1,
                        SlotOutcome::AlreadyExists => summary.skipped_existing += 1,
                    },
                    Err(e) => {
                        error!(
                            "❌ Slot ({}, {}) no generado: {}",
                            route.name, date, e
                        );
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            "✅ Semana {} generada: {} asignados, {} unfilled, {} existentes",
            week_start, summary.filled, summary.unfilled, summary.skipped_existing
        );

        self.notify_schedule_locked(organization_id, week_start, week_end)
            .await?;

        Ok(summary)
    }

    async fn fill_slot(
        &self,
        organization_id: Uuid,
        route: &Route,
        date: NaiveDate,
        used_caps: &mut HashMap<Uuid, i64>,
    ) -> Result<SlotOutcome, AppError> {
        let candidates = self
            .drivers
            .schedulable_candidates(organization_id, weekday_index(date), route.id)
            .await?;

        let mut chosen: Option<ScheduleCandidate> = None;
        for candidate in rank_candidates(candidates) {
            let used = used_caps.get(&candidate.driver_id).copied().unwrap_or(0);
            if used >= candidate.weekly_cap as i64 {
                continue;
            }
            // un assignment vivo por fecha y conductor
            if self
                .assignments
                .has_assignment_on(organization_id, candidate.driver_id, date)
                .await?
            {
                continue;
            }
            chosen = Some(candidate);
            break;
        }

        match chosen {
            Some(candidate) => {
                let created = self
                    .assignments
                    .create_slot(
                        organization_id,
                        route.id,
                        date,
                        Some(candidate.driver_id),
                        AssignmentStatus::Scheduled,
                        AssignedBy::Schedule,
                    )
                    .await?;

                match created {
                    Some(_) => {
                        *used_caps.entry(candidate.driver_id).or_insert(0) += 1;
                        Ok(SlotOutcome::Filled)
                    }
                    None => Ok(SlotOutcome::AlreadyExists),
                }
            }
            None => {
                let created = self
                    .assignments
                    .create_slot(
                        organization_id,
                        route.id,
                        date,
                        None,
                        AssignmentStatus::Unfilled,
                        AssignedBy::Schedule,
                    )
                    .await?;

                Ok(match created {
                    Some(_) => SlotOutcome::Unfilled,
                    None => SlotOutcome::AlreadyExists,
                })
            }
        }
    }

    /// Un intent schedule_locked por conductor con turnos esa semana
    async fn notify_schedule_locked(
        &self,
        organization_id: Uuid,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> Result<(), AppError> {
        let counts = self
            .assignments
            .week_driver_counts(organization_id, week_start, week_end)
            .await?;

        for (driver_id, assignment_count) in counts {
            self.notifications
                .emit(
                    organization_id,
                    driver_id,
                    &format!("schedule_locked:{}:{}", driver_id, week_start),
                    NotificationIntent::ScheduleLocked {
                        week_start,
                        assignment_count,
                    },
                )
                .await;
        }

        Ok(())
    }
}

enum SlotOutcome {
    Filled,
    Unfilled,
    AlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        route_completions: i64,
        completion_rate: f64,
        attendance_rate: f64,
    ) -> ScheduleCandidate {
        ScheduleCandidate {
            driver_id: Uuid::new_v4(),
            weekly_cap: 4,
            route_completions,
            completion_rate,
            attendance_rate,
        }
    }

    #[test]
    fn test_route_completions_dominate() {
        let a = candidate(10, 0.5, 0.5);
        let b = candidate(2, 1.0, 1.0);
        let ranked = rank_candidates(vec![b.clone(), a.clone()]);
        assert_eq!(ranked[0].driver_id, a.driver_id);
    }

    #[test]
    fn test_completion_rate_breaks_ties() {
        let a = candidate(5, 0.97, 0.6);
        let b = candidate(5, 0.91, 1.0);
        let ranked = rank_candidates(vec![b.clone(), a.clone()]);
        assert_eq!(ranked[0].driver_id, a.driver_id);
    }

    #[test]
    fn test_attendance_is_last_tiebreak() {
        let a = candidate(5, 0.95, 0.99);
        let b = candidate(5, 0.95, 0.80);
        let ranked = rank_candidates(vec![b.clone(), a.clone()]);
        assert_eq!(ranked[0].driver_id, a.driver_id);
    }
}
