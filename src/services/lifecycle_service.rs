//! Ciclo de vida de confirmación del assignment
//!
//! scheduled → confirmed → active (llegada) → completed, o desvíos a
//! cancelled por el conductor o por auto-drop al vencer el deadline de
//! confirmación. Cada desvío abre una ventana de bidding y aplica la
//! penalización de salud que corresponde.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::models::assignment::{Assignment, AssignmentStatus, AssignmentWithStart, CancelType};
use crate::models::bid::BidTrigger;
use crate::models::health::HealthEventType;
use crate::models::notification::NotificationIntent;
use crate::models::shift::{delivery_ratio, CompleteShiftRequest, EditShiftRequest, Shift};
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::repositories::shift_repository::ShiftRepository;
use crate::services::bidding_service::BiddingService;
use crate::services::health_service::HealthService;
use crate::services::metrics_service::MetricsService;
use crate::services::notification_service::{NotificationService, NotificationSink};
use crate::services::SweepSummary;
use crate::utils::errors::{not_found_error, state_conflict_error, AppError};
use crate::utils::time::shift_start;

/// Umbral de entrega alta que otorga el punto extra de salud
const HIGH_DELIVERY_THRESHOLD: f64 = 0.95;

/// Clasificación de una cancelación iniciada por el conductor: late solo
/// si el assignment ya estaba confirmado y faltan menos de
/// `late_threshold_hours` para el turno; todo lo demás es driver.
pub fn classify_cancellation(
    confirmed: bool,
    time_to_shift: Duration,
    late_threshold_hours: i64,
) -> CancelType {
    if confirmed && time_to_shift < Duration::hours(late_threshold_hours) {
        CancelType::Late
    } else {
        CancelType::Driver
    }
}

pub struct LifecycleService {
    assignments: AssignmentRepository,
    shifts: ShiftRepository,
    health: HealthService,
    metrics: MetricsService,
    bidding: BiddingService,
    notifications: NotificationService,
    config: DispatchConfig,
}

impl LifecycleService {
    pub fn new(pool: PgPool, config: DispatchConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            assignments: AssignmentRepository::new(pool.clone()),
            shifts: ShiftRepository::new(pool.clone()),
            health: HealthService::new(pool.clone(), config.clone(), sink.clone()),
            metrics: MetricsService::new(pool.clone(), config.clone(), sink.clone()),
            bidding: BiddingService::new(pool.clone(), config.clone(), sink.clone()),
            notifications: NotificationService::new(pool, sink),
            config,
        }
    }

    /// Confirmar un assignment dentro de su ventana (abre 7 días antes
    /// del turno, cierra 48 horas antes).
    pub async fn confirm(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Assignment, AppError> {
        let slot = self.require_slot(organization_id, assignment_id).await?;
        let assignment = &slot.assignment;

        if assignment.status != AssignmentStatus::Scheduled {
            return Err(state_conflict_error(
                "assignment",
                "confirm",
                assignment.status.as_str(),
            ));
        }
        let driver_id = assignment
            .driver_id
            .ok_or_else(|| AppError::Conflict("assignment has no driver".to_string()))?;

        let start = shift_start(assignment.date, slot.start_time);
        let opens = start - Duration::hours(self.config.confirmation_opens_hours);
        let deadline = start - Duration::hours(self.config.confirmation_deadline_hours);

        if now < opens {
            return Err(AppError::Conflict(
                "confirmation window is not open yet".to_string(),
            ));
        }
        if now >= deadline {
            return Err(AppError::Conflict(
                "confirmation deadline has passed".to_string(),
            ));
        }

        let confirmed = self
            .assignments
            .confirm(organization_id, assignment_id, now)
            .await?
            .ok_or_else(|| {
                state_conflict_error("assignment", "confirm", assignment.status.as_str())
            })?;

        self.health
            .apply_event(
                organization_id,
                driver_id,
                HealthEventType::ConfirmOnTime,
                Some(assignment.date),
                &format!("confirm:{}", assignment_id),
                now,
            )
            .await?;

        self.notifications
            .emit(
                organization_id,
                driver_id,
                &format!("assignment_confirmed:{}", assignment_id),
                NotificationIntent::AssignmentConfirmed {
                    assignment_id,
                    route_id: assignment.route_id,
                    date: assignment.date,
                },
            )
            .await;

        Ok(confirmed)
    }

    /// Registrar la llegada: solo el día del turno, antes de la hora de
    /// inicio de la ruta y exactamente una vez.
    pub async fn arrive(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Shift, AppError> {
        let slot = self.require_slot(organization_id, assignment_id).await?;
        let assignment = &slot.assignment;

        if assignment.status != AssignmentStatus::Confirmed {
            return Err(state_conflict_error(
                "assignment",
                "arrive",
                assignment.status.as_str(),
            ));
        }
        let driver_id = assignment
            .driver_id
            .ok_or_else(|| AppError::Conflict("assignment has no driver".to_string()))?;

        if now.date_naive() != assignment.date {
            return Err(AppError::Conflict(
                "arrival is only allowed on the shift date".to_string(),
            ));
        }
        let start = shift_start(assignment.date, slot.start_time);
        if now >= start {
            return Err(AppError::Conflict(
                "route start time has passed".to_string(),
            ));
        }

        let shift = self
            .shifts
            .create_on_arrival(organization_id, assignment_id, driver_id, now)
            .await?
            .ok_or_else(|| AppError::Conflict("arrival already recorded".to_string()))?;

        self.assignments
            .mark_active(organization_id, assignment_id)
            .await?;

        self.health
            .apply_event(
                organization_id,
                driver_id,
                HealthEventType::ArriveOnTime,
                Some(assignment.date),
                &format!("arrive:{}", assignment_id),
                now,
            )
            .await?;

        Ok(shift)
    }

    /// Registrar los paquetes cargados. Requiere llegada previa.
    pub async fn start_shift(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        parcels_start: i32,
    ) -> Result<Shift, AppError> {
        let assignment = self
            .assignments
            .find_by_id(organization_id, assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &assignment_id.to_string()))?;

        if assignment.status != AssignmentStatus::Active {
            return Err(state_conflict_error(
                "assignment",
                "start",
                assignment.status.as_str(),
            ));
        }

        if self
            .shifts
            .find_by_assignment(organization_id, assignment_id)
            .await?
            .is_none()
        {
            return Err(AppError::Conflict("no arrival recorded".to_string()));
        }

        self.shifts
            .record_start(organization_id, assignment_id, parcels_start)
            .await?
            .ok_or_else(|| AppError::Conflict("shift already started".to_string()))
    }

    /// Completar el turno: cierra el assignment, registra devoluciones y
    /// abre la ventana fija de edición post-completado.
    pub async fn complete(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        request: CompleteShiftRequest,
        now: DateTime<Utc>,
    ) -> Result<Shift, AppError> {
        let assignment = self
            .assignments
            .find_by_id(organization_id, assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &assignment_id.to_string()))?;

        if assignment.status != AssignmentStatus::Active {
            return Err(state_conflict_error(
                "assignment",
                "complete",
                assignment.status.as_str(),
            ));
        }
        let driver_id = assignment
            .driver_id
            .ok_or_else(|| AppError::Conflict("assignment has no driver".to_string()))?;

        let shift = self
            .shifts
            .find_by_assignment(organization_id, assignment_id)
            .await?
            .ok_or_else(|| AppError::Conflict("no arrival recorded".to_string()))?;
        let parcels_start = shift
            .parcels_start
            .ok_or_else(|| AppError::Conflict("shift was never started".to_string()))?;

        let excepted = request.excepted_returns.unwrap_or(0);
        if request.parcels_returned > parcels_start {
            return Err(AppError::BadRequest(
                "parcels_returned cannot exceed parcels_start".to_string(),
            ));
        }

        self.assignments
            .mark_completed(organization_id, assignment_id)
            .await?
            .ok_or_else(|| {
                state_conflict_error("assignment", "complete", assignment.status.as_str())
            })?;

        let editable_until = now + Duration::hours(self.config.shift_edit_window_hours);
        let completed = self
            .shifts
            .record_completion(
                organization_id,
                assignment_id,
                request.parcels_returned,
                excepted,
                now,
                editable_until,
            )
            .await?
            .ok_or_else(|| AppError::Conflict("shift already completed".to_string()))?;

        info!(
            "🏁 Turno de {} completado: {}/{} paquetes entregados",
            driver_id,
            parcels_start - request.parcels_returned,
            parcels_start
        );

        self.health
            .apply_event(
                organization_id,
                driver_id,
                HealthEventType::CompleteShift,
                Some(assignment.date),
                &format!("complete:{}", assignment_id),
                now,
            )
            .await?;

        let high_delivery = delivery_ratio(parcels_start, request.parcels_returned, excepted)
            .map_or(false, |r| r >= HIGH_DELIVERY_THRESHOLD);
        if high_delivery {
            self.health
                .apply_event(
                    organization_id,
                    driver_id,
                    HealthEventType::HighDelivery,
                    Some(assignment.date),
                    &format!("high_delivery:{}", assignment_id),
                    now,
                )
                .await?;
        }

        self.metrics.recompute(organization_id, driver_id).await?;

        Ok(completed)
    }

    /// Cancelación iniciada por el conductor. Antes de confirmar o a más
    /// de 48h es 'driver' (penalización liviana); un confirmado dentro
    /// de las 48h es 'late' (penalización fuerte). Ambas reabren el slot
    /// en el mercado.
    pub async fn cancel(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Assignment, AppError> {
        let slot = self.require_slot(organization_id, assignment_id).await?;
        let assignment = &slot.assignment;

        if !matches!(
            assignment.status,
            AssignmentStatus::Scheduled | AssignmentStatus::Confirmed
        ) {
            return Err(state_conflict_error(
                "assignment",
                "cancel",
                assignment.status.as_str(),
            ));
        }
        let driver_id = assignment
            .driver_id
            .ok_or_else(|| AppError::Conflict("assignment has no driver".to_string()))?;

        let start = shift_start(assignment.date, slot.start_time);
        let cancel_type = classify_cancellation(
            assignment.status == AssignmentStatus::Confirmed,
            start - now,
            self.config.late_cancel_hours,
        );

        let cancelled = self
            .assignments
            .cancel(organization_id, assignment_id, cancel_type, now)
            .await?
            .ok_or_else(|| {
                state_conflict_error("assignment", "cancel", assignment.status.as_str())
            })?;

        info!(
            "🚫 Assignment {} cancelado por {} ({:?})",
            assignment_id, driver_id, cancel_type
        );

        let event = match cancel_type {
            CancelType::Late => HealthEventType::LateCancel,
            _ => HealthEventType::DriverCancel,
        };
        self.health
            .apply_event(
                organization_id,
                driver_id,
                event,
                Some(assignment.date),
                &format!("cancel:{}", assignment_id),
                now,
            )
            .await?;

        self.notifications
            .emit(
                organization_id,
                driver_id,
                &format!("shift_cancelled:{}", assignment_id),
                NotificationIntent::ShiftCancelled {
                    assignment_id,
                    route_id: assignment.route_id,
                    date: assignment.date,
                    cancel_type,
                },
            )
            .await;

        self.metrics.recompute(organization_id, driver_id).await?;

        let reopened = AssignmentWithStart {
            assignment: cancelled.clone(),
            start_time: slot.start_time,
        };
        self.bidding
            .open_window_for(organization_id, &reopened, BidTrigger::Cancellation, None, now)
            .await?;

        Ok(cancelled)
    }

    /// Sweep de deadlines de confirmación: recordatorio a las 72h del
    /// turno y auto-drop al cruzar las 48h sin confirmación.
    pub async fn sweep_confirmation_deadlines(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary, AppError> {
        let horizon_days = self.config.confirmation_opens_hours / 24 + 1;
        let from = now.date_naive();
        let to = from + Duration::days(horizon_days);

        let pending = self
            .assignments
            .unconfirmed_scheduled(organization_id, from, to)
            .await?;
        info!(
            "⏰ Sweep de confirmaciones: {} assignments sin confirmar",
            pending.len()
        );

        let mut summary = SweepSummary::default();
        for slot in pending {
            match self.sweep_one(organization_id, &slot, now).await {
                Ok(true) => summary.processed += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    error!(
                        "❌ Sweep del assignment {} falló: {}",
                        slot.assignment.id, e
                    );
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn sweep_one(
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
        let start = shift_start(assignment.date, slot.start_time);
        let time_left = start - now;

        if time_left <= Duration::hours(self.config.confirmation_deadline_hours) {
            let dropped = match self
                .assignments
                .auto_drop(organization_id, assignment.id, now)
                .await?
            {
                Some(dropped) => dropped,
                // otra corrida del sweep ya lo procesó
                None => return Ok(false),
            };

            info!(
                "⛔ Auto-drop del assignment {} (sin confirmación a {}h del turno)",
                assignment.id, self.config.confirmation_deadline_hours
            );

            self.health
                .apply_event(
                    organization_id,
                    driver_id,
                    HealthEventType::AutoDrop,
                    Some(assignment.date),
                    &format!("auto_drop:{}", assignment.id),
                    now,
                )
                .await?;

            self.notifications
                .emit(
                    organization_id,
                    driver_id,
                    &format!("shift_auto_dropped:{}", assignment.id),
                    NotificationIntent::ShiftAutoDropped {
                        assignment_id: assignment.id,
                        route_id: assignment.route_id,
                        date: assignment.date,
                    },
                )
                .await;

            self.metrics.recompute(organization_id, driver_id).await?;

            let reopened = AssignmentWithStart {
                assignment: dropped,
                start_time: slot.start_time,
            };
            self.bidding
                .open_window_for(organization_id, &reopened, BidTrigger::AutoDrop, None, now)
                .await?;

            return Ok(true);
        }

        if time_left <= Duration::hours(self.config.confirmation_reminder_hours) {
            let deadline = start - Duration::hours(self.config.confirmation_deadline_hours);
            let emitted = self
                .notifications
                .emit(
                    organization_id,
                    driver_id,
                    &format!("confirm_reminder:{}", assignment.id),
                    NotificationIntent::ConfirmationReminder {
                        assignment_id: assignment.id,
                        route_id: assignment.route_id,
                        date: assignment.date,
                        deadline,
                    },
                )
                .await;
            return Ok(emitted);
        }

        Ok(false)
    }

    /// Corrección de paquetes dentro de la ventana de edición
    pub async fn edit_shift(
        &self,
        organization_id: Uuid,
        shift_id: Uuid,
        request: EditShiftRequest,
        now: DateTime<Utc>,
    ) -> Result<Shift, AppError> {
        let shift = self
            .shifts
            .find_by_id(organization_id, shift_id)
            .await?
            .ok_or_else(|| not_found_error("Shift", &shift_id.to_string()))?;

        if shift.completed_at.is_none() {
            return Err(AppError::Conflict("shift is not completed".to_string()));
        }

        if let (Some(returned), Some(start)) = (request.parcels_returned, shift.parcels_start) {
            if returned > start {
                return Err(AppError::BadRequest(
                    "parcels_returned cannot exceed parcels_start".to_string(),
                ));
            }
        }

        let updated = self
            .shifts
            .apply_edit(
                organization_id,
                shift_id,
                request.parcels_returned,
                request.excepted_returns,
                now,
            )
            .await?
            .ok_or_else(|| AppError::Conflict("shift edit window has closed".to_string()))?;

        self.metrics
            .recompute(organization_id, updated.driver_id)
            .await?;

        Ok(updated)
    }

    async fn require_slot(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<AssignmentWithStart, AppError> {
        self.assignments
            .find_with_start(organization_id, assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &assignment_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfirmed_cancel_is_driver_type() {
        // sin confirmar, incluso dentro de las 48h, es 'driver'
        let kind = classify_cancellation(false, Duration::hours(10), 48);
        assert_eq!(kind, CancelType::Driver);
    }

    #[test]
    fn test_confirmed_far_out_is_driver_type() {
        let kind = classify_cancellation(true, Duration::hours(72), 48);
        assert_eq!(kind, CancelType::Driver);
    }

    #[test]
    fn test_confirmed_inside_48h_is_late() {
        let kind = classify_cancellation(true, Duration::hours(47), 48);
        assert_eq!(kind, CancelType::Late);
    }

    #[test]
    fn test_exactly_48h_is_not_late() {
        let kind = classify_cancellation(true, Duration::hours(48), 48);
        assert_eq!(kind, CancelType::Driver);
    }
}
