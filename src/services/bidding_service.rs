//! Mercado de bidding sobre slots abiertos
//!
//! Tres modos decididos al crear la ventana según el tiempo restante al
//! turno: competitive (>24h, resolución por score al cierre), instant
//! (≤24h, first-accept) y emergency (no-show u override manual, siempre
//! first-accept y con bonus de pago). El claim instant/emergency es la
//! ruta más contenciosa del motor: un solo UPDATE condicional decide el
//! ganador y los demás observan un conflicto limpio.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::models::assignment::{Assignment, AssignmentStatus, AssignmentWithStart};
use crate::models::bid::{Bid, BidMode, BidTrigger, BidWindow, BidWindowStatus};
use crate::models::health::HealthEventType;
use crate::models::notification::NotificationIntent;
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::repositories::bid_repository::{BidRepository, BidderStats};
use crate::repositories::driver_repository::DriverRepository;
use crate::services::health_service::HealthService;
use crate::services::notification_service::{NotificationService, NotificationSink};
use crate::utils::errors::{not_found_error, policy_denied_error, AppError};
use crate::utils::time::{shift_start, tenure_months};

/// Pesos del score competitivo
const WEIGHT_HEALTH: f64 = 0.45;
const WEIGHT_FAMILIARITY: f64 = 0.25;
const WEIGHT_SENIORITY: f64 = 0.15;
const WEIGHT_PREFERENCE: f64 = 0.15;

/// Score de un bid competitivo:
/// `0.45·health + 0.25·familiaridad + 0.15·antigüedad + 0.15·preferencia`
/// con health normalizado a 96 puntos, familiaridad a 20 completions en
/// la ruta y antigüedad a 12 meses.
pub fn score_bid(
    health_score: i32,
    route_completions: i64,
    tenure_months: f64,
    route_preferred: bool,
) -> f64 {
    let health = (health_score as f64 / 96.0).min(1.0);
    let familiarity = (route_completions as f64 / 20.0).min(1.0);
    let seniority = (tenure_months / 12.0).min(1.0);
    let preference = if route_preferred { 1.0 } else { 0.0 };

    WEIGHT_HEALTH * health
        + WEIGHT_FAMILIARITY * familiarity
        + WEIGHT_SENIORITY * seniority
        + WEIGHT_PREFERENCE * preference
}

/// Modo de ventana según el disparador y el tiempo restante al turno.
/// No-show y override manual siempre son emergency.
pub fn select_mode(trigger: BidTrigger, time_to_shift: Duration, threshold_hours: i64) -> BidMode {
    match trigger {
        BidTrigger::NoShow | BidTrigger::Manual => BidMode::Emergency,
        BidTrigger::Cancellation | BidTrigger::AutoDrop => {
            if time_to_shift > Duration::hours(threshold_hours) {
                BidMode::Competitive
            } else {
                BidMode::Instant
            }
        }
    }
}

/// Pujador con score ya computado, listo para el ranking
#[derive(Debug, Clone)]
pub struct ScoredBidder {
    pub bid_id: Uuid,
    pub driver_id: Uuid,
    pub bid_at: DateTime<Utc>,
    pub score: f64,
}

/// Ranking competitivo: mayor score primero, empate por bid más temprano
pub fn rank_bidders(mut bidders: Vec<ScoredBidder>) -> Vec<ScoredBidder> {
    bidders.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.bid_at.cmp(&b.bid_at))
    });
    bidders
}

/// Resumen del sweep de cierre de ventanas
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct BidCloseSummary {
    pub resolved: u64,
    pub transitioned_to_instant: u64,
    pub closed_unresolved: u64,
    pub skipped: u64,
    pub failed: u64,
}

enum ResolutionOutcome {
    Resolved,
    TransitionedToInstant,
    Skipped,
}

pub struct BiddingService {
    pool: PgPool,
    bids: BidRepository,
    assignments: AssignmentRepository,
    drivers: DriverRepository,
    health: HealthService,
    notifications: NotificationService,
    config: DispatchConfig,
}

impl BiddingService {
    pub fn new(pool: PgPool, config: DispatchConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            bids: BidRepository::new(pool.clone()),
            assignments: AssignmentRepository::new(pool.clone()),
            drivers: DriverRepository::new(pool.clone()),
            health: HealthService::new(pool.clone(), config.clone(), sink.clone()),
            notifications: NotificationService::new(pool.clone(), sink),
            pool,
            config,
        }
    }

    /// Abrir una ventana sobre un assignment liberado. Devuelve None si
    /// el assignment ya tiene una ventana abierta (invariante de una por
    /// assignment).
    pub async fn open_window_for(
        &self,
        organization_id: Uuid,
        slot: &AssignmentWithStart,
        trigger: BidTrigger,
        bonus_override: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<Option<BidWindow>, AppError> {
        let assignment = &slot.assignment;
        let start = shift_start(assignment.date, slot.start_time);
        let mode = select_mode(trigger, start - now, self.config.instant_mode_threshold_hours);

        let closes_at = match mode {
            BidMode::Competitive => start - Duration::hours(self.config.competitive_close_hours),
            BidMode::Instant => start,
            // las de emergencia siguen reclamables hasta el fin del día
            BidMode::Emergency => end_of_day(assignment.date),
        };

        let pay_bonus = match mode {
            BidMode::Emergency => bonus_override.or(Some(self.config.emergency_bonus_percent)),
            _ => None,
        };

        let window = self
            .bids
            .open_window(organization_id, assignment.id, mode, trigger, closes_at, pay_bonus)
            .await?;

        if let Some(window) = &window {
            info!(
                "📢 Ventana {} {} sobre assignment {} (cierra {})",
                window.mode.as_str(),
                window.id,
                assignment.id,
                closes_at
            );
            self.fan_out(organization_id, window, assignment).await;
        }

        Ok(window)
    }

    /// Notificar la ventana a todos los conductores elegibles, excepto
    /// al que dejó caer el turno.
    async fn fan_out(&self, organization_id: Uuid, window: &BidWindow, assignment: &Assignment) {
        let eligible = match self.drivers.eligible_driver_ids(organization_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("⚠️ Fan-out de ventana {} sin destinatarios: {}", window.id, e);
                return;
            }
        };

        for driver_id in eligible {
            if assignment.driver_id == Some(driver_id) {
                continue;
            }

            let (dedup_key, intent) = match window.mode {
                BidMode::Emergency => (
                    format!("emergency_open:{}:{}", window.id, driver_id),
                    NotificationIntent::EmergencyRouteAvailable {
                        window_id: window.id,
                        route_id: assignment.route_id,
                        date: assignment.date,
                        pay_bonus_percent: window.pay_bonus_percent,
                    },
                ),
                mode => (
                    format!("bid_open:{}:{}:{}", mode.as_str(), window.id, driver_id),
                    NotificationIntent::BidOpen {
                        window_id: window.id,
                        route_id: assignment.route_id,
                        date: assignment.date,
                        mode,
                        closes_at: window.closes_at,
                    },
                ),
            };

            self.notifications
                .emit(organization_id, driver_id, &dedup_key, intent)
                .await;
        }
    }

    /// Pujar en una ventana competitiva. Un bid por (ventana, conductor).
    pub async fn place_bid(
        &self,
        organization_id: Uuid,
        window_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Bid, AppError> {
        let window = self
            .bids
            .find_by_id(organization_id, window_id)
            .await?
            .ok_or_else(|| not_found_error("BidWindow", &window_id.to_string()))?;

        if window.status != BidWindowStatus::Open {
            return Err(AppError::Conflict("bid window is not open".to_string()));
        }
        if window.mode != BidMode::Competitive {
            return Err(AppError::Conflict(
                "window is first-accept; use claim instead of bidding".to_string(),
            ));
        }
        if now >= window.closes_at {
            return Err(AppError::Conflict("bid window already closed".to_string()));
        }

        if let Some(reason) = self.drivers.eligibility_reason(organization_id, driver_id).await? {
            return Err(policy_denied_error("bid", reason));
        }

        self.bids
            .place_bid(organization_id, window_id, driver_id, now)
            .await?
            .ok_or_else(|| AppError::Conflict("driver already bid on this window".to_string()))
    }

    /// Claim atómico de una ventana instant/emergency. De N intentos
    /// concurrentes exactamente uno gana; los demás reciben Conflict sin
    /// efectos parciales.
    pub async fn claim(
        &self,
        organization_id: Uuid,
        window_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Assignment, AppError> {
        let window = self
            .bids
            .find_by_id(organization_id, window_id)
            .await?
            .ok_or_else(|| not_found_error("BidWindow", &window_id.to_string()))?;

        if window.mode == BidMode::Competitive {
            return Err(AppError::Conflict(
                "competitive windows resolve at close; place a bid instead".to_string(),
            ));
        }
        if window.status != BidWindowStatus::Open || now >= window.closes_at {
            return Err(AppError::Conflict("bid window is not open".to_string()));
        }

        if let Some(reason) = self.drivers.eligibility_reason(organization_id, driver_id).await? {
            return Err(policy_denied_error("claim", reason));
        }

        let slot = self
            .assignments
            .find_by_id(organization_id, window.assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &window.assignment_id.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let owned =
            BidRepository::resolve_window_tx(&mut *tx, organization_id, window_id, now).await?;
        if owned == 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict("window was already claimed".to_string()));
        }

        let awarded = AssignmentRepository::award_open_slot(
            &mut *tx,
            organization_id,
            window.assignment_id,
            driver_id,
        )
        .await?;
        if awarded == 0 {
            // conductor ya asignado ese día, o el slot dejó de estar libre
            tx.rollback().await?;
            return Err(AppError::Conflict(
                "driver already holds an assignment on that date".to_string(),
            ));
        }

        BidRepository::record_claim_tx(&mut *tx, organization_id, window_id, driver_id, now).await?;
        BidRepository::mark_losers_tx(&mut *tx, organization_id, window_id, driver_id).await?;
        tx.commit().await?;

        info!("⚡ Claim de {} sobre ventana {} ({})", driver_id, window_id, window.mode.as_str());

        self.health
            .apply_event(
                organization_id,
                driver_id,
                HealthEventType::UrgentBidWin,
                Some(slot.date),
                &format!("bid_win:{}", window_id),
                now,
            )
            .await?;

        self.notifications
            .emit(
                organization_id,
                driver_id,
                &format!("bid_won:{}", window_id),
                NotificationIntent::BidWon {
                    window_id,
                    assignment_id: slot.id,
                    route_id: slot.route_id,
                    date: slot.date,
                },
            )
            .await;

        self.assignments
            .find_by_id(organization_id, window.assignment_id)
            .await?
            .ok_or_else(|| AppError::Internal("assignment vanished after claim".to_string()))
    }

    /// Sweep de cierre: resuelve competitivas vencidas y cierra
    /// instant/emergency sin claim con alerta al manager.
    pub async fn close_bid_windows(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BidCloseSummary, AppError> {
        let mut summary = BidCloseSummary::default();

        let due = self.bids.due_competitive(organization_id, now).await?;
        info!("🔨 Cierre de bidding: {} ventanas competitivas vencidas", due.len());

        for window in due {
            match self.resolve_competitive(organization_id, &window, now).await {
                Ok(ResolutionOutcome::Resolved) => summary.resolved += 1,
                Ok(ResolutionOutcome::TransitionedToInstant) => {
                    summary.transitioned_to_instant += 1
                }
                Ok(ResolutionOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    error!("❌ Resolución de ventana {} falló: {}", window.id, e);
                    summary.failed += 1;
                }
            }
        }

        let expired = self.bids.expired_first_accept(organization_id, now).await?;
        for window in expired {
            match self.close_expired(organization_id, &window).await {
                Ok(true) => summary.closed_unresolved += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    error!("❌ Cierre de ventana {} falló: {}", window.id, e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Resolución competitiva: score para cada bid pendiente, ranking, y
    /// adjudicación saltando a los pujadores con conflicto de fecha. Sin
    /// bids (o todos en conflicto) la ventana pasa a modo instant.
    async fn resolve_competitive(
        &self,
        organization_id: Uuid,
        window: &BidWindow,
        now: DateTime<Utc>,
    ) -> Result<ResolutionOutcome, AppError> {
        let slot = self
            .assignments
            .find_with_start(organization_id, window.assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &window.assignment_id.to_string()))?;

        let bidders = self
            .bids
            .pending_bidders(organization_id, window.id, slot.assignment.route_id)
            .await?;

        if bidders.is_empty() {
            return self.transition_to_instant(organization_id, window, &slot, now).await;
        }

        let mut scored = Vec::with_capacity(bidders.len());
        for bidder in &bidders {
            let score = self.score_for(bidder, now);
            self.bids.set_score(organization_id, bidder.bid_id, score).await?;
            scored.push(ScoredBidder {
                bid_id: bidder.bid_id,
                driver_id: bidder.driver_id,
                bid_at: bidder.bid_at,
                score,
            });
        }

        for candidate in rank_bidders(scored) {
            let mut tx = self.pool.begin().await?;

            let awarded = AssignmentRepository::award_open_slot(
                &mut *tx,
                organization_id,
                slot.assignment.id,
                candidate.driver_id,
            )
            .await?;
            if awarded == 0 {
                // pujador con assignment ese día: se salta y se re-rankea
                tx.rollback().await?;
                info!(
                    "↪️ Pujador {} salteado en ventana {} por conflicto de fecha",
                    candidate.driver_id, window.id
                );
                continue;
            }

            let owned =
                BidRepository::resolve_window_tx(&mut *tx, organization_id, window.id, now).await?;
            if owned == 0 {
                tx.rollback().await?;
                return Ok(ResolutionOutcome::Skipped);
            }

            BidRepository::mark_won_tx(&mut *tx, organization_id, candidate.bid_id, candidate.score)
                .await?;
            BidRepository::mark_losers_tx(&mut *tx, organization_id, window.id, candidate.driver_id)
                .await?;
            tx.commit().await?;

            info!(
                "🏆 Ventana {} resuelta: gana {} con score {:.2}",
                window.id, candidate.driver_id, candidate.score
            );

            self.health
                .apply_event(
                    organization_id,
                    candidate.driver_id,
                    HealthEventType::CompetitiveBidWin,
                    Some(slot.assignment.date),
                    &format!("bid_win:{}", window.id),
                    now,
                )
                .await?;

            self.notifications
                .emit(
                    organization_id,
                    candidate.driver_id,
                    &format!("bid_won:{}", window.id),
                    NotificationIntent::BidWon {
                        window_id: window.id,
                        assignment_id: slot.assignment.id,
                        route_id: slot.assignment.route_id,
                        date: slot.assignment.date,
                    },
                )
                .await;

            for loser in self.bids.losing_bids(organization_id, window.id).await? {
                self.notifications
                    .emit(
                        organization_id,
                        loser.driver_id,
                        &format!("bid_lost:{}:{}", window.id, loser.driver_id),
                        NotificationIntent::BidLost { window_id: window.id },
                    )
                    .await;
            }

            return Ok(ResolutionOutcome::Resolved);
        }

        // todos los pujadores en conflicto
        self.transition_to_instant(organization_id, window, &slot, now).await
    }

    async fn transition_to_instant(
        &self,
        organization_id: Uuid,
        window: &BidWindow,
        slot: &AssignmentWithStart,
        now: DateTime<Utc>,
    ) -> Result<ResolutionOutcome, AppError> {
        let start = shift_start(slot.assignment.date, slot.start_time);
        let new_close = start.max(now);

        let transitioned = self
            .bids
            .transition_to_instant(organization_id, window.id, new_close)
            .await?;

        match transitioned {
            Some(updated) => {
                info!("🔄 Ventana {} pasa a modo instant", window.id);
                self.fan_out(organization_id, &updated, &slot.assignment).await;
                Ok(ResolutionOutcome::TransitionedToInstant)
            }
            None => Ok(ResolutionOutcome::Skipped),
        }
    }

    /// Ventana first-accept vencida sin claim: se cierra y se alerta al
    /// manager. Sin escalamiento adicional.
    async fn close_expired(
        &self,
        organization_id: Uuid,
        window: &BidWindow,
    ) -> Result<bool, AppError> {
        let closed = self.bids.close_unresolved(organization_id, window.id).await?;
        if !closed {
            return Ok(false);
        }

        if let Some(slot) = self
            .assignments
            .find_by_id(organization_id, window.assignment_id)
            .await?
        {
            warn!(
                "🚨 Ventana {} venció sin claim; ruta {} del {} sin cobertura",
                window.id, slot.route_id, slot.date
            );
            self.notifications
                .emit(
                    organization_id,
                    organization_id,
                    &format!("coverage_alert:{}", window.id),
                    NotificationIntent::CoverageAlert {
                        window_id: window.id,
                        route_id: slot.route_id,
                        date: slot.date,
                    },
                )
                .await;
        }

        Ok(true)
    }

    /// Override manual de un manager: fuerza una ventana de emergencia
    /// sobre un slot sin cobertura. No aplica penalizaciones.
    pub async fn force_emergency_window(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        bonus: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<BidWindow, AppError> {
        let slot = self
            .assignments
            .find_with_start(organization_id, assignment_id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &assignment_id.to_string()))?;

        match slot.assignment.status {
            AssignmentStatus::Cancelled | AssignmentStatus::Unfilled => {}
            status => {
                return Err(AppError::Conflict(format!(
                    "cannot open emergency window: assignment is '{}'",
                    status.as_str()
                )))
            }
        }

        self.open_window_for(organization_id, &slot, BidTrigger::Manual, bonus, now)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("assignment already has an open bid window".to_string())
            })
    }

    fn score_for(&self, bidder: &BidderStats, now: DateTime<Utc>) -> f64 {
        score_bid(
            bidder.health_score,
            bidder.route_completions,
            tenure_months(bidder.driver_since, now),
            bidder.route_preferred,
        )
    }
}

/// Último instante del día del turno, límite de claim para emergencias
fn end_of_day(date: chrono::NaiveDate) -> DateTime<Utc> {
    let next_midnight = (date + Duration::days(1))
        .and_time(chrono::NaiveTime::MIN)
        .and_utc();
    next_midnight - Duration::seconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_score_bid_reference_scenario() {
        // salud 82, 12 completions en la ruta, 8 meses, ruta preferida
        let first = score_bid(82, 12, 8.0, true);
        // salud 90, 3 completions, 11 meses, ruta no preferida
        let second = score_bid(90, 3, 11.0, false);

        assert!((first - 0.7844).abs() < 0.005);
        assert!((second - 0.5969).abs() < 0.005);
        assert!(first > second);
    }

    #[test]
    fn test_score_bid_terms_saturate() {
        // todo al tope: 96+ de salud, 20+ completions, 12+ meses, preferida
        let max = score_bid(100, 40, 36.0, true);
        assert!((max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_mode_by_time_to_shift() {
        let th = 24;
        assert_eq!(
            select_mode(BidTrigger::Cancellation, Duration::hours(25), th),
            BidMode::Competitive
        );
        assert_eq!(
            select_mode(BidTrigger::AutoDrop, Duration::hours(24), th),
            BidMode::Instant
        );
        assert_eq!(
            select_mode(BidTrigger::Cancellation, Duration::hours(2), th),
            BidMode::Instant
        );
    }

    #[test]
    fn test_no_show_and_manual_are_always_emergency() {
        let th = 24;
        assert_eq!(
            select_mode(BidTrigger::NoShow, Duration::hours(100), th),
            BidMode::Emergency
        );
        assert_eq!(
            select_mode(BidTrigger::Manual, Duration::hours(-1), th),
            BidMode::Emergency
        );
    }

    #[test]
    fn test_rank_bidders_ties_break_by_earliest_bid() {
        let earlier = Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let a = ScoredBidder {
            bid_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            bid_at: later,
            score: 0.8,
        };
        let b = ScoredBidder {
            bid_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            bid_at: earlier,
            score: 0.8,
        };
        let c = ScoredBidder {
            bid_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            bid_at: earlier,
            score: 0.9,
        };

        let ranked = rank_bidders(vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(ranked[0].bid_id, c.bid_id);
        assert_eq!(ranked[1].bid_id, b.bid_id);
        assert_eq!(ranked[2].bid_id, a.bid_id);
    }
}
