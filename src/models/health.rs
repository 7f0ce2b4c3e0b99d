//! Modelos del motor de salud del conductor
//!
//! Score aditivo 0-100 con piso en 0, estrellas 0-4 por rachas semanales,
//! y política de hard-stop que capa el score en 49 y exige intervención
//! de un manager. Cada evento aplicado queda en un ledger deduplicado y
//! cada día se persiste un snapshot inmutable para auditoría.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Score máximo y cap de hard-stop
pub const MAX_SCORE: i32 = 100;
pub const HARD_STOP_CAP: i32 = 49;
pub const MAX_STARS: i16 = 4;

/// Tipo de evento de salud - mapea al ENUM health_event_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "health_event_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HealthEventType {
    ConfirmOnTime,
    ArriveOnTime,
    CompleteShift,
    HighDelivery,
    CompetitiveBidWin,
    UrgentBidWin,
    AutoDrop,
    DriverCancel,
    LateCancel,
    NoShow,
}

impl HealthEventType {
    /// Delta de puntos del evento. El no-show no es un delta: dispara
    /// el reset completo y aquí vale 0.
    pub fn points(&self) -> i32 {
        match self {
            HealthEventType::ConfirmOnTime => 1,
            HealthEventType::ArriveOnTime => 2,
            HealthEventType::CompleteShift => 2,
            HealthEventType::HighDelivery => 1,
            HealthEventType::CompetitiveBidWin => 2,
            HealthEventType::UrgentBidWin => 4,
            HealthEventType::AutoDrop => -12,
            HealthEventType::DriverCancel => -8,
            HealthEventType::LateCancel => -32,
            HealthEventType::NoShow => 0,
        }
    }

    /// Eventos que cuentan como turno perdido para attendance
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            HealthEventType::AutoDrop
                | HealthEventType::DriverCancel
                | HealthEventType::LateCancel
                | HealthEventType::NoShow
        )
    }
}

/// Estado de salud vigente - una fila por conductor
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriverHealthState {
    pub driver_id: Uuid,
    pub organization_id: Uuid,
    pub score: i32,
    pub stars: i16,
    pub streak_weeks: i32,
    pub assignment_pool_eligible: bool,
    pub requires_manager_intervention: bool,
    pub last_score_reset_at: Option<DateTime<Utc>>,
    /// Última semana (lunes) ya evaluada por la evaluación semanal
    pub last_weekly_eval_on: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

/// Evento aplicado - ledger append-only con clave de deduplicación
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HealthEvent {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub driver_id: Uuid,
    pub event_type: HealthEventType,
    pub points: i32,
    /// Fecha del turno afectado, si el evento viene de un assignment
    pub shift_date: Option<NaiveDate>,
    pub dedup_key: String,
    pub occurred_at: DateTime<Utc>,
}

/// Snapshot diario inmutable del score y sus factores
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriverHealthSnapshot {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub driver_id: Uuid,
    pub snapshot_date: NaiveDate,
    pub score: i32,
    pub stars: i16,
    pub streak_weeks: i32,
    pub hard_stop_active: bool,
    pub factors: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Response del estado de salud para la API
#[derive(Debug, Serialize)]
pub struct HealthStateResponse {
    pub driver_id: Uuid,
    pub score: i32,
    pub stars: i16,
    pub streak_weeks: i32,
    pub assignment_pool_eligible: bool,
    pub requires_manager_intervention: bool,
    pub last_score_reset_at: Option<DateTime<Utc>>,
}

impl From<DriverHealthState> for HealthStateResponse {
    fn from(s: DriverHealthState) -> Self {
        Self {
            driver_id: s.driver_id,
            score: s.score,
            stars: s.stars,
            streak_weeks: s.streak_weeks,
            assignment_pool_eligible: s.assignment_pool_eligible,
            requires_manager_intervention: s.requires_manager_intervention,
            last_score_reset_at: s.last_score_reset_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_values() {
        assert_eq!(HealthEventType::ConfirmOnTime.points(), 1);
        assert_eq!(HealthEventType::ArriveOnTime.points(), 2);
        assert_eq!(HealthEventType::CompleteShift.points(), 2);
        assert_eq!(HealthEventType::HighDelivery.points(), 1);
        assert_eq!(HealthEventType::CompetitiveBidWin.points(), 2);
        assert_eq!(HealthEventType::UrgentBidWin.points(), 4);
        assert_eq!(HealthEventType::AutoDrop.points(), -12);
        assert_eq!(HealthEventType::DriverCancel.points(), -8);
        assert_eq!(HealthEventType::LateCancel.points(), -32);
    }

    #[test]
    fn test_penalty_ordering() {
        // late cancel > auto-drop > driver cancel, siempre
        let late = -HealthEventType::LateCancel.points();
        let auto_drop = -HealthEventType::AutoDrop.points();
        let driver = -HealthEventType::DriverCancel.points();
        assert!(late > auto_drop);
        assert!(auto_drop > driver);
    }

    #[test]
    fn test_miss_classification() {
        assert!(HealthEventType::NoShow.is_miss());
        assert!(HealthEventType::LateCancel.is_miss());
        assert!(HealthEventType::AutoDrop.is_miss());
        assert!(HealthEventType::DriverCancel.is_miss());
        assert!(!HealthEventType::CompleteShift.is_miss());
        assert!(!HealthEventType::ConfirmOnTime.is_miss());
    }
}
