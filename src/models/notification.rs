//! Intents de notificación
//!
//! El motor decide QUÉ notificar y A QUIÉN; la entrega es del
//! colaborador externo. Cada intent es una variante cerrada con sus
//! campos obligatorios, y la clave de deduplicación garantiza como
//! máximo un intent por (destinatario, evento).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::assignment::CancelType;
use crate::models::bid::BidMode;

/// Intent tipado de notificación
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationIntent {
    AssignmentConfirmed {
        assignment_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
    },
    ScheduleLocked {
        week_start: NaiveDate,
        assignment_count: i64,
    },
    ShiftAutoDropped {
        assignment_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
    },
    BidOpen {
        window_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
        mode: BidMode,
        closes_at: DateTime<Utc>,
    },
    BidWon {
        window_id: Uuid,
        assignment_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
    },
    BidLost {
        window_id: Uuid,
    },
    ShiftCancelled {
        assignment_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
        cancel_type: CancelType,
    },
    EmergencyRouteAvailable {
        window_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
        pay_bonus_percent: Option<Decimal>,
    },
    /// Para managers de la organización
    DriverNoShow {
        assignment_id: Uuid,
        driver_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
    },
    StreakAdvanced {
        stars: i16,
        streak_weeks: i32,
    },
    StreakReset {
        reason: String,
    },
    BonusEligible {
        stars: i16,
    },
    CorrectiveWarning {
        attendance_rate: f64,
        threshold: f64,
    },
    ConfirmationReminder {
        assignment_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
        deadline: DateTime<Utc>,
    },
    /// Ventana instant/emergency que llegó al inicio del turno sin claim
    CoverageAlert {
        window_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
    },
}

impl NotificationIntent {
    /// Nombre estable del tipo, usado en el outbox y en logs
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationIntent::AssignmentConfirmed { .. } => "assignment_confirmed",
            NotificationIntent::ScheduleLocked { .. } => "schedule_locked",
            NotificationIntent::ShiftAutoDropped { .. } => "shift_auto_dropped",
            NotificationIntent::BidOpen { .. } => "bid_open",
            NotificationIntent::BidWon { .. } => "bid_won",
            NotificationIntent::BidLost { .. } => "bid_lost",
            NotificationIntent::ShiftCancelled { .. } => "shift_cancelled",
            NotificationIntent::EmergencyRouteAvailable { .. } => "emergency_route_available",
            NotificationIntent::DriverNoShow { .. } => "driver_no_show",
            NotificationIntent::StreakAdvanced { .. } => "streak_advanced",
            NotificationIntent::StreakReset { .. } => "streak_reset",
            NotificationIntent::BonusEligible { .. } => "bonus_eligible",
            NotificationIntent::CorrectiveWarning { .. } => "corrective_warning",
            NotificationIntent::ConfirmationReminder { .. } => "confirmation_reminder",
            NotificationIntent::CoverageAlert { .. } => "coverage_alert",
        }
    }
}

/// Intent ya dirigido: tipo + destinatario + clave de deduplicación
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub recipient_id: Uuid,
    pub dedup_key: String,
    pub intent: NotificationIntent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_serializes_with_type_tag() {
        let intent = NotificationIntent::StreakAdvanced {
            stars: 3,
            streak_weeks: 5,
        };
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["type"], "streak_advanced");
        assert_eq!(value["stars"], 3);
        assert_eq!(value["streak_weeks"], 5);
    }

    #[test]
    fn test_kind_matches_serde_tag() {
        let intent = NotificationIntent::BidLost {
            window_id: Uuid::new_v4(),
        };
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["type"], intent.kind());
    }
}
