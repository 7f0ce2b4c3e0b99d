//! Parámetros de negocio del motor de dispatch
//!
//! Ventanas de confirmación, cortes de bidding y bonus de emergencia.
//! Todos tienen default de producción y se pueden sobreescribir por env var.

use rust_decimal::Decimal;
use std::env;

/// Knobs del motor. Las duraciones se expresan en horas.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Cuántas semanas hacia adelante genera el scheduler
    pub schedule_lookahead_weeks: i64,
    /// La ventana de confirmación abre N horas antes del turno
    pub confirmation_opens_hours: i64,
    /// La ventana de confirmación cierra N horas antes del turno
    pub confirmation_deadline_hours: i64,
    /// El recordatorio de confirmación se dispara N horas antes del turno
    pub confirmation_reminder_hours: i64,
    /// Una cancelación de un turno confirmado dentro de N horas es "late"
    pub late_cancel_hours: i64,
    /// Las ventanas competitivas cierran N horas antes del turno
    pub competitive_close_hours: i64,
    /// Umbral de modo: más de N horas restantes => competitiva, si no instant
    pub instant_mode_threshold_hours: i64,
    /// Bonus de pago por defecto para ventanas de emergencia (porcentaje)
    pub emergency_bonus_percent: Decimal,
    /// Horas de edición del shift después de completar
    pub shift_edit_window_hours: i64,
    /// Días de gracia entre el flag y la reducción del cap semanal
    pub flag_grace_days: i64,
    /// Ventana móvil (días) para la evaluación de hard-stop
    pub hard_stop_window_days: i64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            schedule_lookahead_weeks: 2,
            confirmation_opens_hours: 168,
            confirmation_deadline_hours: 48,
            confirmation_reminder_hours: 72,
            late_cancel_hours: 48,
            competitive_close_hours: 24,
            instant_mode_threshold_hours: 24,
            emergency_bonus_percent: Decimal::new(15, 0),
            shift_edit_window_hours: 2,
            flag_grace_days: 7,
            hard_stop_window_days: 30,
        }
    }
}

impl DispatchConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            schedule_lookahead_weeks: env_i64("SCHEDULE_LOOKAHEAD_WEEKS", defaults.schedule_lookahead_weeks),
            confirmation_opens_hours: env_i64("CONFIRMATION_OPENS_HOURS", defaults.confirmation_opens_hours),
            confirmation_deadline_hours: env_i64("CONFIRMATION_DEADLINE_HOURS", defaults.confirmation_deadline_hours),
            confirmation_reminder_hours: env_i64("CONFIRMATION_REMINDER_HOURS", defaults.confirmation_reminder_hours),
            late_cancel_hours: env_i64("LATE_CANCEL_HOURS", defaults.late_cancel_hours),
            competitive_close_hours: env_i64("COMPETITIVE_CLOSE_HOURS", defaults.competitive_close_hours),
            instant_mode_threshold_hours: env_i64("INSTANT_MODE_THRESHOLD_HOURS", defaults.instant_mode_threshold_hours),
            emergency_bonus_percent: env::var("EMERGENCY_BONUS_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.emergency_bonus_percent),
            shift_edit_window_hours: env_i64("SHIFT_EDIT_WINDOW_HOURS", defaults.shift_edit_window_hours),
            flag_grace_days: env_i64("FLAG_GRACE_DAYS", defaults.flag_grace_days),
            hard_stop_window_days: env_i64("HARD_STOP_WINDOW_DAYS", defaults.hard_stop_window_days),
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.schedule_lookahead_weeks, 2);
        assert_eq!(config.confirmation_deadline_hours, 48);
        assert_eq!(config.confirmation_reminder_hours, 72);
        assert_eq!(config.competitive_close_hours, 24);
        assert_eq!(config.hard_stop_window_days, 30);
    }
}
