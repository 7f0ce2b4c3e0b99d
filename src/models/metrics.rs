//! Modelo de DriverMetrics
//!
//! Estadísticas rodantes por conductor. Se recomputan desde el historial
//! (no son event-sourced): cualquier desenlace no completado cuenta como
//! turno perdido para attendance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// DriverMetrics - mapea exactamente a la tabla driver_metrics
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriverMetrics {
    pub driver_id: Uuid,
    pub organization_id: Uuid,
    pub attendance_rate: f64,
    pub completion_rate: f64,
    pub completed_shifts: i64,
    pub total_assigned_shifts: i64,
    pub updated_at: DateTime<Utc>,
}

/// Response de métricas para la API
#[derive(Debug, Serialize)]
pub struct DriverMetricsResponse {
    pub driver_id: Uuid,
    pub attendance_rate: f64,
    pub completion_rate: f64,
    pub completed_shifts: i64,
    pub total_assigned_shifts: i64,
}

impl From<DriverMetrics> for DriverMetricsResponse {
    fn from(m: DriverMetrics) -> Self {
        Self {
            driver_id: m.driver_id,
            attendance_rate: m.attendance_rate,
            completion_rate: m.completion_rate,
            completed_shifts: m.completed_shifts,
            total_assigned_shifts: m.total_assigned_shifts,
        }
    }
}
