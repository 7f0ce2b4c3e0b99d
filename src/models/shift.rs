//! Modelo de Shift
//!
//! 1:1 con un assignment que llega a completarse. La fila se crea en la
//! llegada del conductor, `start` registra los paquetes cargados y
//! `complete` cierra el turno y abre la ventana corta de edición.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Shift - mapea exactamente a la tabla shifts
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Shift {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub assignment_id: Uuid,
    pub driver_id: Uuid,
    pub arrived_at: DateTime<Utc>,
    pub parcels_start: Option<i32>,
    pub parcels_returned: Option<i32>,
    /// Devoluciones justificadas (rechazo del cliente, dirección inválida)
    pub excepted_returns: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub editable_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Shift {
    /// Ratio de entrega del turno, si ya hay datos de paquetes
    pub fn delivery_ratio(&self) -> Option<f64> {
        let start = self.parcels_start?;
        let returned = self.parcels_returned?;
        delivery_ratio(start, returned, self.excepted_returns)
    }
}

/// `(parcelsStart − parcelsReturned + exceptedReturns) / parcelsStart`
///
/// Turnos con cero paquetes cargados no aportan ratio.
pub fn delivery_ratio(parcels_start: i32, parcels_returned: i32, excepted_returns: i32) -> Option<f64> {
    if parcels_start <= 0 {
        return None;
    }
    let delivered = parcels_start - parcels_returned + excepted_returns;
    Some(delivered as f64 / parcels_start as f64)
}

/// Request para iniciar el turno (carga de paquetes)
#[derive(Debug, Deserialize, Validate)]
pub struct StartShiftRequest {
    #[validate(range(min = 0))]
    pub parcels_start: i32,
}

/// Request para completar el turno
#[derive(Debug, Deserialize, Validate)]
pub struct CompleteShiftRequest {
    #[validate(range(min = 0))]
    pub parcels_returned: i32,

    #[validate(range(min = 0))]
    pub excepted_returns: Option<i32>,
}

/// Request para corregir paquetes dentro de la ventana de edición
#[derive(Debug, Deserialize, Validate)]
pub struct EditShiftRequest {
    #[validate(range(min = 0))]
    pub parcels_returned: Option<i32>,

    #[validate(range(min = 0))]
    pub excepted_returns: Option<i32>,
}

/// Response de shift para la API
#[derive(Debug, Serialize)]
pub struct ShiftResponse {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub driver_id: Uuid,
    pub arrived_at: DateTime<Utc>,
    pub parcels_start: Option<i32>,
    pub parcels_returned: Option<i32>,
    pub excepted_returns: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub editable_until: Option<DateTime<Utc>>,
}

impl From<Shift> for ShiftResponse {
    fn from(shift: Shift) -> Self {
        Self {
            id: shift.id,
            assignment_id: shift.assignment_id,
            driver_id: shift.driver_id,
            arrived_at: shift.arrived_at,
            parcels_start: shift.parcels_start,
            parcels_returned: shift.parcels_returned,
            excepted_returns: shift.excepted_returns,
            completed_at: shift.completed_at,
            editable_until: shift.editable_until,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_ratio() {
        // 100 cargados, 3 devueltos, 1 justificado => 98%
        let ratio = delivery_ratio(100, 3, 1).unwrap();
        assert!((ratio - 0.98).abs() < 1e-9);
    }

    #[test]
    fn test_delivery_ratio_zero_start_excluded() {
        assert!(delivery_ratio(0, 0, 0).is_none());
    }
}
