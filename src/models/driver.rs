//! Modelo de Driver
//!
//! Este módulo contiene el struct Driver y sus preferencias semanales.
//! Los conductores nunca se borran, solo se desactivan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Driver - mapea exactamente a la tabla drivers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    /// Máximo de assignments por semana (default 4, ajustado por flagging/reward)
    pub weekly_cap: i32,
    pub flagged: bool,
    pub flagged_at: Option<DateTime<Utc>>,
    /// Marca de que el cap ya fue reducido por el flag vigente
    pub cap_reduced_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Preferencias semanales del conductor
///
/// `weekdays` usa índices 0-6 con 0 = lunes. Hasta 3 rutas preferidas.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriverPreference {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub driver_id: Uuid,
    pub weekdays: Vec<i16>,
    pub preferred_route_ids: Vec<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// Request para crear un nuevo conductor
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDriverRequest {
    #[validate(length(min = 2, max = 100))]
    pub full_name: String,

    #[validate(length(min = 5, max = 30))]
    pub phone: Option<String>,
}

/// Request para actualizar preferencias
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePreferencesRequest {
    #[validate(length(max = 7))]
    pub weekdays: Vec<i16>,

    #[validate(length(max = 3))]
    pub preferred_route_ids: Vec<Uuid>,
}

/// Response de conductor para la API
#[derive(Debug, Serialize)]
pub struct DriverResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub weekly_cap: i32,
    pub flagged: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Driver> for DriverResponse {
    fn from(driver: Driver) -> Self {
        Self {
            id: driver.id,
            organization_id: driver.organization_id,
            full_name: driver.full_name,
            phone: driver.phone,
            weekly_cap: driver.weekly_cap,
            flagged: driver.flagged,
            active: driver.active,
            created_at: driver.created_at,
        }
    }
}
