//! Modelos de Warehouse y Route
//!
//! Datos de referencia estáticos: cada ruta pertenece a un warehouse
//! y tiene una hora de inicio diaria que gobierna las ventanas de
//! confirmación, bidding y el corte de no-show.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Warehouse - mapea exactamente a la tabla warehouses
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Warehouse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Route - mapea exactamente a la tabla routes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Route {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub warehouse_id: Uuid,
    pub name: String,
    /// Hora de inicio diaria (UTC)
    pub start_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

/// Request para crear un warehouse
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWarehouseRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
}

/// Request para crear una ruta
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRouteRequest {
    pub warehouse_id: Uuid,

    #[validate(length(min = 2, max = 100))]
    pub name: String,

    pub start_time: NaiveTime,
}

/// Response de ruta para la API
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub warehouse_id: Uuid,
    pub name: String,
    pub start_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

impl From<Route> for RouteResponse {
    fn from(route: Route) -> Self {
        Self {
            id: route.id,
            organization_id: route.organization_id,
            warehouse_id: route.warehouse_id,
            name: route.name,
            start_time: route.start_time,
            created_at: route.created_at,
        }
    }
}
