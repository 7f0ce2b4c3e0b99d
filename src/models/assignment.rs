//! Modelo de Assignment
//!
//! El assignment es la entidad central del motor: un slot (ruta, fecha)
//! con un conductor opcional y la máquina de estados
//! scheduled → confirmed → active → completed, con desvíos a cancelled.
//! Nunca se borra; es el registro histórico de cobertura.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del assignment - mapea al ENUM assignment_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "assignment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Scheduled,
    Confirmed,
    Active,
    Completed,
    Cancelled,
    Unfilled,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Scheduled => "scheduled",
            AssignmentStatus::Confirmed => "confirmed",
            AssignmentStatus::Active => "active",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Cancelled => "cancelled",
            AssignmentStatus::Unfilled => "unfilled",
        }
    }
}

/// Origen del assignment - mapea al ENUM assigned_by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "assigned_by", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignedBy {
    Schedule,
    Bid,
    Manual,
}

/// Tipo de cancelación - mapea al ENUM cancel_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "cancel_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancelType {
    Driver,
    Late,
    AutoDrop,
}

/// Assignment - mapea exactamente a la tabla assignments
///
/// Clave única (organization_id, route_id, date): regenerar una semana
/// ya generada no duplica slots. Un no-show detectado deja el assignment
/// en cancelled con `no_show_at` como marcador (el enum de estados no
/// tiene miembro no_show); el marcador también hace idempotente al detector.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub route_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub date: NaiveDate,
    pub status: AssignmentStatus,
    pub assigned_by: AssignedBy,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_type: Option<CancelType>,
    pub no_show_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Assignment junto con la hora de inicio de su ruta
///
/// Lo devuelven los sweeps que necesitan calcular el instante de inicio
/// del turno sin una segunda query por fila.
#[derive(Debug, Clone, FromRow)]
pub struct AssignmentWithStart {
    #[sqlx(flatten)]
    pub assignment: Assignment,
    pub start_time: NaiveTime,
}

/// Response de assignment para la API
#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub route_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub date: NaiveDate,
    pub status: AssignmentStatus,
    pub assigned_by: AssignedBy,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_type: Option<CancelType>,
    pub no_show_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(a: Assignment) -> Self {
        Self {
            id: a.id,
            organization_id: a.organization_id,
            route_id: a.route_id,
            driver_id: a.driver_id,
            date: a.date,
            status: a.status,
            assigned_by: a.assigned_by,
            confirmed_at: a.confirmed_at,
            cancelled_at: a.cancelled_at,
            cancel_type: a.cancel_type,
            no_show_at: a.no_show_at,
            created_at: a.created_at,
        }
    }
}

/// Request para reasignación manual por un manager
#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub driver_id: Uuid,
}
