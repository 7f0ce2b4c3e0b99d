//! Routers de la API
//!
//! La tenencia es explícita: cada request lleva el header
//! X-Organization-Id y el motor solo filtra por él, nunca lo infiere.

pub mod admin_routes;
pub mod assignment_routes;
pub mod bidding_routes;
pub mod driver_routes;
pub mod trigger_routes;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::utils::errors::AppError;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Extraer el organization_id del header de tenencia
pub fn organization_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get(ORGANIZATION_HEADER)
        .ok_or_else(|| AppError::BadRequest("missing X-Organization-Id header".to_string()))?;

    let raw = value
        .to_str()
        .map_err(|_| AppError::BadRequest("invalid X-Organization-Id header".to_string()))?;

    Uuid::parse_str(raw)
        .map_err(|_| AppError::BadRequest("X-Organization-Id must be a UUID".to_string()))
}
