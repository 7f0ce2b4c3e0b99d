//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL con las convenciones estándar.

pub mod assignment;
pub mod bid;
pub mod driver;
pub mod health;
pub mod metrics;
pub mod notification;
pub mod route;
pub mod shift;
