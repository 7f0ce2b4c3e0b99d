//! Services module
//!
//! Este módulo contiene la lógica de negocio del motor de dispatch:
//! generación de schedule, ciclo de confirmación, mercado de bidding,
//! detección de no-shows, salud del conductor y métricas/flagging.

pub mod bidding_service;
pub mod health_service;
pub mod lifecycle_service;
pub mod metrics_service;
pub mod no_show_service;
pub mod notification_service;
pub mod scheduler_service;

use serde::Serialize;

/// Resumen de un sweep: los fallos por ítem se aíslan y se cuentan,
/// nunca abortan el lote.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct SweepSummary {
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
}

