//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::EnvironmentConfig;
use crate::services::notification_service::{NotificationSink, TracingSink};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub notifier: Arc<dyn NotificationSink>,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        Self {
            pool,
            config,
            notifier: Arc::new(TracingSink),
        }
    }

    /// Inyectar un colaborador de notificaciones distinto del default
    pub fn with_sink(pool: PgPool, config: EnvironmentConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            pool,
            config,
            notifier: sink,
        }
    }
}
