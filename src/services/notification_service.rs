//! Emisión de intents de notificación
//!
//! El motor solo decide qué notificar y a quién; la entrega pertenece al
//! colaborador externo detrás de `NotificationSink`. Cada intent pasa por
//! el outbox deduplicado, y un fallo de entrega jamás revierte la
//! transacción de dominio: se loguea y el colaborador reintenta desde el
//! outbox.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::notification::{Notification, NotificationIntent};
use crate::repositories::notification_repository::NotificationRepository;
use crate::utils::errors::AppError;

/// Colaborador de entrega de notificaciones
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError>;
}

/// Sink por defecto: loguea el intent. La entrega real (push/in-app)
/// vive fuera del motor.
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError> {
        info!(
            "📣 Notificación '{}' para {} (dedup {})",
            notification.intent.kind(),
            notification.recipient_id,
            notification.dedup_key
        );
        Ok(())
    }
}

pub struct NotificationService {
    repository: NotificationRepository,
    sink: Arc<dyn NotificationSink>,
}

impl NotificationService {
    pub fn new(pool: PgPool, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            repository: NotificationRepository::new(pool),
            sink,
        }
    }

    /// Emitir un intent. Devuelve true si es la primera emisión para esa
    /// clave de deduplicación; re-ejecuciones del mismo sweep devuelven
    /// false y no generan entregas duplicadas. Nunca propaga errores.
    pub async fn emit(
        &self,
        organization_id: Uuid,
        recipient_id: Uuid,
        dedup_key: &str,
        intent: NotificationIntent,
    ) -> bool {
        let payload = match serde_json::to_value(&intent) {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ Intent '{}' no serializable: {}", intent.kind(), e);
                return false;
            }
        };

        let fresh = match self
            .repository
            .insert(organization_id, recipient_id, intent.kind(), dedup_key, payload)
            .await
        {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!("⚠️ Outbox no disponible para '{}': {}", dedup_key, e);
                return false;
            }
        };

        if !fresh {
            return false;
        }

        let notification = Notification {
            recipient_id,
            dedup_key: dedup_key.to_string(),
            intent,
        };

        if let Err(e) = self.sink.deliver(&notification).await {
            // queda en el outbox; el colaborador reintenta por su cuenta
            warn!("⚠️ Entrega fallida de '{}': {}", notification.dedup_key, e);
        }

        true
    }
}
