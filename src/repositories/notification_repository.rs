use crate::utils::errors::AppError;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

/// Outbox de intents de notificación. La clave de deduplicación única
/// da la garantía de como máximo un intent por (destinatario, evento):
/// el INSERT devuelve false cuando el intent ya fue emitido.
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        organization_id: Uuid,
        recipient_id: Uuid,
        kind: &str,
        dedup_key: &str,
        payload: serde_json::Value,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO notification_outbox
                (id, organization_id, recipient_id, kind, dedup_key, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (organization_id, dedup_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(recipient_id)
        .bind(kind)
        .bind(dedup_key)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
