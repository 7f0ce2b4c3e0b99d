use crate::models::shift::Shift;
use crate::utils::errors::AppError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct ShiftRepository {
    pool: PgPool,
}

impl ShiftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registrar la llegada. La clave única sobre assignment_id garantiza
    /// "exactamente una vez": la segunda llegada devuelve None.
    pub async fn create_on_arrival(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        driver_id: Uuid,
        arrived_at: DateTime<Utc>,
    ) -> Result<Option<Shift>, AppError> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            INSERT INTO shifts (id, organization_id, assignment_id, driver_id, arrived_at, excepted_returns, created_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6)
            ON CONFLICT (assignment_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(assignment_id)
        .bind(driver_id)
        .bind(arrived_at)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    pub async fn find_by_assignment(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<Option<Shift>, AppError> {
        let shift = sqlx::query_as::<_, Shift>(
            "SELECT * FROM shifts WHERE assignment_id = $1 AND organization_id = $2",
        )
        .bind(assignment_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Registrar los paquetes cargados al inicio. Solo una vez.
    pub async fn record_start(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        parcels_start: i32,
    ) -> Result<Option<Shift>, AppError> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            UPDATE shifts
            SET parcels_start = $3
            WHERE assignment_id = $1 AND organization_id = $2 AND parcels_start IS NULL
            RETURNING *
            "#,
        )
        .bind(assignment_id)
        .bind(organization_id)
        .bind(parcels_start)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Cerrar el turno y abrir la ventana de edición
    pub async fn record_completion(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        parcels_returned: i32,
        excepted_returns: i32,
        completed_at: DateTime<Utc>,
        editable_until: DateTime<Utc>,
    ) -> Result<Option<Shift>, AppError> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            UPDATE shifts
            SET parcels_returned = $3, excepted_returns = $4, completed_at = $5, editable_until = $6
            WHERE assignment_id = $1 AND organization_id = $2 AND completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(assignment_id)
        .bind(organization_id)
        .bind(parcels_returned)
        .bind(excepted_returns)
        .bind(completed_at)
        .bind(editable_until)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Corrección post-completado, solo dentro de la ventana de edición
    pub async fn apply_edit(
        &self,
        organization_id: Uuid,
        shift_id: Uuid,
        parcels_returned: Option<i32>,
        excepted_returns: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<Option<Shift>, AppError> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            UPDATE shifts
            SET parcels_returned = COALESCE($3, parcels_returned),
                excepted_returns = COALESCE($4, excepted_returns)
            WHERE id = $1 AND organization_id = $2
              AND completed_at IS NOT NULL
              AND editable_until > $5
            RETURNING *
            "#,
        )
        .bind(shift_id)
        .bind(organization_id)
        .bind(parcels_returned)
        .bind(excepted_returns)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    pub async fn find_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Shift>, AppError> {
        let shift = sqlx::query_as::<_, Shift>(
            "SELECT * FROM shifts WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }
}
