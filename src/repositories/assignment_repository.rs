use crate::models::assignment::{
    AssignedBy, Assignment, AssignmentStatus, AssignmentWithStart, CancelType,
};
use crate::utils::errors::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Repositorio del assignment. Todas las transiciones de estado son
/// UPDATEs condicionales que devuelven filas afectadas: el estado
/// esperado va en el WHERE y una segunda invocación no muta nada.
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Crear un slot (ruta, fecha). La clave única
    /// (organization_id, route_id, date) hace esto idempotente:
    /// devuelve None si el slot ya existía.
    pub async fn create_slot(
        &self,
        organization_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
        driver_id: Option<Uuid>,
        status: AssignmentStatus,
        assigned_by: AssignedBy,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            INSERT INTO assignments (id, organization_id, route_id, driver_id, date, status, assigned_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (organization_id, route_id, date) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(route_id)
        .bind(driver_id)
        .bind(date)
        .bind(status)
        .bind(assigned_by)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    pub async fn find_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// Assignment junto con la hora de inicio de su ruta
    pub async fn find_with_start(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<AssignmentWithStart>, AppError> {
        let row = sqlx::query_as::<_, AssignmentWithStart>(
            r#"
            SELECT a.*, r.start_time FROM assignments a
            JOIN routes r ON r.id = a.route_id
            WHERE a.id = $1 AND a.organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Assignments vivos del conductor en la semana [week_start, week_end]
    pub async fn used_cap(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM assignments
            WHERE organization_id = $1 AND driver_id = $2
              AND date BETWEEN $3 AND $4
              AND status IN ('scheduled', 'confirmed', 'active', 'completed')
            "#,
        )
        .bind(organization_id)
        .bind(driver_id)
        .bind(week_start)
        .bind(week_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// ¿El conductor ya tiene un assignment vivo esa fecha?
    pub async fn has_assignment_on(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM assignments
                WHERE organization_id = $1 AND driver_id = $2 AND date = $3
                  AND status IN ('scheduled', 'confirmed', 'active', 'completed')
            )
            "#,
        )
        .bind(organization_id)
        .bind(driver_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// scheduled → confirmed
    pub async fn confirm(
        &self,
        organization_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments
            SET status = 'confirmed', confirmed_at = $3
            WHERE id = $1 AND organization_id = $2 AND status = 'scheduled'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// confirmed → active, al registrarse la llegada
    pub async fn mark_active(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments
            SET status = 'active'
            WHERE id = $1 AND organization_id = $2 AND status = 'confirmed'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// active → completed
    pub async fn mark_completed(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments
            SET status = 'completed'
            WHERE id = $1 AND organization_id = $2 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// scheduled/confirmed → cancelled, con el tipo de cancelación
    pub async fn cancel(
        &self,
        organization_id: Uuid,
        id: Uuid,
        cancel_type: CancelType,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments
            SET status = 'cancelled', cancel_type = $3, cancelled_at = $4
            WHERE id = $1 AND organization_id = $2 AND status IN ('scheduled', 'confirmed')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(cancel_type)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// Deadline de confirmación vencido: scheduled sin confirmar → auto_drop
    pub async fn auto_drop(
        &self,
        organization_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments
            SET status = 'cancelled', cancel_type = 'auto_drop', cancelled_at = $3
            WHERE id = $1 AND organization_id = $2
              AND status = 'scheduled' AND confirmed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// confirmed sin llegada → no-show. `no_show_at` es el marcador de
    /// procesado: re-ejecutar el detector no toca esta fila.
    pub async fn mark_no_show(
        &self,
        organization_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments
            SET status = 'cancelled', cancelled_at = $3, no_show_at = $3
            WHERE id = $1 AND organization_id = $2
              AND status = 'confirmed' AND no_show_at IS NULL
              AND NOT EXISTS (SELECT 1 FROM shifts s WHERE s.assignment_id = assignments.id)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// Scheduled sin confirmar con fecha próxima, para el sweep de deadlines
    pub async fn unconfirmed_scheduled(
        &self,
        organization_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AssignmentWithStart>, AppError> {
        let rows = sqlx::query_as::<_, AssignmentWithStart>(
            r#"
            SELECT a.*, r.start_time FROM assignments a
            JOIN routes r ON r.id = a.route_id
            WHERE a.organization_id = $1
              AND a.status = 'scheduled'
              AND a.driver_id IS NOT NULL
              AND a.confirmed_at IS NULL
              AND a.date BETWEEN $2 AND $3
            ORDER BY a.date, r.start_time
            "#,
        )
        .bind(organization_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Confirmados sin llegada para fechas ya alcanzadas, candidatos a no-show
    pub async fn no_show_candidates(
        &self,
        organization_id: Uuid,
        up_to: NaiveDate,
    ) -> Result<Vec<AssignmentWithStart>, AppError> {
        let rows = sqlx::query_as::<_, AssignmentWithStart>(
            r#"
            SELECT a.*, r.start_time FROM assignments a
            JOIN routes r ON r.id = a.route_id
            WHERE a.organization_id = $1
              AND a.status = 'confirmed'
              AND a.no_show_at IS NULL
              AND a.date <= $2
              AND NOT EXISTS (SELECT 1 FROM shifts s WHERE s.assignment_id = a.id)
            ORDER BY a.date, r.start_time
            "#,
        )
        .bind(organization_id)
        .bind(up_to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Adjudicar un slot abierto (cancelled/unfilled) a un ganador de
    /// bidding. Un solo UPDATE condicional: el chequeo de conflicto
    /// mismo-día va en el NOT EXISTS, así N claims concurrentes dejan
    /// exactamente un ganador y cero dobles bookings.
    pub async fn award_open_slot(
        conn: &mut PgConnection,
        organization_id: Uuid,
        assignment_id: Uuid,
        driver_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE assignments a
            SET driver_id = $3, assigned_by = 'bid', status = 'scheduled', confirmed_at = NULL
            WHERE a.id = $1 AND a.organization_id = $2
              AND a.status IN ('cancelled', 'unfilled')
              AND NOT EXISTS (
                  SELECT 1 FROM assignments b
                  WHERE b.organization_id = $2 AND b.driver_id = $3 AND b.date = a.date
                    AND b.status IN ('scheduled', 'confirmed', 'active', 'completed')
              )
            "#,
        )
        .bind(assignment_id)
        .bind(organization_id)
        .bind(driver_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Reasignación manual por un manager. Mismo primitivo condicional
    /// que el bidding, sin penalizaciones para nadie.
    pub async fn manual_reassign(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments a
            SET driver_id = $3, assigned_by = 'manual', status = 'scheduled', confirmed_at = NULL
            WHERE a.id = $1 AND a.organization_id = $2
              AND a.status IN ('scheduled', 'confirmed', 'cancelled', 'unfilled')
              AND NOT EXISTS (
                  SELECT 1 FROM assignments b
                  WHERE b.organization_id = $2 AND b.driver_id = $3 AND b.date = a.date
                    AND b.status IN ('scheduled', 'confirmed', 'active', 'completed')
                    AND b.id != a.id
              )
            RETURNING *
            "#,
        )
        .bind(assignment_id)
        .bind(organization_id)
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// Assignments generados para una semana, agrupados por conductor
    pub async fn week_driver_counts(
        &self,
        organization_id: Uuid,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> Result<Vec<(Uuid, i64)>, AppError> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT driver_id, COUNT(*) FROM assignments
            WHERE organization_id = $1 AND date BETWEEN $2 AND $3
              AND driver_id IS NOT NULL
              AND status IN ('scheduled', 'confirmed', 'active', 'completed')
            GROUP BY driver_id
            "#,
        )
        .bind(organization_id)
        .bind(week_start)
        .bind(week_end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
