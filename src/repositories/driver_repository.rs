use crate::models::driver::{Driver, DriverPreference};
use crate::utils::errors::AppError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Fila de candidato para el scheduler: conductor elegible que prefiere
/// el día y la ruta, con sus métricas para el ranking.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleCandidate {
    pub driver_id: Uuid,
    pub weekly_cap: i32,
    pub route_completions: i64,
    pub completion_rate: f64,
    pub attendance_rate: f64,
}

pub struct DriverRepository {
    pool: PgPool,
}

impl DriverRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        full_name: String,
        phone: Option<String>,
    ) -> Result<Driver, AppError> {
        let driver = sqlx::query_as::<_, Driver>(
            r#"
            INSERT INTO drivers (id, organization_id, full_name, phone, weekly_cap, flagged, active, created_at)
            VALUES ($1, $2, $3, $4, 4, false, true, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(full_name)
        .bind(phone)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(driver)
    }

    pub async fn find_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Driver>, AppError> {
        let driver = sqlx::query_as::<_, Driver>(
            "SELECT * FROM drivers WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(driver)
    }

    pub async fn deactivate(&self, organization_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE drivers SET active = false WHERE id = $1 AND organization_id = $2 AND active",
        )
        .bind(id)
        .bind(organization_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Candidatos para un slot (ruta, día de semana): prefieren el día y
    /// la ruta, están activos, sin flag y dentro del pool.
    pub async fn schedulable_candidates(
        &self,
        organization_id: Uuid,
        weekday: i16,
        route_id: Uuid,
    ) -> Result<Vec<ScheduleCandidate>, AppError> {
        let candidates = sqlx::query_as::<_, ScheduleCandidate>(
            r#"
            SELECT d.id AS driver_id,
                   d.weekly_cap,
                   COALESCE((
                       SELECT COUNT(*) FROM assignments a
                       WHERE a.driver_id = d.id AND a.route_id = $3 AND a.status = 'completed'
                   ), 0) AS route_completions,
                   COALESCE(m.completion_rate, 1.0) AS completion_rate,
                   COALESCE(m.attendance_rate, 1.0) AS attendance_rate
            FROM drivers d
            JOIN driver_preferences p ON p.driver_id = d.id
            LEFT JOIN driver_metrics m ON m.driver_id = d.id
            LEFT JOIN driver_health_states h ON h.driver_id = d.id
            WHERE d.organization_id = $1
              AND d.active
              AND NOT d.flagged
              AND COALESCE(h.assignment_pool_eligible, true)
              AND $2 = ANY(p.weekdays)
              AND $3 = ANY(p.preferred_route_ids)
            "#,
        )
        .bind(organization_id)
        .bind(weekday)
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(candidates)
    }

    /// Conductores elegibles para el fan-out de ventanas de bidding
    pub async fn eligible_driver_ids(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT d.id FROM drivers d
            LEFT JOIN driver_health_states h ON h.driver_id = d.id
            WHERE d.organization_id = $1
              AND d.active
              AND NOT d.flagged
              AND COALESCE(h.assignment_pool_eligible, true)
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Conductor elegible para pujar/reclamar. Devuelve la razón del
    /// rechazo para el error de política.
    pub async fn eligibility_reason(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<&'static str>, AppError> {
        let row: Option<(bool, bool, bool)> = sqlx::query_as(
            r#"
            SELECT d.active, d.flagged, COALESCE(h.assignment_pool_eligible, true)
            FROM drivers d
            LEFT JOIN driver_health_states h ON h.driver_id = d.id
            WHERE d.id = $1 AND d.organization_id = $2
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Err(AppError::NotFound(format!(
                "Driver with id '{}' not found",
                driver_id
            ))),
            Some((false, _, _)) => Ok(Some("driver is deactivated")),
            Some((_, true, _)) => Ok(Some("driver is flagged")),
            Some((_, _, false)) => Ok(Some("driver is not pool-eligible")),
            Some((true, false, true)) => Ok(None),
        }
    }

    pub async fn set_flagged(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        flagged: bool,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        // al quitar el flag se limpia la marca de cap reducido, para que
        // un flag futuro pueda volver a aplicar la reducción
        let result = sqlx::query(
            r#"
            UPDATE drivers
            SET flagged = $3,
                flagged_at = CASE WHEN $3 THEN $4 ELSE NULL END,
                cap_reduced_at = CASE WHEN $3 THEN cap_reduced_at ELSE NULL END
            WHERE id = $1 AND organization_id = $2 AND flagged != $3
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(flagged)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_weekly_cap(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        cap: i32,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE drivers SET weekly_cap = $3 WHERE id = $1 AND organization_id = $2 AND weekly_cap != $3",
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(cap)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Conductores flagueados cuyo período de gracia venció y aún no
    /// recibieron la reducción de cap
    pub async fn flagged_past_grace(
        &self,
        organization_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Driver>, AppError> {
        let drivers = sqlx::query_as::<_, Driver>(
            r#"
            SELECT * FROM drivers
            WHERE organization_id = $1
              AND flagged
              AND flagged_at <= $2
              AND cap_reduced_at IS NULL
            "#,
        )
        .bind(organization_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(drivers)
    }

    /// Reducción de cap por flag: -1 con piso 1, una sola vez por flag
    pub async fn reduce_cap_for_flag(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE drivers
            SET weekly_cap = GREATEST(weekly_cap - 1, 1), cap_reduced_at = $3
            WHERE id = $1 AND organization_id = $2 AND flagged AND cap_reduced_at IS NULL
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_preferences(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<DriverPreference>, AppError> {
        let prefs = sqlx::query_as::<_, DriverPreference>(
            "SELECT * FROM driver_preferences WHERE driver_id = $1 AND organization_id = $2",
        )
        .bind(driver_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prefs)
    }

    pub async fn upsert_preferences(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        weekdays: Vec<i16>,
        preferred_route_ids: Vec<Uuid>,
    ) -> Result<DriverPreference, AppError> {
        let prefs = sqlx::query_as::<_, DriverPreference>(
            r#"
            INSERT INTO driver_preferences (id, organization_id, driver_id, weekdays, preferred_route_ids, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (driver_id)
            DO UPDATE SET weekdays = $4, preferred_route_ids = $5, updated_at = $6
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(driver_id)
        .bind(weekdays)
        .bind(preferred_route_ids)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(prefs)
    }
}
