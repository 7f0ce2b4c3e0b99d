use crate::models::health::{
    DriverHealthSnapshot, DriverHealthState, HealthEventType, HARD_STOP_CAP, MAX_SCORE, MAX_STARS,
};
use crate::utils::errors::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct HealthRepository {
    pool: PgPool,
}

impl HealthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Estado de salud del conductor, creándolo si es la primera vez
    pub async fn get_or_create(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<DriverHealthState, AppError> {
        sqlx::query(
            r#"
            INSERT INTO driver_health_states
                (driver_id, organization_id, score, stars, streak_weeks,
                 assignment_pool_eligible, requires_manager_intervention, updated_at)
            VALUES ($1, $2, 0, 0, 0, true, false, $3)
            ON CONFLICT (driver_id) DO NOTHING
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let state = sqlx::query_as::<_, DriverHealthState>(
            "SELECT * FROM driver_health_states WHERE driver_id = $1 AND organization_id = $2",
        )
        .bind(driver_id)
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(state)
    }

    pub async fn find(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<DriverHealthState>, AppError> {
        let state = sqlx::query_as::<_, DriverHealthState>(
            "SELECT * FROM driver_health_states WHERE driver_id = $1 AND organization_id = $2",
        )
        .bind(driver_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }

    pub async fn list_for_org(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<DriverHealthState>, AppError> {
        let states = sqlx::query_as::<_, DriverHealthState>(
            "SELECT * FROM driver_health_states WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(states)
    }

    /// Insertar un evento en el ledger. La clave de deduplicación hace
    /// que cada evento aporte puntos exactamente una vez aunque el sweep
    /// se re-ejecute: devuelve false si ya estaba aplicado.
    pub async fn insert_event(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        event_type: HealthEventType,
        shift_date: Option<NaiveDate>,
        dedup_key: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO health_events
                (id, organization_id, driver_id, event_type, points, shift_date, dedup_key, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (dedup_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(driver_id)
        .bind(event_type)
        .bind(event_type.points())
        .bind(shift_date)
        .bind(dedup_key)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Aplicar un delta de puntos con la aritmética en SQL: piso 0 y
    /// techo 100, o techo 49 si hay hard-stop vigente.
    pub async fn apply_delta(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        delta: i32,
        hard_stop_active: bool,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let cap = if hard_stop_active { HARD_STOP_CAP } else { MAX_SCORE };
        sqlx::query(
            r#"
            UPDATE driver_health_states
            SET score = LEAST(GREATEST(score + $3, 0), $4), updated_at = $5
            WHERE driver_id = $1 AND organization_id = $2
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(delta)
        .bind(cap)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reset completo por no-show: score 0, estrellas 0, racha 0,
    /// fuera del pool, intervención de manager requerida.
    pub async fn full_reset(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE driver_health_states
            SET score = 0, stars = 0, streak_weeks = 0,
                assignment_pool_eligible = false,
                requires_manager_intervention = true,
                last_score_reset_at = $3, updated_at = $3
            WHERE driver_id = $1 AND organization_id = $2
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard-stop: capa el score en 49 y revoca la elegibilidad. El WHERE
    /// evita mutaciones cuando el estado ya refleja el hard-stop.
    pub async fn enforce_hard_stop(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE driver_health_states
            SET score = LEAST(score, $3), stars = 0, streak_weeks = 0,
                assignment_pool_eligible = false,
                requires_manager_intervention = true,
                last_score_reset_at = $4, updated_at = $4
            WHERE driver_id = $1 AND organization_id = $2
              AND (score > $3 OR assignment_pool_eligible OR NOT requires_manager_intervention)
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(HARD_STOP_CAP)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Semana calificada: racha +1 y estrellas +1 con tope 4. El guard
    /// sobre last_weekly_eval_on hace la evaluación idempotente.
    pub async fn advance_streak(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        week_start: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<DriverHealthState>, AppError> {
        let state = sqlx::query_as::<_, DriverHealthState>(
            r#"
            UPDATE driver_health_states
            SET streak_weeks = streak_weeks + 1,
                stars = LEAST(stars + 1, $3),
                last_weekly_eval_on = $4, updated_at = $5
            WHERE driver_id = $1 AND organization_id = $2
              AND (last_weekly_eval_on IS NULL OR last_weekly_eval_on < $4)
            RETURNING *
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(MAX_STARS)
        .bind(week_start)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }

    /// Semana no calificada: solo marca la semana como evaluada
    pub async fn mark_week_evaluated(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        week_start: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE driver_health_states
            SET last_weekly_eval_on = $3, updated_at = $4
            WHERE driver_id = $1 AND organization_id = $2
              AND (last_weekly_eval_on IS NULL OR last_weekly_eval_on < $3)
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(week_start)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reinstalación manual tras un hard-stop. No restaura score ni
    /// estrellas, solo levanta el bloqueo.
    pub async fn reinstate(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE driver_health_states
            SET assignment_pool_eligible = true,
                requires_manager_intervention = false,
                updated_at = $3
            WHERE driver_id = $1 AND organization_id = $2
              AND requires_manager_intervention
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Eventos de un tipo desde un instante (ventana móvil de hard-stop)
    pub async fn count_events_since(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        event_type: HealthEventType,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM health_events
            WHERE organization_id = $1 AND driver_id = $2
              AND event_type = $3 AND occurred_at >= $4
            "#,
        )
        .bind(organization_id)
        .bind(driver_id)
        .bind(event_type)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Eventos de un tipo con fecha de turno dentro de una semana
    pub async fn count_week_events(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        event_type: HealthEventType,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM health_events
            WHERE organization_id = $1 AND driver_id = $2
              AND event_type = $3 AND shift_date BETWEEN $4 AND $5
            "#,
        )
        .bind(organization_id)
        .bind(driver_id)
        .bind(event_type)
        .bind(week_start)
        .bind(week_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Turnos perdidos (cancelación, auto-drop, no-show) con fecha de
    /// turno dentro de una semana
    pub async fn count_week_misses(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM health_events
            WHERE organization_id = $1 AND driver_id = $2
              AND event_type IN ('auto_drop', 'driver_cancel', 'late_cancel', 'no_show')
              AND shift_date BETWEEN $3 AND $4
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

    /// Snapshot diario inmutable; uno por (conductor, fecha)
    pub async fn insert_snapshot(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        snapshot_date: NaiveDate,
        state: &DriverHealthState,
        hard_stop_active: bool,
        factors: serde_json::Value,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO driver_health_snapshots
                (id, organization_id, driver_id, snapshot_date, score, stars,
                 streak_weeks, hard_stop_active, factors, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (driver_id, snapshot_date) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(driver_id)
        .bind(snapshot_date)
        .bind(state.score)
        .bind(state.stars)
        .bind(state.streak_weeks)
        .bind(hard_stop_active)
        .bind(factors)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Historial de snapshots de un conductor, más reciente primero
    pub async fn snapshots_for_driver(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        limit: i64,
    ) -> Result<Vec<DriverHealthSnapshot>, AppError> {
        let snapshots = sqlx::query_as::<_, DriverHealthSnapshot>(
            r#"
            SELECT * FROM driver_health_snapshots
            WHERE organization_id = $1 AND driver_id = $2
            ORDER BY snapshot_date DESC
            LIMIT $3
            "#,
        )
        .bind(organization_id)
        .bind(driver_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots)
    }
}
