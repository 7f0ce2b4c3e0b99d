use crate::models::metrics::DriverMetrics;
use crate::utils::errors::AppError;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Agregados crudos desde el historial, insumo del recómputo de métricas
#[derive(Debug, Clone, Copy)]
pub struct DriverAggregates {
    pub completed_shifts: i64,
    pub missed_shifts: i64,
    /// Promedio del ratio de entrega sobre turnos completados con
    /// parcels_start > 0; None si no hay ninguno
    pub completion_rate: Option<f64>,
}

pub struct MetricsRepository {
    pool: PgPool,
}

impl MetricsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Agregados de vida del conductor. Los turnos perdidos se cuentan
    /// desde el ledger de eventos y no desde assignments: un slot
    /// cancelado puede ser readjudicado por bidding a otro conductor y
    /// el ledger preserva a quién pertenecía la falta.
    pub async fn aggregates(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<DriverAggregates, AppError> {
        let (completed,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM assignments
            WHERE organization_id = $1 AND driver_id = $2 AND status = 'completed'
            "#,
        )
        .bind(organization_id)
        .bind(driver_id)
        .fetch_one(&self.pool)
        .await?;

        let (missed,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM health_events
            WHERE organization_id = $1 AND driver_id = $2
              AND event_type IN ('auto_drop', 'driver_cancel', 'late_cancel', 'no_show')
            "#,
        )
        .bind(organization_id)
        .bind(driver_id)
        .fetch_one(&self.pool)
        .await?;

        let (completion_rate,): (Option<f64>,) = sqlx::query_as(
            r#"
            SELECT AVG((s.parcels_start - s.parcels_returned + s.excepted_returns)::float8 / s.parcels_start)
            FROM shifts s
            WHERE s.organization_id = $1 AND s.driver_id = $2
              AND s.completed_at IS NOT NULL
              AND s.parcels_start > 0
            "#,
        )
        .bind(organization_id)
        .bind(driver_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DriverAggregates {
            completed_shifts: completed,
            missed_shifts: missed,
            completion_rate,
        })
    }

    /// Ratio de entrega promedio de una semana concreta
    pub async fn week_completion_rate(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> Result<Option<f64>, AppError> {
        let (rate,): (Option<f64>,) = sqlx::query_as(
            r#"
            SELECT AVG((s.parcels_start - s.parcels_returned + s.excepted_returns)::float8 / s.parcels_start)
            FROM shifts s
            JOIN assignments a ON a.id = s.assignment_id
            WHERE s.organization_id = $1 AND s.driver_id = $2
              AND s.completed_at IS NOT NULL
              AND s.parcels_start > 0
              AND a.date BETWEEN $3 AND $4
            "#,
        )
        .bind(organization_id)
        .bind(driver_id)
        .bind(week_start)
        .bind(week_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(rate)
    }

    /// Turnos completados por el conductor en una semana
    pub async fn week_completions(
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
              AND status = 'completed' AND date BETWEEN $3 AND $4
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

    pub async fn upsert(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
        attendance_rate: f64,
        completion_rate: f64,
        completed_shifts: i64,
        total_assigned_shifts: i64,
    ) -> Result<DriverMetrics, AppError> {
        let metrics = sqlx::query_as::<_, DriverMetrics>(
            r#"
            INSERT INTO driver_metrics
                (driver_id, organization_id, attendance_rate, completion_rate,
                 completed_shifts, total_assigned_shifts, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (driver_id)
            DO UPDATE SET attendance_rate = $3, completion_rate = $4,
                          completed_shifts = $5, total_assigned_shifts = $6, updated_at = $7
            RETURNING *
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(attendance_rate)
        .bind(completion_rate)
        .bind(completed_shifts)
        .bind(total_assigned_shifts)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(metrics)
    }

    pub async fn find(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<DriverMetrics>, AppError> {
        let metrics = sqlx::query_as::<_, DriverMetrics>(
            "SELECT * FROM driver_metrics WHERE driver_id = $1 AND organization_id = $2",
        )
        .bind(driver_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(metrics)
    }
}
