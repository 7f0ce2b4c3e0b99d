use crate::models::route::{Route, Warehouse};
use crate::utils::errors::AppError;
use chrono::{NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct RouteRepository {
    pool: PgPool,
}

impl RouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_warehouse(
        &self,
        organization_id: Uuid,
        name: String,
    ) -> Result<Warehouse, AppError> {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            INSERT INTO warehouses (id, organization_id, name, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(warehouse)
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        warehouse_id: Uuid,
        name: String,
        start_time: NaiveTime,
    ) -> Result<Route, AppError> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            INSERT INTO routes (id, organization_id, warehouse_id, name, start_time, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(warehouse_id)
        .bind(name)
        .bind(start_time)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(route)
    }

    pub async fn find_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Route>, AppError> {
        let route = sqlx::query_as::<_, Route>(
            "SELECT * FROM routes WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(route)
    }

    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<Route>, AppError> {
        let routes = sqlx::query_as::<_, Route>(
            "SELECT * FROM routes WHERE organization_id = $1 ORDER BY name",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(routes)
    }
}
