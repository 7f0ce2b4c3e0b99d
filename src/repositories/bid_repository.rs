use crate::models::bid::{Bid, BidMode, BidStatus, BidTrigger, BidWindow};
use crate::utils::errors::AppError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Pujador pendiente con los insumos del score competitivo
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BidderStats {
    pub bid_id: Uuid,
    pub driver_id: Uuid,
    pub bid_at: DateTime<Utc>,
    pub health_score: i32,
    pub route_completions: i64,
    pub driver_since: DateTime<Utc>,
    pub route_preferred: bool,
}

pub struct BidRepository {
    pool: PgPool,
}

impl BidRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Abrir una ventana sobre un assignment. El INSERT condicional
    /// mantiene el invariante de una sola ventana abierta por assignment:
    /// devuelve None si ya hay una abierta.
    pub async fn open_window(
        &self,
        organization_id: Uuid,
        assignment_id: Uuid,
        mode: BidMode,
        trigger: BidTrigger,
        closes_at: DateTime<Utc>,
        pay_bonus_percent: Option<Decimal>,
    ) -> Result<Option<BidWindow>, AppError> {
        let window = sqlx::query_as::<_, BidWindow>(
            r#"
            INSERT INTO bid_windows (id, organization_id, assignment_id, mode, trigger, status, closes_at, pay_bonus_percent, created_at)
            SELECT $1, $2, $3, $4, $5, 'open', $6, $7, $8
            WHERE NOT EXISTS (
                SELECT 1 FROM bid_windows
                WHERE assignment_id = $3 AND status = 'open'
            )
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(assignment_id)
        .bind(mode)
        .bind(trigger)
        .bind(closes_at)
        .bind(pay_bonus_percent)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(window)
    }

    pub async fn find_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<BidWindow>, AppError> {
        let window = sqlx::query_as::<_, BidWindow>(
            "SELECT * FROM bid_windows WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(window)
    }

    /// Un bid por (window, driver); devuelve None si el conductor ya pujó
    pub async fn place_bid(
        &self,
        organization_id: Uuid,
        window_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Bid>, AppError> {
        let bid = sqlx::query_as::<_, Bid>(
            r#"
            INSERT INTO bids (id, organization_id, window_id, driver_id, status, bid_at)
            SELECT $1, $2, $3, $4, 'pending', $5
            WHERE EXISTS (
                SELECT 1 FROM bid_windows w
                WHERE w.id = $3 AND w.status = 'open' AND w.closes_at > $5
            )
            ON CONFLICT (window_id, driver_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(window_id)
        .bind(driver_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bid)
    }

    /// Ventanas competitivas abiertas cuyo cierre ya pasó
    pub async fn due_competitive(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<BidWindow>, AppError> {
        let windows = sqlx::query_as::<_, BidWindow>(
            r#"
            SELECT * FROM bid_windows
            WHERE organization_id = $1 AND status = 'open'
              AND mode = 'competitive' AND closes_at <= $2
            ORDER BY closes_at
            "#,
        )
        .bind(organization_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(windows)
    }

    /// Ventanas instant/emergency vencidas sin claim
    pub async fn expired_first_accept(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<BidWindow>, AppError> {
        let windows = sqlx::query_as::<_, BidWindow>(
            r#"
            SELECT * FROM bid_windows
            WHERE organization_id = $1 AND status = 'open'
              AND mode IN ('instant', 'emergency') AND closes_at <= $2
            ORDER BY closes_at
            "#,
        )
        .bind(organization_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(windows)
    }

    /// Bids pendientes de una ventana con los insumos del score:
    /// salud actual, completions en la ruta, antigüedad y preferencia.
    pub async fn pending_bidders(
        &self,
        organization_id: Uuid,
        window_id: Uuid,
        route_id: Uuid,
    ) -> Result<Vec<BidderStats>, AppError> {
        let bidders = sqlx::query_as::<_, BidderStats>(
            r#"
            SELECT b.id AS bid_id,
                   b.driver_id,
                   b.bid_at,
                   COALESCE(h.score, 0) AS health_score,
                   COALESCE((
                       SELECT COUNT(*) FROM assignments a
                       WHERE a.driver_id = b.driver_id AND a.route_id = $3 AND a.status = 'completed'
                   ), 0) AS route_completions,
                   d.created_at AS driver_since,
                   COALESCE($3 = ANY(p.preferred_route_ids), false) AS route_preferred
            FROM bids b
            JOIN drivers d ON d.id = b.driver_id
            LEFT JOIN driver_health_states h ON h.driver_id = b.driver_id
            LEFT JOIN driver_preferences p ON p.driver_id = b.driver_id
            WHERE b.window_id = $2 AND b.organization_id = $1 AND b.status = 'pending'
            "#,
        )
        .bind(organization_id)
        .bind(window_id)
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bidders)
    }

    /// Persistir el score computado de un bid
    pub async fn set_score(
        &self,
        organization_id: Uuid,
        bid_id: Uuid,
        score: f64,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE bids SET score = $3 WHERE id = $1 AND organization_id = $2")
            .bind(bid_id)
            .bind(organization_id)
            .bind(score)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Cambiar una ventana abierta de competitive a instant (cierre sin
    /// bids o todos los pujadores en conflicto)
    pub async fn transition_to_instant(
        &self,
        organization_id: Uuid,
        window_id: Uuid,
        new_closes_at: DateTime<Utc>,
    ) -> Result<Option<BidWindow>, AppError> {
        let window = sqlx::query_as::<_, BidWindow>(
            r#"
            UPDATE bid_windows
            SET mode = 'instant', closes_at = $3
            WHERE id = $1 AND organization_id = $2
              AND status = 'open' AND mode = 'competitive'
            RETURNING *
            "#,
        )
        .bind(window_id)
        .bind(organization_id)
        .bind(new_closes_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(window)
    }

    /// Cerrar una ventana vencida sin resolver
    pub async fn close_unresolved(
        &self,
        organization_id: Uuid,
        window_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE bid_windows SET status = 'closed'
            WHERE id = $1 AND organization_id = $2 AND status = 'open'
            "#,
        )
        .bind(window_id)
        .bind(organization_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// CAS de resolución dentro de una transacción: solo quien pasa de
    /// open a resolved es dueño de la adjudicación.
    pub async fn resolve_window_tx(
        conn: &mut PgConnection,
        organization_id: Uuid,
        window_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE bid_windows
            SET status = 'resolved', resolved_at = $3
            WHERE id = $1 AND organization_id = $2 AND status = 'open'
            "#,
        )
        .bind(window_id)
        .bind(organization_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Marcar el bid ganador dentro de la transacción de resolución
    pub async fn mark_won_tx(
        conn: &mut PgConnection,
        organization_id: Uuid,
        bid_id: Uuid,
        score: f64,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE bids SET status = 'won', score = $3 WHERE id = $1 AND organization_id = $2",
        )
        .bind(bid_id)
        .bind(organization_id)
        .bind(score)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Marcar perdedores a todos los bids pendientes de la ventana que
    /// no son del ganador
    pub async fn mark_losers_tx(
        conn: &mut PgConnection,
        organization_id: Uuid,
        window_id: Uuid,
        winning_driver_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE bids SET status = 'lost'
            WHERE window_id = $1 AND organization_id = $2
              AND driver_id != $3 AND status = 'pending'
            "#,
        )
        .bind(window_id)
        .bind(organization_id)
        .bind(winning_driver_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Registrar el claim ganador de una ventana instant/emergency como
    /// bid ganado, para el historial
    pub async fn record_claim_tx(
        conn: &mut PgConnection,
        organization_id: Uuid,
        window_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO bids (id, organization_id, window_id, driver_id, status, bid_at)
            VALUES ($1, $2, $3, $4, 'won', $5)
            ON CONFLICT (window_id, driver_id) DO UPDATE SET status = 'won'
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(window_id)
        .bind(driver_id)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Bids perdedores de una ventana, para las notificaciones bid_lost
    pub async fn losing_bids(
        &self,
        organization_id: Uuid,
        window_id: Uuid,
    ) -> Result<Vec<Bid>, AppError> {
        let bids = sqlx::query_as::<_, Bid>(
            r#"
            SELECT * FROM bids
            WHERE window_id = $1 AND organization_id = $2 AND status = 'lost'
            "#,
        )
        .bind(window_id)
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bids)
    }
}
