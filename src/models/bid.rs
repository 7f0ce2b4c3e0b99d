//! Modelos de BidWindow y Bid
//!
//! Una ventana por assignment abierto como máximo. El modo se decide al
//! crear la ventana según el tiempo restante al turno; las ventanas de
//! emergencia siempre son first-accept y pueden llevar bonus de pago.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Modo de mercado - mapea al ENUM bid_mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "bid_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BidMode {
    Competitive,
    Instant,
    Emergency,
}

impl BidMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidMode::Competitive => "competitive",
            BidMode::Instant => "instant",
            BidMode::Emergency => "emergency",
        }
    }
}

/// Qué abrió la ventana - mapea al ENUM bid_trigger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "bid_trigger", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BidTrigger {
    Cancellation,
    AutoDrop,
    NoShow,
    Manual,
}

/// Estado de la ventana - mapea al ENUM bid_window_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "bid_window_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BidWindowStatus {
    Open,
    Resolved,
    Closed,
}

/// Estado de un bid - mapea al ENUM bid_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "bid_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Won,
    Lost,
}

/// BidWindow - mapea exactamente a la tabla bid_windows
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BidWindow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub assignment_id: Uuid,
    pub mode: BidMode,
    pub trigger: BidTrigger,
    pub status: BidWindowStatus,
    pub closes_at: DateTime<Utc>,
    pub pay_bonus_percent: Option<Decimal>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Bid - mapea exactamente a la tabla bids
///
/// Un bid por (window, driver); el score queda NULL hasta la resolución
/// competitiva.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bid {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub window_id: Uuid,
    pub driver_id: Uuid,
    pub score: Option<f64>,
    pub status: BidStatus,
    pub bid_at: DateTime<Utc>,
}

/// Request para pujar en una ventana competitiva
#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub driver_id: Uuid,
}

/// Request para reclamar una ventana instant/emergency
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub driver_id: Uuid,
}

/// Request para forzar una ventana de emergencia manual
#[derive(Debug, Deserialize)]
pub struct ForceEmergencyRequest {
    pub pay_bonus_percent: Option<Decimal>,
}

/// Response de ventana para la API
#[derive(Debug, Serialize)]
pub struct BidWindowResponse {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub mode: BidMode,
    pub trigger: BidTrigger,
    pub status: BidWindowStatus,
    pub closes_at: DateTime<Utc>,
    pub pay_bonus_percent: Option<Decimal>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<BidWindow> for BidWindowResponse {
    fn from(w: BidWindow) -> Self {
        Self {
            id: w.id,
            assignment_id: w.assignment_id,
            mode: w.mode,
            trigger: w.trigger,
            status: w.status,
            closes_at: w.closes_at,
            pay_bonus_percent: w.pay_bonus_percent,
            resolved_at: w.resolved_at,
        }
    }
}

/// Response de bid para la API
#[derive(Debug, Serialize)]
pub struct BidResponse {
    pub id: Uuid,
    pub window_id: Uuid,
    pub driver_id: Uuid,
    pub score: Option<f64>,
    pub status: BidStatus,
    pub bid_at: DateTime<Utc>,
}

impl From<Bid> for BidResponse {
    fn from(b: Bid) -> Self {
        Self {
            id: b.id,
            window_id: b.window_id,
            driver_id: b.driver_id,
            score: b.score,
            status: b.status,
            bid_at: b.bid_at,
        }
    }
}
