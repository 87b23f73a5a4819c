//! Wire DTOs for the `market:orders` / `market:ticker` JSON schemas (spec §6).
//!
//! `OrderMessage` is the only place loosely-typed external data enters the
//! system — it is the "guarded dynamic surface" the core `orderbook` crate
//! never sees directly. `validate` is where ids/timestamps get assigned
//! when the sender omits them and where malformed/invalid orders are
//! rejected before they ever reach `Exchange::process_order`.

use chrono::{DateTime, Utc};
use orderbook::{Asset, Order, OrderType, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Inbound order intent as published on `market:orders`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderMessage {
    pub id: Option<String>,
    pub agent_id: String,
    pub asset: Asset,
    pub side: Side,
    #[serde(rename = "type", default)]
    pub order_type: OrderType,
    pub price: Decimal,
    pub quantity: i64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl OrderMessage {
    /// Validates and normalizes this wire message into a core `Order`.
    ///
    /// Rejects: non-positive price on a LIMIT order, non-positive
    /// quantity. Assigns a fresh id/timestamp when the sender omitted
    /// them, matching spec §6's "engine assigns if absent."
    pub fn validate(self) -> Result<Order, EngineError> {
        if self.order_type == OrderType::Limit && self.price <= Decimal::ZERO {
            return Err(EngineError::InvalidOrder(format!(
                "LIMIT order price must be > 0, got {}",
                self.price
            )));
        }
        if self.quantity <= 0 {
            return Err(EngineError::InvalidOrder(format!(
                "quantity must be > 0, got {}",
                self.quantity
            )));
        }

        Ok(Order {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            agent_id: self.agent_id,
            asset: self.asset,
            side: self.side,
            order_type: self.order_type,
            price: self.price,
            quantity: self.quantity as u64,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        })
    }
}

/// Outbound trade record as published on `market:ticker` /
/// `market:last_trade`.
#[derive(Debug, Clone, Serialize)]
pub struct TradeMessage {
    pub id: String,
    pub buyer_agent_id: String,
    pub seller_agent_id: String,
    pub asset: Asset,
    pub price: String,
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
}

impl From<&orderbook::Trade> for TradeMessage {
    fn from(trade: &orderbook::Trade) -> Self {
        Self {
            id: trade.id.clone(),
            buyer_agent_id: trade.buyer_agent_id.clone(),
            seller_agent_id: trade.seller_agent_id.clone(),
            asset: trade.asset,
            price: trade.price.to_string(),
            quantity: trade.quantity,
            timestamp: trade.timestamp,
        }
    }
}

/// Optional `system:status` pause switch (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    Running,
    Paused,
}

impl SystemStatus {
    pub fn parse(payload: &str) -> Option<SystemStatus> {
        match payload.trim() {
            "RUNNING" => Some(SystemStatus::Running),
            "PAUSED" => Some(SystemStatus::Paused),
            _ => None,
        }
    }
}
