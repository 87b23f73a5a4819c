use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tradeable asset. Closed enumeration, extensible at build time only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Wood,
    Food,
    Iron,
    Gold,
    Dolar,
}

impl Asset {
    /// All assets the exchange knows about, in a stable order.
    pub const ALL: [Asset; 5] = [
        Asset::Wood,
        Asset::Food,
        Asset::Iron,
        Asset::Gold,
        Asset::Dolar,
    ];
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Asset::Wood => "WOOD",
            Asset::Food => "FOOD",
            Asset::Iron => "IRON",
            Asset::Gold => "GOLD",
            Asset::Dolar => "DOLAR",
        };
        f.write_str(s)
    }
}

/// BID = intention to buy, ASK = intention to sell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Bid,
    Ask,
}

/// LIMIT rests in the book if unfilled; MARKET discards any residual.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    #[default]
    Limit,
    Market,
}

/// An immutable, already-validated order. The only way to produce one is
/// through `OrderMessage::validate` at the bus boundary (see the
/// market-engine crate) — nothing in this crate constructs an `Order` that
/// skips validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub agent_id: String,
    pub asset: Asset,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Price for LIMIT orders; ignored for MARKET orders. Always > 0.
    pub price: Decimal,
    /// Always > 0.
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
}

/// An immutable, engine-assigned record of an executed match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub buyer_agent_id: String,
    pub seller_agent_id: String,
    pub asset: Asset,
    pub price: Decimal,
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
}

/// The two-price contract (spec §4.2) that subsumes LIMIT and MARKET
/// orders into one crossing test, without inventing a magic decimal value
/// for +infinity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPrice {
    Finite(Decimal),
    PositiveInfinity,
}

impl MatchPrice {
    pub fn for_order(order: &Order) -> MatchPrice {
        match (order.order_type, order.side) {
            (OrderType::Limit, _) => MatchPrice::Finite(order.price),
            (OrderType::Market, Side::Bid) => MatchPrice::PositiveInfinity,
            (OrderType::Market, Side::Ask) => MatchPrice::Finite(Decimal::ZERO),
        }
    }

    /// True iff an incoming BID at this match price crosses a resting ask
    /// at `ask_price` (`match_price >= ask_price`).
    pub fn crosses_ask(&self, ask_price: Decimal) -> bool {
        match self {
            MatchPrice::PositiveInfinity => true,
            MatchPrice::Finite(p) => *p >= ask_price,
        }
    }

    /// True iff an incoming ASK at this match price crosses a resting bid
    /// at `bid_price` (`match_price <= bid_price`).
    pub fn crosses_bid(&self, bid_price: Decimal) -> bool {
        match self {
            MatchPrice::PositiveInfinity => false,
            MatchPrice::Finite(p) => *p <= bid_price,
        }
    }
}

/// A resting order wrapped with its remaining quantity and the sequence
/// number it was inserted under, so ties on (price, timestamp) resolve by
/// insertion order (spec §4.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookEntry {
    pub order: Order,
    pub remaining_qty: u64,
    pub insertion_seq: u64,
}

impl BookEntry {
    pub fn new(order: Order, insertion_seq: u64) -> Self {
        let remaining_qty = order.quantity;
        Self {
            order,
            remaining_qty,
            insertion_seq,
        }
    }
}
