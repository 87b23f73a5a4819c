//! Multi-asset limit order book matching engine.
//!
//! Core features:
//! - Price-time priority matching per asset (best price first, then FIFO)
//! - Partial fills with immediate execution, maker sets the trade price
//! - Self-trade prevention by cancel-oldest-on-collision
//! - Exact decimal price arithmetic, no binary float anywhere in the core

pub mod book;
pub mod exchange;
pub mod price_levels;
pub mod types;

pub use book::Book;
pub use exchange::Exchange;
pub use price_levels::PriceLevels;
pub use types::{Asset, BookEntry, MatchPrice, Order, OrderType, Side, Trade};
