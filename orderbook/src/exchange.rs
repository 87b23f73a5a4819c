//! Exchange router: maps each `Asset` to its own `Book` and provides the
//! single `process_order` entry point (spec §4.3).
//!
//! Unlike the teacher's `DashMap<String, RwLock<OrderBook>>` (built for
//! concurrent REST handlers hitting arbitrary symbols), `Asset` is a
//! closed, small enumeration and the bus adapter is the only caller —
//! there is no concurrent writer, so a plain `HashMap` behind `&mut self`
//! is sufficient and matches spec §5's "no locking needed" contract.

use crate::book::Book;
use crate::types::{Asset, Order, Trade};
use std::collections::HashMap;

/// Owns one `Book` per asset for the lifetime of the engine process.
pub struct Exchange {
    books: HashMap<Asset, Book>,
}

impl Exchange {
    /// Creates an exchange with an empty book for every known asset.
    pub fn new() -> Self {
        let books = Asset::ALL.into_iter().map(|a| (a, Book::new())).collect();
        Self { books }
    }

    /// Routes an order to its asset's book and returns the trades it
    /// produced. No cross-asset matching ever occurs.
    pub fn process_order(&mut self, order: Order) -> Vec<Trade> {
        self.books
            .get_mut(&order.asset)
            .expect("every Asset variant has a book")
            .process_order(order)
    }

    /// Borrows the book for an asset, e.g. for best-bid/ask inspection.
    pub fn book(&self, asset: Asset) -> &Book {
        self.books.get(&asset).expect("every Asset variant has a book")
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderType, Side};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(id: &str, agent: &str, asset: Asset, side: Side, price: rust_decimal::Decimal, qty: u64) -> Order {
        Order {
            id: id.to_string(),
            agent_id: agent.to_string(),
            asset,
            side,
            order_type: OrderType::Limit,
            price,
            quantity: qty,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn routes_to_the_correct_asset_book() {
        let mut exchange = Exchange::new();
        exchange.process_order(order("1", "A", Asset::Wood, Side::Ask, dec!(5.00), 10));
        let trades = exchange.process_order(order("2", "B", Asset::Wood, Side::Bid, dec!(5.00), 10));
        assert_eq!(trades.len(), 1);

        // A resting order on a different asset must not be touched.
        assert!(exchange.book(Asset::Gold).best_ask().is_none());
    }

    #[test]
    fn every_asset_starts_with_an_empty_book() {
        let exchange = Exchange::new();
        for asset in Asset::ALL {
            assert!(exchange.book(asset).best_bid().is_none());
            assert!(exchange.book(asset).best_ask().is_none());
        }
    }
}
