//! Per-asset matching engine: a two-sided `Book` with price-time priority
//! matching.
//!
//! Core rules:
//! - Price-time priority matching (best price first, then FIFO)
//! - Partial fills with immediate execution, maker sets the trade price
//! - Self-trade prevention by cancel-oldest-on-collision
//! - LIMIT residuals rest in the book; MARKET residuals are discarded

use crate::price_levels::PriceLevels;
use crate::types::{BookEntry, MatchPrice, Order, OrderType, Side, Trade};
use uuid::Uuid;

/// Central limit order book for a single asset, with separate bid/ask
/// sides. Not thread-safe — the bus adapter owns each `Book` exclusively
/// and never shares it across tasks.
pub struct Book {
    /// Buy orders, highest price first.
    pub bids: PriceLevels,
    /// Sell orders, lowest price first.
    pub asks: PriceLevels,
    next_insertion_seq: u64,
}

impl Book {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self {
            bids: PriceLevels::new(Side::Bid),
            asks: PriceLevels::new(Side::Ask),
            next_insertion_seq: 0,
        }
    }

    /// Returns the current best bid price.
    pub fn best_bid(&self) -> Option<rust_decimal::Decimal> {
        self.bids.best_price()
    }

    /// Returns the current best ask price.
    pub fn best_ask(&self) -> Option<rust_decimal::Decimal> {
        self.asks.best_price()
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_insertion_seq;
        self.next_insertion_seq += 1;
        seq
    }

    /// Processes an incoming order against this book and returns the
    /// trades it produced, in execution order.
    ///
    /// Implements spec §4.2's matching loop: self-trade prevention by
    /// popping (not trading) a resting order from the same agent, maker's
    /// price execution, and LIMIT-rests/MARKET-discards residual handling.
    pub fn process_order(&mut self, order: Order) -> Vec<Trade> {
        match order.side {
            Side::Bid => self.match_against_asks(order),
            Side::Ask => self.match_against_bids(order),
        }
    }

    fn match_against_asks(&mut self, order: Order) -> Vec<Trade> {
        let match_price = MatchPrice::for_order(&order);
        let mut trades = Vec::new();
        let mut residual = order.quantity;

        loop {
            let Some(top) = self.asks.peek_best() else {
                break;
            };

            if top.order.agent_id == order.agent_id {
                self.asks.pop_best();
                continue;
            }

            if !match_price.crosses_ask(top.order.price) {
                break;
            }

            let mut maker = self.asks.pop_best().expect("peeked entry must pop");
            let exec_qty = residual.min(maker.remaining_qty);
            let exec_price = maker.order.price;

            trades.push(Trade {
                id: Uuid::new_v4().to_string(),
                buyer_agent_id: order.agent_id.clone(),
                seller_agent_id: maker.order.agent_id.clone(),
                asset: order.asset,
                price: exec_price,
                quantity: exec_qty,
                timestamp: chrono::Utc::now(),
            });

            residual -= exec_qty;
            maker.remaining_qty -= exec_qty;

            if maker.remaining_qty > 0 {
                self.asks.push_front(maker);
            }

            if residual == 0 {
                break;
            }
        }

        if residual > 0 && order.order_type == OrderType::Limit {
            let seq = self.next_seq();
            let mut resting = order;
            resting.quantity = residual;
            self.bids.push(BookEntry::new(resting, seq));
        }

        trades
    }

    fn match_against_bids(&mut self, order: Order) -> Vec<Trade> {
        let match_price = MatchPrice::for_order(&order);
        let mut trades = Vec::new();
        let mut residual = order.quantity;

        loop {
            let Some(top) = self.bids.peek_best() else {
                break;
            };

            if top.order.agent_id == order.agent_id {
                self.bids.pop_best();
                continue;
            }

            if !match_price.crosses_bid(top.order.price) {
                break;
            }

            let mut maker = self.bids.pop_best().expect("peeked entry must pop");
            let exec_qty = residual.min(maker.remaining_qty);
            let exec_price = maker.order.price;

            trades.push(Trade {
                id: Uuid::new_v4().to_string(),
                buyer_agent_id: maker.order.agent_id.clone(),
                seller_agent_id: order.agent_id.clone(),
                asset: order.asset,
                price: exec_price,
                quantity: exec_qty,
                timestamp: chrono::Utc::now(),
            });

            residual -= exec_qty;
            maker.remaining_qty -= exec_qty;

            if maker.remaining_qty > 0 {
                self.bids.push_front(maker);
            }

            if residual == 0 {
                break;
            }
        }

        if residual > 0 && order.order_type == OrderType::Limit {
            let seq = self.next_seq();
            let mut resting = order;
            resting.quantity = residual;
            self.asks.push(BookEntry::new(resting, seq));
        }

        trades
    }
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Asset;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn order(
        id: &str,
        agent: &str,
        side: Side,
        order_type: OrderType,
        price: rust_decimal::Decimal,
        qty: u64,
        t: i64,
    ) -> Order {
        Order {
            id: id.to_string(),
            agent_id: agent.to_string(),
            asset: Asset::Wood,
            side,
            order_type,
            price,
            quantity: qty,
            timestamp: Utc.timestamp_opt(t, 0).unwrap(),
        }
    }

    /// S1 — simple cross.
    #[test]
    fn simple_cross() {
        let mut book = Book::new();
        book.process_order(order(
            "a1", "A", Side::Ask, OrderType::Limit, dec!(5.00), 10, 1,
        ));
        let trades = book.process_order(order(
            "b1", "B", Side::Bid, OrderType::Limit, dec!(5.00), 10, 2,
        ));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].buyer_agent_id, "B");
        assert_eq!(trades[0].seller_agent_id, "A");
        assert_eq!(trades[0].quantity, 10);
        assert_eq!(trades[0].price, dec!(5.00));
        assert!(book.asks.is_empty());
        assert!(book.bids.is_empty());
    }

    /// S2 — partial fill, residual rests.
    #[test]
    fn partial_fill_residual_rests() {
        let mut book = Book::new();
        book.process_order(order(
            "a1", "A", Side::Ask, OrderType::Limit, dec!(5.00), 10, 1,
        ));
        let trades = book.process_order(order(
            "b1", "B", Side::Bid, OrderType::Limit, dec!(5.00), 4, 2,
        ));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 4);
        assert_eq!(book.asks.total_len(), 1);
        let remaining = book.asks.peek_best().unwrap();
        assert_eq!(remaining.order.id, "a1");
        assert_eq!(remaining.remaining_qty, 6);
    }

    /// S3 — walk the book with price improvement.
    #[test]
    fn walk_the_book_with_improvement() {
        let mut book = Book::new();
        book.process_order(order(
            "a1", "A", Side::Ask, OrderType::Limit, dec!(5.00), 5, 1,
        ));
        book.process_order(order(
            "a2", "B", Side::Ask, OrderType::Limit, dec!(5.50), 5, 2,
        ));
        let trades = book.process_order(order(
            "b1", "C", Side::Bid, OrderType::Limit, dec!(6.00), 10, 3,
        ));

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].seller_agent_id, "A");
        assert_eq!(trades[0].quantity, 5);
        assert_eq!(trades[0].price, dec!(5.00));
        assert_eq!(trades[1].seller_agent_id, "B");
        assert_eq!(trades[1].quantity, 5);
        assert_eq!(trades[1].price, dec!(5.50));
        assert!(book.asks.is_empty());
        assert!(book.bids.is_empty());
        // C paid less than its limit on both trades.
        assert!(trades.iter().all(|t| t.price <= dec!(6.00)));
    }

    /// S4 — time priority at equal price.
    #[test]
    fn time_priority_at_equal_price() {
        let mut book = Book::new();
        book.process_order(order(
            "x", "X", Side::Bid, OrderType::Limit, dec!(5.00), 5, 1,
        ));
        book.process_order(order(
            "y", "Y", Side::Bid, OrderType::Limit, dec!(5.00), 5, 2,
        ));
        let trades = book.process_order(order(
            "z", "Z", Side::Ask, OrderType::Limit, dec!(5.00), 5, 3,
        ));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].buyer_agent_id, "X");
        let remaining = book.bids.peek_best().unwrap();
        assert_eq!(remaining.order.id, "y");
    }

    /// S5 — MARKET order consumes then vanishes.
    #[test]
    fn market_order_discards_residual() {
        let mut book = Book::new();
        book.process_order(order(
            "a1", "A", Side::Ask, OrderType::Limit, dec!(5.00), 3, 1,
        ));
        let trades = book.process_order(order(
            "m1",
            "M",
            Side::Bid,
            OrderType::Market,
            dec!(0),
            10,
            2,
        ));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 3);
        assert!(book.asks.is_empty());
        assert!(book.bids.is_empty());
    }

    /// S6 — self-trade prevention.
    #[test]
    fn self_trade_prevention_cancels_resting_order() {
        let mut book = Book::new();
        book.process_order(order(
            "a1", "A", Side::Ask, OrderType::Limit, dec!(5.00), 5, 1,
        ));
        let trades = book.process_order(order(
            "b1", "A", Side::Bid, OrderType::Limit, dec!(5.00), 5, 2,
        ));

        assert!(trades.is_empty());
        assert!(book.asks.is_empty());
        assert_eq!(book.bids.total_len(), 1);
        let resting = book.bids.peek_best().unwrap();
        assert_eq!(resting.order.id, "b1");
        assert_eq!(resting.remaining_qty, 5);
    }

    #[test]
    fn market_order_on_empty_book_produces_no_trades() {
        let mut book = Book::new();
        let trades = book.process_order(order(
            "m1",
            "M",
            Side::Ask,
            OrderType::Market,
            dec!(0),
            10,
            1,
        ));
        assert!(trades.is_empty());
        assert!(book.bids.is_empty());
        assert!(book.asks.is_empty());
    }

    #[test]
    fn non_crossing_orders_rest_on_both_sides() {
        let mut book = Book::new();
        book.process_order(order(
            "a1", "A", Side::Ask, OrderType::Limit, dec!(5.10), 10, 1,
        ));
        let trades = book.process_order(order(
            "b1", "B", Side::Bid, OrderType::Limit, dec!(5.00), 10, 2,
        ));
        assert!(trades.is_empty());
        assert_eq!(book.best_bid(), Some(dec!(5.00)));
        assert_eq!(book.best_ask(), Some(dec!(5.10)));
    }
}
