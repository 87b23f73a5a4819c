//! Redis pub/sub bus adapter: the ingress/egress state machine of spec §4.4.
//!
//! The adapter subscribes to `market:orders` (and the optional
//! `system:status` pause switch), routes every valid order through the
//! `Exchange`, and publishes resulting trades. Connection loss moves the
//! adapter into a backoff-and-retry loop rather than tearing down the
//! process — only an internal invariant violation is fatal.

use std::time::Duration;

use futures::StreamExt;
use orderbook::{Asset, Exchange};
use rand::Rng;
use redis::AsyncCommands;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::EngineError;
use crate::messages::{OrderMessage, SystemStatus, TradeMessage};

const ORDERS_CHANNEL: &str = "market:orders";
const STATUS_CHANNEL: &str = "system:status";
const TICKER_CHANNEL: &str = "market:ticker";

fn last_trade_key(asset: Asset) -> String {
    format!("market:last_trade:{asset}")
}

fn price_key(asset: Asset) -> String {
    format!("market:price:{asset}")
}

/// Coarse states the adapter moves through; logged on every transition,
/// not matched on directly (the `run`/`subscribed_loop` control flow below
/// is the actual state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdapterState {
    Connecting,
    Subscribed,
    Error,
    Draining,
}

/// Bounded exponential backoff with jitter for transport reconnects.
/// base 100ms, factor 2, cap 5s, +/-20% jitter (spec §4.4).
struct Backoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl Backoff {
    fn new() -> Self {
        Self {
            base: Duration::from_millis(100),
            cap: Duration::from_secs(5),
            attempt: 0,
        }
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_delay(&mut self) -> Duration {
        let exp_millis = self.base.as_millis().saturating_mul(1u128 << self.attempt.min(16));
        let capped_millis = exp_millis.min(self.cap.as_millis()) as f64;
        self.attempt += 1;

        let jitter = rand::thread_rng().gen_range(-0.2..=0.2);
        let jittered = (capped_millis * (1.0 + jitter)).max(0.0);
        Duration::from_millis(jittered as u64)
    }
}

/// Drives one engine process end to end: connect, subscribe, consume
/// orders, publish trades, reconnect on transport failure.
pub struct BusAdapter {
    redis_url: String,
    exchange: Exchange,
    status: SystemStatus,
}

impl BusAdapter {
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            exchange: Exchange::new(),
            status: SystemStatus::Running,
        }
    }

    /// Runs until `shutdown` is set to `true` or an `InternalInvariant`
    /// error is raised. A `TransportError` never escapes this function —
    /// it is retried internally with backoff.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), EngineError> {
        let client = redis::Client::open(self.redis_url.clone())?;
        let mut backoff = Backoff::new();
        let mut state = AdapterState::Connecting;

        loop {
            if *shutdown.borrow() {
                state = AdapterState::Draining;
                info!(?state, "shutdown requested, not reconnecting");
                return Ok(());
            }

            match self.connect_and_subscribe(&client).await {
                Ok((pubsub, publish_conn)) => {
                    backoff.reset();
                    state = AdapterState::Subscribed;
                    info!(?state, channel = ORDERS_CHANNEL, "subscribed to order bus");

                    match self.subscribed_loop(pubsub, publish_conn, &mut shutdown).await {
                        Ok(()) => {
                            state = AdapterState::Draining;
                            info!(?state, "drained cleanly");
                            return Ok(());
                        }
                        Err(EngineError::TransportError(e)) => {
                            state = AdapterState::Error;
                            error!(?state, error = %e, "transport error, will reconnect");
                        }
                        Err(other) => return Err(other),
                    }
                }
                Err(e) => {
                    state = AdapterState::Error;
                    error!(?state, error = %e, "failed to connect to bus");
                }
            }

            let delay = backoff.next_delay();
            warn!(delay_ms = delay.as_millis() as u64, "backing off before reconnect");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn connect_and_subscribe(
        &self,
        client: &redis::Client,
    ) -> Result<(redis::aio::PubSub, redis::aio::MultiplexedConnection), EngineError> {
        let pubsub_conn = client.get_async_connection().await?;
        let mut pubsub = pubsub_conn.into_pubsub();
        pubsub.subscribe(ORDERS_CHANNEL).await?;
        pubsub.subscribe(STATUS_CHANNEL).await?;

        let publish_conn = client.get_multiplexed_async_connection().await?;

        Ok((pubsub, publish_conn))
    }

    /// Consumes messages until the pubsub stream closes (transport error)
    /// or a shutdown is requested. Returns `Err(InternalInvariant(_))` if
    /// the book is ever found crossed after processing an order.
    async fn subscribed_loop(
        &mut self,
        mut pubsub: redis::aio::PubSub,
        mut publish_conn: redis::aio::MultiplexedConnection,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), EngineError> {
        let mut messages = pubsub.on_message();

        loop {
            tokio::select! {
                maybe_msg = messages.next() => {
                    match maybe_msg {
                        Some(msg) => {
                            if let Err(e) = self.handle_message(msg, &mut publish_conn).await {
                                if matches!(e, EngineError::InternalInvariant(_)) {
                                    return Err(e);
                                }
                                warn!(error = %e, "dropping message after handling error");
                            }
                        }
                        None => {
                            return Err(EngineError::TransportError(redis::RedisError::from((
                                redis::ErrorKind::IoError,
                                "pubsub stream closed",
                            ))));
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_ok() && *shutdown.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn handle_message(
        &mut self,
        msg: redis::Msg,
        publish_conn: &mut redis::aio::MultiplexedConnection,
    ) -> Result<(), EngineError> {
        let channel = msg.get_channel_name().to_string();
        let payload: String = msg.get_payload()?;

        match channel.as_str() {
            ORDERS_CHANNEL => {
                if self.status == SystemStatus::Paused {
                    return Ok(());
                }
                self.process_order_payload(&payload, publish_conn).await
            }
            STATUS_CHANNEL => {
                match SystemStatus::parse(&payload) {
                    Some(status) => {
                        info!(?status, "system status changed");
                        self.status = status;
                    }
                    None => warn!(payload, "ignoring unrecognized system:status payload"),
                }
                Ok(())
            }
            other => {
                warn!(channel = other, "message on unrecognized channel, dropping");
                Ok(())
            }
        }
    }

    async fn process_order_payload(
        &mut self,
        payload: &str,
        publish_conn: &mut redis::aio::MultiplexedConnection,
    ) -> Result<(), EngineError> {
        let order = match serde_json::from_str::<OrderMessage>(payload) {
            Ok(msg) => match msg.validate() {
                Ok(order) => order,
                Err(e) => {
                    warn!(error = %e, payload, "dropping invalid order");
                    return Ok(());
                }
            },
            Err(e) => {
                warn!(error = %e, payload, "dropping malformed order payload");
                return Ok(());
            }
        };

        let asset = order.asset;
        let trades = self.exchange.process_order(order);
        self.check_book_invariants(asset)?;

        for trade in &trades {
            self.publish_trade(publish_conn, trade).await;
        }

        Ok(())
    }

    fn check_book_invariants(&self, asset: Asset) -> Result<(), EngineError> {
        let book = self.exchange.book(asset);
        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            if bid >= ask {
                return Err(EngineError::InternalInvariant(format!(
                    "crossed book for {asset}: bid {bid} >= ask {ask}"
                )));
            }
        }
        Ok(())
    }

    async fn publish_trade(&self, conn: &mut redis::aio::MultiplexedConnection, trade: &orderbook::Trade) {
        let message = TradeMessage::from(trade);
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, trade_id = %trade.id, "failed to serialize trade");
                return;
            }
        };

        if let Err(e) = conn.publish::<_, _, ()>(TICKER_CHANNEL, &json).await {
            error!(error = %e, channel = TICKER_CHANNEL, "failed to publish trade");
        }

        let last_trade_key = last_trade_key(trade.asset);
        if let Err(e) = conn.set::<_, _, ()>(&last_trade_key, &json).await {
            error!(error = %e, key = %last_trade_key, "failed to record last trade");
        }

        let price_key = price_key(trade.asset);
        if let Err(e) = conn.set::<_, _, ()>(&price_key, trade.price.to_string()).await {
            error!(error = %e, key = %price_key, "failed to record last price");
        }
    }
}
