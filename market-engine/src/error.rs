//! Error taxonomy for the bus adapter (spec §7).
//!
//! Each variant maps to exactly one policy from spec §7's table:
//! `MalformedMessage`/`InvalidOrder` are logged and dropped without
//! stopping the ingress loop, `TransportError` triggers reconnect with
//! backoff, `InternalInvariant` is fatal, and `Cancelled` ends the loop
//! cleanly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("payload could not be parsed as an order: {0}")]
    MalformedMessage(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("transport error: {0}")]
    TransportError(#[from] redis::RedisError),

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    #[error("shutdown requested")]
    Cancelled,
}
