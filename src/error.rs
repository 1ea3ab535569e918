use crate::rpc::TransportError;
use std::time::Duration;

/// Failures of the fixed-point math primitives.
///
/// These indicate an impossible on-chain state or a programming error; the
/// affected computation is aborted rather than returning a wrong number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("multiplication overflow")]
    MultiplicationOverflow,
    #[error("sqrt price is zero")]
    ZeroPrice,
    #[error("liquidity is zero")]
    ZeroLiquidity,
    #[error("computed sqrt price would be non-positive")]
    PriceUnderflow,
}

/// Discovery-level failures. Per-venue problems are contained and logged;
/// this only surfaces when the aggregate request is meaningless.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("all venue probes failed on transport: {0}")]
    Transport(#[source] TransportError),
}

/// Routing failures. "No route found" is not an error: `find_best_route`
/// returns `Ok(None)` so callers can tell it apart from retryable failures.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("request deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("slippage tolerance {0}% is out of range (0..=100)")]
    InvalidSlippage(f64),
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Execution failures. Signer and broadcast errors are surfaced unmodified;
/// the router never retries a failed broadcast.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("no configured venue named {0:?}")]
    UnknownVenue(String),
    #[error("token {0} is not part of the route path")]
    TokenNotInRoute(alloy_primitives::Address),
    #[error("signer rejected transaction: {0}")]
    Signer(#[source] eyre::Report),
}

/// Position-manager capability errors. `NotImplemented` is an expected,
/// pattern-matchable outcome, not an exception.
#[derive(Debug, thiserror::Error)]
pub enum PositionError {
    #[error("position minting via the position manager is not implemented")]
    NotImplemented,
    #[error("tick range [{lower}, {upper}] is invalid")]
    InvalidTickRange { lower: i32, upper: i32 },
    #[error(transparent)]
    Math(#[from] MathError),
}
