pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod execution;
pub mod liquidity;
pub mod math;
pub mod pools;
pub mod router;
pub mod rpc;

pub use config::{EngineConfig, VenueConfig};
pub use discovery::PoolManager;
pub use error::{
    DiscoveryError, ExecutionError, MathError, PositionError, RouteError,
};
pub use execution::{SwapSigner, SwapTransaction, build_swap_transaction};
pub use liquidity::{
    ConcentratedLiquidityManager, ConcentratedLiquidityPosition, liquidity_for_amounts,
};
pub use pools::{ConcentratedLiquidityPool, ConstantProductPool, Pool, PoolVersion};
pub use router::{Quote, SwapParams, SwapRoute, SwapRouter};
pub use rpc::{CallProvider, HttpRpcClient, TransportError};
