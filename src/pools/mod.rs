pub mod pool;

pub use pool::{ConcentratedLiquidityPool, ConstantProductPool, Pool, PoolVersion};
