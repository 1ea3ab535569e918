use crate::constants::{V2_SWAP_GAS, V3_SWAP_GAS, tick_spacing_for_fee_bps};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

/// AMM family of a venue or pool.
#[derive(
    Copy, Clone, Debug, Display, PartialEq, Hash, Eq, EnumString, VariantNames, Deserialize,
    Serialize, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PoolVersion {
    /// Constant-product reserves (`reserve0 * reserve1 == k`).
    V2,
    /// Concentrated liquidity over tick ranges.
    V3,
}

/// One constant-product pool instance, read fresh from chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstantProductPool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub fee_bps: u16,
    /// Synthetic sqrt price derived from reserves so both pool families
    /// expose the same price representation.
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub dex_id: String,
}

/// One concentrated-liquidity pool instance, read fresh from chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcentratedLiquidityPool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee_bps: u16,
    pub tick_spacing: i32,
    pub liquidity: u128,
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub dex_id: String,
}

/// A discovered liquidity pool. Constructed per discovery call, never
/// mutated, discarded once the request completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pool {
    ConstantProduct(ConstantProductPool),
    ConcentratedLiquidity(ConcentratedLiquidityPool),
}

impl Pool {
    pub fn version(&self) -> PoolVersion {
        match self {
            Pool::ConstantProduct(_) => PoolVersion::V2,
            Pool::ConcentratedLiquidity(_) => PoolVersion::V3,
        }
    }

    pub fn address(&self) -> Address {
        match self {
            Pool::ConstantProduct(p) => p.address,
            Pool::ConcentratedLiquidity(p) => p.address,
        }
    }

    pub fn token0(&self) -> Address {
        match self {
            Pool::ConstantProduct(p) => p.token0,
            Pool::ConcentratedLiquidity(p) => p.token0,
        }
    }

    pub fn token1(&self) -> Address {
        match self {
            Pool::ConstantProduct(p) => p.token1,
            Pool::ConcentratedLiquidity(p) => p.token1,
        }
    }

    pub fn fee_bps(&self) -> u16 {
        match self {
            Pool::ConstantProduct(p) => p.fee_bps,
            Pool::ConcentratedLiquidity(p) => p.fee_bps,
        }
    }

    pub fn sqrt_price_x96(&self) -> U256 {
        match self {
            Pool::ConstantProduct(p) => p.sqrt_price_x96,
            Pool::ConcentratedLiquidity(p) => p.sqrt_price_x96,
        }
    }

    pub fn tick(&self) -> i32 {
        match self {
            Pool::ConstantProduct(p) => p.tick,
            Pool::ConcentratedLiquidity(p) => p.tick,
        }
    }

    pub fn dex_id(&self) -> &str {
        match self {
            Pool::ConstantProduct(p) => &p.dex_id,
            Pool::ConcentratedLiquidity(p) => &p.dex_id,
        }
    }

    /// Expected tick spacing for this pool's fee tier, when the tier is one
    /// the engine quotes.
    pub fn expected_tick_spacing(&self) -> Option<i32> {
        tick_spacing_for_fee_bps(self.fee_bps())
    }

    /// Flat per-family gas estimate used for route ranking.
    pub fn gas_estimate(&self) -> u64 {
        match self.version() {
            PoolVersion::V2 => V2_SWAP_GAS,
            PoolVersion::V3 => V3_SWAP_GAS,
        }
    }

    /// A pool without usable liquidity must never become a routing candidate.
    pub fn has_liquidity(&self) -> bool {
        match self {
            Pool::ConstantProduct(p) => !p.reserve0.is_zero() && !p.reserve1.is_zero(),
            Pool::ConcentratedLiquidity(p) => p.liquidity > 0,
        }
    }

    /// True when `token_in` is `token0`, i.e. the swap pushes the price down.
    pub fn is_zero_for_one(&self, token_in: Address) -> bool {
        token_in == self.token0()
    }

    /// The opposite leg of the pair, or `None` when `token` is not in it.
    pub fn other_token(&self, token: Address) -> Option<Address> {
        if token == self.token0() {
            Some(self.token1())
        } else if token == self.token1() {
            Some(self.token0())
        } else {
            None
        }
    }
}
