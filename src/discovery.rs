use crate::config::{EngineConfig, VenueConfig};
use crate::constants::fee_bps_to_pool_fee;
use crate::error::DiscoveryError;
use crate::math::sqrt_price_x96_from_reserves;
use crate::pools::{ConcentratedLiquidityPool, ConstantProductPool, Pool, PoolVersion};
use crate::rpc::{CallProvider, TransportError};
use alloy_primitives::aliases::{I24, U24};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, sol};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

sol! {
    interface IUniswapV3Factory {
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }

    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    interface IUniswapV3Pool {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function fee() external view returns (uint24);
        function tickSpacing() external view returns (int24);
        function liquidity() external view returns (uint128);
        function slot0() external view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked);
    }

    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }
}

/// Discovers candidate pools across configured venues and fee tiers.
///
/// Stateless between calls: each request performs fresh on-chain reads and
/// the resulting pools are discarded once the request completes.
pub struct PoolManager {
    provider: Arc<dyn CallProvider>,
    config: Arc<EngineConfig>,
}

impl PoolManager {
    pub fn new(provider: Arc<dyn CallProvider>, config: Arc<EngineConfig>) -> Self {
        Self { provider, config }
    }

    /// Fans out over configured venues x fee tiers, fetches pool state and
    /// returns every usable pool for the pair.
    ///
    /// A failed probe of one venue/tier never aborts the others. The whole
    /// call only fails when every probe died on transport, so callers can
    /// distinguish "no pools exist" from "we could not ask".
    pub async fn discover_pools(
        &self,
        token_a: Address,
        token_b: Address,
    ) -> Result<Vec<Pool>, DiscoveryError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_rpc));
        let rpc_timeout = self.config.rpc_timeout();
        let mut join_set = JoinSet::new();

        for venue in &self.config.venues {
            for &fee_bps in &venue.fee_tiers_bps {
                let provider = Arc::clone(&self.provider);
                let venue = venue.clone();
                let semaphore = Arc::clone(&semaphore);
                join_set.spawn(async move {
                    let _permit =
                        semaphore.acquire_owned().await.expect("semaphore never closed");
                    let venue_name = venue.name.clone();
                    let result =
                        probe_venue_tier(provider, venue, fee_bps, token_a, token_b, rpc_timeout)
                            .await;
                    (venue_name, fee_bps, result)
                });
            }
        }

        let mut pools = Vec::new();
        let mut errors = Vec::new();
        let mut any_answered = false;

        while let Some(joined) = join_set.join_next().await {
            let (venue_name, fee_bps, result) = match joined {
                Ok(output) => output,
                Err(e) => {
                    warn!("discovery probe task failed to join: {e}");
                    continue;
                }
            };
            match result {
                Ok(Some(pool)) => {
                    any_answered = true;
                    debug!(
                        "discovered {} pool {:?} at {} bps",
                        venue_name,
                        pool.address(),
                        fee_bps
                    );
                    pools.push(pool);
                }
                Ok(None) => any_answered = true,
                Err(e) if e.is_venue_error() => {
                    any_answered = true;
                    warn!("venue {venue_name} tier {fee_bps} bps unavailable: {e}");
                }
                Err(e) => {
                    warn!("probe of venue {venue_name} tier {fee_bps} bps failed: {e}");
                    errors.push(e);
                }
            }
        }

        if !any_answered {
            if let Some(last) = errors.pop() {
                return Err(DiscoveryError::Transport(last));
            }
        }

        info!(
            "discovered {} candidate pool(s) for {token_a:#x}/{token_b:#x}",
            pools.len()
        );
        Ok(pools)
    }
}

async fn timed_call(
    provider: &dyn CallProvider,
    to: Address,
    data: Bytes,
    rpc_timeout: Duration,
) -> Result<Bytes, TransportError> {
    tokio::time::timeout(rpc_timeout, provider.call(to, data))
        .await
        .map_err(|_| TransportError::Timeout(rpc_timeout))?
}

fn decode_err(e: alloy_sol_types::Error) -> TransportError {
    TransportError::MalformedResponse(e.to_string())
}

async fn probe_venue_tier(
    provider: Arc<dyn CallProvider>,
    venue: VenueConfig,
    fee_bps: u16,
    token_a: Address,
    token_b: Address,
    rpc_timeout: Duration,
) -> Result<Option<Pool>, TransportError> {
    match venue.version {
        PoolVersion::V3 => {
            probe_v3(provider.as_ref(), &venue, fee_bps, token_a, token_b, rpc_timeout).await
        }
        PoolVersion::V2 => {
            probe_v2(provider.as_ref(), &venue, fee_bps, token_a, token_b, rpc_timeout).await
        }
    }
}

async fn probe_v3(
    provider: &dyn CallProvider,
    venue: &VenueConfig,
    fee_bps: u16,
    token_a: Address,
    token_b: Address,
    rpc_timeout: Duration,
) -> Result<Option<Pool>, TransportError> {
    let lookup = IUniswapV3Factory::getPoolCall {
        tokenA: token_a,
        tokenB: token_b,
        fee: U24::from(fee_bps_to_pool_fee(fee_bps)),
    };
    let ret = timed_call(provider, venue.factory, lookup.abi_encode().into(), rpc_timeout).await?;
    let pool_address =
        IUniswapV3Factory::getPoolCall::abi_decode_returns(&ret).map_err(decode_err)?;
    if pool_address.is_zero() {
        return Ok(None);
    }

    let ret = timed_call(
        provider,
        pool_address,
        IUniswapV3Pool::token0Call {}.abi_encode().into(),
        rpc_timeout,
    )
    .await?;
    let token0 = IUniswapV3Pool::token0Call::abi_decode_returns(&ret).map_err(decode_err)?;

    let ret = timed_call(
        provider,
        pool_address,
        IUniswapV3Pool::token1Call {}.abi_encode().into(),
        rpc_timeout,
    )
    .await?;
    let token1 = IUniswapV3Pool::token1Call::abi_decode_returns(&ret).map_err(decode_err)?;

    let ret = timed_call(
        provider,
        pool_address,
        IUniswapV3Pool::feeCall {}.abi_encode().into(),
        rpc_timeout,
    )
    .await?;
    let pool_fee = IUniswapV3Pool::feeCall::abi_decode_returns(&ret).map_err(decode_err)?;
    if pool_fee.to::<u32>() != fee_bps_to_pool_fee(fee_bps) {
        warn!(
            "pool {pool_address:#x} reports fee {} but was looked up at {} bps, skipping",
            pool_fee, fee_bps
        );
        return Ok(None);
    }

    let ret = timed_call(
        provider,
        pool_address,
        IUniswapV3Pool::tickSpacingCall {}.abi_encode().into(),
        rpc_timeout,
    )
    .await?;
    let tick_spacing =
        IUniswapV3Pool::tickSpacingCall::abi_decode_returns(&ret).map_err(decode_err)?;

    let ret = timed_call(
        provider,
        pool_address,
        IUniswapV3Pool::liquidityCall {}.abi_encode().into(),
        rpc_timeout,
    )
    .await?;
    let liquidity = IUniswapV3Pool::liquidityCall::abi_decode_returns(&ret).map_err(decode_err)?;
    if liquidity == 0 {
        debug!("pool {pool_address:#x} has zero liquidity, skipping");
        return Ok(None);
    }

    let ret = timed_call(
        provider,
        pool_address,
        IUniswapV3Pool::slot0Call {}.abi_encode().into(),
        rpc_timeout,
    )
    .await?;
    let slot0 = IUniswapV3Pool::slot0Call::abi_decode_returns(&ret).map_err(decode_err)?;
    let sqrt_price_x96 = U256::from(slot0.sqrtPriceX96);
    if sqrt_price_x96.is_zero() {
        debug!("pool {pool_address:#x} is uninitialized (zero price), skipping");
        return Ok(None);
    }

    let pool = Pool::ConcentratedLiquidity(ConcentratedLiquidityPool {
        address: pool_address,
        token0,
        token1,
        fee_bps,
        tick_spacing: tick_to_i32(tick_spacing),
        liquidity,
        sqrt_price_x96,
        tick: tick_to_i32(slot0.tick),
        dex_id: venue.name.clone(),
    });
    if pool.expected_tick_spacing() != Some(tick_to_i32(tick_spacing)) {
        warn!(
            "pool {pool_address:#x} tick spacing {} does not match its {} bps fee tier",
            tick_to_i32(tick_spacing),
            fee_bps
        );
    }
    Ok(Some(pool))
}

async fn probe_v2(
    provider: &dyn CallProvider,
    venue: &VenueConfig,
    fee_bps: u16,
    token_a: Address,
    token_b: Address,
    rpc_timeout: Duration,
) -> Result<Option<Pool>, TransportError> {
    let lookup = IUniswapV2Factory::getPairCall { tokenA: token_a, tokenB: token_b };
    let ret = timed_call(provider, venue.factory, lookup.abi_encode().into(), rpc_timeout).await?;
    let pair_address =
        IUniswapV2Factory::getPairCall::abi_decode_returns(&ret).map_err(decode_err)?;
    if pair_address.is_zero() {
        return Ok(None);
    }

    let ret = timed_call(
        provider,
        pair_address,
        IUniswapV2Pair::token0Call {}.abi_encode().into(),
        rpc_timeout,
    )
    .await?;
    let token0 = IUniswapV2Pair::token0Call::abi_decode_returns(&ret).map_err(decode_err)?;

    let ret = timed_call(
        provider,
        pair_address,
        IUniswapV2Pair::token1Call {}.abi_encode().into(),
        rpc_timeout,
    )
    .await?;
    let token1 = IUniswapV2Pair::token1Call::abi_decode_returns(&ret).map_err(decode_err)?;

    let ret = timed_call(
        provider,
        pair_address,
        IUniswapV2Pair::getReservesCall {}.abi_encode().into(),
        rpc_timeout,
    )
    .await?;
    let reserves = IUniswapV2Pair::getReservesCall::abi_decode_returns(&ret).map_err(decode_err)?;
    let reserve0 = U256::from(reserves.reserve0);
    let reserve1 = U256::from(reserves.reserve1);
    if reserve0.is_zero() || reserve1.is_zero() {
        debug!("pair {pair_address:#x} has an empty reserve, skipping");
        return Ok(None);
    }

    let sqrt_price_x96 = match sqrt_price_x96_from_reserves(reserve0, reserve1) {
        Ok(price) => price,
        Err(e) => {
            warn!("pair {pair_address:#x} price derivation failed ({e}), skipping");
            return Ok(None);
        }
    };

    Ok(Some(Pool::ConstantProduct(ConstantProductPool {
        address: pair_address,
        token0,
        token1,
        reserve0,
        reserve1,
        fee_bps,
        sqrt_price_x96,
        tick: tick_from_reserves(reserve0, reserve1),
        dex_id: venue.name.clone(),
    })))
}

/// An int24 always fits an i32.
fn tick_to_i32(tick: I24) -> i32 {
    i32::try_from(tick).unwrap_or_default()
}

/// `floor(log(reserve1 / reserve0) / log(1.0001))`, the tick index of the
/// constant-product marked price.
fn tick_from_reserves(reserve0: U256, reserve1: U256) -> i32 {
    let r0 = u256_approx_f64(reserve0);
    let r1 = u256_approx_f64(reserve1);
    if r0 == 0.0 || r1 == 0.0 {
        return 0;
    }
    ((r1 / r0).ln() / 1.0001f64.ln()).floor() as i32
}

pub(crate) fn u256_approx_f64(value: U256) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(0.0)
}
