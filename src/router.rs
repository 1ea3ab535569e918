use crate::config::{EngineConfig, VenueConfig};
use crate::constants::Q96;
use crate::discovery::{PoolManager, u256_approx_f64};
use crate::error::{MathError, RouteError};
use crate::execution::{SwapSigner, SwapTransaction, build_swap_transaction};
use crate::math::mul_div;
use crate::pools::{Pool, PoolVersion};
use crate::rpc::{CallProvider, TransportError};
use alloy_primitives::aliases::U24;
use alloy_primitives::utils::{format_units, parse_units};
use alloy_primitives::{Address, B256, Bytes, U160, U256};
use alloy_sol_types::{SolCall, sol};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

sol! {
    interface IQuoter {
        function quoteExactInputSingle(address tokenIn, address tokenOut, uint24 fee, uint256 amountIn, uint160 sqrtPriceLimitX96) external returns (uint256 amountOut);
    }

    interface IUniswapV2Router {
        function getAmountsOut(uint256 amountIn, address[] memory path) external view returns (uint256[] memory amounts);
    }

    interface IERC20 {
        function decimals() external view returns (uint8);
    }
}

/// Percentages are carried as 1e6 fixed-point numbers until the final
/// conversion to f64, so spot and effective prices compare on one scale.
const PRICE_SCALE: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);
const BPS_DENOMINATOR: U256 = U256::from_limbs([10_000, 0, 0, 0]);

/// A fully-quoted single-pool route. `amount_out` is the slippage-adjusted
/// minimum the caller should accept; `expected_out` is the raw quote.
#[derive(Debug, Clone)]
pub struct SwapRoute {
    pub pool: Pool,
    pub path: [Address; 2],
    pub amount_in: U256,
    pub amount_out: U256,
    pub expected_out: U256,
    pub gas_estimate: u64,
    pub price_impact_pct: f64,
    pub fee_bps: u16,
    pub dex_id: String,
}

/// Caller-supplied execution parameters for a routed swap.
#[derive(Debug, Clone)]
pub struct SwapParams {
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub recipient: Address,
    /// Absolute unix timestamp in seconds after which the swap reverts.
    pub deadline: U256,
    pub sqrt_price_limit_x96: Option<U256>,
    pub slippage_tolerance_pct: f64,
}

/// Human-boundary quote: amounts cross as decimal strings scaled by the
/// tokens' on-chain `decimals()`.
#[derive(Debug, Clone)]
pub struct Quote {
    pub route: SwapRoute,
    pub amount_out: String,
    pub price_impact_pct: f64,
    pub gas_estimate: u64,
    pub dex_id: String,
}

struct PoolQuote {
    pool: Pool,
    amount_out: U256,
    price_impact_pct: f64,
}

/// Quotes every discovered pool for a pair and picks the route with the best
/// gas-adjusted output.
pub struct SwapRouter {
    provider: Arc<dyn CallProvider>,
    config: Arc<EngineConfig>,
    pool_manager: PoolManager,
}

impl SwapRouter {
    pub fn new(provider: Arc<dyn CallProvider>, config: Arc<EngineConfig>) -> Self {
        let pool_manager = PoolManager::new(Arc::clone(&provider), Arc::clone(&config));
        Self { provider, config, pool_manager }
    }

    /// Finds the single best pool to swap `amount_in` of `token_in` into
    /// `token_out`. `Ok(None)` means no venue can serve the pair, which is a
    /// normal outcome and distinct from a transport failure.
    pub async fn find_best_route(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        slippage_pct: f64,
    ) -> Result<Option<SwapRoute>, RouteError> {
        let deadline = self.config.request_deadline();
        tokio::time::timeout(
            deadline,
            self.find_best_route_inner(token_in, token_out, amount_in, slippage_pct),
        )
        .await
        .map_err(|_| RouteError::DeadlineExceeded(deadline))?
    }

    async fn find_best_route_inner(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        slippage_pct: f64,
    ) -> Result<Option<SwapRoute>, RouteError> {
        if amount_in.is_zero() {
            return Err(RouteError::InvalidAmount("amount_in is zero".to_string()));
        }
        if !(0.0..=100.0).contains(&slippage_pct) || !slippage_pct.is_finite() {
            return Err(RouteError::InvalidSlippage(slippage_pct));
        }

        let pools = self.pool_manager.discover_pools(token_in, token_out).await?;
        if pools.is_empty() {
            info!("no pools found for {token_in:#x}/{token_out:#x}");
            return Ok(None);
        }

        let quotes = self.quote_pools(pools, token_in, amount_in).await;
        if quotes.is_empty() {
            info!("no pool produced a usable quote for {token_in:#x}/{token_out:#x}");
            return Ok(None);
        }

        let gas_price_wei = self.config.gas_price_wei;
        let best = quotes
            .into_iter()
            .max_by(|a, b| {
                let ea = effective_output(a.amount_out, a.pool.gas_estimate(), gas_price_wei);
                let eb = effective_output(b.amount_out, b.pool.gas_estimate(), gas_price_wei);
                // tie-break on lower gas
                ea.cmp(&eb)
                    .then_with(|| b.pool.gas_estimate().cmp(&a.pool.gas_estimate()))
            })
            .expect("non-empty quote set");

        let min_out = apply_slippage(best.amount_out, slippage_pct)?;
        info!(
            "best route for {token_in:#x}/{token_out:#x}: {} pool {:?}, out {} (min {})",
            best.pool.dex_id(),
            best.pool.address(),
            best.amount_out,
            min_out
        );

        Ok(Some(SwapRoute {
            path: [token_in, token_out],
            amount_in,
            amount_out: min_out,
            expected_out: best.amount_out,
            gas_estimate: best.pool.gas_estimate(),
            price_impact_pct: best.price_impact_pct,
            fee_bps: best.pool.fee_bps(),
            dex_id: best.pool.dex_id().to_string(),
            pool: best.pool,
        }))
    }

    /// Quotes `amount_in` through every candidate pool concurrently. Pools
    /// whose quote fails are dropped with a warning; only successes rank.
    async fn quote_pools(
        &self,
        pools: Vec<Pool>,
        token_in: Address,
        amount_in: U256,
    ) -> Vec<PoolQuote> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_rpc));
        let rpc_timeout = self.config.rpc_timeout();
        let mut join_set = JoinSet::new();

        for pool in pools {
            let Some(venue) = self.config.venue(pool.dex_id()).cloned() else {
                warn!("pool {:?} references unknown venue {:?}", pool.address(), pool.dex_id());
                continue;
            };
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                quote_pool(provider.as_ref(), &venue, &pool, token_in, amount_in, rpc_timeout)
                    .await
                    .map(|amount_out| (pool, amount_out))
            });
        }

        let mut quotes = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!("quote task failed to join: {e}");
                    continue;
                }
            };
            match result {
                Ok((pool, amount_out)) => {
                    if amount_out.is_zero() {
                        debug!("pool {:?} quoted zero output, dropping", pool.address());
                        continue;
                    }
                    match price_impact_pct(&pool, token_in, amount_in, amount_out) {
                        Ok(price_impact_pct) => {
                            quotes.push(PoolQuote { pool, amount_out, price_impact_pct });
                        }
                        Err(e) => {
                            warn!("pool {:?} price impact failed ({e}), dropping", pool.address());
                        }
                    }
                }
                Err(e) => warn!("pool quote failed: {e}"),
            }
        }
        quotes
    }

    /// Decimal-string boundary around `find_best_route`: amounts in and out
    /// are scaled by each token's on-chain `decimals()`.
    pub async fn get_quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: &str,
        slippage_pct: f64,
    ) -> Result<Option<Quote>, RouteError> {
        let decimals_in = self.token_decimals(token_in).await?;
        let decimals_out = self.token_decimals(token_out).await?;

        let amount_in = parse_units(amount_in, decimals_in)
            .map_err(|e| RouteError::InvalidAmount(e.to_string()))?
            .get_absolute();

        let Some(route) =
            self.find_best_route(token_in, token_out, amount_in, slippage_pct).await?
        else {
            return Ok(None);
        };

        let amount_out = format_units(route.amount_out, decimals_out)
            .map_err(|e| RouteError::InvalidAmount(e.to_string()))?;

        Ok(Some(Quote {
            amount_out,
            price_impact_pct: route.price_impact_pct,
            gas_estimate: route.gas_estimate,
            dex_id: route.dex_id.clone(),
            route,
        }))
    }

    /// Builds venue calldata for a routed swap and submits it through the
    /// caller's signer. No retry: a failed broadcast surfaces unmodified.
    pub async fn execute_swap(
        &self,
        route: &SwapRoute,
        params: &SwapParams,
        signer: &dyn SwapSigner,
    ) -> Result<B256, crate::error::ExecutionError> {
        let venue = self
            .config
            .venue(&route.dex_id)
            .ok_or_else(|| crate::error::ExecutionError::UnknownVenue(route.dex_id.clone()))?;
        let tx = build_swap_transaction(route, params, venue, self.config.wrapped_native)?;
        submit(signer, tx).await
    }

    /// Default execution parameters for a routed swap: tokens and amount
    /// taken from the route, deadline set `tx_deadline` ahead of now. The
    /// route's `amount_out` already reflects the slippage tolerance.
    pub fn swap_params(
        &self,
        route: &SwapRoute,
        recipient: Address,
        slippage_pct: f64,
    ) -> SwapParams {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        SwapParams {
            token_in: route.path[0],
            token_out: route.path[1],
            amount_in: route.amount_in,
            recipient,
            deadline: U256::from((now + self.config.tx_deadline()).as_secs()),
            sqrt_price_limit_x96: None,
            slippage_tolerance_pct: slippage_pct,
        }
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, TransportError> {
        let data: Bytes = IERC20::decimalsCall {}.abi_encode().into();
        let ret = tokio::time::timeout(self.config.rpc_timeout(), self.provider.call(token, data))
            .await
            .map_err(|_| TransportError::Timeout(self.config.rpc_timeout()))??;
        IERC20::decimalsCall::abi_decode_returns(&ret)
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))
    }
}

async fn submit(
    signer: &dyn SwapSigner,
    tx: SwapTransaction,
) -> Result<B256, crate::error::ExecutionError> {
    signer
        .sign_and_send(tx)
        .await
        .map_err(crate::error::ExecutionError::Signer)
}

async fn quote_pool(
    provider: &dyn CallProvider,
    venue: &VenueConfig,
    pool: &Pool,
    token_in: Address,
    amount_in: U256,
    rpc_timeout: Duration,
) -> Result<U256, TransportError> {
    let Some(token_out) = pool.other_token(token_in) else {
        return Err(TransportError::MalformedResponse(format!(
            "token {token_in:#x} is not in pool {:#x}",
            pool.address()
        )));
    };
    match pool.version() {
        PoolVersion::V3 => {
            let Some(quoter) = venue.quoter else {
                return Err(TransportError::MalformedResponse(format!(
                    "venue {:?} has no quoter",
                    venue.name
                )));
            };
            let call = IQuoter::quoteExactInputSingleCall {
                tokenIn: token_in,
                tokenOut: token_out,
                fee: U24::from(crate::constants::fee_bps_to_pool_fee(pool.fee_bps())),
                amountIn: amount_in,
                sqrtPriceLimitX96: U160::ZERO,
            };
            let ret = timed_call(provider, quoter, call.abi_encode().into(), rpc_timeout).await?;
            IQuoter::quoteExactInputSingleCall::abi_decode_returns(&ret)
                .map_err(|e| TransportError::MalformedResponse(e.to_string()))
        }
        PoolVersion::V2 => {
            let call = IUniswapV2Router::getAmountsOutCall {
                amountIn: amount_in,
                path: vec![token_in, token_out],
            };
            let ret =
                timed_call(provider, venue.router, call.abi_encode().into(), rpc_timeout).await?;
            let amounts = IUniswapV2Router::getAmountsOutCall::abi_decode_returns(&ret)
                .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
            amounts.last().copied().ok_or_else(|| {
                TransportError::MalformedResponse("getAmountsOut returned no amounts".to_string())
            })
        }
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

/// `amount_out` minus the gas cost of the swap denominated in wei, floored at
/// zero. Comparing routes on this instead of raw output lets a slightly worse
/// quote win when it is much cheaper to execute.
pub fn effective_output(amount_out: U256, gas_estimate: u64, gas_price_wei: u64) -> U256 {
    let gas_cost = U256::from(gas_estimate) * U256::from(gas_price_wei);
    amount_out.saturating_sub(gas_cost)
}

/// Reduces `amount_out` by the slippage tolerance, in whole basis points.
/// The adjusted amount never exceeds the input.
pub fn apply_slippage(amount_out: U256, slippage_pct: f64) -> Result<U256, MathError> {
    let bps = (slippage_pct * 100.0).round() as u64;
    let bps = bps.min(10_000);
    mul_div(amount_out, U256::from(10_000 - bps), BPS_DENOMINATOR)
}

/// Relative deviation of the executed price from the pool's marked price,
/// in percent.
///
/// Instead of collapsing both prices onto one small fixed-point scale (which
/// underflows for pairs whose raw price is far from 1, e.g. any
/// 18-vs-6-decimal pair), the marked price is applied to `amount_in` first:
/// the deviation is `|spot_out - amount_out| / spot_out`, computed entirely
/// in U256 with 512-bit intermediates.
pub fn price_impact_pct(
    pool: &Pool,
    token_in: Address,
    amount_in: U256,
    amount_out: U256,
) -> Result<f64, MathError> {
    let sqrt_price = pool.sqrt_price_x96();
    if sqrt_price.is_zero() {
        return Err(MathError::ZeroPrice);
    }
    if amount_in.is_zero() {
        return Err(MathError::DivisionByZero);
    }

    // fee-free output at the marked price: amount_in * sqrtP^2 / Q192 when
    // selling token0, amount_in * Q192 / sqrtP^2 when selling token1
    let spot_out = if pool.is_zero_for_one(token_in) {
        mul_div(mul_div(amount_in, sqrt_price, Q96)?, sqrt_price, Q96)?
    } else {
        mul_div(mul_div(amount_in, Q96, sqrt_price)?, Q96, sqrt_price)?
    };
    if spot_out.is_zero() {
        return Err(MathError::ZeroPrice);
    }

    let diff = spot_out.abs_diff(amount_out);
    let ratio = mul_div(diff, PRICE_SCALE, spot_out)?;

    // ratio is diff/spot_out in 1e6 units; 1e4 of those is one percent
    Ok(u256_approx_f64(ratio) / 10_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::pool::tests::{test_v2_pool, test_v3_pool};
    use crate::rpc::MockCallProvider;
    use crate::rpc::mock::{return_data, return_u256_array, word_address, word_u256};

    const TOKEN_A: Address = Address::repeat_byte(0x01);
    const TOKEN_B: Address = Address::repeat_byte(0x02);
    const QUOTER: Address = Address::repeat_byte(0xd3);
    const V2_ROUTER: Address = Address::repeat_byte(0xe2);

    fn gwei(n: u64) -> u64 {
        n * 1_000_000_000
    }

    #[test]
    fn test_effective_output_subtracts_gas_cost() {
        let out = effective_output(U256::from(1_000_000u64), 100, 1_000);
        assert_eq!(out, U256::from(900_000u64));
    }

    #[test]
    fn test_effective_output_saturates_at_zero() {
        let out = effective_output(U256::from(10u64), 200_000, gwei(50));
        assert_eq!(out, U256::ZERO);
    }

    #[test]
    fn test_lower_gas_wins_when_nominal_output_ties() {
        // identical quotes, different venues: the cheaper execution ranks higher
        let ea = effective_output(U256::from(1_000_000u64), 200_000, 1);
        let eb = effective_output(U256::from(1_000_000u64), 150_000, 1);
        assert!(eb > ea);
    }

    #[test]
    fn test_high_gas_price_flips_the_winner() {
        // 1800 out at 200k gas loses to 1795 out at 150k gas once gas costs
        // dwarf both outputs and the tie-break prefers the cheaper pool
        let gas_price = gwei(50);
        let ea = effective_output(U256::from(1_800u64), 200_000, gas_price);
        let eb = effective_output(U256::from(1_795u64), 150_000, gas_price);
        // both effective outputs floor at zero, so the tie-break must pick
        // the 150k-gas pool despite its smaller nominal quote
        assert_eq!(ea, U256::ZERO);
        assert_eq!(eb, U256::ZERO);
        let winner = ea.cmp(&eb).then_with(|| 150_000u64.cmp(&200_000u64));
        assert_eq!(winner, std::cmp::Ordering::Less);
    }

    #[test]
    fn test_apply_slippage_reduces_output() {
        let adjusted = apply_slippage(U256::from(10_000u64), 0.5).unwrap();
        assert_eq!(adjusted, U256::from(9_950u64));
        assert!(adjusted <= U256::from(10_000u64));
    }

    #[test]
    fn test_apply_slippage_zero_is_identity() {
        let adjusted = apply_slippage(U256::from(12_345u64), 0.0).unwrap();
        assert_eq!(adjusted, U256::from(12_345u64));
    }

    #[test]
    fn test_apply_slippage_full_tolerance_floors_at_zero() {
        let adjusted = apply_slippage(U256::from(12_345u64), 100.0).unwrap();
        assert_eq!(adjusted, U256::ZERO);
    }

    #[test]
    fn test_price_impact_zero_for_fair_execution() {
        // v3 pool at price 1.0: swapping 1000 for 1000 has no impact
        let pool = test_v3_pool();
        let impact =
            price_impact_pct(&pool, TOKEN_A, U256::from(1_000u64), U256::from(1_000u64)).unwrap();
        assert!(impact.abs() < 1e-9);
    }

    #[test]
    fn test_price_impact_grows_with_worse_execution() {
        let pool = test_v3_pool();
        let small =
            price_impact_pct(&pool, TOKEN_A, U256::from(1_000u64), U256::from(995u64)).unwrap();
        let large =
            price_impact_pct(&pool, TOKEN_A, U256::from(1_000u64), U256::from(900u64)).unwrap();
        assert!(small > 0.0);
        assert!(large > small);
        // 900/1000 against a spot of 1.0 is a 10% deviation
        assert!((large - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_price_impact_for_decimal_mismatched_pair() {
        // 6-decimal stable against an 18-decimal major: the raw price is
        // ~2.2e8, far from 1 in both directions
        let reserve0 = U256::from(4_500_000_000_000u64); // 4.5M units @ 6 decimals
        let reserve1 = U256::from(10u8).pow(U256::from(21u8)); // 1000 units @ 18 decimals
        let pool = Pool::ConstantProduct(crate::pools::ConstantProductPool {
            address: Address::repeat_byte(0x10),
            token0: TOKEN_A,
            token1: TOKEN_B,
            reserve0,
            reserve1,
            fee_bps: 30,
            sqrt_price_x96: crate::math::sqrt_price_x96_from_reserves(reserve0, reserve1)
                .unwrap(),
            tick: 0,
            dex_id: "uniswap-v2".to_string(),
        });

        // selling one 18-decimal unit nets ~4500 of the stable at the marked
        // price; a fair quote of 4488 is a ~0.27% deviation, not an error
        let amount_in = U256::from(10u8).pow(U256::from(18u8));
        let amount_out = U256::from(4_488_000_000u64);
        let impact = price_impact_pct(&pool, TOKEN_B, amount_in, amount_out).unwrap();
        assert!(impact > 0.2 && impact < 0.35, "impact {impact}");

        // the opposite direction stays finite too
        let impact = price_impact_pct(
            &pool,
            TOKEN_A,
            U256::from(1_000_000_000u64),
            U256::from(220_000_000_000_000_000u64),
        )
        .unwrap();
        assert!(impact > 0.5 && impact < 1.5, "impact {impact}");
    }

    #[test]
    fn test_price_impact_rejects_zero_amount_in() {
        let pool = test_v3_pool();
        let err = price_impact_pct(&pool, TOKEN_A, U256::ZERO, U256::from(1u64)).unwrap_err();
        assert_eq!(err, MathError::DivisionByZero);
    }

    fn test_config() -> Arc<EngineConfig> {
        test_config_with_gas(0)
    }

    fn test_config_with_gas(gas_price_wei: u64) -> Arc<EngineConfig> {
        let mut config = EngineConfig::default();
        config.rpc_timeout_secs = 1;
        config.request_deadline_secs = 5;
        config.gas_price_wei = gas_price_wei;
        config.venues = vec![
            VenueConfig {
                name: "uniswap-v3".to_string(),
                version: PoolVersion::V3,
                factory: Address::repeat_byte(0xf3),
                router: Address::repeat_byte(0xe3),
                quoter: Some(QUOTER),
                fee_tiers_bps: vec![30],
            },
            VenueConfig {
                name: "uniswap-v2".to_string(),
                version: PoolVersion::V2,
                factory: Address::repeat_byte(0xf2),
                router: V2_ROUTER,
                quoter: None,
                fee_tiers_bps: vec![30],
            },
        ];
        Arc::new(config)
    }

    /// Scripts full discovery plus quotes for both configured venues: a v3
    /// pool at price 1.0 quoting `v3_quote` and a v2 pair with balanced
    /// reserves quoting `v2_quote`.
    fn script_both_venues(provider: &MockCallProvider, v3_quote: u64, v2_quote: u64) {
        use crate::discovery::{
            IUniswapV2Factory, IUniswapV2Pair, IUniswapV3Factory, IUniswapV3Pool,
        };

        let pool_v3 = Address::repeat_byte(0x33);
        provider.respond(
            Address::repeat_byte(0xf3),
            IUniswapV3Factory::getPoolCall::SELECTOR,
            return_data(&[word_address(pool_v3)]),
        );
        provider.respond(
            pool_v3,
            IUniswapV3Pool::token0Call::SELECTOR,
            return_data(&[word_address(TOKEN_A)]),
        );
        provider.respond(
            pool_v3,
            IUniswapV3Pool::token1Call::SELECTOR,
            return_data(&[word_address(TOKEN_B)]),
        );
        provider.respond(
            pool_v3,
            IUniswapV3Pool::feeCall::SELECTOR,
            return_data(&[word_u256(U256::from(3_000u64))]),
        );
        provider.respond(
            pool_v3,
            IUniswapV3Pool::tickSpacingCall::SELECTOR,
            return_data(&[word_u256(U256::from(60u64))]),
        );
        provider.respond(
            pool_v3,
            IUniswapV3Pool::liquidityCall::SELECTOR,
            return_data(&[word_u256(U256::from(1_000_000u64))]),
        );
        provider.respond(
            pool_v3,
            IUniswapV3Pool::slot0Call::SELECTOR,
            return_data(&[
                word_u256(Q96),
                word_u256(U256::ZERO),
                word_u256(U256::ZERO),
                word_u256(U256::ZERO),
                word_u256(U256::ZERO),
                word_u256(U256::ZERO),
                word_u256(U256::from(1u8)),
            ]),
        );
        provider.respond(
            QUOTER,
            IQuoter::quoteExactInputSingleCall::SELECTOR,
            return_data(&[word_u256(U256::from(v3_quote))]),
        );

        let pair_v2 = Address::repeat_byte(0x22);
        provider.respond(
            Address::repeat_byte(0xf2),
            IUniswapV2Factory::getPairCall::SELECTOR,
            return_data(&[word_address(pair_v2)]),
        );
        provider.respond(
            pair_v2,
            IUniswapV2Pair::token0Call::SELECTOR,
            return_data(&[word_address(TOKEN_A)]),
        );
        provider.respond(
            pair_v2,
            IUniswapV2Pair::token1Call::SELECTOR,
            return_data(&[word_address(TOKEN_B)]),
        );
        provider.respond(
            pair_v2,
            IUniswapV2Pair::getReservesCall::SELECTOR,
            return_data(&[
                word_u256(U256::from(1_000_000u64)),
                word_u256(U256::from(1_000_000u64)),
                word_u256(U256::ZERO),
            ]),
        );
        provider.respond(
            V2_ROUTER,
            IUniswapV2Router::getAmountsOutCall::SELECTOR,
            return_u256_array(&[U256::from(1_800u64), U256::from(v2_quote)]),
        );
    }

    #[tokio::test]
    async fn test_find_best_route_prefers_higher_nominal_output() {
        let provider = Arc::new(MockCallProvider::new());
        script_both_venues(&provider, 1_800, 1_795);

        let router = SwapRouter::new(provider, test_config());
        let route = router
            .find_best_route(TOKEN_A, TOKEN_B, U256::from(1_800u64), 0.5)
            .await
            .unwrap()
            .expect("both venues have pools");

        assert_eq!(route.dex_id, "uniswap-v3");
        assert_eq!(route.expected_out, U256::from(1_800u64));
        // the returned amount is the slippage-adjusted minimum
        assert_eq!(route.amount_out, U256::from(1_791u64));
        assert_eq!(route.amount_out, apply_slippage(route.expected_out, 0.5).unwrap());
        assert_eq!(route.path, [TOKEN_A, TOKEN_B]);
    }

    #[tokio::test]
    async fn test_find_best_route_high_gas_price_flips_winner() {
        // 1800 out at 200k gas against 1795 out at 150k gas: with gas priced
        // at 50 gwei both effective outputs floor at zero and the tie-break
        // must pick the cheaper pool
        let provider = Arc::new(MockCallProvider::new());
        script_both_venues(&provider, 1_800, 1_795);

        let router = SwapRouter::new(provider, test_config_with_gas(gwei(50)));
        let route = router
            .find_best_route(TOKEN_A, TOKEN_B, U256::from(1_800u64), 0.5)
            .await
            .unwrap()
            .expect("both venues have pools");

        assert_eq!(route.dex_id, "uniswap-v2");
        assert_eq!(route.gas_estimate, 150_000);
        assert_eq!(route.expected_out, U256::from(1_795u64));
        assert_eq!(route.amount_out, U256::from(1_786u64));
    }

    #[tokio::test]
    async fn test_quote_pools_ranks_and_contains_failures() {
        let provider = Arc::new(MockCallProvider::new());
        // the v3 quoter answers, the v2 router reverts
        provider.respond(
            QUOTER,
            IQuoter::quoteExactInputSingleCall::SELECTOR,
            return_data(&[word_u256(U256::from(990u64))]),
        );
        provider.fail_with_node_error(
            V2_ROUTER,
            IUniswapV2Router::getAmountsOutCall::SELECTOR,
            "execution reverted",
        );

        let router = SwapRouter::new(provider, test_config());
        let pools = vec![
            test_v3_pool(),
            test_v2_pool(),
        ];
        let quotes = router.quote_pools(pools, TOKEN_A, U256::from(1_000u64)).await;
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].amount_out, U256::from(990u64));
        assert_eq!(quotes[0].pool.version(), PoolVersion::V3);
    }

    #[tokio::test]
    async fn test_v2_quote_takes_last_amount() {
        let provider = Arc::new(MockCallProvider::new());
        provider.respond(
            V2_ROUTER,
            IUniswapV2Router::getAmountsOutCall::SELECTOR,
            return_u256_array(&[U256::from(1_000u64), U256::from(987u64)]),
        );

        let venue = test_config().venue("uniswap-v2").unwrap().clone();
        let pool = test_v2_pool();
        let out = quote_pool(
            provider.as_ref(),
            &venue,
            &pool,
            TOKEN_A,
            U256::from(1_000u64),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(out, U256::from(987u64));
    }

    #[tokio::test]
    async fn test_swap_params_cover_the_route_and_future_deadline() {
        let provider = Arc::new(MockCallProvider::new());
        let router = SwapRouter::new(provider, test_config());
        let route = SwapRoute {
            pool: test_v3_pool(),
            path: [TOKEN_A, TOKEN_B],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(985u64),
            expected_out: U256::from(990u64),
            gas_estimate: 200_000,
            price_impact_pct: 0.1,
            fee_bps: 5,
            dex_id: "uniswap-v3".to_string(),
        };

        let params = router.swap_params(&route, Address::repeat_byte(0xaa), 0.5);
        assert_eq!(params.token_in, TOKEN_A);
        assert_eq!(params.token_out, TOKEN_B);
        assert_eq!(params.amount_in, U256::from(1_000u64));
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert!(params.deadline > U256::from(now));
    }

    #[tokio::test]
    async fn test_find_best_route_rejects_zero_amount() {
        let provider = Arc::new(MockCallProvider::new());
        let router = SwapRouter::new(provider, test_config());
        let err = router
            .find_best_route(TOKEN_A, TOKEN_B, U256::ZERO, 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_find_best_route_rejects_bad_slippage() {
        let provider = Arc::new(MockCallProvider::new());
        let router = SwapRouter::new(provider, test_config());
        let err = router
            .find_best_route(TOKEN_A, TOKEN_B, U256::from(1u64), 250.0)
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidSlippage(_)));
    }

    #[tokio::test]
    async fn test_find_best_route_none_when_no_pools_exist() {
        let provider = Arc::new(MockCallProvider::new());
        provider.respond(
            Address::repeat_byte(0xf3),
            crate::discovery::IUniswapV3Factory::getPoolCall::SELECTOR,
            return_data(&[word_address(Address::ZERO)]),
        );
        provider.respond(
            Address::repeat_byte(0xf2),
            crate::discovery::IUniswapV2Factory::getPairCall::SELECTOR,
            return_data(&[word_address(Address::ZERO)]),
        );

        let router = SwapRouter::new(provider, test_config());
        let route = router
            .find_best_route(TOKEN_A, TOKEN_B, U256::from(1_000u64), 0.5)
            .await
            .unwrap();
        assert!(route.is_none());
    }

    #[tokio::test]
    async fn test_get_quote_none_when_no_pools_exist() {
        let provider = Arc::new(MockCallProvider::new());
        provider.respond(
            TOKEN_A,
            IERC20::decimalsCall::SELECTOR,
            return_data(&[word_u256(U256::from(18u8))]),
        );
        provider.respond(
            TOKEN_B,
            IERC20::decimalsCall::SELECTOR,
            return_data(&[word_u256(U256::from(6u8))]),
        );
        provider.respond(
            Address::repeat_byte(0xf3),
            crate::discovery::IUniswapV3Factory::getPoolCall::SELECTOR,
            return_data(&[word_address(Address::ZERO)]),
        );
        provider.respond(
            Address::repeat_byte(0xf2),
            crate::discovery::IUniswapV2Factory::getPairCall::SELECTOR,
            return_data(&[word_address(Address::ZERO)]),
        );

        let router = SwapRouter::new(provider, test_config());
        let quote = router.get_quote(TOKEN_A, TOKEN_B, "1.5", 0.5).await.unwrap();
        assert!(quote.is_none());
    }

    #[tokio::test]
    async fn test_get_quote_rejects_malformed_amount() {
        let provider = Arc::new(MockCallProvider::new());
        provider.respond(
            TOKEN_A,
            IERC20::decimalsCall::SELECTOR,
            return_data(&[word_u256(U256::from(18u8))]),
        );
        provider.respond(
            TOKEN_B,
            IERC20::decimalsCall::SELECTOR,
            return_data(&[word_u256(U256::from(6u8))]),
        );

        let router = SwapRouter::new(provider, test_config());
        let err = router
            .get_quote(TOKEN_A, TOKEN_B, "not-a-number", 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidAmount(_)));
    }
}
