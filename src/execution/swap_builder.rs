use crate::config::VenueConfig;
use crate::constants::fee_bps_to_pool_fee;
use crate::error::ExecutionError;
use crate::pools::PoolVersion;
use crate::router::{SwapParams, SwapRoute};
use alloy_primitives::aliases::U24;
use alloy_primitives::{Address, B256, Bytes, U160, U256};
use alloy_sol_types::{SolCall, sol};
use async_trait::async_trait;
use tracing::debug;

sol! {
    struct ExactInputSingleParams {
        address tokenIn;
        address tokenOut;
        uint24 fee;
        address recipient;
        uint256 deadline;
        uint256 amountIn;
        uint256 amountOutMinimum;
        uint160 sqrtPriceLimitX96;
    }

    interface ISwapRouter {
        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
    }

    interface IV2SwapRouter {
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
        function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable returns (uint256[] memory amounts);
    }
}

/// A fully-prepared swap ready for signing: target router, calldata, native
/// value to forward and a gas limit. No key material is involved here.
#[derive(Debug, Clone)]
pub struct SwapTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
}

/// Signing and broadcasting seam. The engine never holds keys; callers plug
/// in whatever wallet or relay they use and get the tx hash back.
#[async_trait]
pub trait SwapSigner: Send + Sync {
    async fn sign_and_send(&self, tx: SwapTransaction) -> eyre::Result<B256>;
}

/// Builds venue-specific calldata for a routed swap.
///
/// Native value is forwarded only when the input leg is the wrapped-native
/// token; every other swap moves tokens via prior approval and carries zero
/// value.
pub fn build_swap_transaction(
    route: &SwapRoute,
    params: &SwapParams,
    venue: &VenueConfig,
    wrapped_native: Address,
) -> Result<SwapTransaction, ExecutionError> {
    if params.token_in != route.path[0] {
        return Err(ExecutionError::TokenNotInRoute(params.token_in));
    }
    if params.token_out != route.path[1] {
        return Err(ExecutionError::TokenNotInRoute(params.token_out));
    }

    let native_in = params.token_in == wrapped_native;
    let value = if native_in { params.amount_in } else { U256::ZERO };

    let data: Bytes = match route.pool.version() {
        PoolVersion::V3 => {
            let sqrt_price_limit = params
                .sqrt_price_limit_x96
                .map(U160::saturating_from)
                .unwrap_or(U160::ZERO);
            ISwapRouter::exactInputSingleCall {
                params: ExactInputSingleParams {
                    tokenIn: params.token_in,
                    tokenOut: params.token_out,
                    fee: U24::from(fee_bps_to_pool_fee(route.fee_bps)),
                    recipient: params.recipient,
                    deadline: params.deadline,
                    amountIn: params.amount_in,
                    amountOutMinimum: route.amount_out,
                    sqrtPriceLimitX96: sqrt_price_limit,
                },
            }
            .abi_encode()
            .into()
        }
        PoolVersion::V2 if native_in => IV2SwapRouter::swapExactETHForTokensCall {
            amountOutMin: route.amount_out,
            path: route.path.to_vec(),
            to: params.recipient,
            deadline: params.deadline,
        }
        .abi_encode()
        .into(),
        PoolVersion::V2 => IV2SwapRouter::swapExactTokensForTokensCall {
            amountIn: params.amount_in,
            amountOutMin: route.amount_out,
            path: route.path.to_vec(),
            to: params.recipient,
            deadline: params.deadline,
        }
        .abi_encode()
        .into(),
    };

    debug!(
        "built {} swap via router {:?}: {} bytes calldata, value {}",
        route.pool.version(),
        venue.router,
        data.len(),
        value
    );

    Ok(SwapTransaction { to: venue.router, data, value, gas_limit: route.gas_estimate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::pool::tests::{test_v2_pool, test_v3_pool};
    use crate::pools::Pool;

    const TOKEN_A: Address = Address::repeat_byte(0x01);
    const TOKEN_B: Address = Address::repeat_byte(0x02);
    const RECIPIENT: Address = Address::repeat_byte(0xaa);
    const WRAPPED: Address = Address::repeat_byte(0xee);

    fn test_venue(version: PoolVersion) -> VenueConfig {
        VenueConfig {
            name: "test".to_string(),
            version,
            factory: Address::repeat_byte(0xf0),
            router: Address::repeat_byte(0xe0),
            quoter: None,
            fee_tiers_bps: vec![30],
        }
    }

    fn test_route(pool: Pool) -> SwapRoute {
        SwapRoute {
            path: [TOKEN_A, TOKEN_B],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(985u64),
            expected_out: U256::from(990u64),
            gas_estimate: pool.gas_estimate(),
            price_impact_pct: 0.1,
            fee_bps: pool.fee_bps(),
            dex_id: pool.dex_id().to_string(),
            pool,
        }
    }

    fn test_params() -> SwapParams {
        SwapParams {
            token_in: TOKEN_A,
            token_out: TOKEN_B,
            amount_in: U256::from(1_000u64),
            recipient: RECIPIENT,
            deadline: U256::from(1_700_000_000u64),
            sqrt_price_limit_x96: None,
            slippage_tolerance_pct: 0.5,
        }
    }

    #[test]
    fn test_v3_calldata_round_trip() {
        let route = test_route(test_v3_pool());
        let tx = build_swap_transaction(&route, &test_params(), &test_venue(PoolVersion::V3), WRAPPED)
            .unwrap();

        let decoded = ISwapRouter::exactInputSingleCall::abi_decode(&tx.data).unwrap();
        assert_eq!(decoded.params.tokenIn, TOKEN_A);
        assert_eq!(decoded.params.tokenOut, TOKEN_B);
        assert_eq!(decoded.params.amountIn, U256::from(1_000u64));
        assert_eq!(decoded.params.amountOutMinimum, U256::from(985u64));
        assert_eq!(decoded.params.recipient, RECIPIENT);
        assert_eq!(decoded.params.fee, U24::from(500u32));
        assert_eq!(decoded.params.sqrtPriceLimitX96, U160::ZERO);

        assert_eq!(tx.to, Address::repeat_byte(0xe0));
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(tx.gas_limit, 200_000);
    }

    #[test]
    fn test_value_forwarded_only_for_wrapped_native_input() {
        let route = test_route(test_v3_pool());
        let params = test_params();

        let plain =
            build_swap_transaction(&route, &params, &test_venue(PoolVersion::V3), WRAPPED).unwrap();
        assert_eq!(plain.value, U256::ZERO);

        // same swap, but the input token is the wrapped-native token
        let native =
            build_swap_transaction(&route, &params, &test_venue(PoolVersion::V3), TOKEN_A).unwrap();
        assert_eq!(native.value, U256::from(1_000u64));
    }

    #[test]
    fn test_v2_selector_depends_on_native_input() {
        let route = test_route(test_v2_pool());
        let params = test_params();

        let plain =
            build_swap_transaction(&route, &params, &test_venue(PoolVersion::V2), WRAPPED).unwrap();
        assert_eq!(
            &plain.data[..4],
            IV2SwapRouter::swapExactTokensForTokensCall::SELECTOR
        );
        assert_eq!(plain.gas_limit, 150_000);

        let native =
            build_swap_transaction(&route, &params, &test_venue(PoolVersion::V2), TOKEN_A).unwrap();
        assert_eq!(
            &native.data[..4],
            IV2SwapRouter::swapExactETHForTokensCall::SELECTOR
        );
        assert_eq!(native.value, U256::from(1_000u64));

        let decoded = IV2SwapRouter::swapExactETHForTokensCall::abi_decode(&native.data).unwrap();
        assert_eq!(decoded.path, vec![TOKEN_A, TOKEN_B]);
        assert_eq!(decoded.amountOutMin, U256::from(985u64));
    }

    #[test]
    fn test_mismatched_tokens_are_rejected() {
        let route = test_route(test_v3_pool());
        let mut params = test_params();
        params.token_in = Address::repeat_byte(0x99);

        let err = build_swap_transaction(&route, &params, &test_venue(PoolVersion::V3), WRAPPED)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::TokenNotInRoute(_)));
    }
}
