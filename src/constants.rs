use alloy_primitives::{Address, U256, address};

/// 2^96, the fixed-point scale of `sqrtPriceX96`.
pub const Q96: U256 = U256::from_limbs([0, 1 << 32, 0, 0]);

/// 2^192, the scale of a squared sqrt price.
pub const Q192: U256 = U256::from_limbs([0, 0, 0, 1]);

/// Fee tiers quotable by this engine, in basis points.
pub const FEE_TIERS_BPS: [u16; 4] = [1, 5, 30, 100];

/// Flat gas estimate for a single-hop swap through a constant-product router.
pub const V2_SWAP_GAS: u64 = 150_000;

/// Flat gas estimate for a single-hop swap through a concentrated-liquidity router.
pub const V3_SWAP_GAS: u64 = 200_000;

/// Tick spacing fixed per fee tier: {1 -> 1, 5 -> 10, 30 -> 60, 100 -> 200}.
pub const fn tick_spacing_for_fee_bps(fee_bps: u16) -> Option<i32> {
    match fee_bps {
        1 => Some(1),
        5 => Some(10),
        30 => Some(60),
        100 => Some(200),
        _ => None,
    }
}

/// Converts a basis-point fee tier to the `uint24` fee unit used on-chain
/// (hundredths of a basis point, e.g. 30 bps -> 3000).
pub const fn fee_bps_to_pool_fee(fee_bps: u16) -> u32 {
    fee_bps as u32 * 100
}

pub const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

#[non_exhaustive]
pub struct EthDexAddress;

impl EthDexAddress {
    // Uniswap V2 compatible
    pub const UNISWAP_V2_FACTORY: Address = address!("5c69bee701ef814a2b6a3edd4b1652cb9cc5aa6f");
    pub const UNISWAP_V2_ROUTER: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
    pub const SUSHISWAP_FACTORY: Address = address!("c0aee478e3658e2610c5f7a4a2e1777ce9e4f2ac");
    pub const SUSHISWAP_ROUTER: Address = address!("d9e1cE17f2641f24aE83637ab66a2cca9C378B9F");

    // Uniswap V3 compatible
    pub const UNISWAP_V3_FACTORY: Address = address!("1f98431c8ad98523631ae4a59f267346ea31f984");
    pub const UNISWAP_V3_ROUTER: Address = address!("E592427A0AEce92De3Edee1F18E0157C05861564");
    pub const UNISWAP_V3_QUOTER: Address = address!("b27308f9F90D607463bb33eA1BeBb41C27CE5AB6");
}
