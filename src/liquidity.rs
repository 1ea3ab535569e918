use crate::constants::Q96;
use crate::error::{MathError, PositionError};
use crate::math::mul_div;
use alloy_primitives::{Address, U256};
use tracing::debug;

/// A concentrated-liquidity position as tracked by a V3-style pool.
///
/// Fee growth snapshots and owed amounts mirror the pool's per-position
/// bookkeeping; a freshly minted position starts with all of them zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcentratedLiquidityPosition {
    pub pool_address: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub fee_growth_inside0_last_x128: U256,
    pub fee_growth_inside1_last_x128: U256,
    pub tokens_owed0: U256,
    pub tokens_owed1: U256,
}

/// Computes position liquidity from token amounts and a price range.
///
/// Bounds are normalized so `sqrt_price_a <= sqrt_price_b`. Below the range
/// only token0 contributes, above it only token1; strictly inside, the
/// position is capped by the scarcer side.
pub fn liquidity_for_amounts(
    sqrt_price_x96: U256,
    sqrt_price_a_x96: U256,
    sqrt_price_b_x96: U256,
    amount0: U256,
    amount1: U256,
) -> Result<u128, MathError> {
    if sqrt_price_x96.is_zero() || sqrt_price_a_x96.is_zero() || sqrt_price_b_x96.is_zero() {
        return Err(MathError::ZeroPrice);
    }
    let (lower, upper) = if sqrt_price_a_x96 <= sqrt_price_b_x96 {
        (sqrt_price_a_x96, sqrt_price_b_x96)
    } else {
        (sqrt_price_b_x96, sqrt_price_a_x96)
    };
    if lower == upper {
        return Err(MathError::DivisionByZero);
    }

    let liquidity = if sqrt_price_x96 <= lower {
        liquidity_for_amount0(lower, upper, amount0)?
    } else if sqrt_price_x96 >= upper {
        liquidity_for_amount1(lower, upper, amount1)?
    } else {
        let from0 = liquidity_for_amount0(sqrt_price_x96, upper, amount0)?;
        let from1 = liquidity_for_amount1(lower, sqrt_price_x96, amount1)?;
        from0.min(from1)
    };

    u128::try_from(liquidity).map_err(|_| MathError::MultiplicationOverflow)
}

/// `L = amount0 * (sqrtA * sqrtB / Q96) / (sqrtB - sqrtA)`
fn liquidity_for_amount0(
    sqrt_price_a_x96: U256,
    sqrt_price_b_x96: U256,
    amount0: U256,
) -> Result<U256, MathError> {
    let intermediate = mul_div(sqrt_price_a_x96, sqrt_price_b_x96, Q96)?;
    mul_div(amount0, intermediate, sqrt_price_b_x96 - sqrt_price_a_x96)
}

/// `L = amount1 * Q96 / (sqrtB - sqrtA)`
fn liquidity_for_amount1(
    sqrt_price_a_x96: U256,
    sqrt_price_b_x96: U256,
    amount1: U256,
) -> Result<U256, MathError> {
    mul_div(amount1, Q96, sqrt_price_b_x96 - sqrt_price_a_x96)
}

/// Manages V3-style liquidity positions. Quoting-side math is live; minting
/// through the on-chain position manager is not wired up yet, and
/// `create_position` reports that as a typed outcome callers can match on.
pub struct ConcentratedLiquidityManager;

impl ConcentratedLiquidityManager {
    pub fn new() -> Self {
        Self
    }

    /// Validates the requested tick range, then stops short of minting: the
    /// position-manager integration is not implemented and this returns
    /// `PositionError::NotImplemented`.
    pub fn create_position(
        &self,
        pool_address: Address,
        tick_lower: i32,
        tick_upper: i32,
        tick_spacing: i32,
    ) -> Result<ConcentratedLiquidityPosition, PositionError> {
        if tick_lower >= tick_upper
            || tick_spacing <= 0
            || tick_lower % tick_spacing != 0
            || tick_upper % tick_spacing != 0
        {
            return Err(PositionError::InvalidTickRange { lower: tick_lower, upper: tick_upper });
        }
        debug!(
            "position mint requested for pool {pool_address:#x} range [{tick_lower}, {tick_upper}]"
        );
        Err(PositionError::NotImplemented)
    }
}

impl Default for ConcentratedLiquidityManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_q96() -> U256 {
        Q96 * U256::from(2u8)
    }

    fn three_q96() -> U256 {
        Q96 * U256::from(3u8)
    }

    #[test]
    fn test_below_range_uses_only_token0() {
        // current price under the range: token1 amount is irrelevant
        let with_token1 =
            liquidity_for_amounts(Q96, two_q96(), three_q96(), U256::from(1_000u64), U256::MAX >> 8)
                .unwrap();
        let without_token1 =
            liquidity_for_amounts(Q96, two_q96(), three_q96(), U256::from(1_000u64), U256::ZERO)
                .unwrap();
        assert_eq!(with_token1, without_token1);
        assert!(with_token1 > 0);
    }

    #[test]
    fn test_above_range_uses_only_token1() {
        let with_token0 = liquidity_for_amounts(
            three_q96(),
            Q96,
            two_q96(),
            U256::MAX >> 8,
            U256::from(1_000u64),
        )
        .unwrap();
        let without_token0 =
            liquidity_for_amounts(three_q96(), Q96, two_q96(), U256::ZERO, U256::from(1_000u64))
                .unwrap();
        assert_eq!(with_token0, without_token0);
        assert!(with_token0 > 0);
    }

    #[test]
    fn test_inside_range_takes_the_scarcer_side() {
        let balanced = liquidity_for_amounts(
            two_q96(),
            Q96,
            three_q96(),
            U256::from(1_000_000u64),
            U256::from(1_000_000u64),
        )
        .unwrap();
        let starved0 = liquidity_for_amounts(
            two_q96(),
            Q96,
            three_q96(),
            U256::from(10u64),
            U256::from(1_000_000u64),
        )
        .unwrap();
        assert!(starved0 < balanced);
    }

    #[test]
    fn test_swapped_bounds_are_normalized() {
        let forward = liquidity_for_amounts(
            two_q96(),
            Q96,
            three_q96(),
            U256::from(5_000u64),
            U256::from(5_000u64),
        )
        .unwrap();
        let swapped = liquidity_for_amounts(
            two_q96(),
            three_q96(),
            Q96,
            U256::from(5_000u64),
            U256::from(5_000u64),
        )
        .unwrap();
        assert_eq!(forward, swapped);
    }

    #[test]
    fn test_degenerate_range_is_rejected() {
        let err = liquidity_for_amounts(
            Q96,
            two_q96(),
            two_q96(),
            U256::from(1u64),
            U256::from(1u64),
        )
        .unwrap_err();
        assert_eq!(err, MathError::DivisionByZero);
    }

    #[test]
    fn test_zero_price_is_rejected() {
        let err = liquidity_for_amounts(
            U256::ZERO,
            Q96,
            two_q96(),
            U256::from(1u64),
            U256::from(1u64),
        )
        .unwrap_err();
        assert_eq!(err, MathError::ZeroPrice);
    }

    #[test]
    fn test_create_position_is_an_explicit_capability_gap() {
        let manager = ConcentratedLiquidityManager::new();
        let result = manager.create_position(Address::repeat_byte(0x20), -60, 60, 60);
        assert!(matches!(result, Err(PositionError::NotImplemented)));
    }

    #[test]
    fn test_create_position_validates_tick_range() {
        let manager = ConcentratedLiquidityManager::new();
        // inverted range
        assert!(matches!(
            manager.create_position(Address::repeat_byte(0x20), 60, -60, 60),
            Err(PositionError::InvalidTickRange { .. })
        ));
        // misaligned with the tick spacing
        assert!(matches!(
            manager.create_position(Address::repeat_byte(0x20), -61, 60, 60),
            Err(PositionError::InvalidTickRange { .. })
        ));
    }
}
