use crate::constants::{Q192, Q96};
use crate::error::MathError;
use crate::math::full_math::{div_rounding_up, into_u256, mul_div, mul_div_rounding_up};
use alloy_primitives::{U256, U512};

/// Computes the sqrt price after absorbing `amount_in` of one side of the
/// pair at the given price and liquidity.
///
/// `zero_for_one == true` means token0 is being sold into the pool, which
/// pushes the price down (amount0 formula, rounded up); otherwise token1 is
/// sold and the price moves up (amount1 formula, rounded down).
pub fn get_next_sqrt_price_from_input(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, MathError> {
    if sqrt_price_x96.is_zero() {
        return Err(MathError::ZeroPrice);
    }
    if liquidity == 0 {
        return Err(MathError::ZeroLiquidity);
    }
    if amount_in.is_zero() {
        return Ok(sqrt_price_x96);
    }
    if zero_for_one {
        next_sqrt_price_from_amount0_rounding_up(sqrt_price_x96, liquidity, amount_in)
    } else {
        next_sqrt_price_from_amount1_rounding_down(sqrt_price_x96, liquidity, amount_in)
    }
}

/// `ceil(L * Q96 * sqrtP / (L * Q96 + amount * sqrtP))`, with the
/// precision-losing fallback form when the product overflows.
fn next_sqrt_price_from_amount0_rounding_up(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount: U256,
) -> Result<U256, MathError> {
    let numerator1: U256 = U256::from(liquidity) << 96;

    let next = if let Some(product) = amount.checked_mul(sqrt_price_x96) {
        if let Some(denominator) = numerator1.checked_add(product) {
            mul_div_rounding_up(numerator1, sqrt_price_x96, denominator)?
        } else {
            fallback_next_from_amount0(numerator1, sqrt_price_x96, amount)?
        }
    } else {
        fallback_next_from_amount0(numerator1, sqrt_price_x96, amount)?
    };

    if next.is_zero() {
        return Err(MathError::PriceUnderflow);
    }
    Ok(next)
}

fn fallback_next_from_amount0(
    numerator1: U256,
    sqrt_price_x96: U256,
    amount: U256,
) -> Result<U256, MathError> {
    let denominator = (numerator1 / sqrt_price_x96)
        .checked_add(amount)
        .ok_or(MathError::MultiplicationOverflow)?;
    div_rounding_up(numerator1, denominator)
}

/// `sqrtP + floor(amount * Q96 / L)`.
fn next_sqrt_price_from_amount1_rounding_down(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount: U256,
) -> Result<U256, MathError> {
    let quotient = mul_div(amount, Q96, U256::from(liquidity))?;
    sqrt_price_x96
        .checked_add(quotient)
        .ok_or(MathError::MultiplicationOverflow)
}

/// Derives a synthetic `sqrtPriceX96` from constant-product reserves:
/// `sqrt(reserve1 * Q192 / reserve0)`. With both reserves non-zero the
/// result is non-zero, so V2 pools never surface a zero price.
pub fn sqrt_price_x96_from_reserves(reserve0: U256, reserve1: U256) -> Result<U256, MathError> {
    if reserve0.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if reserve1.is_zero() {
        return Err(MathError::ZeroPrice);
    }
    let ratio = U512::from(reserve1) * U512::from(Q192) / U512::from(reserve0);
    Ok(crate::math::full_math::sqrt(into_u256(ratio)?))
}
