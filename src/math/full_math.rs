use crate::error::MathError;
use alloy_primitives::{U256, U512};

/// Narrows a 512-bit value back to 256 bits, failing when the high half is
/// populated.
pub(crate) fn into_u256(value: U512) -> Result<U256, MathError> {
    let limbs = value.as_limbs();
    if limbs[4] != 0 || limbs[5] != 0 || limbs[6] != 0 || limbs[7] != 0 {
        return Err(MathError::MultiplicationOverflow);
    }
    Ok(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

/// Computes `floor(a * b / denominator)` with the 256x256 product carried
/// exactly in 512 bits. Overflow of the quotient is a detectable failure,
/// never a silent wrap.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = U512::from(a) * U512::from(b);
    into_u256(product / U512::from(denominator))
}

/// Same as [`mul_div`] but rounds the quotient up on a non-zero remainder.
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = U512::from(a) * U512::from(b);
    let denominator = U512::from(denominator);
    let quotient = into_u256(product / denominator)?;
    if (product % denominator).is_zero() {
        Ok(quotient)
    } else {
        quotient
            .checked_add(U256::from(1u8))
            .ok_or(MathError::MultiplicationOverflow)
    }
}

/// `ceil(a / b)`.
pub fn div_rounding_up(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let quotient = a / b;
    if (a % b).is_zero() {
        Ok(quotient)
    } else {
        quotient
            .checked_add(U256::from(1u8))
            .ok_or(MathError::MultiplicationOverflow)
    }
}

/// Integer square root via Newton's method, rounded down.
///
/// Used to derive a synthetic `sqrtPriceX96` from constant-product reserves
/// so V2-style pools expose the same price representation as V3-style ones.
pub fn sqrt(value: U256) -> U256 {
    if value <= U256::from(1u8) {
        return value;
    }
    let two = U256::from(2u8);
    let mut z = value;
    let mut x = value / two + U256::from(1u8);
    while x < z {
        z = x;
        x = (value / x + x) / two;
    }
    z
}
