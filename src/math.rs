//! Fixed-point helpers
//!
//! All balances are integer amounts in the asset's native precision.
//! Ratios are expressed in basis points against [`MAX_BPS`].

use alloy_primitives::U256;

use crate::error::{ProtocolError, Result};

/// 10000 bps = 100%
pub const MAX_BPS: u64 = 10_000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rounding {
    Floor,
    Ceiling,
}

/// 1e18, the scale used by `price_per_full_share`
pub fn one_e18() -> U256 {
    U256::from(10u64).pow(U256::from(18))
}

/// Computes `value * numerator / denominator` with full 256-bit checks.
pub fn mul_div(value: U256, numerator: U256, denominator: U256, rounding: Rounding) -> Result<U256> {
    if denominator.is_zero() {
        return Err(ProtocolError::ArithmeticOverflow);
    }

    let product = value
        .checked_mul(numerator)
        .ok_or(ProtocolError::ArithmeticOverflow)?;

    let quotient = product / denominator;
    match rounding {
        Rounding::Floor => Ok(quotient),
        Rounding::Ceiling => {
            if (product % denominator).is_zero() {
                Ok(quotient)
            } else {
                quotient
                    .checked_add(U256::from(1u64))
                    .ok_or(ProtocolError::ArithmeticOverflow)
            }
        }
    }
}

/// `amount * bps / 10000`
pub fn apply_bps(amount: U256, bps: u64, rounding: Rounding) -> Result<U256> {
    mul_div(amount, U256::from(bps), U256::from(MAX_BPS), rounding)
}

pub fn checked_add(a: U256, b: U256) -> Result<U256> {
    a.checked_add(b).ok_or(ProtocolError::ArithmeticOverflow)
}

/// Subtraction that reports underflow as an amount error, since every
/// underflow in this crate means "more than the balance".
pub fn checked_sub(a: U256, b: U256, what: &str) -> Result<U256> {
    a.checked_sub(b).ok_or_else(|| {
        ProtocolError::invalid_amount(format!("{} exceeds balance ({} > {})", what, b, a))
    })
}

/// Lossy conversion for display only
pub fn to_f64(value: U256, decimals: u8) -> f64 {
    let raw: f64 = value.to_string().parse().unwrap_or(0.0);
    raw / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn test_mul_div_floor() {
        assert_eq!(mul_div(u(100), u(3), u(2), Rounding::Floor).unwrap(), u(150));
        assert_eq!(mul_div(u(100), u(1), u(3), Rounding::Floor).unwrap(), u(33));
    }

    #[test]
    fn test_mul_div_ceiling() {
        assert_eq!(mul_div(u(100), u(3), u(2), Rounding::Ceiling).unwrap(), u(150));
        assert_eq!(mul_div(u(100), u(1), u(3), Rounding::Ceiling).unwrap(), u(34));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            mul_div(u(100), u(100), U256::ZERO, Rounding::Floor),
            Err(ProtocolError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_overflow() {
        assert_eq!(
            mul_div(U256::MAX, u(2), u(1), Rounding::Floor),
            Err(ProtocolError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_apply_bps() {
        // 0.5% withdrawal fee on 1 WBTC
        assert_eq!(apply_bps(u(100_000_000), 50, Rounding::Floor).unwrap(), u(500_000));
        // 99.75% of 1000 = 997.5 -> floor / ceil
        assert_eq!(apply_bps(u(1000), 9975, Rounding::Floor).unwrap(), u(997));
        assert_eq!(apply_bps(u(1000), 9975, Rounding::Ceiling).unwrap(), u(998));
    }

    #[test]
    fn test_checked_sub_reports_amount() {
        let err = checked_sub(u(1), u(2), "withdrawal").unwrap_err();
        assert_eq!(err.kind(), "INVALID_AMOUNT");
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(to_f64(u(150_000_000), 8), 1.5);
    }
}
