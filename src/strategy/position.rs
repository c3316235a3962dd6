//! Position bookkeeping
//!
//! Transitions return the next [`Position`] instead of mutating in place,
//! so the strategy can stage a change and assign it only once the adapter
//! call and the slippage check have both passed.

use alloy_primitives::U256;
use serde::Serialize;

use crate::error::{ProtocolError, Result};
use crate::math::{checked_add, mul_div, Rounding};

/// Lifecycle of the strategy's stake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PositionState {
    Empty,
    Deployed,
    PartiallyWithdrawn,
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionState::Empty => write!(f, "EMPTY"),
            PositionState::Deployed => write!(f, "DEPLOYED"),
            PositionState::PartiallyWithdrawn => write!(f, "PARTIALLY_WITHDRAWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Want committed to the pool (cost basis)
    pub deployed_asset_amount: U256,

    /// Receipt tokens held
    pub position_token_amount: U256,
}

impl Position {
    pub fn is_empty(&self) -> bool {
        self.position_token_amount.is_zero() && self.deployed_asset_amount.is_zero()
    }

    pub fn after_deposit(&self, amount: U256, minted: U256) -> Result<Position> {
        Ok(Position {
            deployed_asset_amount: checked_add(self.deployed_asset_amount, amount)?,
            position_token_amount: checked_add(self.position_token_amount, minted)?,
        })
    }

    /// Receipt tokens equivalent to `amount` out of `pool_value`, rounded up
    /// and capped at what is held.
    pub fn tokens_for(&self, amount: U256, pool_value: U256) -> Result<U256> {
        if amount >= pool_value {
            return Ok(self.position_token_amount);
        }
        Ok(mul_div(self.position_token_amount, amount, pool_value, Rounding::Ceiling)?
            .min(self.position_token_amount))
    }

    /// Proportional reduction for an exit of `amount` out of `pool_value`.
    /// Returns the next position and the receipt tokens given up.
    pub fn after_withdrawal(&self, amount: U256, pool_value: U256) -> Result<(Position, U256)> {
        if amount.is_zero() || amount > pool_value {
            return Err(ProtocolError::invalid_amount(format!(
                "exit of {} from a position worth {}",
                amount, pool_value
            )));
        }
        if amount == pool_value {
            return Ok((Position::default(), self.position_token_amount));
        }

        let burned = self.tokens_for(amount, pool_value)?;
        let basis_released = mul_div(
            self.deployed_asset_amount,
            amount,
            pool_value,
            Rounding::Floor,
        )?;

        Ok((
            Position {
                deployed_asset_amount: self.deployed_asset_amount - basis_released,
                position_token_amount: self.position_token_amount - burned,
            },
            burned,
        ))
    }
}
