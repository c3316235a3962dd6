//! Position Adapter
//!
//! Boundary to the external liquidity position the strategy deploys into.
//! The pool's pricing curve is opaque: the strategy only sees
//! receipt tokens on entry, a valuation, and slippage-bounded exits.
//!
//! ## Contract
//!
//! - `deposit(amount)` commits `amount` of want and returns receipt tokens
//! - `withdraw(desired, max_slippage_bps)` reduces the valuation by exactly
//!   `desired` and returns at least `desired * (1 - max_slippage_bps / 10000)`,
//!   or fails
//! - `balance()` is the want-equivalent value of the position
//!
//! The adapter's `address()` is the pool account in the asset ledger; the
//! strategy moves want to and from it around each call.

mod mock;

pub use mock::MockPositionAdapter;

use alloy_primitives::{Address, U256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("pool unavailable: {0}")]
    Unavailable(String),

    #[error("insufficient pool liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: U256, available: U256 },

    #[error("exit of {desired} would return {received}, beyond {max_slippage_bps} bps slippage")]
    SlippageBound {
        desired: U256,
        received: U256,
        max_slippage_bps: u64,
    },

    #[error("deposit of {amount} mints no receipt tokens")]
    DepositTooSmall { amount: U256 },

    #[error("position not fully exited, {remaining} still deployed")]
    ExitIncomplete { remaining: U256 },

    #[error("valuation drifted: expected {expected} after exit, pool reports {actual}")]
    ValuationDrift { expected: U256, actual: U256 },
}

/// Implementations are cloned to stage a call and the clone is kept only on
/// success, so `Clone` must copy the whole pool-side state.
pub trait PositionAdapter: Clone + std::fmt::Debug {
    /// Pool account holding deployed want in the asset ledger
    fn address(&self) -> Address;

    fn name(&self) -> &str;

    /// Enter the position, returning receipt tokens minted
    fn deposit(&mut self, amount: U256) -> Result<U256, AdapterError>;

    /// Exit `desired` worth of the position, returning want actually received
    fn withdraw(&mut self, desired: U256, max_slippage_bps: u64) -> Result<U256, AdapterError>;

    /// Want-equivalent value of the position
    fn balance(&self) -> U256;

    /// Largest single exit the pool can honor right now
    fn max_withdraw(&self) -> U256 {
        self.balance()
    }
}
