//! Deterministic in-memory position
//!
//! Stands in for the real liquidity pool in tests and CLI scenarios.
//! Knobs: entry rate for the first deposit, a flat exit loss, a per-call
//! exit cap, yield accrual, one-shot failure injection, and a rogue mode
//! that under-delivers instead of failing.

use alloy_primitives::{Address, U256};
use tracing::debug;

use super::{AdapterError, PositionAdapter};
use crate::math::{apply_bps, mul_div, Rounding, MAX_BPS};

/// Receipt tokens minted per unit of want on the first deposit, in bps (1:1)
const DEFAULT_ENTRY_RATE_BPS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct MockPositionAdapter {
    address: Address,
    name: String,

    /// Want-equivalent value of all receipt tokens outstanding
    value: U256,

    /// Receipt tokens outstanding
    supply: U256,

    /// Receipt tokens per want on first entry (bps)
    entry_rate_bps: u64,

    /// Loss applied to every exit (bps)
    exit_loss_bps: u64,

    /// Largest exit honored per call
    exit_cap: Option<U256>,

    /// When false, exits that breach the caller's bound succeed anyway
    enforce_bound: bool,

    fail_next: Option<String>,
}

impl MockPositionAdapter {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            name: "mock-pool".to_string(),
            value: U256::ZERO,
            supply: U256::ZERO,
            entry_rate_bps: DEFAULT_ENTRY_RATE_BPS,
            exit_loss_bps: 0,
            exit_cap: None,
            enforce_bound: true,
            fail_next: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_entry_rate_bps(mut self, bps: u64) -> Self {
        self.entry_rate_bps = bps;
        self
    }

    pub fn with_exit_loss_bps(mut self, bps: u64) -> Self {
        self.exit_loss_bps = bps.min(MAX_BPS);
        self
    }

    pub fn with_exit_cap(mut self, cap: U256) -> Self {
        self.exit_cap = Some(cap);
        self
    }

    /// Ignore the caller's slippage bound (misbehaving pool)
    pub fn rogue(mut self) -> Self {
        self.enforce_bound = false;
        self
    }

    pub fn set_exit_loss_bps(&mut self, bps: u64) {
        self.exit_loss_bps = bps.min(MAX_BPS);
    }

    /// Make the next deposit or withdraw fail
    pub fn fail_next(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    pub fn recover(&mut self) {
        self.fail_next = None;
    }

    /// Grow the position's valuation (trading fees, incentives)
    pub fn accrue(&mut self, amount: U256) {
        self.value = self.value.saturating_add(amount);
    }

    pub fn supply(&self) -> U256 {
        self.supply
    }

    fn check_failure(&mut self) -> Result<(), AdapterError> {
        match self.fail_next.take() {
            Some(reason) => Err(AdapterError::Unavailable(reason)),
            None => Ok(()),
        }
    }
}

impl PositionAdapter for MockPositionAdapter {
    fn address(&self) -> Address {
        self.address
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn deposit(&mut self, amount: U256) -> Result<U256, AdapterError> {
        self.check_failure()?;

        let minted = if self.supply.is_zero() || self.value.is_zero() {
            mul_div(amount, U256::from(self.entry_rate_bps), U256::from(MAX_BPS), Rounding::Floor)
        } else {
            mul_div(amount, self.supply, self.value, Rounding::Floor)
        }
        .map_err(|e| AdapterError::Unavailable(e.to_string()))?;

        if minted.is_zero() {
            return Err(AdapterError::DepositTooSmall { amount });
        }

        self.value += amount;
        self.supply += minted;
        debug!("{}: deposit {} -> {} receipt tokens", self.name, amount, minted);
        Ok(minted)
    }

    fn withdraw(&mut self, desired: U256, max_slippage_bps: u64) -> Result<U256, AdapterError> {
        self.check_failure()?;

        let available = self.max_withdraw();
        if desired > available {
            return Err(AdapterError::InsufficientLiquidity {
                requested: desired,
                available,
            });
        }

        let loss = apply_bps(desired, self.exit_loss_bps, Rounding::Ceiling)
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        let received = desired - loss.min(desired);

        if self.enforce_bound {
            let floor = apply_bps(desired, MAX_BPS - max_slippage_bps.min(MAX_BPS), Rounding::Ceiling)
                .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
            if received < floor {
                return Err(AdapterError::SlippageBound {
                    desired,
                    received,
                    max_slippage_bps,
                });
            }
        }

        let burned = if desired == self.value {
            self.supply
        } else {
            mul_div(self.supply, desired, self.value, Rounding::Ceiling)
                .map_err(|e| AdapterError::Unavailable(e.to_string()))?
                .min(self.supply)
        };

        self.value -= desired;
        self.supply -= burned;
        debug!(
            "{}: withdraw {} -> received {} (burned {})",
            self.name, desired, received, burned
        );
        Ok(received)
    }

    fn balance(&self) -> U256 {
        self.value
    }

    fn max_withdraw(&self) -> U256 {
        match self.exit_cap {
            Some(cap) => cap.min(self.value),
            None => self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> MockPositionAdapter {
        MockPositionAdapter::new(Address::repeat_byte(0xB0))
    }

    #[test]
    fn test_deposit_mints_proportionally() {
        let mut adapter = pool().with_entry_rate_bps(20_000);
        let first = adapter.deposit(U256::from(1_000u64)).unwrap();
        assert_eq!(first, U256::from(2_000u64));

        let second = adapter.deposit(U256::from(500u64)).unwrap();
        assert_eq!(second, U256::from(1_000u64));
        assert_eq!(adapter.balance(), U256::from(1_500u64));
    }

    #[test]
    fn test_withdraw_reduces_value_exactly() {
        let mut adapter = pool().with_exit_loss_bps(10);
        adapter.deposit(U256::from(10_000u64)).unwrap();

        let received = adapter.withdraw(U256::from(1_000u64), 25).unwrap();
        assert_eq!(received, U256::from(999u64));
        assert_eq!(adapter.balance(), U256::from(9_000u64));
    }

    #[test]
    fn test_withdraw_rejects_loss_beyond_bound() {
        let mut adapter = pool().with_exit_loss_bps(100);
        adapter.deposit(U256::from(10_000u64)).unwrap();

        let err = adapter.withdraw(U256::from(1_000u64), 25).unwrap_err();
        assert!(matches!(err, AdapterError::SlippageBound { .. }));
        assert_eq!(adapter.balance(), U256::from(10_000u64));
    }

    #[test]
    fn test_rogue_pool_underdelivers() {
        let mut adapter = pool().with_exit_loss_bps(100).rogue();
        adapter.deposit(U256::from(10_000u64)).unwrap();

        let received = adapter.withdraw(U256::from(1_000u64), 25).unwrap();
        assert_eq!(received, U256::from(990u64));
    }

    #[test]
    fn test_exit_cap() {
        let mut adapter = pool().with_exit_cap(U256::from(300u64));
        adapter.deposit(U256::from(1_000u64)).unwrap();
        assert_eq!(adapter.max_withdraw(), U256::from(300u64));

        let err = adapter.withdraw(U256::from(400u64), 25).unwrap_err();
        assert!(matches!(err, AdapterError::InsufficientLiquidity { .. }));
    }

    #[test]
    fn test_full_exit_burns_all_supply() {
        let mut adapter = pool();
        adapter.deposit(U256::from(777u64)).unwrap();
        adapter.withdraw(U256::from(777u64), 25).unwrap();
        assert!(adapter.balance().is_zero());
        assert!(adapter.supply().is_zero());
    }

    #[test]
    fn test_fail_next_is_one_shot() {
        let mut adapter = pool();
        adapter.fail_next("paused");
        assert!(adapter.deposit(U256::from(10u64)).is_err());
        assert!(adapter.deposit(U256::from(10u64)).is_ok());
    }
}
