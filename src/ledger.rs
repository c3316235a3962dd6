//! Fungible asset ledger
//!
//! In-process stand-in for the ERC20 surface the vault and strategy rely on:
//! `approve`, `transferFrom`, `transfer` and `balanceOf`, keyed by asset
//! address. An allowance of `U256::MAX` is treated as infinite, matching
//! the `MaxUint256` approvals used by depositors.

use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use tracing::trace;

use crate::error::{ProtocolError, Result};

#[derive(Debug, Clone, Default)]
pub struct AssetLedger {
    /// (asset, account) -> balance
    balances: HashMap<(Address, Address), U256>,

    /// (asset, owner, spender) -> allowance
    allowances: HashMap<(Address, Address, Address), U256>,

    /// asset -> total supply
    supplies: HashMap<Address, U256>,
}

impl AssetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, asset: Address, account: Address) -> U256 {
        self.balances
            .get(&(asset, account))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn allowance(&self, asset: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(asset, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self, asset: Address) -> U256 {
        self.supplies.get(&asset).copied().unwrap_or(U256::ZERO)
    }

    pub fn approve(&mut self, asset: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((asset, owner, spender), amount);
    }

    /// Credit `amount` out of thin air (faucet for scenarios and tests)
    pub fn mint(&mut self, asset: Address, to: Address, amount: U256) -> Result<()> {
        let supply = self
            .total_supply(asset)
            .checked_add(amount)
            .ok_or(ProtocolError::ArithmeticOverflow)?;
        let balance = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(ProtocolError::ArithmeticOverflow)?;

        self.supplies.insert(asset, supply);
        self.balances.insert((asset, to), balance);
        Ok(())
    }

    pub fn transfer(&mut self, asset: Address, from: Address, to: Address, amount: U256) -> Result<()> {
        let from_balance = self.balance_of(asset, from);
        if from_balance < amount {
            return Err(ProtocolError::invalid_amount(format!(
                "transfer of {} from {} exceeds balance {}",
                amount, from, from_balance
            )));
        }
        if from == to || amount.is_zero() {
            return Ok(());
        }

        let to_balance = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(ProtocolError::ArithmeticOverflow)?;

        self.balances.insert((asset, from), from_balance - amount);
        self.balances.insert((asset, to), to_balance);

        trace!("transfer {} of {:?}: {:?} -> {:?}", amount, asset, from, to);
        Ok(())
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`.
    /// Fails if the allowance or the balance is insufficient.
    pub fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<()> {
        let allowance = self.allowance(asset, from, spender);
        if spender != from && allowance < amount {
            return Err(ProtocolError::invalid_amount(format!(
                "allowance {} of {} for {} is below {}",
                allowance, from, spender, amount
            )));
        }

        self.transfer(asset, from, to, amount)?;

        if spender != from && allowance != U256::MAX {
            self.allowances
                .insert((asset, from, spender), allowance - amount);
        }
        Ok(())
    }
}
