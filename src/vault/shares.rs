//! Share ledger and NAV conversions
//!
//! Shares are minted against total managed assets (idle + deployed):
//! `shares = assets * total_shares / total_assets`, 1:1 for the first
//! depositor. Both directions round down, in the vault's favor.

use alloy_primitives::{Address, U256};
use std::collections::HashMap;

use crate::error::{ProtocolError, Result};
use crate::math::{checked_add, checked_sub, mul_div, Rounding};

#[derive(Debug, Clone, Default)]
pub struct ShareLedger {
    balances: HashMap<Address, U256>,
    total_supply: U256,
}

impl ShareLedger {
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn mint(&mut self, to: Address, shares: U256) -> Result<()> {
        let balance = checked_add(self.balance_of(to), shares)?;
        self.total_supply = checked_add(self.total_supply, shares)?;
        self.balances.insert(to, balance);
        Ok(())
    }

    pub fn burn(&mut self, from: Address, shares: U256) -> Result<()> {
        let balance = checked_sub(self.balance_of(from), shares, "share burn")?;
        self.total_supply = checked_sub(self.total_supply, shares, "share burn")?;
        if balance.is_zero() {
            self.balances.remove(&from);
        } else {
            self.balances.insert(from, balance);
        }
        Ok(())
    }
}

/// Shares minted for a deposit of `assets` into a vault managing
/// `total_assets` before the deposit.
pub fn shares_for_deposit(assets: U256, total_shares: U256, total_assets: U256) -> Result<U256> {
    if total_shares.is_zero() {
        return Ok(assets);
    }
    if total_assets.is_zero() {
        return Err(ProtocolError::invalid_amount(
            "vault has outstanding shares but no assets",
        ));
    }
    mul_div(assets, total_shares, total_assets, Rounding::Floor)
}

/// Assets owed for burning `shares`
pub fn assets_for_shares(shares: U256, total_shares: U256, total_assets: U256) -> Result<U256> {
    if total_shares.is_zero() {
        return Err(ProtocolError::invalid_amount("no shares outstanding"));
    }
    mul_div(shares, total_assets, total_shares, Rounding::Floor)
}
