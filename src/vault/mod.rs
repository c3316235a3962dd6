//! Vault (Sett)
//!
//! Holds idle want, issues shares against total managed assets and pushes
//! spare want to the controller. User withdrawals are served from idle
//! want first; any shortfall is pulled back through the controller and only
//! that pulled portion pays the withdrawal fee.

mod shares;

pub use shares::{assets_for_shares, shares_for_deposit, ShareLedger};

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, info};

use crate::access::{AccessControl, Capability};
use crate::adapter::PositionAdapter;
use crate::controller::Controller;
use crate::error::{ProtocolError, Result};
use crate::ledger::AssetLedger;
use crate::math::{apply_bps, checked_add, checked_sub, mul_div, one_e18, Rounding};
use crate::strategy::Strategy;
use crate::types::FeeSchedule;

#[derive(Debug, Clone)]
pub struct VaultParams {
    pub address: Address,
    pub want: Address,
    pub controller: Address,
    /// Withdrawal fee recipient
    pub treasury: Address,
    /// Share of idle want `earn` may deploy (bps)
    pub min_bps: u64,
    pub fees: FeeSchedule,
}

/// What a user withdrawal paid out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WithdrawReceipt {
    pub shares_burned: U256,
    /// Proportional claim at burn time
    pub claim: U256,
    /// Want pulled back from the strategy
    pub pulled: U256,
    pub fee: U256,
    pub paid: U256,
}

#[derive(Debug, Clone)]
pub struct Vault {
    address: Address,
    want: Address,
    controller: Address,
    treasury: Address,
    min_bps: u64,
    fees: FeeSchedule,
    shares: ShareLedger,
    access: AccessControl,
}

impl Vault {
    pub fn new(params: VaultParams, access: AccessControl) -> Self {
        Self {
            address: params.address,
            want: params.want,
            controller: params.controller,
            treasury: params.treasury,
            min_bps: params.min_bps,
            fees: params.fees,
            shares: ShareLedger::default(),
            access,
        }
    }

    // ============================================
    // READS
    // ============================================

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn want(&self) -> Address {
        self.want
    }

    pub fn total_supply(&self) -> U256 {
        self.shares.total_supply()
    }

    pub fn shares_of(&self, account: Address) -> U256 {
        self.shares.balance_of(account)
    }

    /// Idle want held by the vault
    pub fn balance_of_asset(&self, ledger: &AssetLedger) -> U256 {
        ledger.balance_of(self.want, self.address)
    }

    /// Total managed assets: idle want plus everything the strategy holds
    pub fn balance<A: PositionAdapter>(
        &self,
        ledger: &AssetLedger,
        controller: &Controller,
        strategy: &Strategy<A>,
    ) -> U256 {
        self.balance_of_asset(ledger)
            .saturating_add(controller.balance_of(ledger, strategy, self.want))
    }

    /// Idle want eligible for deployment; the rest is the withdrawal buffer
    pub fn available(&self, ledger: &AssetLedger) -> Result<U256> {
        apply_bps(self.balance_of_asset(ledger), self.min_bps, Rounding::Floor)
    }

    /// Value of one full share (1e18), 1e18 for an empty vault
    pub fn price_per_full_share<A: PositionAdapter>(
        &self,
        ledger: &AssetLedger,
        controller: &Controller,
        strategy: &Strategy<A>,
    ) -> Result<U256> {
        let supply = self.total_supply();
        if supply.is_zero() {
            return Ok(one_e18());
        }
        mul_div(
            self.balance(ledger, controller, strategy),
            one_e18(),
            supply,
            Rounding::Floor,
        )
    }

    // ============================================
    // DEPOSIT
    // ============================================

    /// Pull `amount` of want from `caller` and mint shares against NAV.
    pub fn deposit<A: PositionAdapter>(
        &mut self,
        ledger: &mut AssetLedger,
        controller: &Controller,
        strategy: &Strategy<A>,
        caller: Address,
        amount: U256,
    ) -> Result<U256> {
        if amount.is_zero() {
            return Err(ProtocolError::invalid_amount("deposit of zero"));
        }

        let pool = self.balance(ledger, controller, strategy);
        let shares = shares_for_deposit(amount, self.total_supply(), pool)?;
        if shares.is_zero() {
            return Err(ProtocolError::invalid_amount(format!(
                "deposit of {} is too small to mint a share",
                amount
            )));
        }

        ledger.transfer_from(self.want, self.address, caller, self.address, amount)?;
        self.shares.mint(caller, shares)?;

        info!("Vault: {:?} deposited {} for {} shares", caller, amount, shares);
        Ok(shares)
    }

    pub fn deposit_all<A: PositionAdapter>(
        &mut self,
        ledger: &mut AssetLedger,
        controller: &Controller,
        strategy: &Strategy<A>,
        caller: Address,
    ) -> Result<U256> {
        let amount = ledger.balance_of(self.want, caller);
        self.deposit(ledger, controller, strategy, caller, amount)
    }

    // ============================================
    // EARN
    // ============================================

    /// Push `available()` to the controller for deployment. Returns the
    /// amount deployed; zero is a no-op.
    pub fn earn<A: PositionAdapter>(
        &mut self,
        ledger: &mut AssetLedger,
        controller: &Controller,
        strategy: &mut Strategy<A>,
        caller: Address,
    ) -> Result<U256> {
        self.access.require(caller, Capability::Earn)?;

        let amount = self.available(ledger)?;
        if amount.is_zero() {
            debug!("Vault: nothing available to earn");
            return Ok(U256::ZERO);
        }

        ledger.transfer(self.want, self.address, self.controller, amount)?;
        controller.deploy(ledger, strategy, self.want, amount, self.address)?;

        info!("Vault: earn pushed {} to strategy", amount);
        Ok(amount)
    }

    // ============================================
    // WITHDRAW
    // ============================================

    /// Burn `shares` and pay out the proportional claim, pulling any
    /// shortfall back from the strategy.
    pub fn withdraw<A: PositionAdapter>(
        &mut self,
        ledger: &mut AssetLedger,
        controller: &Controller,
        strategy: &mut Strategy<A>,
        caller: Address,
        shares: U256,
    ) -> Result<WithdrawReceipt> {
        if shares.is_zero() {
            return Err(ProtocolError::invalid_amount("withdrawal of zero shares"));
        }
        let held = self.shares_of(caller);
        if shares > held {
            return Err(ProtocolError::invalid_amount(format!(
                "withdrawal of {} shares exceeds balance {}",
                shares, held
            )));
        }

        let pool = self.balance(ledger, controller, strategy);
        let claim = assets_for_shares(shares, self.total_supply(), pool)?;

        let idle = self.balance_of_asset(ledger);
        let mut pulled = U256::ZERO;
        let mut owed = claim;

        if idle < claim {
            let shortfall = claim - idle;
            let request = shortfall.min(strategy.balance_of_pool());
            if !request.is_zero() {
                pulled = controller.withdraw(ledger, strategy, self.want, request, self.address)?;
            }
            if pulled < shortfall {
                owed = checked_add(idle, pulled)?;
            }
        }

        let fee = self.fees.withdrawal_fee_on(pulled)?;
        let paid = checked_sub(owed, fee, "withdrawal fee")?;
        if checked_add(paid, fee)? > claim {
            return Err(ProtocolError::invalid_amount(format!(
                "payout {} exceeds claim {}",
                paid, claim
            )));
        }

        ledger.transfer(self.want, self.address, self.treasury, fee)?;
        ledger.transfer(self.want, self.address, caller, paid)?;
        self.shares.burn(caller, shares)?;

        info!(
            "Vault: {:?} burned {} shares for {} (pulled {}, fee {})",
            caller, shares, paid, pulled, fee
        );
        Ok(WithdrawReceipt {
            shares_burned: shares,
            claim,
            pulled,
            fee,
            paid,
        })
    }

    pub fn withdraw_all<A: PositionAdapter>(
        &mut self,
        ledger: &mut AssetLedger,
        controller: &Controller,
        strategy: &mut Strategy<A>,
        caller: Address,
    ) -> Result<WithdrawReceipt> {
        let shares = self.shares_of(caller);
        self.withdraw(ledger, controller, strategy, caller, shares)
    }
}
