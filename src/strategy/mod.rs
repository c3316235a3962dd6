//! Strategy
//!
//! Owns the position adapter and the [`Position`] bookkeeping. Every entry
//! point is controller-only; the strategy never talks to the vault
//! directly.
//!
//! ## Exit contract
//!
//! A partial withdrawal of `X` lowers `balance_of_pool` by exactly `X` and
//! must return at least `X * tolerance`, otherwise the call fails with
//! `SlippageExceeded` and nothing is committed.
//!
//! Adapter calls run on a staged copy of the adapter. The copy replaces the
//! live one only after every check has passed and the ledger transfers
//! have gone through.

mod position;

pub use position::{Position, PositionState};

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::adapter::{AdapterError, PositionAdapter};
use crate::error::{ProtocolError, Result};
use crate::ledger::AssetLedger;
use crate::math::{checked_add, checked_sub};
use crate::types::{FeeSchedule, ProtectedAssetSet, SlippageTolerance};

/// Upper bound on exit rounds in `withdraw_all` when the pool caps exits
pub const MAX_EXIT_ROUNDS: usize = 16;

/// Addresses and parameters a strategy is deployed with
#[derive(Debug, Clone)]
pub struct StrategyParams {
    pub address: Address,
    pub controller: Address,
    pub want: Address,
    pub lp_component: Address,
    pub reward: Address,
    pub governance: Address,
    pub strategist: Address,
    pub fees: FeeSchedule,
    pub tolerance: SlippageTolerance,
}

/// Outcome of a harvest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    /// Position value above cost basis at harvest time
    pub gain: U256,
    /// Want actually realized from the gain
    pub realized: U256,
    pub governance_fee: U256,
    pub strategist_fee: U256,
    /// Realized gain put back into the position
    pub compounded: U256,
    /// Realized gain left as idle want (too small to compound)
    pub retained: U256,
}

#[derive(Debug, Clone)]
pub struct Strategy<A> {
    address: Address,
    controller: Address,
    want: Address,
    governance: Address,
    strategist: Address,
    fees: FeeSchedule,
    tolerance: SlippageTolerance,
    protected: ProtectedAssetSet,
    adapter: A,
    position: Position,
    state: PositionState,
}

impl<A: PositionAdapter> Strategy<A> {
    pub fn new(params: StrategyParams, adapter: A) -> Self {
        Self {
            protected: ProtectedAssetSet::new(params.want, params.lp_component, params.reward),
            address: params.address,
            controller: params.controller,
            want: params.want,
            governance: params.governance,
            strategist: params.strategist,
            fees: params.fees,
            tolerance: params.tolerance,
            adapter,
            position: Position::default(),
            state: PositionState::Empty,
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

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn position_state(&self) -> PositionState {
        self.state
    }

    pub fn tolerance(&self) -> SlippageTolerance {
        self.tolerance
    }

    /// Tokens `withdraw_other` refuses to move
    pub fn protected_assets(&self) -> &ProtectedAssetSet {
        &self.protected
    }

    /// Idle want held by the strategy
    pub fn balance_of_want(&self, ledger: &AssetLedger) -> U256 {
        ledger.balance_of(self.want, self.address)
    }

    /// Want-equivalent value of the position
    pub fn balance_of_pool(&self) -> U256 {
        self.adapter.balance()
    }

    /// Raw receipt tokens held
    pub fn balance_of_lp(&self) -> U256 {
        self.position.position_token_amount
    }

    /// Idle want plus position value
    pub fn balance_of(&self, ledger: &AssetLedger) -> U256 {
        self.balance_of_want(ledger)
            .saturating_add(self.balance_of_pool())
    }

    fn only_controller(&self, caller: Address, action: &str) -> Result<()> {
        if caller != self.controller {
            warn!("Strategy: rejected {} from {:?}", action, caller);
            return Err(ProtocolError::denied(caller, format!("call strategy {}", action)));
        }
        Ok(())
    }

    // ============================================
    // DEPOSIT
    // ============================================

    /// Move `amount` of idle want into the position
    pub fn deposit(
        &mut self,
        ledger: &mut AssetLedger,
        caller: Address,
        amount: U256,
    ) -> Result<U256> {
        self.only_controller(caller, "deposit")?;

        if amount.is_zero() {
            return Err(ProtocolError::invalid_amount("strategy deposit of zero"));
        }
        let idle = self.balance_of_want(ledger);
        if amount > idle {
            return Err(ProtocolError::invalid_amount(format!(
                "strategy deposit of {} exceeds idle want {}",
                amount, idle
            )));
        }

        let mut adapter = self.adapter.clone();
        let minted = adapter.deposit(amount)?;
        let next = self.position.after_deposit(amount, minted)?;
        ledger.transfer(self.want, self.address, adapter.address(), amount)?;

        self.adapter = adapter;
        self.position = next;
        self.state = PositionState::Deployed;

        info!(
            "Strategy: deployed {} into {} ({} receipt tokens)",
            amount,
            self.adapter.name(),
            minted
        );
        Ok(minted)
    }

    // ============================================
    // WITHDRAW
    // ============================================

    /// Exit exactly `amount` worth of the position and hand the proceeds
    /// to the controller.
    pub fn withdraw(
        &mut self,
        ledger: &mut AssetLedger,
        caller: Address,
        amount: U256,
    ) -> Result<U256> {
        self.only_controller(caller, "withdraw")?;

        if amount.is_zero() {
            return Err(ProtocolError::invalid_amount("strategy withdrawal of zero"));
        }
        let pool_before = self.balance_of_pool();
        if amount > pool_before {
            return Err(ProtocolError::invalid_amount(format!(
                "withdrawal of {} exceeds pool balance {}",
                amount, pool_before
            )));
        }

        let (next, burned) = self.position.after_withdrawal(amount, pool_before)?;

        let mut adapter = self.adapter.clone();
        let received = self.exit(&mut adapter, amount, pool_before)?;

        ledger.transfer(self.want, adapter.address(), self.address, received)?;
        ledger.transfer(self.want, self.address, self.controller, received)?;

        self.adapter = adapter;
        self.position = next;
        self.state = if next.is_empty() {
            PositionState::Empty
        } else {
            PositionState::PartiallyWithdrawn
        };

        info!(
            "Strategy: withdrew {} from pool, received {} (burned {} receipt tokens)",
            amount, received, burned
        );
        Ok(received)
    }

    /// Unwind the whole position and send every unit of want to the
    /// controller. Exits repeat while the pool caps single exits, for at
    /// most [`MAX_EXIT_ROUNDS`] rounds; a position that still holds value
    /// after that fails with `ExitIncomplete` and nothing is committed.
    pub fn withdraw_all(
        &mut self,
        ledger: &mut AssetLedger,
        caller: Address,
    ) -> Result<U256> {
        self.only_controller(caller, "withdraw all")?;

        let mut adapter = self.adapter.clone();
        let mut rounds = 0;
        let mut recovered = U256::ZERO;

        while !adapter.balance().is_zero() {
            let remaining = adapter.balance();
            let chunk = remaining.min(adapter.max_withdraw());
            if rounds == MAX_EXIT_ROUNDS || chunk.is_zero() {
                return Err(AdapterError::ExitIncomplete { remaining }.into());
            }

            let received = self.exit(&mut adapter, chunk, remaining)?;
            recovered = checked_add(recovered, received)?;
            rounds += 1;
            debug!("Strategy: exit round {} took {} (received {})", rounds, chunk, received);
        }

        ledger.transfer(self.want, adapter.address(), self.address, recovered)?;
        let total = self.balance_of_want(ledger);
        ledger.transfer(self.want, self.address, self.controller, total)?;

        self.adapter = adapter;
        self.position = Position::default();
        self.state = PositionState::Empty;

        info!(
            "Strategy: position closed in {} rounds, recovered {} ({} returned to controller)",
            rounds, recovered, total
        );
        Ok(total)
    }

    /// Adapter exit plus the slippage and valuation checks shared by every
    /// withdrawal path.
    fn exit(&self, adapter: &mut A, amount: U256, pool_before: U256) -> Result<U256> {
        let received = adapter.withdraw(amount, self.tolerance.max_slippage_bps())?;
        self.tolerance.check(amount, received)?;

        let expected = pool_before - amount;
        let actual = adapter.balance();
        if actual != expected {
            return Err(AdapterError::ValuationDrift { expected, actual }.into());
        }
        Ok(received)
    }

    // ============================================
    // HARVEST
    // ============================================

    /// Realize position value above cost basis, pay performance fees and
    /// compound the rest.
    pub fn harvest(
        &mut self,
        ledger: &mut AssetLedger,
        caller: Address,
    ) -> Result<HarvestReport> {
        self.only_controller(caller, "harvest")?;

        let pool_before = self.balance_of_pool();
        let gain = pool_before.saturating_sub(self.position.deployed_asset_amount);
        if gain.is_zero() {
            debug!("Strategy: nothing to harvest");
            return Ok(HarvestReport::default());
        }

        let burned = self.position.tokens_for(gain, pool_before)?;
        let mut adapter = self.adapter.clone();
        let realized = self.exit(&mut adapter, gain, pool_before)?;

        let (governance_fee, strategist_fee) = self.fees.performance_fees(realized)?;
        let remainder = checked_sub(
            checked_sub(realized, governance_fee, "governance fee")?,
            strategist_fee,
            "strategist fee",
        )?;

        // Dust too small to mint a receipt token stays idle in the strategy
        let mut tokens = self.position.position_token_amount - burned;
        let mut compounded = U256::ZERO;
        if !remainder.is_zero() {
            match adapter.deposit(remainder) {
                Ok(minted) => {
                    tokens = checked_add(tokens, minted)?;
                    compounded = remainder;
                }
                Err(AdapterError::DepositTooSmall { amount }) => {
                    debug!("Strategy: {} too small to compound, kept idle", amount);
                }
                Err(e) => return Err(e.into()),
            }
        }
        let retained = remainder - compounded;

        ledger.transfer(self.want, adapter.address(), self.address, realized)?;
        ledger.transfer(self.want, self.address, self.governance, governance_fee)?;
        ledger.transfer(self.want, self.address, self.strategist, strategist_fee)?;
        ledger.transfer(self.want, self.address, adapter.address(), compounded)?;

        self.adapter = adapter;
        // Cost basis resets to the marked value after compounding
        self.position = Position {
            deployed_asset_amount: self.balance_of_pool(),
            position_token_amount: tokens,
        };
        if self.position.is_empty() {
            self.state = PositionState::Empty;
        }

        let report = HarvestReport {
            gain,
            realized,
            governance_fee,
            strategist_fee,
            compounded,
            retained,
        };
        info!(
            "Strategy: harvested {} (gov fee {}, strategist fee {}, compounded {})",
            realized, governance_fee, strategist_fee, compounded
        );
        Ok(report)
    }

    // ============================================
    // SWEEP
    // ============================================

    /// Hand a stray token to the controller. Protected assets are refused.
    pub fn withdraw_other(
        &mut self,
        ledger: &mut AssetLedger,
        caller: Address,
        token: Address,
    ) -> Result<U256> {
        self.only_controller(caller, "withdraw other")?;
        self.protected.ensure_not_protected(token)?;

        let balance = ledger.balance_of(token, self.address);
        ledger.transfer(token, self.address, self.controller, balance)?;
        info!("Strategy: swept {} of {:?} to controller", balance, token);
        Ok(balance)
    }
}
