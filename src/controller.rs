//! Controller
//!
//! Single authorization and routing point between vaults and strategies.
//! Holds no assets beyond the span of one call: whatever a strategy hands
//! over is forwarded in the same operation.
//!
//! Route checks:
//! - `withdraw` / `deploy`: caller must be the vault registered for the asset
//! - `withdraw_all`: `WithdrawAll` capability
//! - `sweep`: `Sweep` capability
//! - `harvest`: `Harvest` capability

use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::access::{AccessControl, Capability};
use crate::adapter::PositionAdapter;
use crate::error::{ProtocolError, Result};
use crate::ledger::AssetLedger;
use crate::strategy::{HarvestReport, Strategy};

#[derive(Debug, Clone)]
pub struct Controller {
    address: Address,

    /// Receives swept tokens and withdrawal fees
    rewards: Address,

    /// asset -> authorized vault
    vaults: HashMap<Address, Address>,

    /// asset -> active strategy
    strategies: HashMap<Address, Address>,

    access: AccessControl,
}

impl Controller {
    pub fn new(address: Address, rewards: Address, access: AccessControl) -> Self {
        Self {
            address,
            rewards,
            vaults: HashMap::new(),
            strategies: HashMap::new(),
            access,
        }
    }

    /// Wire an asset to its vault and strategy (deployment time only)
    pub fn register(&mut self, asset: Address, vault: Address, strategy: Address) {
        self.vaults.insert(asset, vault);
        self.strategies.insert(asset, strategy);
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn rewards(&self) -> Address {
        self.rewards
    }

    pub fn vault_for(&self, asset: Address) -> Option<Address> {
        self.vaults.get(&asset).copied()
    }

    pub fn strategy_for(&self, asset: Address) -> Option<Address> {
        self.strategies.get(&asset).copied()
    }

    /// Total want the strategy for `asset` manages
    pub fn balance_of<A: PositionAdapter>(
        &self,
        ledger: &AssetLedger,
        strategy: &Strategy<A>,
        asset: Address,
    ) -> U256 {
        if self.strategy_for(asset) == Some(strategy.address()) {
            strategy.balance_of(ledger)
        } else {
            U256::ZERO
        }
    }

    // ============================================
    // ROUTE CHECKS
    // ============================================

    fn registered_vault(&self, asset: Address, caller: Address) -> Result<Address> {
        self.vault_for(asset).ok_or_else(|| {
            ProtocolError::denied(caller, format!("route unregistered asset {:?}", asset))
        })
    }

    fn only_vault(&self, asset: Address, caller: Address, action: &str) -> Result<Address> {
        let vault = self.registered_vault(asset, caller)?;
        if caller != vault {
            warn!("Controller: {} rejected for {:?}", action, caller);
            return Err(ProtocolError::denied(caller, action));
        }
        Ok(vault)
    }

    fn ensure_strategy<A: PositionAdapter>(
        &self,
        asset: Address,
        strategy: &Strategy<A>,
        caller: Address,
    ) -> Result<()> {
        match self.strategy_for(asset) {
            Some(registered) if registered == strategy.address() && strategy.want() == asset => {
                Ok(())
            }
            _ => Err(ProtocolError::denied(
                caller,
                format!("route to unregistered strategy {:?}", strategy.address()),
            )),
        }
    }

    // ============================================
    // ROUTES
    // ============================================

    /// Vault-only partial withdrawal. Forwards exactly what the strategy
    /// returned.
    pub fn withdraw<A: PositionAdapter>(
        &self,
        ledger: &mut AssetLedger,
        strategy: &mut Strategy<A>,
        asset: Address,
        amount: U256,
        caller: Address,
    ) -> Result<U256> {
        let vault = self.only_vault(asset, caller, "withdraw from controller")?;
        if amount.is_zero() {
            return Err(ProtocolError::invalid_amount("controller withdrawal of zero"));
        }
        self.ensure_strategy(asset, strategy, caller)?;

        let received = strategy.withdraw(ledger, self.address, amount)?;
        ledger.transfer(asset, self.address, vault, received)?;

        info!("Controller: routed {} to vault (requested {})", received, amount);
        Ok(received)
    }

    /// Privileged full unwind; everything recovered goes to the vault.
    pub fn withdraw_all<A: PositionAdapter>(
        &self,
        ledger: &mut AssetLedger,
        strategy: &mut Strategy<A>,
        asset: Address,
        caller: Address,
    ) -> Result<U256> {
        self.access.require(caller, Capability::WithdrawAll)?;
        let vault = self.registered_vault(asset, caller)?;
        self.ensure_strategy(asset, strategy, caller)?;

        let received = strategy.withdraw_all(ledger, self.address)?;
        ledger.transfer(asset, self.address, vault, received)?;

        info!("Controller: withdraw all routed {} to vault", received);
        Ok(received)
    }

    /// Vault-only deployment of want the vault has already handed over.
    pub fn deploy<A: PositionAdapter>(
        &self,
        ledger: &mut AssetLedger,
        strategy: &mut Strategy<A>,
        asset: Address,
        amount: U256,
        caller: Address,
    ) -> Result<U256> {
        self.only_vault(asset, caller, "deploy through controller")?;
        if amount.is_zero() {
            return Err(ProtocolError::invalid_amount("deployment of zero"));
        }
        self.ensure_strategy(asset, strategy, caller)?;

        ledger.transfer(asset, self.address, strategy.address(), amount)?;
        strategy.deposit(ledger, self.address, amount)
    }

    /// Recover a non-protected token stuck in the strategy to the rewards
    /// account.
    pub fn sweep<A: PositionAdapter>(
        &self,
        ledger: &mut AssetLedger,
        strategy: &mut Strategy<A>,
        asset: Address,
        token: Address,
        caller: Address,
    ) -> Result<U256> {
        self.access.require(caller, Capability::Sweep)?;
        self.ensure_strategy(asset, strategy, caller)?;

        let swept = strategy.withdraw_other(ledger, self.address, token)?;
        ledger.transfer(token, self.address, self.rewards, swept)?;
        Ok(swept)
    }

    pub fn harvest<A: PositionAdapter>(
        &self,
        ledger: &mut AssetLedger,
        strategy: &mut Strategy<A>,
        asset: Address,
        caller: Address,
    ) -> Result<HarvestReport> {
        self.access.require(caller, Capability::Harvest)?;
        self.ensure_strategy(asset, strategy, caller)?;
        strategy.harvest(ledger, self.address)
    }
}
