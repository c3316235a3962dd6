//! Shared value types: fees, slippage bound, protected assets

use alloy_primitives::{Address, U256};
use eyre::{eyre, Result as EyreResult};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::math::{apply_bps, Rounding, MAX_BPS};

// ============================================
// DEFAULTS
// ============================================

/// 10% of harvested gain to governance
pub const DEFAULT_GOV_PERFORMANCE_FEE: u64 = 1000;

/// 10% of harvested gain to the strategist
pub const DEFAULT_PERFORMANCE_FEE: u64 = 1000;

/// 0.5% of want pulled out of the strategy on user withdrawals
pub const DEFAULT_WITHDRAWAL_FEE: u64 = 50;

/// Keep at least 99.75% of requested value on exit (0.25% max loss)
pub const DEFAULT_SLIPPAGE_TOLERANCE_BPS: u64 = 9975;

/// Share of idle want `earn` may deploy; the rest stays as withdrawal buffer
pub const DEFAULT_VAULT_MIN_BPS: u64 = 9500;

// ============================================
// FEE SCHEDULE
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub governance_performance_fee: u64,
    pub performance_fee: u64,
    pub withdrawal_fee: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            governance_performance_fee: DEFAULT_GOV_PERFORMANCE_FEE,
            performance_fee: DEFAULT_PERFORMANCE_FEE,
            withdrawal_fee: DEFAULT_WITHDRAWAL_FEE,
        }
    }
}

impl FeeSchedule {
    pub fn new(governance_performance_fee: u64, performance_fee: u64, withdrawal_fee: u64) -> Self {
        Self {
            governance_performance_fee,
            performance_fee,
            withdrawal_fee,
        }
    }

    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Fees on one flow can never exceed the gross amount
    pub fn validate(&self) -> EyreResult<()> {
        for (name, bps) in [
            ("governance performance fee", self.governance_performance_fee),
            ("performance fee", self.performance_fee),
            ("withdrawal fee", self.withdrawal_fee),
        ] {
            if bps > MAX_BPS {
                return Err(eyre!("{} of {} bps exceeds {} bps", name, bps, MAX_BPS));
            }
        }
        if self.governance_performance_fee + self.performance_fee > MAX_BPS {
            return Err(eyre!(
                "performance fees sum to {} bps, above {} bps",
                self.governance_performance_fee + self.performance_fee,
                MAX_BPS
            ));
        }
        Ok(())
    }

    /// (governance fee, strategist fee) taken from a harvested gain
    pub fn performance_fees(&self, gain: U256) -> Result<(U256, U256)> {
        let governance = apply_bps(gain, self.governance_performance_fee, Rounding::Floor)?;
        let strategist = apply_bps(gain, self.performance_fee, Rounding::Floor)?;
        Ok((governance, strategist))
    }

    pub fn withdrawal_fee_on(&self, amount: U256) -> Result<U256> {
        apply_bps(amount, self.withdrawal_fee, Rounding::Floor)
    }
}

// ============================================
// SLIPPAGE TOLERANCE
// ============================================

/// Minimum fraction of requested value that must come back from an exit,
/// in bps of the request (9975 = at most 0.25% lost)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlippageTolerance {
    kept_bps: u64,
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        Self {
            kept_bps: DEFAULT_SLIPPAGE_TOLERANCE_BPS,
        }
    }
}

impl SlippageTolerance {
    pub fn from_bps(kept_bps: u64) -> EyreResult<Self> {
        if kept_bps == 0 || kept_bps > MAX_BPS {
            return Err(eyre!(
                "slippage tolerance must be in (0, {}] bps, got {}",
                MAX_BPS,
                kept_bps
            ));
        }
        Ok(Self { kept_bps })
    }

    pub fn kept_bps(&self) -> u64 {
        self.kept_bps
    }

    /// Loss allowed, as passed to the adapter
    pub fn max_slippage_bps(&self) -> u64 {
        MAX_BPS - self.kept_bps.min(MAX_BPS)
    }

    /// Smallest acceptable proceeds for `requested`, rounded up
    pub fn min_received(&self, requested: U256) -> Result<U256> {
        apply_bps(requested, self.kept_bps, Rounding::Ceiling)
    }

    pub fn check(&self, requested: U256, received: U256) -> Result<()> {
        let minimum = self.min_received(requested)?;
        if received < minimum {
            return Err(ProtocolError::SlippageExceeded {
                requested,
                received,
                minimum,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for SlippageTolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.max_slippage_bps() as f64 / 100.0)
    }
}

// ============================================
// PROTECTED ASSETS
// ============================================

/// Assets sweep operations must never move: want, LP component, reward token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedAssetSet {
    assets: Vec<Address>,
}

impl ProtectedAssetSet {
    pub fn new(want: Address, lp_component: Address, reward: Address) -> Self {
        Self {
            assets: vec![want, lp_component, reward],
        }
    }

    pub fn contains(&self, asset: &Address) -> bool {
        self.assets.contains(asset)
    }

    pub fn ensure_not_protected(&self, asset: Address) -> Result<()> {
        if self.contains(&asset) {
            return Err(ProtocolError::ProtectedAssetViolation { asset });
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.assets.iter()
    }
}
