//! Sett configuration
//!
//! Registry of addresses, fee schedule and risk parameters a deployment is
//! built from. Loaded once (environment / .env or a TOML file) and
//! immutable afterwards.

use alloy_primitives::Address;
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::math::MAX_BPS;
use crate::tokens::{symbol_of, BAL, BPT_WBTC_WETH, DEV_MULTISIG, REGISTRY, WBTC};
use crate::types::{
    FeeSchedule, ProtectedAssetSet, SlippageTolerance, DEFAULT_GOV_PERFORMANCE_FEE,
    DEFAULT_PERFORMANCE_FEE, DEFAULT_SLIPPAGE_TOLERANCE_BPS, DEFAULT_VAULT_MIN_BPS,
    DEFAULT_WITHDRAWAL_FEE,
};

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // ========== Assets ==========
    /// Deposited asset, denominates shares
    pub want: Address,

    /// Liquidity position receipt token
    pub lp_component: Address,

    /// Incentive token emitted to the position
    pub reward_token: Address,

    // ========== Actors ==========
    /// Governance multisig (every capability)
    pub governance: Address,

    /// Strategy operator (withdraw all, sweep), receives performance fee
    pub strategist: Address,

    /// Automation (earn, harvest)
    pub keeper: Address,

    /// Receives withdrawal fees and swept tokens
    pub treasury: Address,

    /// Registry used for cross-deployment discovery
    pub registry: Address,

    // ========== Fees (bps) ==========
    pub fees: FeeSchedule,

    // ========== Risk ==========
    /// Minimum share of requested value kept on exit (9975 = 0.25% max loss)
    pub slippage_tolerance_bps: u64,

    /// Share of idle want `earn` may deploy (9500 keeps a 5% buffer)
    pub vault_min_bps: u64,

    // ========== Journal ==========
    /// Append every operation to `journal_path` as JSON lines
    pub journal_enabled: bool,

    pub journal_path: String,
}

fn env_address(key: &str, default: Address) -> Address {
    env::var(key)
        .ok()
        .and_then(|s| Address::from_str(s.trim()).ok())
        .unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let governance = env_address("GOVERNANCE", DEV_MULTISIG);

        Ok(Self {
            // Assets
            want: env_address("WANT_TOKEN", WBTC),
            lp_component: env_address("LP_COMPONENT", BPT_WBTC_WETH),
            reward_token: env_address("REWARD_TOKEN", BAL),

            // Actors default to governance, as in a fresh deployment
            governance,
            strategist: env_address("STRATEGIST", governance),
            keeper: env_address("KEEPER", governance),
            treasury: env_address("TREASURY", governance),
            registry: env_address("REGISTRY", REGISTRY),

            // Fees
            fees: FeeSchedule::new(
                env_parse("GOV_PERFORMANCE_FEE_BPS", DEFAULT_GOV_PERFORMANCE_FEE),
                env_parse("PERFORMANCE_FEE_BPS", DEFAULT_PERFORMANCE_FEE),
                env_parse("WITHDRAWAL_FEE_BPS", DEFAULT_WITHDRAWAL_FEE),
            ),

            // Risk
            slippage_tolerance_bps: env_parse(
                "SLIPPAGE_TOLERANCE_BPS",
                DEFAULT_SLIPPAGE_TOLERANCE_BPS,
            ),
            vault_min_bps: env_parse("VAULT_MIN_BPS", DEFAULT_VAULT_MIN_BPS),

            // Journal
            journal_enabled: env_parse("JOURNAL_ENABLED", false),
            journal_path: env::var("JOURNAL_PATH")
                .unwrap_or_else(|_| "./logs/sett_journal.log".to_string()),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn slippage_tolerance(&self) -> Result<SlippageTolerance> {
        SlippageTolerance::from_bps(self.slippage_tolerance_bps)
    }

    pub fn protected_assets(&self) -> ProtectedAssetSet {
        ProtectedAssetSet::new(self.want, self.lp_component, self.reward_token)
    }

    /// Check bounds before building a deployment
    pub fn validate(&self) -> Result<()> {
        self.fees.validate()?;
        self.slippage_tolerance()?;

        if self.vault_min_bps == 0 || self.vault_min_bps > MAX_BPS {
            return Err(eyre!(
                "VAULT_MIN_BPS must be in (0, {}] (currently {})",
                MAX_BPS,
                self.vault_min_bps
            ));
        }

        if self.want == self.lp_component
            || self.want == self.reward_token
            || self.lp_component == self.reward_token
        {
            return Err(eyre!(
                "want, LP component and reward token must be distinct"
            ));
        }

        for (name, addr) in [
            ("GOVERNANCE", self.governance),
            ("STRATEGIST", self.strategist),
            ("KEEPER", self.keeper),
            ("TREASURY", self.treasury),
        ] {
            if addr == Address::ZERO {
                return Err(eyre!("{} must not be the zero address", name));
            }
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║                  SETT - CONFIGURATION                      ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ ASSETS                                                     ║");
        println!("║ • Want:            {:<40} ║", symbol_of(&self.want));
        println!("║ • LP Component:    {:<40} ║", symbol_of(&self.lp_component));
        println!("║ • Reward:          {:<40} ║", symbol_of(&self.reward_token));
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ FEES                                                       ║");
        println!("║ • Gov Performance: {:>36} bps ║", self.fees.governance_performance_fee);
        println!("║ • Performance:     {:>36} bps ║", self.fees.performance_fee);
        println!("║ • Withdrawal:      {:>36} bps ║", self.fees.withdrawal_fee);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ RISK                                                       ║");
        println!(
            "║ • Max Slippage:    {:>39.2}% ║",
            (MAX_BPS.saturating_sub(self.slippage_tolerance_bps)) as f64 / 100.0
        );
        println!(
            "║ • Earn Buffer:     {:>39.2}% ║",
            (MAX_BPS.saturating_sub(self.vault_min_bps)) as f64 / 100.0
        );
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ JOURNAL                                                    ║");
        println!("║ • Enabled:         {:^40} ║",
            if self.journal_enabled { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            want: WBTC,
            lp_component: BPT_WBTC_WETH,
            reward_token: BAL,
            governance: DEV_MULTISIG,
            strategist: DEV_MULTISIG,
            keeper: DEV_MULTISIG,
            treasury: DEV_MULTISIG,
            registry: REGISTRY,
            fees: FeeSchedule::default(),
            slippage_tolerance_bps: DEFAULT_SLIPPAGE_TOLERANCE_BPS,
            vault_min_bps: DEFAULT_VAULT_MIN_BPS,
            journal_enabled: false,
            journal_path: "./logs/sett_journal.log".to_string(),
        }
    }
}

// ============================================
// TESTS
// ============================================
