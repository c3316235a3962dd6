//! Token definitions for the Sett
//!
//! The default deployment is a WBTC vault whose strategy provides liquidity
//! to the Balancer 50 WBTC / 50 WETH pool and earns BAL.

use alloy_primitives::{address, Address, U256};
use std::collections::HashMap;

use crate::math::to_f64;

/// WBTC, the want asset
pub const WBTC: Address = address!("2260fac5e5542a773aa44fbcfedf7c193bc2c599");

/// Balancer 50 WBTC 50 WETH pool token, the LP component
pub const BPT_WBTC_WETH: Address = address!("a6f548df93de924d73be7d25dc02554c6bd66db5");

/// BAL, the reward token
pub const BAL: Address = address!("ba100000625a3754423978a60c9317c58a424e3d");

/// Badger dev multisig (governance)
pub const DEV_MULTISIG: Address = address!("b65cef03b9b89f99517643226d76e286ee999e77");

/// Multichain registry for cross-deployment discovery
pub const REGISTRY: Address = address!("fda7eb6f8b7a9e9fcfd348042ae675d1d652454f");

/// Represents a token the sett touches
#[derive(Debug, Clone)]
pub struct Token {
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
    pub role: TokenRole,
}

/// What a token is used for in the sett
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRole {
    /// Deposited asset, denominates shares
    Want,

    /// Receipt token of the liquidity position
    LpComponent,

    /// Incentive token emitted to the position
    Reward,
}

impl std::fmt::Display for TokenRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenRole::Want => write!(f, "want"),
            TokenRole::LpComponent => write!(f, "lp component"),
            TokenRole::Reward => write!(f, "reward"),
        }
    }
}

pub fn sett_tokens() -> Vec<Token> {
    vec![
        Token {
            symbol: "WBTC",
            address: WBTC,
            decimals: 8,
            role: TokenRole::Want,
        },
        Token {
            symbol: "B-50WBTC-50WETH",
            address: BPT_WBTC_WETH,
            decimals: 18,
            role: TokenRole::LpComponent,
        },
        Token {
            symbol: "BAL",
            address: BAL,
            decimals: 18,
            role: TokenRole::Reward,
        },
    ]
}

/// Address -> token lookup
pub fn token_map() -> HashMap<Address, Token> {
    sett_tokens()
        .into_iter()
        .map(|t| (t.address, t))
        .collect()
}

/// Decimals for known tokens, 18 otherwise
pub fn decimals_of(address: &Address) -> u8 {
    token_map().get(address).map(|t| t.decimals).unwrap_or(18)
}

pub fn symbol_of(address: &Address) -> String {
    token_map()
        .get(address)
        .map(|t| t.symbol.to_string())
        .unwrap_or_else(|| format!("0x{}...", &format!("{:?}", address)[2..8]))
}

/// "1.25000000 WBTC"
pub fn format_amount(amount: U256, token: &Address) -> String {
    let decimals = decimals_of(token);
    format!(
        "{:.*} {}",
        decimals as usize,
        to_f64(amount, decimals),
        symbol_of(token)
    )
}
