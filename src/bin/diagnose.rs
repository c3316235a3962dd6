//! Diagnostic tool - Check configuration
//!
//! Run with: cargo run --bin diagnose

use std::env;

use sett::tokens::symbol_of;
use sett::Config;

fn main() {
    println!("🔍 SETT DIAGNOSTIC CHECK\n");

    dotenvy::dotenv().ok();

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    let checks = [
        ("WANT_TOKEN", "WBTC", "Deposited asset"),
        ("LP_COMPONENT", "BPT 50WBTC-50WETH", "Liquidity position token"),
        ("REWARD_TOKEN", "BAL", "Incentive token"),
        ("GOVERNANCE", "dev multisig", "Holds every capability"),
        ("STRATEGIST", "governance", "Withdraw all, sweep"),
        ("KEEPER", "governance", "Earn, harvest"),
        ("TREASURY", "governance", "Fee and sweep recipient"),
        ("GOV_PERFORMANCE_FEE_BPS", "1000", "Governance cut of harvests"),
        ("PERFORMANCE_FEE_BPS", "1000", "Strategist cut of harvests"),
        ("WITHDRAWAL_FEE_BPS", "50", "Fee on want pulled from the strategy"),
        ("SLIPPAGE_TOLERANCE_BPS", "9975", "Kept share of requested exits"),
        ("VAULT_MIN_BPS", "9500", "Share of idle want earn deploys"),
        ("JOURNAL_ENABLED", "false", "Write the operation journal?"),
    ];

    for (key, default, desc) in checks {
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        let marker = if env::var(key).is_err() { "(default)" } else { "(from .env)" };
        println!("  {}: {} {}", key, value, marker);
        println!("    └─ {}\n", desc);
    }

    println!("═══════════════════════════════════════════════════");
    println!("                     STATUS                         ");
    println!("═══════════════════════════════════════════════════\n");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ Failed to load configuration: {}", e);
            return;
        }
    };

    println!("  Want:       {} ({:?})", symbol_of(&config.want), config.want);
    println!("  Protected:  {}", config
        .protected_assets()
        .iter()
        .map(symbol_of)
        .collect::<Vec<_>>()
        .join(", "));

    let roles_shared = config.governance == config.strategist && config.governance == config.keeper;
    if roles_shared {
        println!("  ⚠️  Governance, strategist and keeper are the same account");
    }

    match config.validate() {
        Ok(()) => {
            let perf = config.fees.governance_performance_fee + config.fees.performance_fee;
            println!("  ✅ Configuration valid");
            println!("     → Harvest fees:   {:.2}% total", perf as f64 / 100.0);
            println!("     → Withdrawal fee: {:.2}%", config.fees.withdrawal_fee as f64 / 100.0);
            println!("     → Max slippage:   {:.2}%",
                (10_000 - config.slippage_tolerance_bps) as f64 / 100.0);
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {}", e);
        }
    }

    println!();
}
