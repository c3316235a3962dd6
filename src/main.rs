//! Sett - scenario runner
//!
//! Run with: cargo run -- scenario withdraw-some
//!
//! Deploys a vault, controller and strategy over a deterministic mock pool
//! and walks through the deposit / withdraw-all / withdraw-some flows,
//! printing component balances after every step.

use alloy_primitives::{Address, U256};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{ensure, Result};
use console::style;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sett::adapter::MockPositionAdapter;
use sett::math::{apply_bps, Rounding};
use sett::protocol::Balances;
use sett::tokens::format_amount;
use sett::{Config, Protocol};

/// Account the scenarios deposit from
const DEPOSITOR: Address = Address::with_last_byte(0xD0);

/// Account the mock pool holds want at
const MOCK_POOL: Address = Address::with_last_byte(0xB0);

#[derive(Parser)]
#[command(name = "sett", version, about = "Vault / controller / strategy scenario runner")]
struct Cli {
    /// Load configuration from a TOML file instead of the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one of the reference scenarios against the mock pool
    Scenario {
        #[arg(value_enum)]
        kind: ScenarioKind,

        /// Depositor's starting want balance, in base units (10 WBTC)
        #[arg(long, default_value_t = 1_000_000_000)]
        starting_balance: u64,

        /// Loss the mock pool applies to every exit
        #[arg(long, default_value_t = 0)]
        exit_loss_bps: u64,
    },

    /// Inspect or write configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the active configuration
    Show,

    /// Write the default configuration to a TOML file
    Init { path: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScenarioKind {
    Deposit,
    WithdrawAll,
    WithdrawSome,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🏦 SETT - Vault / Controller / Strategy").cyan().bold()
    );
    println!(
        "{}",
        style("    Share accounting | Routed withdrawals | Bounded exits").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn phase(title: &str) {
    println!();
    println!("{}", style(format!("═══ {} ═══", title)).blue().bold());
    println!();
}

fn print_balances(balances: &Balances, want: &Address) {
    println!("   Vault idle:        {}", format_amount(balances.vault_idle, want));
    println!("   Vault managed:     {}", format_amount(balances.vault_total, want));
    println!("   Available:         {}", format_amount(balances.available, want));
    println!("   Shares:            {}", balances.total_shares);
    println!("   Strategy want:     {}", format_amount(balances.strategy_want, want));
    println!("   Strategy pool:     {}", format_amount(balances.strategy_pool, want));
    println!("   Strategy LP:       {}", balances.strategy_lp);
    println!("   Position:          {}", balances.position_state);
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }
    Ok(config)
}

fn run_scenario(config: Config, kind: ScenarioKind, starting_balance: u64, exit_loss_bps: u64) -> Result<()> {
    let want = config.want;
    let keeper = config.keeper;
    let strategist = config.strategist;

    let adapter = MockPositionAdapter::new(MOCK_POOL)
        .with_name("mock 50WBTC-50WETH")
        .with_exit_loss_bps(exit_loss_bps);
    let mut protocol = Protocol::deploy(config, adapter)?;
    let vault = protocol.addresses().vault;
    let tolerance = protocol.strategy().tolerance();

    let start = U256::from(starting_balance);
    protocol.ledger_mut().mint(want, DEPOSITOR, start)?;
    protocol.approve(DEPOSITOR, U256::MAX);

    // =============================================
    // PHASE 1: DEPOSIT + EARN
    // =============================================
    phase("PHASE 1: DEPOSIT + EARN");

    let deposit = start / U256::from(2u64);
    let shares = protocol.deposit(DEPOSITOR, deposit)?;
    info!("Deposited {} for {} shares", format_amount(deposit, &want), shares);

    let deployed = protocol.earn(keeper)?;
    info!("Earn deployed {}", format_amount(deployed, &want));

    ensure!(!protocol.balance_of_pool().is_zero(), "pool balance is zero after earn");
    ensure!(!protocol.balance_of_lp().is_zero(), "LP balance is zero after earn");
    print_balances(&protocol.balances()?, &want);

    match kind {
        ScenarioKind::Deposit => {}

        // =============================================
        // PHASE 2: WITHDRAW ALL
        // =============================================
        ScenarioKind::WithdrawAll => {
            phase("PHASE 2: WITHDRAW ALL");

            let received = protocol.controller_withdraw_all(strategist, want)?;
            info!("Controller returned {} to the vault", format_amount(received, &want));

            ensure!(protocol.balance_of_pool().is_zero(), "pool balance left after withdraw all");
            ensure!(protocol.balance_of_lp().is_zero(), "LP balance left after withdraw all");
            print_balances(&protocol.balances()?, &want);
        }

        // =============================================
        // PHASE 2: WITHDRAW SOME
        // =============================================
        ScenarioKind::WithdrawSome => {
            phase("PHASE 2: WITHDRAW SOME");

            let amount = start / U256::from(20u64);
            let pool_before = protocol.balance_of_pool();
            let idle_before = protocol.balance_of_asset();

            protocol.controller_withdraw(vault, want, amount)?;

            let pool_delta = pool_before - protocol.balance_of_pool();
            let delivered = protocol.balance_of_asset() - idle_before;
            let minimum = apply_bps(amount, tolerance.kept_bps(), Rounding::Ceiling)?;

            println!("   Requested:         {}", format_amount(amount, &want));
            println!("   Pool delta:        {}", format_amount(pool_delta, &want));
            println!("   Delivered:         {}", format_amount(delivered, &want));
            println!("   Minimum ({}):   {}", tolerance, format_amount(minimum, &want));

            ensure!(pool_delta == amount, "pool moved {} for a request of {}", pool_delta, amount);
            ensure!(delivered >= minimum, "delivered {} below minimum {}", delivered, minimum);
            print_balances(&protocol.balances()?, &want);
        }
    }

    println!();
    println!("{}", style(format!("✅ Scenario {:?} passed", kind)).green().bold());
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sett=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scenario {
            kind,
            starting_balance,
            exit_loss_bps,
        } => {
            print_banner();
            let config = load_config(cli.config.as_ref())?;
            config.print_summary();
            run_scenario(config, kind, starting_balance, exit_loss_bps)?;
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(cli.config.as_ref())?;
                config.print_summary();
            }
            ConfigAction::Init { path } => {
                Config::default().save_to_file(&path)?;
                println!("{} {}", style("Wrote default configuration to").green(), path.display());
            }
        },
    }

    Ok(())
}
