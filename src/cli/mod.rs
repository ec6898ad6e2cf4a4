use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::LedgerService;
use crate::domain::{AccountId, format_cents, parse_cents};
use crate::storage::StoreConfig;
use crate::{server, telemetry};

/// Custodia - Custodial Wallet Ledger
#[derive(Parser)]
#[command(name = "custodia")]
#[command(about = "A minimal custodial wallet ledger: accounts, deposits and transfers")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "CUSTODIA_DATABASE", default_value = "custodia.db")]
    pub database: String,

    /// Maximum number of pooled database connections
    #[arg(long, env = "CUSTODIA_MAX_CONNECTIONS", default_value_t = 8)]
    pub max_connections: u32,

    /// How long to wait on a locked database, in milliseconds
    #[arg(long, env = "CUSTODIA_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database (safe to repeat)
    Init,

    /// Open a new account with a random 6-digit id
    CreateAccount {
        /// Display name of the account holder
        name: String,

        /// Opening balance (e.g., "50.00" or "50")
        #[arg(long, default_value = "0")]
        initial_balance: String,
    },

    /// Show the name and balance of an account
    Balance {
        /// 6-digit account id
        id: AccountId,
    },

    /// Add funds to an account
    Deposit {
        /// 6-digit account id
        id: AccountId,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,
    },

    /// Move funds between two accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Sender account id
        #[arg(long)]
        from: AccountId,

        /// Receiver account id
        #[arg(long)]
        to: AccountId,
    },

    /// Show the number of accounts and the money they hold
    Summary,

    /// Serve the ledger over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, env = "CUSTODIA_LISTEN", default_value = "127.0.0.1:8000")]
        listen: SocketAddr,
    },
}

impl Cli {
    fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.database)
            .with_max_connections(self.max_connections)
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    pub async fn run(self) -> Result<()> {
        telemetry::init(self.verbose);

        let service = Arc::new(LedgerService::open(&self.store_config()).await?);
        let result = run_command(&service, self.command, &self.database).await;

        // `serve` already closed the store on shutdown; closing again is a no-op.
        service.close().await;
        result
    }
}

async fn run_command(
    service: &Arc<LedgerService>,
    command: Commands,
    database: &str,
) -> Result<()> {
    match command {
        Commands::Init => {
            println!("Database initialized: {}", database);
        }

        Commands::CreateAccount {
            name,
            initial_balance,
        } => {
            let initial_balance = parse_cents(&initial_balance)
                .context("Invalid initial balance. Use '50.00' or '50'")?;
            let account = service.create_account(name, initial_balance).await?;
            println!(
                "Created account {} for {} (balance {})",
                account.id,
                account.name,
                format_cents(account.balance)
            );
        }

        Commands::Balance { id } => {
            let account = service.get_balance(id).await?;
            println!("{} ({}): {}", account.name, account.id, format_cents(account.balance));
        }

        Commands::Deposit { id, amount } => {
            let amount = parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let receipt = service.deposit(id, amount).await?;
            println!(
                "Deposited {} into {}",
                format_cents(receipt.amount),
                receipt.account_id
            );
        }

        Commands::Transfer { amount, from, to } => {
            let amount = parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let receipt = service.transfer(from, to, amount).await?;
            println!(
                "Transferred {} from {} to {}",
                format_cents(receipt.amount),
                receipt.sender_id,
                receipt.receiver_id
            );
        }

        Commands::Summary => {
            let summary = service.summary().await?;
            println!("Accounts:      {}", summary.account_count);
            println!("Total balance: {}", format_cents(summary.total_balance));
        }

        Commands::Serve { listen } => {
            server::serve(Arc::clone(service), listen).await?;
        }
    }
    Ok(())
}
