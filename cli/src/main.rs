mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client::link::{FUNDING_AMOUNT, FUNDING_TEXT};
use client::WalletSender;
use commands::{Session, Target};
use shared::{Address, Coins};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_OWNER: &str = "0QD9jGNwJs3Sv5y1OWNIq_jXxWqrGi8q10zLIB3SZwdak7Nt";
const DEFAULT_CODE_PATH: &str = "build/main.compiled.json";

#[derive(Parser)]
#[command(name = "main-contract")]
#[command(about = "Deploy and operate the counter contract", long_about = None)]
#[command(version)]
struct Cli {
    /// Network to use (mainnet, testnet)
    #[arg(long, global = true)]
    network: Option<String>,

    /// v4 HTTP API endpoint (defaults per network)
    #[arg(long, global = true, env = "TON_V4_ENDPOINT")]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CodeArgs {
    /// Compiled contract code (JSON artifact with a `hex` field, or raw BOC)
    #[arg(long, default_value = DEFAULT_CODE_PATH)]
    code: PathBuf,

    /// Owner written into the initial contract data
    #[arg(long, default_value = DEFAULT_OWNER)]
    owner: Address,
}

#[derive(Args)]
struct TargetArgs {
    /// Address of a deployed instance; derived from --code and --owner when absent
    #[arg(long)]
    address: Option<Address>,

    #[command(flatten)]
    code: CodeArgs,
}

impl TargetArgs {
    fn target(&self) -> Target<'_> {
        match self.address {
            Some(address) => Target::Address(address),
            None => Target::Derived {
                code_path: &self.code.code,
                owner: self.code.owner,
            },
        }
    }
}

#[derive(Args)]
struct WalletArgs {
    /// Active v4r2 wallet paying for sends
    #[arg(long, env = "WALLET_ADDRESS")]
    wallet_address: Address,

    /// Hex encoded ed25519 seed of the wallet
    #[arg(long, env = "WALLET_SECRET_KEY", hide_env_values = true)]
    wallet_secret: String,
}

impl WalletArgs {
    fn sender(&self, session: &Session) -> Result<WalletSender> {
        WalletSender::from_secret_hex(
            session.client.clone(),
            self.wallet_address,
            &self.wallet_secret,
        )
        .context("Failed to load wallet key")
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new counter contract and wait until it is active
    Deploy {
        #[command(flatten)]
        code: CodeArgs,

        #[command(flatten)]
        wallet: WalletArgs,

        /// TON attached to the deploy message
        #[arg(long, default_value = "0.05")]
        value: Coins,

        /// Activation checks before giving up
        #[arg(long, default_value_t = 20)]
        attempts: u32,

        /// Seconds between activation checks
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },

    /// Print the address the contract would deploy to
    Address {
        #[command(flatten)]
        code: CodeArgs,
    },

    /// Read counter, recent sender and owner
    Data {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Read the contract balance
    Balance {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Increase the counter
    Increment {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        wallet: WalletArgs,

        /// Amount added to the counter
        #[arg(long, default_value_t = 1)]
        by: u32,

        /// TON attached to the message
        #[arg(long, default_value = "0.05")]
        value: Coins,
    },

    /// Send TON to the contract
    Deposit {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        wallet: WalletArgs,

        /// TON to deposit
        #[arg(long)]
        value: Coins,
    },

    /// Ask the contract to send TON back to the owner
    Withdraw {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        wallet: WalletArgs,

        /// TON to withdraw
        #[arg(long)]
        amount: Coins,

        /// TON attached to the request
        #[arg(long, default_value = "0.05")]
        value: Coins,
    },

    /// Print a tonhub link for funding the contract by hand
    Link {
        #[command(flatten)]
        target: TargetArgs,

        /// Comment attached to the transfer
        #[arg(long, default_value = FUNDING_TEXT)]
        text: String,

        /// TON to transfer
        #[arg(long)]
        amount: Option<Coins>,

        /// Also print the link as a terminal QR code
        #[arg(long)]
        qr: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "main_contract=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();

    let cli = Cli::parse();

    // Resolve network configuration
    let sources = config::ConfigSources::from_env();
    let network = config::resolve_network(cli.network, &sources)?;
    let endpoint = config::resolve_endpoint(cli.endpoint, network, &sources)?;
    let session = Session::new(endpoint, network);

    match cli.command {
        Commands::Deploy {
            code,
            wallet,
            value,
            attempts,
            interval,
        } => {
            let wallet = wallet.sender(&session)?;
            commands::deploy(
                &session,
                &wallet,
                &code.code,
                code.owner,
                value,
                attempts,
                Duration::from_secs(interval),
            )
            .await?;
        }
        Commands::Address { code } => {
            commands::address(&session, &code.code, code.owner)?;
        }
        Commands::Data { target } => {
            commands::data(&session, target.target()).await?;
        }
        Commands::Balance { target } => {
            commands::balance(&session, target.target()).await?;
        }
        Commands::Increment {
            target,
            wallet,
            by,
            value,
        } => {
            let wallet = wallet.sender(&session)?;
            commands::increment(&session, &wallet, target.target(), value, by).await?;
        }
        Commands::Deposit {
            target,
            wallet,
            value,
        } => {
            let wallet = wallet.sender(&session)?;
            commands::deposit(&session, &wallet, target.target(), value).await?;
        }
        Commands::Withdraw {
            target,
            wallet,
            amount,
            value,
        } => {
            let wallet = wallet.sender(&session)?;
            commands::withdraw(&session, &wallet, target.target(), value, amount).await?;
        }
        Commands::Link {
            target,
            text,
            amount,
            qr,
        } => {
            let amount = amount.unwrap_or(FUNDING_AMOUNT);
            commands::link(&session, target.target(), &text, amount, qr)?;
        }
    }

    Ok(())
}
