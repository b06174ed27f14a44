use anyhow::{Context, Result};
use client::{
    qr_code, transfer_link, wait_for_deploy, Contract, ContractProvider, MainContract,
    NetworkProvider, TonClient4, WalletSender,
};
use colored::Colorize;
use shared::{load_compiled_code, Address, Coins, ContractConfig, FriendlyFormat, Network};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Network connection shared by every command
pub struct Session {
    pub client: Arc<TonClient4>,
    pub network: Network,
}

impl Session {
    pub fn new(endpoint: String, network: Network) -> Self {
        Session {
            client: Arc::new(TonClient4::new(endpoint)),
            network,
        }
    }

    fn display(&self, address: &Address) -> String {
        address.to_friendly(FriendlyFormat {
            test_only: self.network.is_test_only(),
            ..FriendlyFormat::default()
        })
    }

    fn provider(&self, contract: &MainContract) -> NetworkProvider {
        NetworkProvider::new(
            self.client.clone(),
            contract.address(),
            contract.init().cloned(),
        )
    }
}

/// Which contract instance a command talks to
pub enum Target<'a> {
    Address(Address),
    Derived { code_path: &'a Path, owner: Address },
}

/// Contract instance with zero counter and `owner` as both owner and recent sender
pub fn derive_contract(code_path: &Path, owner: Address) -> Result<MainContract> {
    let code = load_compiled_code(code_path)
        .with_context(|| format!("Failed to load compiled code from {}", code_path.display()))?;
    let config = ContractConfig {
        counter: 0,
        recent_sender: owner,
        owner_address: owner,
    };
    Ok(MainContract::create_from_config(&config, code, 0)?)
}

fn open(target: Target<'_>) -> Result<MainContract> {
    match target {
        Target::Address(address) => Ok(MainContract::create_from_address(address)),
        Target::Derived { code_path, owner } => derive_contract(code_path, owner),
    }
}

pub fn address(session: &Session, code_path: &Path, owner: Address) -> Result<()> {
    let contract = derive_contract(code_path, owner)?;
    let address = contract.address();

    println!("\n{}", "Contract Address:".bold().cyan());
    println!("{}", "=".repeat(80).cyan());
    println!("  Friendly: {}", session.display(&address).bold());
    println!("  Raw:      {}", address.to_raw_string().bright_black());
    println!("  Owner:    {}", session.display(&owner));
    println!("  Network:  {}", session.network.to_string().bright_blue());
    println!("{}\n", "=".repeat(80).cyan());
    Ok(())
}

pub async fn deploy(
    session: &Session,
    wallet: &WalletSender,
    code_path: &Path,
    owner: Address,
    value: Coins,
    attempts: u32,
    interval: Duration,
) -> Result<()> {
    let contract = derive_contract(code_path, owner)?;
    let address = contract.address();
    let provider = session.provider(&contract);

    println!("\n{}", "Deploying contract...".bold().cyan());
    println!("  Address: {}", session.display(&address).bold());
    println!("  Network: {}", session.network.to_string().bright_blue());

    if provider
        .get_state()
        .await
        .context("Failed to fetch contract account")?
        .is_active()
    {
        println!("{} Contract is already deployed", "ℹ".blue());
        return Ok(());
    }

    contract
        .send_deploy(&provider, wallet, value)
        .await
        .context("Failed to send deploy message")?;
    info!(address = %address, value = %value, "Deploy message sent");

    println!(
        "  Waiting for activation ({} attempts, {}s apart)...",
        attempts,
        interval.as_secs()
    );
    wait_for_deploy(&provider, address, attempts, interval)
        .await
        .context("Contract was not deployed")?;

    println!("{} Contract deployed at {}\n", "✓".green(), session.display(&address));
    Ok(())
}

pub async fn data(session: &Session, target: Target<'_>) -> Result<()> {
    let contract = open(target)?;
    let provider = session.provider(&contract);
    let data = contract
        .get_contract_data(&provider)
        .await
        .context("Failed to read contract data")?;

    println!("\n{}", "Contract Data:".bold().cyan());
    println!("{}", "=".repeat(80).cyan());
    println!("  Address:       {}", session.display(&contract.address()).bold());
    println!("  Counter:       {}", data.counter.to_string().green());
    println!("  Recent sender: {}", session.display(&data.recent_sender));
    println!("  Owner:         {}", session.display(&data.owner_address));
    println!("{}\n", "=".repeat(80).cyan());
    Ok(())
}

pub async fn balance(session: &Session, target: Target<'_>) -> Result<()> {
    let contract = open(target)?;
    let provider = session.provider(&contract);
    let balance = contract
        .get_balance(&provider)
        .await
        .context("Failed to read contract balance")?;

    println!(
        "{} {} TON",
        "Balance:".bold().cyan(),
        balance.amount.to_string().green()
    );
    Ok(())
}

pub async fn increment(
    session: &Session,
    wallet: &WalletSender,
    target: Target<'_>,
    value: Coins,
    by: u32,
) -> Result<()> {
    let contract = open(target)?;
    let provider = session.provider(&contract);
    contract
        .send_increment(&provider, wallet, value, by)
        .await
        .context("Failed to send increment")?;

    println!(
        "{} Increment by {} sent to {}",
        "✓".green(),
        by,
        session.display(&contract.address())
    );
    Ok(())
}

pub async fn deposit(
    session: &Session,
    wallet: &WalletSender,
    target: Target<'_>,
    value: Coins,
) -> Result<()> {
    let contract = open(target)?;
    let provider = session.provider(&contract);
    contract
        .send_deposit(&provider, wallet, value)
        .await
        .context("Failed to send deposit")?;

    println!(
        "{} Deposit of {} TON sent to {}",
        "✓".green(),
        value,
        session.display(&contract.address())
    );
    Ok(())
}

pub async fn withdraw(
    session: &Session,
    wallet: &WalletSender,
    target: Target<'_>,
    value: Coins,
    amount: Coins,
) -> Result<()> {
    let contract = open(target)?;
    let provider = session.provider(&contract);
    contract
        .send_withdrawal_request(&provider, wallet, value, amount)
        .await
        .context("Failed to send withdrawal request")?;

    println!(
        "{} Withdrawal of {} TON requested from {}",
        "✓".green(),
        amount,
        session.display(&contract.address())
    );
    println!(
        "  {}",
        "Only the owner may withdraw; other senders get their value bounced.".bright_black()
    );
    Ok(())
}

pub fn link(
    session: &Session,
    target: Target<'_>,
    text: &str,
    amount: Coins,
    qr: bool,
) -> Result<()> {
    let contract = open(target)?;
    let link = transfer_link(
        &contract.address(),
        session.network.is_test_only(),
        text,
        amount,
    )?;
    println!("{}", link);
    if qr {
        println!("{}", qr_code(&link).context("Failed to render QR code")?);
    }
    Ok(())
}
