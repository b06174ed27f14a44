//! In-memory chain: accounts, a message queue and a transaction journal.
//!
//! Fees are flat: every executed compute phase costs `COMPUTE_FEE` and every
//! outbound message costs `FORWARD_FEE`. Storage fees are not modelled.

use crate::executor::{AcceptingWallet, ContractExecutor, ExecutionContext, GetMethodContext, OutMessage};
use crate::transaction::{SendMessageResult, Transaction};
use async_trait::async_trait;
use client::{
    AccountStatus, Contract, ContractProvider, ContractState, GetMethodResult, InternalMessage,
    ProviderError, SendMode, Sender, SenderArguments, TupleItem,
};
use sha2::{Digest, Sha256};
use shared::{contract_address, Address, Cell, CellBuilder, CodecError, Coins, StateInit};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const COMPUTE_FEE: Coins = Coins::from_nano(2_000_000);
pub const FORWARD_FEE: Coins = Coins::from_nano(1_000_000);
pub const TREASURY_BALANCE: Coins = Coins::from_ton(1_000_000);

const MAX_TRANSACTIONS_PER_SEND: usize = 10_000;
const BOUNCED_BODY_BITS: usize = 256;
const TREASURY_CODE_TAG: &[u8] = b"sandbox-treasury";

#[derive(Debug, Clone, Default)]
struct Account {
    balance: Coins,
    code: Option<Cell>,
    data: Option<Cell>,
}

impl Account {
    fn state(&self) -> ContractState {
        let status = match &self.code {
            Some(code) => AccountStatus::Active {
                code: Some(code.clone()),
                data: self.data.clone(),
            },
            None => AccountStatus::Uninit,
        };
        ContractState {
            balance: self.balance,
            status,
        }
    }
}

#[derive(Debug, Clone)]
struct Delivery {
    from: Address,
    to: Address,
    value: Coins,
    bounce: bool,
    bounced: bool,
    body: Cell,
    init: Option<StateInit>,
}

enum Queued {
    /// Signed request handed to a wallet from outside the chain
    WalletRequest {
        wallet: Address,
        args: SenderArguments,
    },
    Internal(Delivery),
}

struct ChainState {
    accounts: HashMap<Address, Account>,
    executors: HashMap<[u8; 32], Arc<dyn ContractExecutor>>,
    queue: VecDeque<Queued>,
    journal: Vec<Transaction>,
    lt: u64,
    now: u32,
}

impl ChainState {
    fn next_lt(&mut self) -> u64 {
        self.lt += 1;
        self.lt
    }

    fn balance_of(&self, address: &Address) -> Coins {
        self.accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    fn run_queue(&mut self) -> Result<Vec<Transaction>, ProviderError> {
        let mut transactions = Vec::new();
        while let Some(item) = self.queue.pop_front() {
            if transactions.len() >= MAX_TRANSACTIONS_PER_SEND {
                self.queue.clear();
                return Err(ProviderError::Unsupported(format!(
                    "message cascade exceeded {} transactions",
                    MAX_TRANSACTIONS_PER_SEND
                )));
            }
            let tx = match item {
                Queued::WalletRequest { wallet, args } => self.process_wallet_request(wallet, args),
                Queued::Internal(delivery) => match self.process_internal(delivery) {
                    Ok(tx) => tx,
                    Err(e) => {
                        self.queue.clear();
                        return Err(e);
                    }
                },
            };
            debug!("Transaction {}", tx);
            self.journal.push(tx.clone());
            transactions.push(tx);
        }
        Ok(transactions)
    }

    fn process_wallet_request(&mut self, wallet: Address, args: SenderArguments) -> Transaction {
        let lt = self.next_lt();
        let account = self.accounts.entry(wallet).or_default();

        let (debit, delivered) = if args.send_mode.contains(SendMode::CARRY_ALL_REMAINING_BALANCE) {
            (account.balance, account.balance.saturating_sub(FORWARD_FEE))
        } else if args.send_mode.contains(SendMode::PAY_GAS_SEPARATELY) {
            (args.value.saturating_add(FORWARD_FEE), args.value)
        } else {
            (args.value, args.value.saturating_sub(FORWARD_FEE))
        };

        let mut out_messages = 0;
        let success = match account.balance.checked_sub(debit) {
            Some(rest) => {
                account.balance = rest;
                self.queue.push_back(Queued::Internal(Delivery {
                    from: wallet,
                    to: args.to,
                    value: delivered,
                    bounce: args.bounce,
                    bounced: false,
                    body: args.body,
                    init: args.init,
                }));
                out_messages = 1;
                true
            }
            None if args.send_mode.contains(SendMode::IGNORE_ERRORS) => true,
            None => {
                warn!("Wallet {} cannot cover {}", wallet, debit);
                false
            }
        };

        Transaction {
            lt,
            from: None,
            to: wallet,
            value: Coins::ZERO,
            body: Cell::empty(),
            success,
            exit_code: Some(0),
            bounced: false,
            out_messages,
        }
    }

    fn process_internal(&mut self, delivery: Delivery) -> Result<Transaction, ProviderError> {
        // Staged on a copy; nothing is written back until the executor is known
        let mut account = self.accounts.get(&delivery.to).cloned().unwrap_or_default();
        account.balance = account.balance.saturating_add(delivery.value);
        if account.code.is_none() {
            if let Some(init) = &delivery.init {
                if contract_address(delivery.to.workchain, init)? == delivery.to {
                    account.code = Some(init.code.clone());
                    account.data = Some(init.data.clone());
                } else {
                    warn!("State init does not match address {}", delivery.to);
                }
            }
        }
        let executor = match &account.code {
            Some(code) => Some(
                self.executors
                    .get(&code.hash())
                    .cloned()
                    .ok_or_else(|| ProviderError::UnknownCode(hex::encode(code.hash())))?,
            ),
            None => None,
        };

        let lt = self.next_lt();
        let now = self.now;
        let balance = account.balance;
        let data = account.data.clone().unwrap_or_default();
        self.accounts.insert(delivery.to, account);

        let mut tx = Transaction {
            lt,
            from: Some(delivery.from),
            to: delivery.to,
            value: delivery.value,
            body: delivery.body.clone(),
            success: false,
            exit_code: None,
            bounced: delivery.bounced,
            out_messages: 0,
        };

        let Some(executor) = executor else {
            // nothing to execute on an uninitialized account
            if delivery.bounce && !delivery.bounced {
                tx.out_messages = self.bounce(&delivery, Coins::ZERO)?;
            }
            return Ok(tx);
        };

        let ctx = ExecutionContext {
            myself: delivery.to,
            sender: delivery.from,
            value: delivery.value,
            balance,
            bounced: delivery.bounced,
            now,
            lt,
        };
        let result = executor.on_internal(&ctx, &data, &delivery.body);
        tx.exit_code = Some(result.exit_code);

        let fee = COMPUTE_FEE.min(balance);
        let balance = balance.saturating_sub(fee);

        if result.is_success() {
            if let Some((rest, deliveries)) =
                plan_actions(&delivery, balance, fee, &result.out_messages)
            {
                let account = self.accounts.entry(delivery.to).or_default();
                account.balance = rest;
                if let Some(new_data) = result.data {
                    account.data = Some(new_data);
                }
                tx.success = true;
                tx.out_messages = deliveries.len();
                self.queue
                    .extend(deliveries.into_iter().map(Queued::Internal));
            } else {
                warn!("Action phase failed on {}", delivery.to);
                self.accounts.entry(delivery.to).or_default().balance = balance;
            }
        } else {
            self.accounts.entry(delivery.to).or_default().balance = balance;
            if delivery.bounce && !delivery.bounced {
                tx.out_messages = self.bounce(&delivery, fee)?;
            }
        }
        Ok(tx)
    }

    /// Return what is left of the inbound value to its sender
    fn bounce(&mut self, delivery: &Delivery, fee: Coins) -> Result<usize, ProviderError> {
        let body = bounced_body(&delivery.body)?;
        let account = self.accounts.entry(delivery.to).or_default();
        let remaining = delivery.value.saturating_sub(fee).min(account.balance);
        let delivered = match remaining.checked_sub(FORWARD_FEE) {
            Some(v) if v > Coins::ZERO => v,
            _ => return Ok(0),
        };
        account.balance = account.balance.saturating_sub(remaining);

        self.queue.push_back(Queued::Internal(Delivery {
            from: delivery.to,
            to: delivery.from,
            value: delivered,
            bounce: false,
            bounced: true,
            body,
            init: None,
        }));
        Ok(1)
    }
}

/// Resolve out-messages against the balance left after the compute fee.
/// `None` means the action phase fails and nothing is sent.
fn plan_actions(
    delivery: &Delivery,
    mut balance: Coins,
    fee: Coins,
    out_messages: &[OutMessage],
) -> Option<(Coins, Vec<Delivery>)> {
    let mut incoming_left = delivery.value.saturating_sub(fee);
    let mut deliveries = Vec::with_capacity(out_messages.len());

    for out in out_messages {
        let all_balance = out.mode.contains(SendMode::CARRY_ALL_REMAINING_BALANCE);
        let value = if all_balance {
            balance
        } else if out.mode.contains(SendMode::CARRY_ALL_REMAINING_INCOMING_VALUE) {
            let v = out.value.saturating_add(incoming_left);
            incoming_left = Coins::ZERO;
            v
        } else {
            out.value
        };

        let (debit, delivered) = if out.mode.contains(SendMode::PAY_GAS_SEPARATELY) && !all_balance {
            (value.saturating_add(FORWARD_FEE), Some(value))
        } else {
            (value, value.checked_sub(FORWARD_FEE))
        };

        match (balance.checked_sub(debit), delivered) {
            (Some(rest), Some(delivered)) => {
                balance = rest;
                deliveries.push(Delivery {
                    from: delivery.to,
                    to: out.to,
                    value: delivered,
                    bounce: out.bounce,
                    bounced: false,
                    body: out.body.clone(),
                    init: None,
                });
            }
            _ if out.mode.contains(SendMode::IGNORE_ERRORS) => continue,
            _ => return None,
        }
    }
    Some((balance, deliveries))
}

/// `0xffffffff` followed by the first 256 bits of the rejected body
fn bounced_body(original: &Cell) -> Result<Cell, ProviderError> {
    let mut s = original.begin_parse();
    let bits = s.remaining_bits().min(BOUNCED_BODY_BITS);
    let mut b = CellBuilder::new();
    b.store_uint(0xFFFF_FFFF, 32).map_err(CodecError::from)?;
    for _ in 0..bits {
        let bit = s.load_bit().map_err(CodecError::from)?;
        b.store_bit(bit).map_err(CodecError::from)?;
    }
    Ok(b.build())
}

struct Inner {
    state: Mutex<ChainState>,
    // one send and its whole message cascade at a time
    send_lock: Mutex<()>,
}

/// Handle to an emulated chain; clones share the same state
#[derive(Clone)]
pub struct Blockchain {
    inner: Arc<Inner>,
}

impl Blockchain {
    pub fn create() -> Self {
        let now = chrono::Utc::now().timestamp() as u32;
        Blockchain {
            inner: Arc::new(Inner {
                state: Mutex::new(ChainState {
                    accounts: HashMap::new(),
                    executors: HashMap::new(),
                    queue: VecDeque::new(),
                    journal: Vec::new(),
                    lt: 0,
                    now,
                }),
                send_lock: Mutex::new(()),
            }),
        }
    }

    /// Funded wallet whose address is derived from `name`; asking twice for
    /// the same name returns the same wallet
    pub async fn treasury(&self, name: &str) -> Result<TreasurySender, ProviderError> {
        let hash: [u8; 32] = Sha256::digest(name.as_bytes()).into();
        let address = Address::new(0, hash);

        let mut code = CellBuilder::new();
        code.store_bytes(TREASURY_CODE_TAG).map_err(CodecError::from)?;
        let code = code.build();

        let mut state = self.inner.state.lock().await;
        state
            .executors
            .entry(code.hash())
            .or_insert_with(|| Arc::new(AcceptingWallet));
        state.accounts.entry(address).or_insert_with(|| {
            debug!("Created treasury {} at {}", name, address);
            Account {
                balance: TREASURY_BALANCE,
                code: Some(code),
                data: Some(Cell::empty()),
            }
        });

        Ok(TreasurySender {
            chain: self.clone(),
            address,
        })
    }

    /// Bind contract behaviour to a code cell
    pub async fn register_code(&self, code: &Cell, executor: Arc<dyn ContractExecutor>) {
        let mut state = self.inner.state.lock().await;
        state.executors.insert(code.hash(), executor);
    }

    pub fn open_contract<C: Contract>(&self, contract: &C) -> SandboxProvider {
        self.provider(contract.address(), contract.init().cloned())
    }

    pub fn provider(&self, address: Address, init: Option<StateInit>) -> SandboxProvider {
        SandboxProvider {
            chain: self.clone(),
            address,
            init,
        }
    }

    pub async fn balance(&self, address: &Address) -> Coins {
        self.inner.state.lock().await.balance_of(address)
    }

    /// Every transaction processed so far
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.inner.state.lock().await.journal.clone()
    }

    pub async fn now(&self) -> u32 {
        self.inner.state.lock().await.now
    }

    pub async fn set_now(&self, now: u32) {
        self.inner.state.lock().await.now = now;
    }
}

/// Sender backed by a sandbox treasury
#[derive(Clone)]
pub struct TreasurySender {
    chain: Blockchain,
    address: Address,
}

impl TreasurySender {
    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn balance(&self) -> Coins {
        self.chain.balance(&self.address).await
    }
}

#[async_trait]
impl Sender for TreasurySender {
    fn address(&self) -> Option<Address> {
        Some(self.address)
    }

    async fn send(&self, args: SenderArguments) -> Result<(), ProviderError> {
        let mut state = self.chain.inner.state.lock().await;
        let available = state.balance_of(&self.address);
        let needed = if args.send_mode.contains(SendMode::PAY_GAS_SEPARATELY) {
            args.value.saturating_add(FORWARD_FEE)
        } else {
            args.value
        };
        if !args.send_mode.contains(SendMode::CARRY_ALL_REMAINING_BALANCE) && available < needed {
            return Err(ProviderError::InsufficientFunds {
                address: self.address,
                needed: needed.to_string(),
                available: available.to_string(),
            });
        }
        state.queue.push_back(Queued::WalletRequest {
            wallet: self.address,
            args,
        });
        Ok(())
    }
}

/// Contract provider bound to one address of an emulated chain
pub struct SandboxProvider {
    chain: Blockchain,
    address: Address,
    init: Option<StateInit>,
}

impl SandboxProvider {
    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl ContractProvider for SandboxProvider {
    type SendOutcome = SendMessageResult;

    async fn get_state(&self) -> Result<ContractState, ProviderError> {
        let state = self.chain.inner.state.lock().await;
        Ok(state
            .accounts
            .get(&self.address)
            .map(Account::state)
            .unwrap_or_else(|| Account::default().state()))
    }

    async fn get(&self, method: &str, args: Vec<TupleItem>) -> Result<GetMethodResult, ProviderError> {
        let state = self.chain.inner.state.lock().await;
        let account = state
            .accounts
            .get(&self.address)
            .filter(|a| a.code.is_some())
            .ok_or(ProviderError::AccountNotActive(self.address))?;
        let code = account.code.as_ref().map(Cell::hash).unwrap_or_default();
        let executor = state
            .executors
            .get(&code)
            .ok_or_else(|| ProviderError::UnknownCode(hex::encode(code)))?;

        let ctx = GetMethodContext {
            myself: self.address,
            balance: account.balance,
            now: state.now,
        };
        let data = account.data.clone().unwrap_or_default();
        Ok(executor.run_get_method(&ctx, &data, method, &args))
    }

    async fn internal(
        &self,
        via: &dyn Sender,
        message: InternalMessage,
    ) -> Result<SendMessageResult, ProviderError> {
        let _guard = self.chain.inner.send_lock.lock().await;

        let init = match &self.init {
            Some(init) if !self.get_state().await?.is_active() => Some(init.clone()),
            _ => None,
        };
        via.send(SenderArguments {
            to: self.address,
            value: message.value,
            bounce: message.bounce,
            send_mode: message.send_mode,
            init,
            body: message.body,
        })
        .await?;

        let transactions = self.chain.inner.state.lock().await.run_queue()?;
        Ok(SendMessageResult { transactions })
    }
}
