//! Polling loop over a contract get-method.
//!
//! Each tick fetches the latest block, runs the configured get-method and
//! compares `(recent_sender, total)` with the previous tick. Ticks run one at
//! a time on a spawned task; a tick that fails is logged and skipped.

use crate::config::{ConfigError, ContractTarget};
use crate::source::StateSource;
use crate::state::{ContractSnapshot, MonitorState};
use client::{ClientError, Contract, MainContract, RpcError};
use shared::{load_compiled_code, Address, CodecError, ContractConfig, FriendlyFormat};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Address of the watched contract
pub fn resolve_address(target: &ContractTarget) -> Result<Address, MonitorError> {
    match target {
        ContractTarget::Address(address) => Ok(*address),
        ContractTarget::Derived { code_path, owner } => {
            let code = load_compiled_code(code_path)?;
            let config = ContractConfig {
                counter: 0,
                recent_sender: *owner,
                owner_address: *owner,
            };
            Ok(MainContract::create_from_config(&config, code, 0)?.address())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Changed(ContractSnapshot),
    Unchanged,
}

pub struct Monitor<S> {
    source: Arc<S>,
    address: Address,
    get_method: String,
    state: MonitorState,
}

impl<S: StateSource + 'static> Monitor<S> {
    pub fn new(source: Arc<S>, address: Address, get_method: impl Into<String>) -> Self {
        Monitor {
            source,
            address,
            get_method: get_method.into(),
            state: MonitorState::default(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Whether the watched account is active at the latest block
    pub async fn is_active(&self) -> Result<bool, MonitorError> {
        let seqno = self.source.latest_seqno().await?;
        let state = self.source.account_state(seqno, &self.address).await?;
        Ok(state.is_active())
    }

    async fn fetch(&self) -> Result<(ContractSnapshot, u32), MonitorError> {
        let seqno = self.source.latest_seqno().await?;
        let result = self
            .source
            .run_get_method(seqno, &self.address, &self.get_method)
            .await?;
        let mut reader = result.reader(&self.get_method)?;
        let recent_sender = reader.read_address()?;
        let total = reader.read_int()?;
        Ok((
            ContractSnapshot {
                recent_sender,
                total,
            },
            seqno,
        ))
    }

    /// Run one tick and update the last-seen snapshot
    pub async fn poll_once(&mut self) -> Result<PollOutcome, MonitorError> {
        let (snapshot, seqno) = match self.fetch().await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.state.record_failure();
                warn!(
                    address = %self.address,
                    failures = self.state.consecutive_failures,
                    error = %e,
                    "Poll tick skipped"
                );
                return Err(e);
            }
        };
        self.state.clear_failures();

        if self.state.observe(snapshot.clone(), seqno) {
            let sender = snapshot.recent_sender.to_friendly(FriendlyFormat {
                bounceable: false,
                test_only: true,
                ..FriendlyFormat::default()
            });
            info!(
                seqno = seqno,
                "Recent sender: {}. New total sum = {}",
                sender,
                snapshot.total
            );
            Ok(PollOutcome::Changed(snapshot))
        } else {
            debug!(seqno = seqno, "Contract data unchanged");
            Ok(PollOutcome::Unchanged)
        }
    }

    /// Poll every `period` on a spawned task until the handle shuts it down.
    /// The first tick fires after one period.
    pub fn spawn(mut self, period: Duration) -> MonitorHandle {
        let (shutdown, mut stop) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop.changed() => break,
                }
                // an in-flight tick is abandoned on shutdown
                let finished = tokio::select! {
                    _ = self.poll_once() => true,
                    _ = stop.changed() => false,
                };
                if !finished {
                    break;
                }
            }
            info!(address = %self.address, ticks = self.state.ticks, "Monitor stopped");
            self.state
        });

        MonitorHandle { shutdown, task }
    }
}

/// Control over a spawned monitor
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<MonitorState>,
}

impl MonitorHandle {
    /// Stop polling and return the final state
    pub async fn shutdown(self) -> Result<MonitorState, tokio::task::JoinError> {
        let _ = self.shutdown.send(true);
        self.task.await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
