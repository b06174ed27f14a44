/// Wallet v4r2 sender
/// Signs simple-send requests with an ed25519 key and submits them as
/// external messages through the v4 API
use crate::error::ProviderError;
use crate::message::{external_message, internal_message};
use crate::provider::{Sender, SenderArguments};
use crate::rpc::TonClient4;
use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey};
use shared::{boc, Address, Cell, CellBuilder, CodecError};
use std::sync::Arc;
use tracing::{debug, info};

/// Subwallet id for workchain 0 wallets
pub const DEFAULT_WALLET_ID: u32 = 698_983_191;

/// Seconds a signed request stays valid
pub const VALIDITY_SECS: i64 = 60;

pub struct WalletSender {
    client: Arc<TonClient4>,
    address: Address,
    signing_key: SigningKey,
    wallet_id: u32,
}

impl WalletSender {
    pub fn new(client: Arc<TonClient4>, address: Address, signing_key: SigningKey) -> Self {
        let wallet_id = DEFAULT_WALLET_ID.wrapping_add(address.workchain as i32 as u32);
        WalletSender {
            client,
            address,
            signing_key,
            wallet_id,
        }
    }

    /// Build from a hex encoded 32-byte ed25519 seed
    pub fn from_secret_hex(
        client: Arc<TonClient4>,
        address: Address,
        secret_hex: &str,
    ) -> Result<Self, ProviderError> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| ProviderError::Wallet(format!("Invalid secret key hex: {}", e)))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            ProviderError::Wallet(format!(
                "Secret key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::new(client, address, SigningKey::from_bytes(&seed)))
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    async fn seqno(&self, block: u32) -> Result<u32, ProviderError> {
        let result = self.client.run_method(block, &self.address, "seqno").await?;
        let mut reader = result
            .reader("seqno")
            .map_err(|e| ProviderError::Wallet(e.to_string()))?;
        let seqno = reader
            .read_int()
            .map_err(|e| ProviderError::Wallet(e.to_string()))?;
        u32::try_from(seqno).map_err(|_| ProviderError::Wallet(format!("Invalid seqno {}", seqno)))
    }

    /// Signed wallet body: `signature:bits512` followed by the signing payload
    pub fn signed_body(
        &self,
        seqno: u32,
        valid_until: u32,
        args: &SenderArguments,
    ) -> Result<Cell, CodecError> {
        let message = internal_message(&args.to, args.value, args.bounce, args.init.as_ref(), &args.body)?;

        let mut payload = CellBuilder::new();
        payload
            .store_uint(self.wallet_id as u128, 32)?
            .store_uint(valid_until as u128, 32)?
            .store_uint(seqno as u128, 32)?
            // simple send
            .store_uint(0, 8)?
            .store_uint(args.send_mode.0 as u128, 8)?
            .store_ref(message)?;
        let payload = payload.build();

        let signature = self.signing_key.sign(&payload.hash());

        let mut body = CellBuilder::new();
        body.store_bytes(&signature.to_bytes())?
            .store_slice(&payload.begin_parse())?;
        Ok(body.build())
    }
}

#[async_trait]
impl Sender for WalletSender {
    fn address(&self) -> Option<Address> {
        Some(self.address)
    }

    async fn send(&self, args: SenderArguments) -> Result<(), ProviderError> {
        let block = self.client.get_last_block().await?;
        let state = self.client.get_account(block.seqno, &self.address).await?;
        if !state.is_active() {
            return Err(ProviderError::AccountNotActive(self.address));
        }
        if state.balance < args.value {
            return Err(ProviderError::InsufficientFunds {
                address: self.address,
                needed: args.value.to_string(),
                available: state.balance.to_string(),
            });
        }

        let seqno = self.seqno(block.seqno).await?;
        let valid_until = (Utc::now().timestamp() + VALIDITY_SECS) as u32;
        debug!(
            "Signing request seqno={} valid_until={} to {}",
            seqno, valid_until, args.to
        );

        let body = self.signed_body(seqno, valid_until, &args)?;
        let external = external_message(&self.address, None, &body)?;
        self.client.send_message(&boc::serialize(&external)).await?;

        info!("Sent {} TON from {} to {}", args.value, self.address, args.to);
        Ok(())
    }
}
