//! Wallet signer seam.

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};

use crate::{error::WalletError, rpc::LedgerRpc};

/// A connected (or not) wallet that adds the payer signature and broadcasts.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// `None` when no wallet is connected.
    fn pubkey(&self) -> Option<Pubkey>;

    /// Sign a partially-signed transaction as fee payer and submit it.
    async fn sign_and_send(
        &self,
        transaction: Transaction,
        rpc: &dyn LedgerRpc,
    ) -> Result<Signature, WalletError>;
}

/// Wallet backed by a local keypair.
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn pubkey(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    async fn sign_and_send(
        &self,
        mut transaction: Transaction,
        rpc: &dyn LedgerRpc,
    ) -> Result<Signature, WalletError> {
        let blockhash = transaction.message.recent_blockhash;
        transaction.try_partial_sign(&[&self.keypair], blockhash)?;
        Ok(rpc.send_transaction(&transaction).await?)
    }
}
