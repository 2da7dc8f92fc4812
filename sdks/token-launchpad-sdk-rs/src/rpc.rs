//! Ledger connection seam.

use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use tokio::time::Instant;

use crate::error::RpcError;

/// How long the default `confirm_transaction` polls before giving up.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Ledger queries the launch pipeline needs. Implemented for the nonblocking
/// [`RpcClient`]; tests substitute an in-memory ledger.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError>;

    async fn latest_blockhash(&self) -> Result<Hash, RpcError>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError>;

    /// `None` while the ledger has no status at `commitment`.
    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<Option<Result<(), TransactionError>>, RpcError>;

    async fn get_account(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Account>, RpcError>;

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, RpcError>;

    /// Wait until the transaction reaches `commitment` or fails. The default polls
    /// `signature_status` for [`CONFIRMATION_TIMEOUT`]; [`RpcClient`] uses its own wait.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<(), RpcError> {
        let started = Instant::now();
        loop {
            match self.signature_status(signature, commitment).await? {
                Some(Ok(())) => return Ok(()),
                Some(Err(error)) => {
                    return Err(RpcError::TransactionFailed {
                        signature: *signature,
                        error,
                    })
                }
                None if started.elapsed() >= CONFIRMATION_TIMEOUT => {
                    return Err(RpcError::ConfirmationTimeout(*signature))
                }
                None => tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await,
            }
        }
    }
}

#[async_trait]
impl LedgerRpc for RpcClient {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError> {
        Ok(RpcClient::get_minimum_balance_for_rent_exemption(self, data_len).await?)
    }

    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        Ok(self.get_latest_blockhash().await?)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        Ok(RpcClient::send_transaction(self, transaction).await?)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<Option<Result<(), TransactionError>>, RpcError> {
        Ok(self
            .get_signature_status_with_commitment(signature, commitment)
            .await?)
    }

    async fn get_account(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Account>, RpcError> {
        Ok(self
            .get_account_with_commitment(address, commitment)
            .await?
            .value)
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, RpcError> {
        Ok(RpcClient::request_airdrop(self, to, lamports).await?)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<(), RpcError> {
        if let Err(e) = self
            .poll_for_signature_with_commitment(signature, commitment)
            .await
        {
            return Err(match RpcError::from(e) {
                RpcError::Request(_) => RpcError::ConfirmationTimeout(*signature),
                other => other,
            });
        }
        // the wait ends on any status, failed ones included
        match LedgerRpc::signature_status(self, signature, commitment).await? {
            Some(Ok(())) => Ok(()),
            Some(Err(error)) => Err(RpcError::TransactionFailed {
                signature: *signature,
                error,
            }),
            None => Err(RpcError::ConfirmationTimeout(*signature)),
        }
    }
}
