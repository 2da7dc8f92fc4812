//! Faucet airdrops for funding a wallet on test clusters.

use solana_sdk::{
    commitment_config::CommitmentConfig, native_token::LAMPORTS_PER_SOL, pubkey::Pubkey,
    signature::Signature,
};
use tracing::info;

use crate::{
    error::{AirdropError, RpcError},
    network::Network,
    rpc::LedgerRpc,
};

pub const MIN_AIRDROP_SOL: u64 = 1;
pub const MAX_AIRDROP_SOL: u64 = 5;

/// Request `sol` SOL for `recipient` and wait for confirmation.
pub async fn request_airdrop(
    rpc: &dyn LedgerRpc,
    network: Network,
    recipient: Option<Pubkey>,
    sol: u64,
) -> Result<Signature, AirdropError> {
    if !network.supports_airdrop() {
        return Err(AirdropError::UnsupportedNetwork(network));
    }
    if !(MIN_AIRDROP_SOL..=MAX_AIRDROP_SOL).contains(&sol) {
        return Err(AirdropError::Amount(sol));
    }
    let recipient = recipient.ok_or(AirdropError::WalletNotConnected)?;

    let lamports = sol * LAMPORTS_PER_SOL;
    let signature = rpc
        .request_airdrop(&recipient, lamports)
        .await
        .map_err(classify)?;
    rpc.confirm_transaction(&signature, CommitmentConfig::confirmed())
        .await
        .map_err(classify)?;

    info!(%recipient, sol, %signature, "airdrop confirmed");
    Ok(signature)
}

fn classify(e: RpcError) -> AirdropError {
    match &e {
        RpcError::Request(message) | RpcError::Transport(message) if message.contains("429") => {
            AirdropError::RateLimited
        }
        _ => AirdropError::Rpc(e),
    }
}
