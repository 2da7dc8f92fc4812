//! Signing, broadcast and confirmation of the launch transaction.

use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use tracing::{info, warn};

use crate::{
    error::{RpcError, SubmissionError, WalletError},
    rpc::LedgerRpc,
    wallet::WalletSigner,
};

/// Submit `instructions` as one atomic transaction paid for by `payer`.
///
/// The mint keypair is consumed: it co-signs once and is dropped before the wallet sees
/// the transaction. A fresh blockhash is fetched right before signing. There is no
/// resubmission; a caller that wants to retry runs a new launch with a new mint.
///
/// If the confirmation wait fails without a definitive ledger verdict, the signature
/// status is queried once more. A transaction that turns out to have landed is reported as
/// success; one with no status at all is [`SubmissionError::Unconfirmed`].
///
/// Once the mint has co-signed, a transport failure from the wallet's send leaves the
/// outcome open and is [`SubmissionError::BroadcastInterrupted`]. Only a refusal to sign or
/// an answer from the node rejecting the transaction is a definite failure.
pub async fn submit_launch_transaction(
    instructions: &[Instruction],
    payer: &Pubkey,
    mint: Keypair,
    rpc: &dyn LedgerRpc,
    wallet: &dyn WalletSigner,
) -> Result<Signature, SubmissionError> {
    let blockhash = rpc
        .latest_blockhash()
        .await
        .map_err(SubmissionError::Blockhash)?;

    let mut transaction = Transaction::new_with_payer(instructions, Some(payer));
    transaction.try_partial_sign(&[&mint], blockhash)?;
    drop(mint);

    let signature = match wallet.sign_and_send(transaction, rpc).await {
        Ok(signature) => signature,
        Err(source @ WalletError::Rpc(RpcError::Transport(_))) => {
            warn!(error = %source, "broadcast interrupted; the transaction may still land");
            return Err(SubmissionError::BroadcastInterrupted(source));
        }
        Err(source) => return Err(source.into()),
    };
    info!(%signature, "launch transaction sent");

    let commitment = CommitmentConfig::confirmed();
    match rpc.confirm_transaction(&signature, commitment).await {
        Ok(()) => {
            info!(%signature, "launch transaction confirmed");
            Ok(signature)
        }
        Err(source @ RpcError::TransactionFailed { .. }) => {
            Err(SubmissionError::Rejected { signature, source })
        }
        Err(source) => {
            warn!(%signature, error = %source, "confirmation failed; re-checking signature status");
            match rpc.signature_status(&signature, commitment).await {
                Ok(Some(Ok(()))) => {
                    info!(%signature, "launch transaction landed after confirmation wait");
                    Ok(signature)
                }
                Ok(Some(Err(error))) => Err(SubmissionError::Rejected {
                    signature,
                    source: RpcError::TransactionFailed { signature, error },
                }),
                Ok(None) | Err(_) => Err(SubmissionError::Unconfirmed { signature, source }),
            }
        }
    }
}
