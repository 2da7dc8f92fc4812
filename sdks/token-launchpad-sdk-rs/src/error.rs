//! Error types

use std::{fmt, time::Duration};

use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_sdk::{
    program_error::ProgramError, pubkey::Pubkey, signature::Signature, signer::SignerError,
    transaction::TransactionError,
};
use thiserror::Error;

use crate::network::Network;

/// Errors raised by the ledger connection.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The node answered with an error (JSON-RPC error, preflight or simulation failure)
    #[error("rpc request failed: {0}")]
    Request(String),
    /// No answer came back; the node may or may not have received the request
    #[error("rpc transport failed: {0}")]
    Transport(String),
    /// No status reached the requested commitment before the wait gave up
    #[error("transaction {0} was not confirmed before the confirmation timeout")]
    ConfirmationTimeout(Signature),
    /// The ledger executed the transaction and it failed
    #[error("transaction {signature} failed: {error}")]
    TransactionFailed {
        /// Transaction signature
        signature: Signature,
        /// Error reported by the runtime
        error: TransactionError,
    },
}

impl From<ClientError> for RpcError {
    fn from(e: ClientError) -> Self {
        match e.kind() {
            ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
                RpcError::Transport(e.to_string())
            }
            _ => RpcError::Request(e.to_string()),
        }
    }
}

/// A launch request that can never succeed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ValidationError {
    /// Name outside 2..=20 characters
    #[error("token name must be 2-20 characters, got {0}")]
    NameLength(usize),
    /// Symbol outside 2..=8 characters
    #[error("token symbol must be 2-8 characters, got {0}")]
    SymbolLength(usize),
    /// Decimals above 18
    #[error("decimals cannot exceed 18, got {0}")]
    Decimals(u8),
    /// Supply of zero
    #[error("initial supply must be a positive number")]
    ZeroSupply,
    /// `supply * 10^decimals` does not fit a u64 amount
    #[error("initial supply {supply} with {decimals} decimals overflows a u64 amount")]
    SupplyOverflow {
        /// Whole-token supply
        supply: u64,
        /// Mint decimals
        decimals: u8,
    },
    /// Image URL does not parse
    #[error("image url is not a valid URL: {0}")]
    ImageUrl(String),
    /// Description neither empty nor 8..=50 characters
    #[error("description must be 8-50 characters or empty, got {0}")]
    DescriptionLength(usize),
    /// Metadata JSON without name or symbol
    #[error("token metadata must include name and symbol")]
    MissingNameOrSymbol,
}

/// Errors from the off-chain metadata store.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Document rejected before any request was made
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Store credentials missing
    #[error("metadata store is not configured: {0}")]
    Configuration(String),
    /// Store answered with a non-2xx status
    #[error("metadata store rejected upload with status {status}: {body}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },
    /// Request was sent but no response came back
    #[error("no response received from metadata store: {0}")]
    Network(String),
    /// Request aborted by the upload timeout
    #[error("metadata upload timed out after {0:?}")]
    Timeout(Duration),
    /// 2xx response without a usable `secure_url`
    #[error("metadata store response is missing `secure_url`: {0}")]
    Protocol(String),
}

/// Errors computing the mint account layout or its rent.
#[derive(Debug, Error)]
pub enum SizingError {
    /// Extension layout or metadata packing failed
    #[error("failed to compute mint account layout: {0}")]
    Layout(#[from] ProgramError),
    /// The rent-exemption query failed
    #[error("rent query for {len} bytes failed: {source}")]
    Rent {
        /// Byte length that was queried
        len: usize,
        /// Underlying RPC error
        #[source]
        source: RpcError,
    },
}

/// Errors from the instruction builders.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// An upstream builder rejected its arguments
    #[error("failed to build {step} instruction: {source}")]
    Instruction {
        /// Step that failed
        step: &'static str,
        /// Builder error
        #[source]
        source: ProgramError,
    },
}

/// Errors from a wallet signer.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No public key available
    #[error("wallet not connected")]
    NotConnected,
    /// The user or wallet declined to sign
    #[error("wallet rejected the transaction: {0}")]
    Rejected(String),
    /// Local signing failed
    #[error(transparent)]
    Signing(#[from] SignerError),
    /// Broadcast failed
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Errors signing, broadcasting or confirming the launch transaction.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Recent blockhash could not be fetched
    #[error("failed to fetch recent blockhash: {0}")]
    Blockhash(#[source] RpcError),
    /// The mint keypair could not co-sign
    #[error("mint keypair failed to sign: {0}")]
    MintSignature(#[from] SignerError),
    /// The wallet did not sign or broadcast
    #[error("wallet failed to sign or send: {0}")]
    Wallet(#[from] WalletError),
    /// The ledger reported the transaction as failed
    #[error("transaction {signature} failed: {source}")]
    Rejected {
        /// Transaction signature
        signature: Signature,
        /// Underlying RPC error
        #[source]
        source: RpcError,
    },
    /// The wallet's broadcast request was lost in transit; the node may have received it
    #[error("broadcast of the launch transaction failed in transit: {0}")]
    BroadcastInterrupted(#[source] WalletError),
    /// Broadcast happened but confirmation could not be established either way
    #[error("transaction {signature} was broadcast but its outcome is unknown: {source}")]
    Unconfirmed {
        /// Transaction signature
        signature: Signature,
        /// Underlying RPC error
        #[source]
        source: RpcError,
    },
}

impl SubmissionError {
    /// True when the transaction may have landed.
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(
            self,
            SubmissionError::Unconfirmed { .. } | SubmissionError::BroadcastInterrupted(_)
        )
    }

    /// Signature of the broadcast transaction, if it got that far.
    pub fn signature(&self) -> Option<Signature> {
        match self {
            SubmissionError::Rejected { signature, .. }
            | SubmissionError::Unconfirmed { signature, .. } => Some(*signature),
            _ => None,
        }
    }
}

/// Errors reading back a confirmed mint.
#[derive(Debug, Error)]
pub enum ReadBackError {
    /// Account query failed
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// No account at the mint address
    #[error("mint account {0} not found")]
    AccountNotFound(Pubkey),
    /// Account is not owned by the token program
    #[error("account {mint} is owned by {owner}, not the token program")]
    WrongOwner {
        /// Mint address
        mint: Pubkey,
        /// Actual owner
        owner: Pubkey,
    },
    /// Account data does not decode as a mint with metadata
    #[error("failed to decode mint account: {0}")]
    Decode(#[from] ProgramError),
}

/// Errors loading, saving or resolving network settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unrecognized network name
    #[error("unknown network `{0}` (expected mainnet, devnet, testnet, localhost or custom)")]
    UnknownNetwork(String),
    /// `custom` selected without a URL
    #[error("custom network selected but no custom rpc url is set")]
    MissingCustomRpcUrl,
    /// URL does not parse or is not http(s)
    #[error("invalid rpc url `{url}`: {reason}")]
    InvalidRpcUrl {
        /// Offending URL
        url: String,
        /// Parse failure
        reason: String,
    },
    /// Settings file could not be read or written
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Settings file is not a JSON object of strings
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors requesting a faucet airdrop.
#[derive(Debug, Error)]
pub enum AirdropError {
    /// Faucets do not exist on this network
    #[error("airdrops are not available on {0}")]
    UnsupportedNetwork(Network),
    /// Amount outside the allowed range
    #[error("airdrop amount must be between 1 and 5 SOL, got {0}")]
    Amount(u64),
    /// No wallet to fund
    #[error("wallet not connected")]
    WalletNotConnected,
    /// Faucet answered 429
    #[error("airdrop limit reached or faucet has run dry; try again later or visit faucet.solana.com")]
    RateLimited,
    /// Any other faucet or confirmation failure
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Pipeline stage a launch failed in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LaunchStage {
    /// Request validation and wallet precondition
    Validation,
    /// Metadata upload
    Upload,
    /// Account sizing and rent
    Sizing,
    /// Instruction assembly
    Assembly,
    /// Signing, broadcast and confirmation
    Submission,
}

impl fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LaunchStage::Validation => "validation",
            LaunchStage::Upload => "upload",
            LaunchStage::Sizing => "sizing",
            LaunchStage::Assembly => "assembly",
            LaunchStage::Submission => "submission",
        };
        f.write_str(s)
    }
}

/// Errors from the launch pipeline, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Request rejected before any network call
    #[error("invalid launch request: {0}")]
    Validation(#[from] ValidationError),
    /// No wallet public key
    #[error("wallet not connected")]
    WalletNotConnected,
    /// Metadata store credentials missing
    #[error("metadata store is not configured: {0}")]
    Configuration(String),
    /// Metadata upload failed; nothing touched the ledger
    #[error("metadata upload failed: {0}")]
    Upload(#[source] UploadError),
    /// Rent query or layout failed after the metadata was uploaded to `uri`
    #[error("sizing failed after metadata was uploaded to {uri}: {source}")]
    Sizing {
        /// URI of the already-uploaded metadata
        uri: String,
        /// Sizing failure
        #[source]
        source: SizingError,
    },
    /// Instruction builders failed
    #[error("instruction assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
    /// Transaction definitely did not land
    #[error("transaction submission failed for mint {mint}: {source}")]
    Submission {
        /// Mint address of the abandoned attempt
        mint: Pubkey,
        /// Submission failure
        #[source]
        source: SubmissionError,
    },
    /// Transaction was broadcast and may have landed, revocations included
    #[error("launch outcome unknown: mint {mint} may exist on-chain ({source})")]
    OutcomeUnknown {
        /// Mint address that may now exist
        mint: Pubkey,
        /// Broadcast signature; `None` when the wallet's send never returned one
        signature: Option<Signature>,
        /// Confirmation failure
        #[source]
        source: SubmissionError,
    },
}

impl LaunchError {
    /// Stage the pipeline stopped in.
    pub fn stage(&self) -> LaunchStage {
        match self {
            LaunchError::Validation(_) | LaunchError::WalletNotConnected => LaunchStage::Validation,
            LaunchError::Configuration(_) | LaunchError::Upload(_) => LaunchStage::Upload,
            LaunchError::Sizing { .. } => LaunchStage::Sizing,
            LaunchError::Assembly(_) => LaunchStage::Assembly,
            LaunchError::Submission { .. } | LaunchError::OutcomeUnknown { .. } => {
                LaunchStage::Submission
            }
        }
    }

    /// True when the ledger may hold the mint despite the error.
    pub fn is_outcome_unknown(&self) -> bool {
        matches!(self, LaunchError::OutcomeUnknown { .. })
    }
}
