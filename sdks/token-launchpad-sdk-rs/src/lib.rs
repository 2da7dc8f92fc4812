//! Token Launchpad – Rust SDK
//!
//! This crate provides:
//! - Launch request validation and the off-chain metadata JSON document
//! - A metadata store client (Cloudinary unsigned raw uploads) behind the `MetadataStore` seam
//! - Mint account sizing for Token-2022 with a metadata pointer and embedded metadata
//! - Instruction builders with correct ordering, plus a transaction builder for the full launch
//! - Submission with a co-signing mint keypair and a `WalletSigner` fee payer
//! - Readers that decode a launched mint back into mint, pointer and metadata state
//! - Network selection and persisted endpoint settings
//!
//! `TokenLauncher` composes all of the above into one `launch` call. The lower-level pieces
//! stay public for callers that want to assemble or submit transactions themselves.

pub mod airdrop;
pub mod client;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod reader;
pub mod request;
pub mod rpc;
pub mod sizing;
pub mod state;
pub mod submit;
pub mod upload;
pub mod wallet;

pub use airdrop::request_airdrop;
pub use client::{DerivedAddresses, LaunchStep, TokenLaunchClient, TxLaunchTokenParams};
pub use error::{
    AirdropError, AssemblyError, ConfigError, LaunchError, LaunchStage, ReadBackError, RpcError,
    SizingError, SubmissionError, UploadError, ValidationError, WalletError,
};
pub use network::{FileStore, KeyValueStore, MemoryStore, Network, NetworkSettings};
pub use pipeline::{LaunchConfig, TokenLaunchResult, TokenLauncher};
pub use reader::{
    decode_mint_account, MetadataPointerState, MetadataReadBack, MetadataState, MintState,
    TokenLaunchReader,
};
pub use request::TokenLaunchRequest;
pub use rpc::LedgerRpc;
pub use sizing::{size_mint_account, MintSizing};
pub use state::{AuthorityKind, AuthorityState, MetadataRecord};
pub use submit::submit_launch_transaction;
pub use upload::{CloudinaryStore, MetadataJson, MetadataStore, StoreConfig};
pub use wallet::{KeypairWallet, WalletSigner};
