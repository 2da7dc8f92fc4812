//! The launch pipeline: validate, upload, size, assemble, submit, read back.
//!
//! Stages run strictly in order and each one returns early on failure. Nothing is shared
//! between launches, so concurrent launches on the same `TokenLauncher` are independent;
//! preventing duplicate submissions of one request is left to the caller.

use std::sync::Arc;

use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use tracing::{debug, info, warn};

use crate::{
    client::{TokenLaunchClient, TxLaunchTokenParams},
    error::{LaunchError, ReadBackError, UploadError},
    network::NetworkSettings,
    reader::{MetadataReadBack, TokenLaunchReader},
    request::TokenLaunchRequest,
    rpc::LedgerRpc,
    sizing::size_mint_account,
    state::{AuthorityState, MetadataRecord},
    submit::submit_launch_transaction,
    upload::{CloudinaryStore, MetadataStore, StoreConfig},
    wallet::WalletSigner,
};

/// Explicit configuration for building a launcher; nothing is read from global state.
#[derive(Clone, Debug, Default)]
pub struct LaunchConfig {
    pub network: NetworkSettings,
    pub store: StoreConfig,
}

/// Outcome of a confirmed launch.
#[derive(Debug)]
pub struct TokenLaunchResult {
    pub mint_address: Pubkey,
    pub associated_token_address: Pubkey,
    pub signature: Signature,
    pub metadata_uri: String,
    /// Verification read; a failure here does not undo the launch
    pub read_back: Result<MetadataReadBack, ReadBackError>,
}

impl TokenLaunchResult {
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = json!({
            "mintAddress": self.mint_address.to_string(),
            "associatedTokenAddress": self.associated_token_address.to_string(),
            "signature": self.signature.to_string(),
            "metadataUri": self.metadata_uri,
        });
        match &self.read_back {
            Ok(read_back) => value["data"] = json!(read_back),
            Err(e) => value["readBackError"] = json!(e.to_string()),
        }
        value
    }
}

/// Runs launches against one ledger, metadata store and wallet.
pub struct TokenLauncher {
    client: TokenLaunchClient,
    rpc: Arc<dyn LedgerRpc>,
    store: Arc<dyn MetadataStore>,
    wallet: Arc<dyn WalletSigner>,
}

impl TokenLauncher {
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        store: Arc<dyn MetadataStore>,
        wallet: Arc<dyn WalletSigner>,
    ) -> Self {
        Self {
            client: TokenLaunchClient::default(),
            rpc,
            store,
            wallet,
        }
    }

    /// Connect to the configured endpoint and metadata store.
    pub fn from_config(
        config: &LaunchConfig,
        wallet: Arc<dyn WalletSigner>,
    ) -> Result<Self, LaunchError> {
        let endpoint = config
            .network
            .endpoint()
            .map_err(|e| LaunchError::Configuration(e.to_string()))?;
        let store = CloudinaryStore::new(config.store.clone()).map_err(LaunchError::Upload)?;
        let rpc = RpcClient::new_with_commitment(endpoint, CommitmentConfig::confirmed());
        Ok(Self::new(Arc::new(rpc), Arc::new(store), wallet))
    }

    pub fn with_client(mut self, client: TokenLaunchClient) -> Self {
        self.client = client;
        self
    }

    pub fn client(&self) -> &TokenLaunchClient {
        &self.client
    }

    pub fn rpc(&self) -> &dyn LedgerRpc {
        self.rpc.as_ref()
    }

    /// Read back an existing mint.
    pub async fn read(&self, mint: &Pubkey) -> Result<MetadataReadBack, ReadBackError> {
        TokenLaunchReader::new(self.client.token_program_id, self.rpc.as_ref())
            .read(mint)
            .await
    }

    /// Launch a token. The request is consumed; a retry needs a new request and gets a
    /// new mint.
    pub async fn launch(
        &self,
        request: TokenLaunchRequest,
    ) -> Result<TokenLaunchResult, LaunchError> {
        request.validate()?;
        let payer = self.wallet.pubkey().ok_or(LaunchError::WalletNotConnected)?;

        let mint_keypair = Keypair::new();
        let mint = mint_keypair.pubkey();
        info!(%mint, %payer, name = %request.name, symbol = %request.symbol, "launching token");

        let uri = self
            .store
            .upload(&request.metadata_json())
            .await
            .map_err(|e| match e {
                UploadError::Configuration(message) => LaunchError::Configuration(message),
                other => LaunchError::Upload(other),
            })?;

        let metadata = MetadataRecord::new(&request, mint, payer, uri);
        let sizing = size_mint_account(self.rpc.as_ref(), &metadata)
            .await
            .map_err(|source| LaunchError::Sizing {
                uri: metadata.uri.clone(),
                source,
            })?;
        let metadata_uri = metadata.uri.clone();

        let params = TxLaunchTokenParams::from_request(&request, mint, metadata, sizing, payer)?;
        let (instructions, derived) = self.client.launch_token_tx_with_addresses(&params)?;
        debug!(
            instructions = instructions.len(),
            ata = %derived.associated_token_address,
            "assembled launch transaction"
        );

        let signature = submit_launch_transaction(
            &instructions,
            &payer,
            mint_keypair,
            self.rpc.as_ref(),
            self.wallet.as_ref(),
        )
        .await
        .map_err(|source| {
            if source.is_outcome_unknown() {
                LaunchError::OutcomeUnknown {
                    mint,
                    signature: source.signature(),
                    source,
                }
            } else {
                LaunchError::Submission { mint, source }
            }
        })?;

        let read_back = self.read(&mint).await;
        match &read_back {
            Ok(read_back) => check_read_back(&params, read_back),
            Err(e) => warn!(%mint, error = %e, "read-back failed; the mint exists regardless"),
        }

        info!(%mint, %signature, "token launched");
        Ok(TokenLaunchResult {
            mint_address: mint,
            associated_token_address: derived.associated_token_address,
            signature,
            metadata_uri,
            read_back,
        })
    }
}

fn check_read_back(params: &TxLaunchTokenParams, read_back: &MetadataReadBack) {
    let payer = &params.payer;
    let checks = [
        (
            "mint authority",
            params.mint_authority,
            AuthorityState::from_onchain(read_back.mint.mint_authority, payer),
        ),
        (
            "freeze authority",
            params.freeze_authority,
            AuthorityState::from_onchain(read_back.mint.freeze_authority, payer),
        ),
    ];
    for (what, planned, actual) in checks {
        if planned != actual {
            warn!(?planned, ?actual, "read-back {} differs from plan", what);
        }
    }
    if read_back.metadata_pointer.metadata_address != Some(params.mint) {
        warn!(
            pointer = ?read_back.metadata_pointer.metadata_address,
            "metadata pointer does not reference the mint"
        );
    }
    if read_back.mint.supply != params.raw_amount {
        warn!(
            supply = read_back.mint.supply,
            expected = params.raw_amount,
            "read-back supply differs from minted amount"
        );
    }
}
