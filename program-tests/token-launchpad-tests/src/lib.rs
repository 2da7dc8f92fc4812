//! Shared fixtures for the launch pipeline tests: an in-memory ledger that executes the
//! launch transaction into a real Token-2022 account image, a scripted metadata store and
//! a scripted wallet.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    program_option::COption,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    system_instruction::SystemInstruction,
    system_program,
    transaction::{Transaction, TransactionError},
};
use spl_pod::optional_keys::OptionalNonZeroPubkey;
use spl_token_2022::{
    extension::{
        metadata_pointer::MetadataPointer, BaseStateWithExtensionsMut, ExtensionType,
        StateWithExtensionsMut,
    },
    state::Mint,
};
use spl_token_metadata_interface::{
    instruction::TokenMetadataInstruction,
    state::{Field, TokenMetadata},
};
use spl_type_length_value::variable_len_pack::VariableLenPack;
use token_launchpad_sdk::{
    AuthorityKind, LaunchStep, LedgerRpc, MetadataJson, MetadataStore, RpcError,
    TokenLaunchClient, TokenLaunchRequest, UploadError, WalletError, WalletSigner,
};
use tokio::net::TcpListener;

/// Install a test log writer once; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// A request that passes validation: 1000 tokens at 9 decimals, description, no revokes.
pub fn sample_request() -> TokenLaunchRequest {
    TokenLaunchRequest {
        name: "Test Token".into(),
        symbol: "TEST".into(),
        decimals: 9,
        initial_supply: 1000,
        image_url: Some("https://example.com/token.png".into()),
        description: Some("A token for testing".into()),
        revoke_mint: false,
        revoke_freeze: false,
    }
}

// === Mint account fixture ===

/// Builds the byte image of a Token-2022 mint with a metadata pointer and embedded metadata.
#[derive(Clone, Debug)]
pub struct MintFixture {
    pub mint: Pubkey,
    pub decimals: u8,
    pub supply: u64,
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
    pub pointer_authority: Option<Pubkey>,
    pub metadata: TokenMetadata,
}

impl MintFixture {
    pub fn new(mint: Pubkey, authority: Pubkey) -> Self {
        Self {
            mint,
            decimals: 9,
            supply: 0,
            mint_authority: Some(authority),
            freeze_authority: Some(authority),
            pointer_authority: Some(authority),
            metadata: TokenMetadata {
                update_authority: OptionalNonZeroPubkey(authority),
                mint,
                name: "Test Token".into(),
                symbol: "TEST".into(),
                uri: "https://example.com/meta.json".into(),
                additional_metadata: vec![],
            },
        }
    }

    /// Base mint with the pointer extension, as allocated by create-account.
    pub fn base_len() -> Result<usize, ProgramError> {
        ExtensionType::try_calculate_account_len::<Mint>(&[ExtensionType::MetadataPointer])
    }

    /// Account size once the metadata extension (2-byte type, 2-byte length) is appended.
    pub fn final_len(&self) -> Result<usize, ProgramError> {
        Ok(Self::base_len()? + 2 + 2 + self.metadata.get_packed_len()?)
    }

    pub fn build(&self) -> Result<Vec<u8>, ProgramError> {
        let mut data = vec![0u8; self.final_len()?];

        let mut state = StateWithExtensionsMut::<Mint>::unpack_uninitialized(&mut data)?;
        let pointer = state.init_extension::<MetadataPointer>(true)?;
        pointer.authority = OptionalNonZeroPubkey::try_from(self.pointer_authority)?;
        pointer.metadata_address = OptionalNonZeroPubkey::try_from(Some(self.mint))?;

        state.base = Mint {
            mint_authority: COption::from(self.mint_authority),
            supply: self.supply,
            decimals: self.decimals,
            is_initialized: true,
            freeze_authority: COption::from(self.freeze_authority),
        };
        state.pack_base();
        state.init_account_type()?;
        state.init_variable_len_extension(&self.metadata, false)?;
        Ok(data)
    }

    pub fn account(&self, lamports: u64) -> Result<Account, ProgramError> {
        Ok(Account {
            lamports,
            data: self.build()?,
            owner: spl_token_2022::id(),
            executable: false,
            rent_epoch: 0,
        })
    }
}

/// Replay a launch transaction's instructions into the mint fixture they would produce.
pub fn execute_launch(tx: &Transaction) -> Option<MintFixture> {
    let client = TokenLaunchClient::default();
    let keys = &tx.message.account_keys;
    let instructions: Vec<Instruction> = tx
        .message
        .instructions
        .iter()
        .map(|ci| Instruction {
            program_id: keys[ci.program_id_index as usize],
            accounts: ci
                .accounts
                .iter()
                .map(|i| AccountMeta::new(keys[*i as usize], false))
                .collect(),
            data: ci.data.clone(),
        })
        .collect();

    let create = instructions.first()?;
    let payer = create.accounts.first()?.pubkey;
    let mint = create.accounts.get(1)?.pubkey;
    let mut fixture = MintFixture::new(mint, payer);

    for ix in &instructions {
        if ix.program_id == spl_token_2022::id() {
            match TokenMetadataInstruction::unpack(&ix.data) {
                Ok(TokenMetadataInstruction::Initialize(init)) => {
                    fixture.metadata.name = init.name;
                    fixture.metadata.symbol = init.symbol;
                    fixture.metadata.uri = init.uri;
                    continue;
                }
                Ok(TokenMetadataInstruction::UpdateField(update)) => {
                    if let Field::Key(key) = update.field {
                        fixture.metadata.additional_metadata.push((key, update.value));
                    }
                    continue;
                }
                _ => {}
            }
        }
        let Some(step) = client.describe_instruction(ix) else {
            continue;
        };
        match step {
            LaunchStep::InitializeMint { decimals } => fixture.decimals = decimals,
            LaunchStep::MintTo { amount } => fixture.supply += amount,
            LaunchStep::SetAuthority {
                kind: AuthorityKind::Mint,
                new_authority,
            } => fixture.mint_authority = new_authority,
            LaunchStep::SetAuthority {
                kind: AuthorityKind::Freeze,
                new_authority,
            } => fixture.freeze_authority = new_authority,
            _ => {}
        }
    }
    Some(fixture)
}

/// Decoded create-account step of a launch transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreateAccount {
    pub lamports: u64,
    pub space: u64,
    pub owner: Pubkey,
}

/// The system-program create-account instruction a launch transaction opens with.
pub fn create_account_of(tx: &Transaction) -> Option<CreateAccount> {
    let ix = tx.message.instructions.first()?;
    if tx.message.account_keys[ix.program_id_index as usize] != system_program::id() {
        return None;
    }
    match bincode::deserialize::<SystemInstruction>(&ix.data).ok()? {
        SystemInstruction::CreateAccount {
            lamports,
            space,
            owner,
        } => Some(CreateAccount {
            lamports,
            space,
            owner,
        }),
        _ => None,
    }
}

/// Reject a launch whose create-account step does not match the Token-2022 layout: space
/// must be the base mint with the pointer extension, and lamports must cover the size the
/// account reaches once the metadata is embedded.
pub fn check_launch_layout(tx: &Transaction) -> Result<(), String> {
    let (Some(create), Some(fixture)) = (create_account_of(tx), execute_launch(tx)) else {
        return Ok(());
    };
    let base_len = MintFixture::base_len().map_err(|e| e.to_string())?;
    let final_len = fixture.final_len().map_err(|e| e.to_string())?;
    if create.owner != spl_token_2022::id() {
        return Err(format!("mint owner {} is not Token-2022", create.owner));
    }
    if create.space != base_len as u64 {
        return Err(format!("allocated {} bytes, expected {}", create.space, base_len));
    }
    let required = FakeLedger::rent_for(final_len);
    if create.lamports != required {
        return Err(format!(
            "funded {} lamports, {} bytes need {}",
            create.lamports, final_len, required
        ));
    }
    Ok(())
}

// === Fake ledger ===

/// What the ledger reports after a transaction is sent.
#[derive(Clone, Debug)]
pub enum ConfirmBehavior {
    /// Confirms and applies the transaction
    Confirmed,
    /// Executes and fails
    Failed(TransactionError),
    /// Confirmation wait times out, but a later status check finds it landed
    TimedOutButLanded,
    /// Confirmation wait times out and the ledger never reports a status
    TimedOut,
}

#[derive(Debug, Default)]
pub struct LedgerCalls {
    pub rent: AtomicUsize,
    pub blockhash: AtomicUsize,
    pub send: AtomicUsize,
    pub status: AtomicUsize,
    pub get_account: AtomicUsize,
    pub airdrop: AtomicUsize,
}

impl LedgerCalls {
    pub fn total(&self) -> usize {
        [
            &self.rent,
            &self.blockhash,
            &self.send,
            &self.status,
            &self.get_account,
            &self.airdrop,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

/// In-memory ledger. Sent transactions must carry valid signatures; confirmed launches are
/// materialized as real Token-2022 mint accounts.
pub struct FakeLedger {
    pub calls: LedgerCalls,
    pub confirm: ConfirmBehavior,
    pub rent_error: Option<String>,
    pub airdrop_error: Option<String>,
    /// Skip materializing accounts so read-back finds nothing
    pub hide_accounts: bool,
    pub rent_queries: Mutex<Vec<usize>>,
    pub sent: Mutex<Vec<Transaction>>,
    pub accounts: Mutex<HashMap<Pubkey, Account>>,
    landed: Mutex<HashMap<Signature, Result<(), TransactionError>>>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self {
            calls: LedgerCalls::default(),
            confirm: ConfirmBehavior::Confirmed,
            rent_error: None,
            airdrop_error: None,
            hide_accounts: false,
            rent_queries: Mutex::new(vec![]),
            sent: Mutex::new(vec![]),
            accounts: Mutex::new(HashMap::new()),
            landed: Mutex::new(HashMap::new()),
        }
    }
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirm(mut self, confirm: ConfirmBehavior) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_rent_error(mut self, message: &str) -> Self {
        self.rent_error = Some(message.to_string());
        self
    }

    pub fn with_airdrop_error(mut self, message: &str) -> Self {
        self.airdrop_error = Some(message.to_string());
        self
    }

    pub fn with_hidden_accounts(mut self) -> Self {
        self.hide_accounts = true;
        self
    }

    /// Rent formula: 10 lamports per byte.
    pub fn rent_for(len: usize) -> u64 {
        len as u64 * 10
    }

    pub fn insert_account(&self, address: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(address, account);
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    fn apply(&self, tx: &Transaction) {
        if self.hide_accounts {
            return;
        }
        if let Some(fixture) = execute_launch(tx) {
            let len = fixture.final_len().unwrap_or_default();
            if let Ok(account) = fixture.account(Self::rent_for(len)) {
                self.insert_account(fixture.mint, account);
            }
        }
    }
}

#[async_trait]
impl LedgerRpc for FakeLedger {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError> {
        self.calls.rent.fetch_add(1, Ordering::SeqCst);
        self.rent_queries.lock().unwrap().push(data_len);
        match &self.rent_error {
            Some(message) => Err(RpcError::Request(message.clone())),
            None => Ok(Self::rent_for(data_len)),
        }
    }

    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        self.calls.blockhash.fetch_add(1, Ordering::SeqCst);
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        self.calls.send.fetch_add(1, Ordering::SeqCst);
        transaction
            .verify()
            .map_err(|e| RpcError::Request(format!("signature verification failed: {}", e)))?;
        check_launch_layout(transaction)
            .map_err(|e| RpcError::Request(format!("preflight failed: {}", e)))?;
        let signature = transaction.signatures[0];
        self.sent.lock().unwrap().push(transaction.clone());

        let outcome = match &self.confirm {
            ConfirmBehavior::Confirmed | ConfirmBehavior::TimedOutButLanded => {
                self.apply(transaction);
                Some(Ok(()))
            }
            ConfirmBehavior::Failed(error) => Some(Err(error.clone())),
            ConfirmBehavior::TimedOut => None,
        };
        if let Some(outcome) = outcome {
            self.landed.lock().unwrap().insert(signature, outcome);
        }
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> Result<Option<Result<(), TransactionError>>, RpcError> {
        self.calls.status.fetch_add(1, Ordering::SeqCst);
        Ok(self.landed.lock().unwrap().get(signature).cloned())
    }

    async fn get_account(
        &self,
        address: &Pubkey,
        _commitment: CommitmentConfig,
    ) -> Result<Option<Account>, RpcError> {
        self.calls.get_account.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn request_airdrop(&self, _to: &Pubkey, _lamports: u64) -> Result<Signature, RpcError> {
        self.calls.airdrop.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.airdrop_error {
            return Err(RpcError::Request(message.clone()));
        }
        let signature = Signature::new_unique();
        self.landed.lock().unwrap().insert(signature, Ok(()));
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<(), RpcError> {
        let launched = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .any(|t| t.signatures[0] == *signature);
        match &self.confirm {
            ConfirmBehavior::TimedOut | ConfirmBehavior::TimedOutButLanded if launched => {
                Err(RpcError::ConfirmationTimeout(*signature))
            }
            _ => match self.signature_status(signature, commitment).await? {
                Some(Ok(())) => Ok(()),
                Some(Err(error)) => Err(RpcError::TransactionFailed {
                    signature: *signature,
                    error,
                }),
                None => Err(RpcError::ConfirmationTimeout(*signature)),
            },
        }
    }
}

// === Fake metadata store ===

type UploadFailure = Box<dyn Fn() -> UploadError + Send + Sync>;

/// Scripted metadata store that records every document it receives.
pub struct FakeStore {
    uri: String,
    failure: Option<UploadFailure>,
    pub uploads: Mutex<Vec<MetadataJson>>,
}

impl FakeStore {
    pub fn ok(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            failure: None,
            uploads: Mutex::new(vec![]),
        }
    }

    pub fn failing(failure: impl Fn() -> UploadError + Send + Sync + 'static) -> Self {
        Self {
            uri: String::new(),
            failure: Some(Box::new(failure)),
            uploads: Mutex::new(vec![]),
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl MetadataStore for FakeStore {
    async fn upload(&self, json: &MetadataJson) -> Result<String, UploadError> {
        self.uploads.lock().unwrap().push(json.clone());
        match &self.failure {
            Some(failure) => Err(failure()),
            None => Ok(self.uri.clone()),
        }
    }
}

// === Fake wallet ===

/// How a connected wallet handles a signing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletBehavior {
    /// Sign and broadcast
    Send,
    /// Refuse to sign
    Reject,
    /// Broadcast, then lose the response to a transport error
    SendThenDropResponse,
    /// Fail with a transport error before anything reaches the ledger
    Unreachable,
}

/// Keypair wallet that can be disconnected or scripted to fail.
pub struct FakeWallet {
    keypair: Option<Keypair>,
    behavior: WalletBehavior,
    pub sign_requests: AtomicUsize,
}

impl FakeWallet {
    pub fn connected() -> Self {
        Self {
            keypair: Some(Keypair::new()),
            behavior: WalletBehavior::Send,
            sign_requests: AtomicUsize::new(0),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            keypair: None,
            ..Self::connected()
        }
    }

    pub fn rejecting() -> Self {
        Self::with_behavior(WalletBehavior::Reject)
    }

    pub fn with_behavior(behavior: WalletBehavior) -> Self {
        Self {
            behavior,
            ..Self::connected()
        }
    }
}

#[async_trait]
impl WalletSigner for FakeWallet {
    fn pubkey(&self) -> Option<Pubkey> {
        self.keypair.as_ref().map(|k| k.pubkey())
    }

    async fn sign_and_send(
        &self,
        mut transaction: Transaction,
        rpc: &dyn LedgerRpc,
    ) -> Result<Signature, WalletError> {
        self.sign_requests.fetch_add(1, Ordering::SeqCst);
        let keypair = self.keypair.as_ref().ok_or(WalletError::NotConnected)?;
        if self.behavior == WalletBehavior::Reject {
            return Err(WalletError::Rejected("user rejected the request".into()));
        }
        let blockhash = transaction.message.recent_blockhash;
        transaction.try_partial_sign(&[keypair], blockhash)?;
        let timeout = || {
            WalletError::Rpc(RpcError::Transport(
                "error sending request: operation timed out".into(),
            ))
        };
        match self.behavior {
            WalletBehavior::Unreachable => Err(timeout()),
            WalletBehavior::SendThenDropResponse => {
                rpc.send_transaction(&transaction).await?;
                Err(timeout())
            }
            _ => Ok(rpc.send_transaction(&transaction).await?),
        }
    }
}

/// Ledger, store and wallet bundled for pipeline tests.
pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub store: Arc<FakeStore>,
    pub wallet: Arc<FakeWallet>,
}

impl Harness {
    pub fn new(ledger: FakeLedger, store: FakeStore, wallet: FakeWallet) -> Self {
        Self {
            ledger: Arc::new(ledger),
            store: Arc::new(store),
            wallet: Arc::new(wallet),
        }
    }

    pub fn launcher(&self) -> token_launchpad_sdk::TokenLauncher {
        token_launchpad_sdk::TokenLauncher::new(
            self.ledger.clone(),
            self.store.clone(),
            self.wallet.clone(),
        )
    }
}

// === Network ===

/// A local address nothing is listening on.
pub async fn refused_address() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}", addr))
}
