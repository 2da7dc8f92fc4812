use std::{path::PathBuf, str::FromStr, sync::Arc};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
    signer::Signer,
};
use token_launchpad_sdk::{
    request_airdrop,
    sizing::{mint_account_len, packed_metadata_len},
    FileStore, KeypairWallet, LaunchConfig, LaunchError, MetadataRecord, MintSizing, Network,
    NetworkSettings, StoreConfig, TokenLaunchClient, TokenLaunchReader, TokenLaunchRequest,
    TokenLauncher, TxLaunchTokenParams,
};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroize;

const DRY_RUN_URI: &str = "https://res.cloudinary.com/pending/raw/upload/token-metadata.json";

fn parse_pubkey(s: &str) -> anyhow::Result<Pubkey> {
    Pubkey::from_str(s.trim()).with_context(|| format!("invalid base58 address `{}`", s))
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NetworkArg {
    Mainnet,
    Devnet,
    Testnet,
    Localhost,
    Custom,
}

impl NetworkArg {
    fn to_network(self) -> Network {
        match self {
            NetworkArg::Mainnet => Network::Mainnet,
            NetworkArg::Devnet => Network::Devnet,
            NetworkArg::Testnet => Network::Testnet,
            NetworkArg::Localhost => Network::Localhost,
            NetworkArg::Custom => Network::Custom,
        }
    }
}

#[derive(Clone, Debug)]
enum SignerSourceKind {
    Prompt,
    Stdin,
    File,
    Env,
}

#[derive(Clone, Debug, Args)]
struct SignerArg {
    /// Signer source: prompt|stdin|file:/path|env:VAR
    #[arg(long = "payer", alias = "signer", default_value = "prompt")]
    signer: String,
}

/// Accepts a JSON byte array (solana keygen format) or a base58 secret key.
fn keypair_from_secret(secret: &str) -> anyhow::Result<Keypair> {
    let secret = secret.trim();
    let mut bytes: Vec<u8> = if secret.starts_with('[') {
        serde_json::from_str(secret).context("invalid JSON keypair")?
    } else {
        bs58::decode(secret)
            .into_vec()
            .context("secret is neither a JSON byte array nor base58")?
    };
    let keypair =
        Keypair::from_bytes(&bytes).map_err(|e| anyhow::anyhow!("invalid keypair: {}", e));
    bytes.zeroize();
    keypair
}

fn keypair_from_source(spec: &str) -> anyhow::Result<Keypair> {
    use std::io::Read as _;
    let (kind, rest) = if let Some(rest) = spec.strip_prefix("file:") {
        (SignerSourceKind::File, rest.to_string())
    } else if let Some(rest) = spec.strip_prefix("env:") {
        (SignerSourceKind::Env, rest.to_string())
    } else if spec == "stdin" {
        (SignerSourceKind::Stdin, String::new())
    } else {
        (SignerSourceKind::Prompt, String::new())
    };

    let mut secret = match kind {
        SignerSourceKind::Prompt => {
            rpassword::prompt_password("enter payer secret key (base58 or JSON bytes): ")?
        }
        SignerSourceKind::Stdin => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
        SignerSourceKind::File => {
            // keygen files load directly; anything else is read as text
            if let Ok(keypair) = read_keypair_file(&rest) {
                return Ok(keypair);
            }
            std::fs::read_to_string(&rest).with_context(|| format!("read {}", rest))?
        }
        SignerSourceKind::Env => {
            std::env::var(&rest).with_context(|| format!("env {} not set", rest))?
        }
    };
    let keypair = keypair_from_secret(&secret);
    secret.zeroize();
    keypair
}

#[derive(Parser, Debug)]
#[command(
    name = "launchpad",
    version,
    about = "Token Launchpad CLI",
    long_about = "Command-line interface for launching Token-2022 mints with embedded metadata.\nJSON is always printed to stdout; logs/status to stderr."
)]
struct Cli {
    /// Settings file holding the persisted network selection
    #[arg(
        default_value = "launchpad-settings.json",
        env = "LAUNCHPAD_SETTINGS",
        global = true,
        long
    )]
    settings: PathBuf,

    /// Override the persisted network for this invocation
    #[arg(global = true, long, value_enum)]
    network: Option<NetworkArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload metadata, create the mint, mint the supply and apply authority changes
    #[command(alias = "create", about = "Launch a new Token-2022 mint with metadata")]
    Launch(LaunchArgs),

    /// Show mint + metadata pointer + embedded metadata
    #[command(
        alias = "inspect",
        alias = "info",
        about = "Show mint, metadata pointer and embedded metadata"
    )]
    Show {
        #[arg(long)]
        mint: String,
    },

    /// Request test SOL for the payer
    #[command(about = "Request an airdrop on devnet, testnet, localhost or custom")]
    Airdrop {
        /// Whole SOL, 1..=5
        #[arg(long, default_value_t = 1)]
        amount: u64,

        /// Recipient signer source
        #[command(flatten)]
        payer: SignerArg,
    },

    #[command(subcommand, alias = "net", about = "Network selection")]
    Network(NetworkCmd),
}

#[derive(Args, Debug)]
struct LaunchArgs {
    /// Token name (2-20 chars)
    #[arg(long)]
    name: String,

    /// Token symbol (2-8 chars)
    #[arg(long)]
    symbol: String,

    /// Number of decimals for the mint
    #[arg(long, default_value_t = 9)]
    decimals: u8,

    /// Whole-token supply minted to the payer
    #[arg(long)]
    supply: u64,

    /// Image URL written into the metadata JSON
    #[arg(long)]
    image_url: Option<String>,

    /// Token description (8-50 chars)
    #[arg(long)]
    description: Option<String>,

    /// Remove the mint authority after minting
    #[arg(long, default_value_t = false)]
    revoke_mint: bool,

    /// Remove the freeze authority after minting
    #[arg(long, default_value_t = false)]
    revoke_freeze: bool,

    /// Print the planned instructions; no upload, no submission
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Payer signer source
    #[command(flatten)]
    payer: SignerArg,
}

impl LaunchArgs {
    fn to_request(&self) -> TokenLaunchRequest {
        TokenLaunchRequest {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            initial_supply: self.supply,
            image_url: self.image_url.clone(),
            description: self.description.clone(),
            revoke_mint: self.revoke_mint,
            revoke_freeze: self.revoke_freeze,
        }
    }
}

#[derive(Subcommand, Debug)]
enum NetworkCmd {
    /// Print the selected network and endpoint
    #[command(alias = "get")]
    Show,
    /// Select a network
    Set {
        #[arg(value_enum, value_name = "NETWORK")]
        selection: NetworkArg,
    },
    /// Store a custom RPC URL and select it
    #[command(alias = "rpc")]
    CustomRpc { url: String },
}

fn load_settings(cli: &Cli) -> anyhow::Result<(FileStore, NetworkSettings)> {
    let store = FileStore::open(&cli.settings)
        .with_context(|| format!("open settings {}", cli.settings.display()))?;
    let mut settings = NetworkSettings::load(&store).with_mainnet_override_from_env();
    if let Some(network) = cli.network {
        settings.set_network(network.to_network());
    }
    Ok((store, settings))
}

fn rpc_client(settings: &NetworkSettings) -> anyhow::Result<RpcClient> {
    let endpoint = settings.endpoint()?;
    eprintln!("rpc: {} ({})", endpoint, settings.network);
    Ok(RpcClient::new_with_commitment(
        endpoint,
        CommitmentConfig::confirmed(),
    ))
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn error_json(e: &LaunchError) -> serde_json::Value {
    let mut value = json!({
        "error": e.to_string(),
        "stage": e.stage().to_string(),
        "outcomeUnknown": e.is_outcome_unknown(),
    });
    match e {
        LaunchError::Submission { mint, .. } => value["mint"] = json!(mint.to_string()),
        LaunchError::OutcomeUnknown {
            mint, signature, ..
        } => {
            value["mint"] = json!(mint.to_string());
            if let Some(signature) = signature {
                value["signature"] = json!(signature.to_string());
            }
        }
        LaunchError::Sizing { uri, .. } => value["metadataUri"] = json!(uri),
        _ => {}
    }
    value
}

/// Offline plan: placeholder URI, no rent query.
fn dry_run(request: &TokenLaunchRequest, payer: Pubkey) -> anyhow::Result<serde_json::Value> {
    request.validate()?;
    let client = TokenLaunchClient::default();
    let mint = Keypair::new().pubkey();
    let metadata = MetadataRecord::new(request, mint, payer, DRY_RUN_URI.to_string());
    let sizing = MintSizing {
        mint_account_len: mint_account_len()?,
        metadata_len: packed_metadata_len(&metadata)?,
        rent_lamports: 0,
    };
    let params = TxLaunchTokenParams::from_request(request, mint, metadata, sizing, payer)?;
    let (ixs, derived) = client.launch_token_tx_with_addresses(&params)?;
    let steps: Vec<_> = ixs
        .iter()
        .filter_map(|ix| client.describe_instruction(ix))
        .map(|step| json!({ "step": step.label(), "detail": format!("{:?}", step) }))
        .collect();
    Ok(json!({
        "dryRun": true,
        "payer": payer.to_string(),
        "mint": mint.to_string(),
        "associatedTokenAddress": derived.associated_token_address.to_string(),
        "mintAccountLen": sizing.mint_account_len,
        "finalAccountLen": sizing.final_len(),
        "rawAmount": params.raw_amount,
        "steps": steps,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let (mut store, mut settings) = load_settings(&args)?;

    match args.command {
        Commands::Launch(launch) => {
            let request = launch.to_request();
            let payer_kp = keypair_from_source(&launch.payer.signer)?;

            if launch.dry_run {
                print_json(&dry_run(&request, payer_kp.pubkey())?)?;
                return Ok(());
            }

            let config = LaunchConfig {
                network: settings,
                store: StoreConfig::from_env(),
            };
            let wallet = Arc::new(KeypairWallet::new(payer_kp));
            let launcher = TokenLauncher::from_config(&config, wallet)?;

            match launcher.launch(request).await {
                Ok(result) => {
                    eprintln!(
                        "launch: mint={} signature={}",
                        result.mint_address, result.signature
                    );
                    print_json(&result.to_json())?;
                }
                Err(e) => {
                    print_json(&error_json(&e))?;
                    return Err(e).context("launch failed");
                }
            }
        }
        Commands::Show { mint } => {
            let mint_pk = parse_pubkey(&mint)?;
            let rpc = rpc_client(&settings)?;
            let reader = TokenLaunchReader::new(TokenLaunchClient::default().token_program_id, &rpc);
            let read_back = reader.read(&mint_pk).await?;
            print_json(&json!({
                "mintAddress": mint_pk.to_string(),
                "data": read_back,
            }))?;
        }
        Commands::Airdrop { amount, payer } => {
            let payer_kp = keypair_from_source(&payer.signer)?;
            let rpc = rpc_client(&settings)?;
            let signature =
                request_airdrop(&rpc, settings.network, Some(payer_kp.pubkey()), amount).await?;
            eprintln!("airdrop: {} SOL to {}", amount, payer_kp.pubkey());
            print_json(&json!({
                "recipient": payer_kp.pubkey().to_string(),
                "amount": amount,
                "signature": signature.to_string(),
            }))?;
        }
        Commands::Network(NetworkCmd::Show) => {
            let endpoint = settings.endpoint().map_err(anyhow::Error::from);
            print_json(&json!({
                "network": settings.network.as_str(),
                "customRpcUrl": settings.custom_rpc_url,
                "endpoint": endpoint.as_ref().ok(),
                "error": endpoint.as_ref().err().map(|e| e.to_string()),
            }))?;
        }
        Commands::Network(NetworkCmd::Set { selection }) => {
            settings.set_network(selection.to_network());
            if matches!(selection, NetworkArg::Custom) {
                anyhow::ensure!(
                    !settings.custom_rpc_url.is_empty(),
                    "no custom rpc url stored; use `network custom-rpc <url>`"
                );
            }
            settings.save(&mut store)?;
            eprintln!("network: {}", settings.network);
            print_json(&json!({ "network": settings.network.as_str() }))?;
        }
        Commands::Network(NetworkCmd::CustomRpc { url }) => {
            settings.set_custom_rpc_url(&url)?;
            settings.save(&mut store)?;
            eprintln!("network: {} ({})", settings.network, settings.custom_rpc_url);
            print_json(&json!({
                "network": settings.network.as_str(),
                "customRpcUrl": settings.custom_rpc_url,
            }))?;
        }
    }

    Ok(())
}
