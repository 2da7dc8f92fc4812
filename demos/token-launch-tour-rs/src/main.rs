use std::sync::Arc;

use anyhow::Context;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig, native_token::LAMPORTS_PER_SOL,
    signature::read_keypair_file, signer::Signer,
};
use token_launchpad_sdk::{
    request_airdrop, CloudinaryStore, KeypairWallet, MemoryStore, NetworkSettings, StoreConfig,
    TokenLaunchRequest, TokenLauncher,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env from demos/.env (CLOUDINARY_CLOUD_NAME, PAYER_KEYPAIR, ...)
    let _ = dotenvy::from_path("demos/.env").ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let keypair_path = std::env::var("PAYER_KEYPAIR").context("PAYER_KEYPAIR")?;
    let payer_kp = read_keypair_file(&keypair_path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", keypair_path, e))?;
    let payer = payer_kp.pubkey();

    // Network from env; nothing persisted for the tour
    let mut settings =
        NetworkSettings::load(&MemoryStore::default()).with_mainnet_override_from_env();
    if let Ok(network) = std::env::var("SOLANA_NETWORK") {
        settings.set_network(network.parse()?);
    }
    if let Ok(url) = std::env::var("SOLANA_CUSTOM_RPC") {
        settings.set_custom_rpc_url(&url)?;
    }
    let endpoint = settings.endpoint()?;
    let rpc = Arc::new(RpcClient::new_with_commitment(
        endpoint.clone(),
        CommitmentConfig::confirmed(),
    ));
    println!("RPC: {} ({})", endpoint, settings.network);
    println!("Payer: {}", payer);

    let balance = rpc.get_balance(&payer).await.context("get balance")?;
    println!("Payer lamports: {}", balance);
    if balance < LAMPORTS_PER_SOL / 10 && settings.network.supports_airdrop() {
        println!("Requesting 1 SOL airdrop...");
        request_airdrop(rpc.as_ref(), settings.network, Some(payer), 1).await?;
    }

    let request = TokenLaunchRequest {
        name: "Demo Token".into(),
        symbol: "DEMO".into(),
        decimals: 6,
        initial_supply: 1_000_000,
        image_url: Some("https://example.com/demo.png".into()),
        description: Some("Launched from the tour".into()),
        revoke_mint: true,
        revoke_freeze: true,
    };
    let expected_raw = request.raw_amount()?;

    println!("Building instructions: [create_mint_account, initialize_metadata_pointer, initialize_mint(decimals=6), initialize_metadata, update_field(description), create_associated_token_account, mint_to, set_authority(mint), set_authority(freeze)]");

    let store = CloudinaryStore::new(StoreConfig::from_env())?;
    let launcher = TokenLauncher::new(
        rpc,
        Arc::new(store),
        Arc::new(KeypairWallet::new(payer_kp)),
    );

    println!("Submitting launch...");
    let result = launcher.launch(request).await?;
    println!("Mint: {}", result.mint_address);
    println!("Associated token account: {}", result.associated_token_address);
    println!("Signature: {}", result.signature);
    println!("Metadata URI: {}", result.metadata_uri);

    // Verify what landed
    let read_back = result
        .read_back
        .as_ref()
        .map_err(|e| anyhow::anyhow!("read-back failed: {}", e))?;

    anyhow::ensure!(
        read_back.metadata.mint == result.mint_address,
        "mint mismatch; expected={} actual={}",
        result.mint_address,
        read_back.metadata.mint
    );

    anyhow::ensure!(
        read_back.metadata.symbol == "DEMO",
        "symbol mismatch; expected=DEMO actual={}",
        read_back.metadata.symbol
    );

    anyhow::ensure!(
        read_back.mint.supply == expected_raw,
        "supply mismatch; expected={} actual={}",
        expected_raw,
        read_back.mint.supply
    );

    anyhow::ensure!(
        read_back.mint.mint_authority.is_none() && read_back.mint.freeze_authority.is_none(),
        "authorities were not revoked: {:?}",
        read_back.mint
    );

    println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    Ok(())
}
