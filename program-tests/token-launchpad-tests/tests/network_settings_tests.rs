use serial_test::serial;
use token_launchpad_sdk::{
    network::{CUSTOM_RPC_KEY, MAINNET_BETA_URL, MAINNET_RPC_URL_ENV, NETWORK_KEY},
    FileStore, KeyValueStore, Network, NetworkSettings,
};

#[test]
fn file_store_persists_selection_across_opens() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("settings.json");

    let mut store = FileStore::open(&path)?;
    let mut settings = NetworkSettings::load(&store);
    assert_eq!(settings.network, Network::Devnet);
    settings.set_custom_rpc_url("https://rpc.example.com")?;
    settings.save(&mut store)?;

    let reopened = FileStore::open(&path)?;
    assert_eq!(reopened.get(NETWORK_KEY).as_deref(), Some("custom"));
    assert_eq!(
        reopened.get(CUSTOM_RPC_KEY).as_deref(),
        Some("https://rpc.example.com")
    );
    let restored = NetworkSettings::load(&reopened);
    assert_eq!(restored.endpoint()?, "https://rpc.example.com");

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(raw[NETWORK_KEY], "custom");
    Ok(())
}

#[test]
fn corrupt_settings_file_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "not json")?;

    assert!(FileStore::open(&path).is_err());
    Ok(())
}

#[test]
#[serial]
fn mainnet_endpoint_honors_environment_override() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = FileStore::open(dir.path().join("settings.json"))?;
    store.set(NETWORK_KEY, "mainnet-beta")?;

    std::env::remove_var(MAINNET_RPC_URL_ENV);
    let settings = NetworkSettings::load(&store).with_mainnet_override_from_env();
    assert_eq!(settings.network, Network::Mainnet);
    assert_eq!(settings.endpoint()?, MAINNET_BETA_URL);

    std::env::set_var(MAINNET_RPC_URL_ENV, "https://mainnet.private.example.com");
    let settings = NetworkSettings::load(&store).with_mainnet_override_from_env();
    assert_eq!(settings.endpoint()?, "https://mainnet.private.example.com");

    std::env::remove_var(MAINNET_RPC_URL_ENV);
    Ok(())
}
