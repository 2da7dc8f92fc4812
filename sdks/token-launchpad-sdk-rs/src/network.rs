//! Network selection and persisted settings.
//!
//! The selected network and the custom RPC URL are stored as plain key/value pairs so a
//! front end can restore them across restarts. Pipeline code never reads this state
//! directly; callers resolve an endpoint and pass it in.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use tracing::warn;

use crate::error::ConfigError;

/// Key holding the selected network name.
pub const NETWORK_KEY: &str = "solana-network";
/// Key holding the user-supplied RPC URL.
pub const CUSTOM_RPC_KEY: &str = "solana-custom-rpc";
/// Env var overriding the public mainnet endpoint.
pub const MAINNET_RPC_URL_ENV: &str = "MAINNET_RPC_URL";

pub const MAINNET_BETA_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEVNET_URL: &str = "https://api.devnet.solana.com";
pub const TESTNET_URL: &str = "https://api.testnet.solana.com";
pub const LOCALHOST_URL: &str = "http://localhost:8899";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Network {
    Mainnet,
    #[default]
    Devnet,
    Testnet,
    Localhost,
    Custom,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Devnet => "devnet",
            Network::Testnet => "testnet",
            Network::Localhost => "localhost",
            Network::Custom => "custom",
        }
    }

    /// Whether a faucet can be expected to answer airdrop requests.
    pub fn supports_airdrop(&self) -> bool {
        !matches!(self, Network::Mainnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" | "mainnet-beta" => Ok(Network::Mainnet),
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            "localhost" => Ok(Network::Localhost),
            "custom" => Ok(Network::Custom),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Network selection, injected into whatever builds the RPC connection.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NetworkSettings {
    pub network: Network,
    pub custom_rpc_url: String,
    /// Private mainnet endpoint, usually from `MAINNET_RPC_URL`
    pub mainnet_rpc_url: Option<String>,
}

impl NetworkSettings {
    /// Restore settings from a key/value store. Unknown or missing network names fall back
    /// to devnet.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let network = store
            .get(NETWORK_KEY)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        let custom_rpc_url = store.get(CUSTOM_RPC_KEY).unwrap_or_default();
        Self {
            network,
            custom_rpc_url,
            mainnet_rpc_url: None,
        }
    }

    /// Persist the selection and custom URL.
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), ConfigError> {
        store.set(NETWORK_KEY, self.network.as_str())?;
        store.set(CUSTOM_RPC_KEY, &self.custom_rpc_url)?;
        Ok(())
    }

    /// Pick up `MAINNET_RPC_URL` from the environment, if set.
    pub fn with_mainnet_override_from_env(mut self) -> Self {
        self.mainnet_rpc_url = std::env::var(MAINNET_RPC_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());
        self
    }

    pub fn set_network(&mut self, network: Network) {
        self.network = network;
    }

    /// Store a custom RPC URL. A non-empty URL also switches the selection to `custom`.
    pub fn set_custom_rpc_url(&mut self, url: &str) -> Result<(), ConfigError> {
        let url = url.trim();
        if !url.is_empty() {
            validate_rpc_url(url)?;
            self.network = Network::Custom;
        }
        self.custom_rpc_url = url.to_string();
        Ok(())
    }

    /// Resolve the RPC endpoint for the selected network.
    pub fn endpoint(&self) -> Result<String, ConfigError> {
        match self.network {
            Network::Mainnet => match &self.mainnet_rpc_url {
                Some(url) => Ok(url.clone()),
                None => {
                    warn!(
                        "{} not set; the public mainnet-beta endpoint is heavily rate limited, \
                         consider a custom rpc url",
                        MAINNET_RPC_URL_ENV
                    );
                    Ok(MAINNET_BETA_URL.to_string())
                }
            },
            Network::Devnet => Ok(DEVNET_URL.to_string()),
            Network::Testnet => Ok(TESTNET_URL.to_string()),
            Network::Localhost => Ok(LOCALHOST_URL.to_string()),
            Network::Custom => {
                if self.custom_rpc_url.is_empty() {
                    return Err(ConfigError::MissingCustomRpcUrl);
                }
                validate_rpc_url(&self.custom_rpc_url)?;
                Ok(self.custom_rpc_url.clone())
            }
        }
    }
}

fn validate_rpc_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidRpcUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidRpcUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme `{}`", other),
        }),
    }
}

/// String key/value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;
}

/// Volatile store, mostly for tests and one-shot invocations.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Flat JSON object on disk. Every `set` rewrites the file.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `path`, starting empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => BTreeMap::new(),
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.entries.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
